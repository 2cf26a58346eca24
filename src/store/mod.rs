// This file is part of the product Quire.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub mod front_matter;
pub mod slug;

pub use slug::{is_valid_slug, slugify};

/// Publication state of a page. Files without a `status` field stay
/// published so records written by older versions remain visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Published,
    Draft,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Published => "published",
            PageStatus::Draft => "draft",
        }
    }

    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("draft") {
            PageStatus::Draft
        } else {
            PageStatus::Published
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub status: PageStatus,
    pub body: String,
}

/// The editable fields of a page, everything except the slug.
#[derive(Debug, Clone)]
pub struct PageFields {
    pub title: String,
    pub date: String,
    pub status: PageStatus,
    pub body: String,
}

#[derive(Debug)]
pub enum StoreError {
    InvalidSlug(String),
    Io(io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidSlug(slug) => write!(f, "Invalid page slug: {}", slug),
            StoreError::Io(err) => write!(f, "Page store I/O error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::InvalidSlug(_) => None,
            StoreError::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err)
    }
}

/// Flat-file page store. Every page is a single `<slug>.md` file directly
/// under the content directory.
#[derive(Debug, Clone)]
pub struct PageStore {
    content_dir: PathBuf,
}

impl PageStore {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Lists every page, newest date first. Pages sharing a date are ordered
    /// by slug so the listing is stable.
    pub fn list(&self) -> Result<Vec<Page>, StoreError> {
        let mut pages = Vec::new();
        for entry in fs::read_dir(&self.content_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }
            let stem = match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            if !is_valid_slug(&stem) {
                log::warn!("Skipping content file with invalid slug: {}", path.display());
                continue;
            }
            pages.push(read_page(&path, stem)?);
        }
        pages.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
        Ok(pages)
    }

    /// Loads a single page. Returns Ok(None) when no record exists for the
    /// slug; an invalid slug is an error so callers never touch paths
    /// outside the content directory.
    pub fn get(&self, slug: &str) -> Result<Option<Page>, StoreError> {
        let path = self.page_path(slug)?;
        if !path.is_file() {
            return Ok(None);
        }
        read_page(&path, slug.to_string()).map(Some)
    }

    /// Writes a page record, replacing any existing file for the slug. The
    /// content goes to a temp file first and is renamed into place, so a
    /// crash mid-write never leaves a truncated record behind.
    pub fn save(&self, slug: &str, fields: &PageFields) -> Result<(), StoreError> {
        let path = self.page_path(slug)?;
        let contents = front_matter::serialize(
            &[
                ("title", &fields.title),
                ("date", &fields.date),
                ("status", fields.status.as_str()),
            ],
            &fields.body,
        );

        let mut temp_path = path.clone();
        let temp_name = match path.file_name() {
            Some(name) => format!("{}.tmp", name.to_string_lossy()),
            None => "page.tmp".to_string(),
        };
        temp_path.set_file_name(temp_name);

        fs::write(&temp_path, contents)?;
        fs::rename(temp_path, path)?;
        Ok(())
    }

    /// Removes a page record. Deleting a slug with no record is not an
    /// error.
    pub fn delete(&self, slug: &str) -> Result<(), StoreError> {
        let path = self.page_path(slug)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn page_path(&self, slug: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_slug(slug) {
            return Err(StoreError::InvalidSlug(slug.to_string()));
        }
        Ok(self.content_dir.join(format!("{}.md", slug)))
    }
}

fn read_page(path: &Path, slug: String) -> Result<Page, StoreError> {
    let raw = fs::read_to_string(path)?;
    let record = front_matter::parse(&raw);
    let title = record
        .meta
        .get("title")
        .cloned()
        .unwrap_or_else(|| slug.clone());
    let date = record.meta.get("date").cloned().unwrap_or_default();
    let status = record
        .meta
        .get("status")
        .map(|raw| PageStatus::parse(raw))
        .unwrap_or(PageStatus::Published);
    Ok(Page {
        slug,
        title,
        date,
        status,
        body: record.body,
    })
}
