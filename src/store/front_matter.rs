// This file is part of the product Quire.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

// The fence line may carry trailing whitespace, including the \r of a
// CRLF-encoded record.
static FRONT_MATTER_FENCE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?m)^---[ \t\r]*$"));

#[derive(Debug, Default, PartialEq)]
pub struct ParsedRecord {
    pub meta: HashMap<String, String>,
    pub body: String,
}

/// Splits a record into `key: value` front matter and a Markdown body.
///
/// A record opens with a `---` fence line, carries one `key: value` pair per
/// line and is closed by a second `---` fence. Anything that does not match
/// that shape, including a missing closing fence, makes the whole file the
/// body with no metadata.
pub fn parse(raw: &str) -> ParsedRecord {
    let fence = match FRONT_MATTER_FENCE.as_ref() {
        Ok(re) => re,
        Err(_) => return whole_body(raw),
    };

    let parts: Vec<&str> = fence.splitn(raw, 3).collect();
    if parts.len() != 3 || !parts[0].trim().is_empty() {
        return whole_body(raw);
    }

    let mut meta = HashMap::new();
    for line in parts[1].lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            meta.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    ParsedRecord {
        meta,
        body: parts[2].trim_start_matches(['\r', '\n']).to_string(),
    }
}

/// Renders front matter fields and a body back into the on-disk format.
/// Field order is fixed so saved files diff cleanly.
pub fn serialize(fields: &[(&str, &str)], body: &str) -> String {
    let mut out = String::from("---\n");
    for (key, value) in fields {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    out.push_str("---\n\n");
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn whole_body(raw: &str) -> ParsedRecord {
    ParsedRecord {
        meta: HashMap::new(),
        body: raw.to_string(),
    }
}
