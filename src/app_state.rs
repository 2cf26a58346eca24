// This file is part of the product Quire.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use std::sync::Arc;

use crate::auth::sessions::SessionStore;
use crate::config::ValidatedConfig;
use crate::public::error::ErrorRenderer;
use crate::runtime_paths::RuntimePaths;
use crate::store::PageStore;
use crate::templates::{MiniJinjaEngine, TemplateEngine};

pub struct AppState {
    pub templates: Arc<dyn TemplateEngine>,
    pub error_renderer: ErrorRenderer,
    pub store: PageStore,
    pub sessions: SessionStore,
    pub config: ValidatedConfig,
    pub runtime_paths: RuntimePaths,
}

impl AppState {
    pub fn new(config: ValidatedConfig, runtime_paths: RuntimePaths) -> Self {
        Self {
            templates: Arc::new(MiniJinjaEngine::new()),
            error_renderer: ErrorRenderer::new(config.app.name.clone()),
            store: PageStore::new(runtime_paths.content_dir.clone()),
            sessions: SessionStore::new(config.admin.session_ttl_seconds),
            config,
            runtime_paths,
        }
    }
}
