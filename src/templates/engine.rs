// This file is part of the product Quire.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use minijinja::{Environment, Value, default_auto_escape_callback};

pub trait TemplateEngine: Send + Sync {
    fn render(&self, template_name: &str, context: Value) -> Result<String, minijinja::Error>;
}

pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(default_auto_escape_callback);
        env.set_loader(embedded_template_loader);
        Self { env }
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render(&self, template_name: &str, context: Value) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template(template_name)?;
        tmpl.render(context)
    }
}

/// Template loader for minijinja that loads from embedded sources
fn embedded_template_loader(name: &str) -> Result<Option<String>, minijinja::Error> {
    let template_content = match name {
        // Error pages
        "error_404.html" => Some(include_str!("../public/templates/error_404.html")),
        "error_500.html" => Some(include_str!("../public/templates/error_500.html")),

        // Public site
        "public/base.html" => Some(include_str!("../public/templates/base.html")),
        "public/home.html" => Some(include_str!("../public/templates/home.html")),
        "public/page.html" => Some(include_str!("../public/templates/page.html")),

        // Admin area
        "admin/base.html" => Some(include_str!("../admin/templates/base.html")),
        "admin/login.html" => Some(include_str!("../admin/templates/login.html")),
        "admin/dashboard.html" => Some(include_str!("../admin/templates/dashboard.html")),
        "admin/editor.html" => Some(include_str!("../admin/templates/editor.html")),
        "admin/delete_confirm.html" => {
            Some(include_str!("../admin/templates/delete_confirm.html"))
        }

        _ => None,
    };

    Ok(template_content.map(|s| s.to_string()))
}
