//! Template loader
//!
//! Loads code generation templates from an override directory or falls back to the
//! embedded defaults. Lookup order for `{name}`:
//! 1. `{templates-dir}/{name}.hbs` (configured override)
//! 2. Embedded fallback

use std::fmt;
use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;
use crate::error::{TranslateError, TranslateResult};

/// Where a template resolves from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Override(PathBuf),
    Embedded,
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override(path) => write!(f, "{}", path.display()),
            Self::Embedded => write!(f, "embedded"),
        }
    }
}

/// Loads and renders Handlebars templates
pub struct TemplateLoader {
    hbs: Handlebars<'static>,
    override_dir: Option<PathBuf>,
}

impl fmt::Debug for TemplateLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateLoader")
            .field("override_dir", &self.override_dir)
            .finish()
    }
}

fn engine() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    hbs.set_strict_mode(true);
    hbs.register_escape_fn(handlebars::no_escape);
    hbs
}

impl TemplateLoader {
    /// Create a loader that checks `override_dir` before the embedded templates
    pub fn new(override_dir: Option<&Path>) -> Self {
        debug!(?override_dir, "TemplateLoader::new: called");
        let override_dir = override_dir.filter(|dir| {
            let exists = dir.is_dir();
            if !exists {
                tracing::warn!(dir = %dir.display(), "Template directory not found, using embedded templates");
            }
            exists
        });
        Self {
            hbs: engine(),
            override_dir: override_dir.map(Path::to_path_buf),
        }
    }

    /// Create a loader that only uses embedded templates
    pub fn embedded_only() -> Self {
        debug!("TemplateLoader::embedded_only: called");
        Self {
            hbs: engine(),
            override_dir: None,
        }
    }

    /// Where `name` would load from, or `None` if it exists nowhere
    pub fn resolve(&self, name: &str) -> Option<TemplateSource> {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(format!("{name}.hbs"));
            if path.is_file() {
                debug!(?path, "TemplateLoader::resolve: found override");
                return Some(TemplateSource::Override(path));
            }
        }
        embedded::get_embedded(name).map(|_| TemplateSource::Embedded)
    }

    fn load_template(&self, name: &str) -> TranslateResult<String> {
        debug!(%name, "TemplateLoader::load_template: called");
        match self.resolve(name) {
            Some(TemplateSource::Override(path)) => {
                std::fs::read_to_string(&path).map_err(|e| TranslateError::Template {
                    name: name.to_string(),
                    message: format!("failed to read {}: {e}", path.display()),
                })
            }
            Some(TemplateSource::Embedded) => Ok(embedded::get_embedded(name).unwrap_or_default().to_string()),
            None => Err(TranslateError::Template {
                name: name.to_string(),
                message: "template not found".to_string(),
            }),
        }
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> TranslateResult<String> {
        debug!(%name, "TemplateLoader::render: called");
        let template = self.load_template(name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| TranslateError::Template {
                name: name.to_string(),
                message: e.to_string(),
            })
    }
}
