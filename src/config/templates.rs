//! Template catalog.
//!
//! The catalog is plain data: a map of template id to [`TemplateConfig`],
//! embedded at build time from `config/templates.yaml`. A catalog can also
//! be loaded from any YAML or JSON file with the same shape.

use super::files::read_required;
use super::types::TemplateConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::format;
use std::collections::BTreeMap;
use std::path::Path;

/// Built-in catalog source.
const BUILTIN_TEMPLATES: &str = include_str!("../../config/templates.yaml");

/// Registry of template descriptors by id.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, TemplateConfig>,
}

impl TemplateCatalog {
    pub fn new(templates: BTreeMap<String, TemplateConfig>) -> Self {
        Self { templates }
    }

    /// The catalog shipped with the binary.
    pub fn builtin() -> ConfigResult<Self> {
        let templates = format::decode(
            BUILTIN_TEMPLATES,
            format::ConfigFormat::Yaml,
            Path::new("<builtin>/templates.yaml"),
        )?;
        Ok(Self::new(templates))
    }

    /// Load a catalog file, format chosen by extension.
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let text = read_required(path).await?;
        Ok(Self::new(format::decode_for_path(&text, path)?))
    }

    /// Look up a template by id.
    pub fn get(&self, id: &str) -> ConfigResult<&TemplateConfig> {
        self.templates
            .get(id)
            .ok_or_else(|| ConfigError::template_not_found(id, self.ids()))
    }

    /// Known ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
