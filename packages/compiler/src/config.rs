//! Parser Configuration
//!
//! Application-level settings that shape every parse: tag prefix
//! registrations, default imports, known device filters, expression builder
//! sources and filter limits. Loaded from JSON (camelCase keys) by tools.

use crate::parser::CompilationMode;
use indexmap::IndexMap;
use serde::Deserialize;

/// A tag prefix registered for the whole application
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagPrefixConfig {
    pub tag_prefix: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub assembly: Option<String>,
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
}

/// Ceilings enforced while parsing; a negative value means unlimited
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterLimits {
    pub max_controls: i64,
    pub max_dependencies: i64,
    pub max_direct_dependencies: i64,
}

impl Default for FilterLimits {
    fn default() -> Self {
        FilterLimits {
            max_controls: -1,
            max_dependencies: -1,
            max_direct_dependencies: -1,
        }
    }
}

/// Application configuration consumed by the parser
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParserConfig {
    /// Selects the current tag pattern (`true`) or the legacy one
    pub target_framework_is_current: bool,
    /// Keep parsing after the first error
    pub collect_errors: bool,
    pub in_designer: bool,
    pub default_compilation_mode: CompilationMode,
    pub tag_prefixes: Vec<TagPrefixConfig>,
    pub namespaces: Vec<String>,
    pub device_filters: Vec<String>,
    pub app_settings: IndexMap<String, String>,
    pub connection_strings: IndexMap<String, String>,
    /// Global resources keyed by class, then by resource key
    pub resources: IndexMap<String, IndexMap<String, String>>,
    /// Local resources keyed by document virtual path, then by resource key
    pub local_resources: IndexMap<String, IndexMap<String, String>>,
    pub filter_limits: Option<FilterLimits>,
    pub page_base_type: Option<String>,
    pub user_control_base_type: Option<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            target_framework_is_current: true,
            collect_errors: false,
            in_designer: false,
            default_compilation_mode: CompilationMode::Always,
            tag_prefixes: vec![TagPrefixConfig {
                tag_prefix: "asp".to_string(),
                namespace: Some("System.Web.UI.WebControls".to_string()),
                assembly: Some("System.Web".to_string()),
                tag_name: None,
                src: None,
            }],
            namespaces: vec![
                "System".to_string(),
                "System.Collections".to_string(),
                "System.Web".to_string(),
                "System.Web.UI".to_string(),
                "System.Web.UI.WebControls".to_string(),
                "System.Web.UI.HtmlControls".to_string(),
            ],
            device_filters: vec!["ie".to_string(), "mozilla".to_string(), "opera".to_string()],
            app_settings: IndexMap::new(),
            connection_strings: IndexMap::new(),
            resources: IndexMap::new(),
            local_resources: IndexMap::new(),
            filter_limits: None,
            page_base_type: None,
            user_control_base_type: None,
        }
    }
}

impl ParserConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_collect_errors(mut self, collect_errors: bool) -> Self {
        self.collect_errors = collect_errors;
        self
    }

    pub fn with_target_framework_is_current(mut self, current: bool) -> Self {
        self.target_framework_is_current = current;
        self
    }

    pub fn with_compilation_mode(mut self, mode: CompilationMode) -> Self {
        self.default_compilation_mode = mode;
        self
    }

    pub fn with_app_setting(mut self, key: &str, value: &str) -> Self {
        self.app_settings.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_tag_prefix(mut self, entry: TagPrefixConfig) -> Self {
        self.tag_prefixes.push(entry);
        self
    }

    pub fn is_known_device_filter(&self, filter: &str) -> bool {
        self.device_filters.iter().any(|f| f.eq_ignore_ascii_case(filter))
    }
}
