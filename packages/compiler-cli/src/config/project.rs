use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use webforms_compiler::{ParserConfig, TypeRegistry};

/// Read a camelCase JSON parser configuration
pub fn load_parser_config(path: &Path) -> anyhow::Result<ParserConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("cannot read config file {}", path.display()))?;
    let config = ParserConfig::from_json(&content)
        .with_context(|| format!("invalid parser config in {}", path.display()))?;
    Ok(config)
}

/// Built-in registry, extended with the type lines of each schema file
pub fn load_registry(schema_files: &[PathBuf]) -> anyhow::Result<Arc<TypeRegistry>> {
    if schema_files.is_empty() {
        return Ok(TypeRegistry::builtin());
    }
    let mut text = String::new();
    for path in schema_files {
        let content =
            fs::read_to_string(path).with_context(|| format!("cannot read schema file {}", path.display()))?;
        text.push_str(&content);
        text.push('\n');
    }
    let registry = TypeRegistry::with_builtins(text.lines()).context("invalid type schema")?;
    log::info!("loaded {} types", registry.len());
    Ok(Arc::new(registry))
}
