//! Expression Builders
//!
//! `<%$ Prefix: value %>` attribute values are handed to the expression
//! builder registered for `Prefix`. The builder parses the value once at
//! parse time into opaque data kept on the bound entry; builders that support
//! evaluation can also produce the value in process (no-compile pages).

use crate::builder::current_template_control;
use crate::config::ParserConfig;
use crate::error::{ErrorCode, ParseError, Result};
use crate::virtual_path::VirtualPath;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// What an expression builder can see of the document being parsed
pub struct ExpressionContext<'a> {
    pub config: &'a ParserConfig,
    pub virtual_path: &'a VirtualPath,
}

impl<'a> ExpressionContext<'a> {
    pub fn new(config: &'a ParserConfig, virtual_path: &'a VirtualPath) -> Self {
        ExpressionContext { config, virtual_path }
    }
}

pub trait ExpressionBuilder: Send + Sync {
    /// Prefix as registered, e.g. `AppSettings`
    fn prefix(&self) -> &str;

    fn parse_expression(&self, expression: &str, ctx: &ExpressionContext) -> Result<Value>;

    fn supports_evaluate(&self) -> bool {
        false
    }

    fn evaluate(&self, _parsed: &Value, _ctx: &ExpressionContext) -> Result<String> {
        Err(ParseError::new(
            ErrorCode::CannotEvaluateExpression,
            format!("Expressions with the prefix '{}' cannot be evaluated without compilation.", self.prefix()),
        ))
    }
}

fn find_ignore_case<'m, V>(map: &'m IndexMap<String, V>, key: &str) -> Option<&'m V> {
    map.get(key)
        .or_else(|| map.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v))
}

/// Local resources of the document at `virtual_path`
pub fn local_resources_for<'c>(
    config: &'c ParserConfig,
    virtual_path: &VirtualPath,
) -> Option<&'c IndexMap<String, String>> {
    config.local_resources.iter().find_map(|(path, resources)| {
        let matches = VirtualPath::new(path).map_or(false, |p| p == *virtual_path);
        matches.then_some(resources)
    })
}

fn not_found(what: &str, key: &str) -> ParseError {
    ParseError::new(
        ErrorCode::ExpressionValueNotFound,
        format!("The {} '{}' was not found.", what, key),
    )
}

fn string_field<'v>(parsed: &'v Value, field: &str) -> Option<&'v str> {
    parsed.get(field).and_then(Value::as_str)
}

/// `Resources: Class, Key` (global) or `Resources: Key` (local to the template control)
pub struct ResourceExpressionBuilder;

impl ExpressionBuilder for ResourceExpressionBuilder {
    fn prefix(&self) -> &str {
        "Resources"
    }

    fn parse_expression(&self, expression: &str, _ctx: &ExpressionContext) -> Result<Value> {
        let parts: Vec<&str> = expression.split(',').map(str::trim).collect();
        let invalid = || {
            ParseError::new(
                ErrorCode::InvalidResourceKey,
                format!("'{}' is not a valid resource expression; use 'Class, Key' or 'Key'.", expression),
            )
        };
        match parts.as_slice() {
            [key] if !key.is_empty() => Ok(json!({ "classKey": null, "resourceKey": key })),
            [class, key] if !class.is_empty() && !key.is_empty() => {
                Ok(json!({ "classKey": class, "resourceKey": key }))
            }
            _ => Err(invalid()),
        }
    }

    fn supports_evaluate(&self) -> bool {
        true
    }

    fn evaluate(&self, parsed: &Value, ctx: &ExpressionContext) -> Result<String> {
        let key = string_field(parsed, "resourceKey").unwrap_or_default();
        match string_field(parsed, "classKey") {
            Some(class) => find_ignore_case(&ctx.config.resources, class)
                .and_then(|resources| find_ignore_case(resources, key))
                .cloned()
                .ok_or_else(|| not_found("resource", &format!("{}, {}", class, key))),
            None => {
                let owner = current_template_control().map(|c| c.virtual_path);
                let path = owner.as_ref().unwrap_or(ctx.virtual_path);
                local_resources_for(ctx.config, path)
                    .and_then(|resources| find_ignore_case(resources, key))
                    .cloned()
                    .ok_or_else(|| not_found("local resource", key))
            }
        }
    }
}

/// `AppSettings: Key`
pub struct AppSettingsExpressionBuilder;

impl ExpressionBuilder for AppSettingsExpressionBuilder {
    fn prefix(&self) -> &str {
        "AppSettings"
    }

    fn parse_expression(&self, expression: &str, _ctx: &ExpressionContext) -> Result<Value> {
        Ok(json!({ "key": expression.trim() }))
    }

    fn supports_evaluate(&self) -> bool {
        true
    }

    fn evaluate(&self, parsed: &Value, ctx: &ExpressionContext) -> Result<String> {
        let key = string_field(parsed, "key").unwrap_or_default();
        find_ignore_case(&ctx.config.app_settings, key)
            .cloned()
            .ok_or_else(|| not_found("application setting", key))
    }
}

/// `ConnectionStrings: Name`, `Name.ConnectionString` or `Name.ProviderName`
pub struct ConnectionStringsExpressionBuilder;

impl ExpressionBuilder for ConnectionStringsExpressionBuilder {
    fn prefix(&self) -> &str {
        "ConnectionStrings"
    }

    fn parse_expression(&self, expression: &str, _ctx: &ExpressionContext) -> Result<Value> {
        let expression = expression.trim();
        let (name, property) = match expression.rsplit_once('.') {
            Some((name, suffix)) if suffix.eq_ignore_ascii_case("connectionstring") => (name, "ConnectionString"),
            Some((name, suffix)) if suffix.eq_ignore_ascii_case("providername") => (name, "ProviderName"),
            _ => (expression, "ConnectionString"),
        };
        Ok(json!({ "name": name, "property": property }))
    }

    fn supports_evaluate(&self) -> bool {
        true
    }

    fn evaluate(&self, parsed: &Value, ctx: &ExpressionContext) -> Result<String> {
        let name = string_field(parsed, "name").unwrap_or_default();
        let key = match string_field(parsed, "property") {
            Some("ProviderName") => format!("{}.ProviderName", name),
            _ => name.to_string(),
        };
        find_ignore_case(&ctx.config.connection_strings, &key)
            .cloned()
            .ok_or_else(|| not_found("connection string", &key))
    }
}

/// `RouteUrl: RouteName=Products, id=5`; only generated code can evaluate it
pub struct RouteUrlExpressionBuilder;

impl ExpressionBuilder for RouteUrlExpressionBuilder {
    fn prefix(&self) -> &str {
        "RouteUrl"
    }

    fn parse_expression(&self, expression: &str, _ctx: &ExpressionContext) -> Result<Value> {
        let mut values = Map::new();
        for pair in expression.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    values.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
                }
                _ => {
                    return Err(ParseError::new(
                        ErrorCode::InvalidExpressionSyntax,
                        format!("'{}' is not a valid route value; use 'name=value'.", pair),
                    ))
                }
            }
        }
        Ok(Value::Object(values))
    }
}

/// Expression builders by prefix (case-insensitive)
#[derive(Clone)]
pub struct ExpressionBuilderRegistry {
    builders: IndexMap<String, Arc<dyn ExpressionBuilder>>,
}

impl ExpressionBuilderRegistry {
    pub fn empty() -> Self {
        ExpressionBuilderRegistry { builders: IndexMap::new() }
    }

    /// `Resources`, `AppSettings`, `ConnectionStrings` and `RouteUrl`
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ResourceExpressionBuilder));
        registry.register(Arc::new(AppSettingsExpressionBuilder));
        registry.register(Arc::new(ConnectionStringsExpressionBuilder));
        registry.register(Arc::new(RouteUrlExpressionBuilder));
        registry
    }

    /// Register a builder, replacing one with the same prefix
    pub fn register(&mut self, builder: Arc<dyn ExpressionBuilder>) {
        self.builders.insert(builder.prefix().to_ascii_lowercase(), builder);
    }

    pub fn get(&self, prefix: &str) -> Option<&dyn ExpressionBuilder> {
        self.builders.get(&prefix.trim().to_ascii_lowercase()).map(|b| b.as_ref())
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.builders.values().map(|b| b.prefix())
    }
}

impl Default for ExpressionBuilderRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for ExpressionBuilderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.prefixes()).finish()
    }
}
