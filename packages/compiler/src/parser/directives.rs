//! Directives
//!
//! `<%@ ... %>` processing. The main directive (`Page`, `Control`, `Master`,
//! `Skin`, `Application`, or a directive without a name) configures the
//! document and its root builder; the others register tag prefixes, imports,
//! assemblies and references.

use super::document::TypeReference;
use super::kind::{CompilationMode, DocumentKind};
use super::registry::{TagNamespaceRegisterEntry, UserControlRegisterEntry};
use super::template_parser::{ParseEnv, ParseState};
use crate::error::{ErrorCode, ParseError, Result};
use crate::markup::{parse_property_device_filter, ParsedAttribute, ParsedAttributeCollection, RawAttribute};
use crate::parse_util::SourceLocation;
use crate::schema::TypeFlags;
use crate::virtual_path::VirtualPath;
use indexmap::IndexMap;

const KNOWN_DIRECTIVES: &[&str] = &[
    "page",
    "control",
    "master",
    "skin",
    "application",
    "register",
    "import",
    "assembly",
    "implements",
    "reference",
    "outputcache",
    "mastertype",
    "previouspagetype",
];

/// Main directive attributes the parser interprets itself
const BUILTIN_ATTRIBUTES: &[&str] = &[
    "language",
    "inherits",
    "classname",
    "codefile",
    "codebehind",
    "codefilebaseclass",
    "src",
    "debug",
    "strict",
    "explicit",
    "linepragmas",
    "warninglevel",
    "compileroptions",
    "compilationmode",
    "autoeventwireup",
    "enableviewstate",
    "enabletheming",
    "masterpagefile",
    "theme",
    "stylesheettheme",
    "targetschema",
    "description",
];

/// Attributes of a secondary directive, consumed one by one
struct DirectiveAttributes<'d> {
    directive: &'d str,
    attributes: ParsedAttributeCollection,
}

impl<'d> DirectiveAttributes<'d> {
    fn take(&mut self, name: &str) -> Option<String> {
        self.attributes
            .remove(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn take_required(&mut self, name: &str) -> Result<String> {
        self.take(name).ok_or_else(|| {
            ParseError::new(
                ErrorCode::MissingAttribute,
                format!("The '{}' directive is missing a '{}' attribute.", self.directive, name),
            )
        })
    }

    /// Fail on anything not consumed
    fn finish(self) -> Result<()> {
        match self.attributes.iter().next() {
            Some(attr) => Err(ParseError::new(
                ErrorCode::AttributeNotSupportedInDirective,
                format!(
                    "The '{}' attribute is not supported by the '{}' directive.",
                    attr.full_name(),
                    self.directive
                ),
            )),
            None => Ok(()),
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(invalid_value(name, value))
    }
}

fn invalid_value(name: &str, value: &str) -> ParseError {
    ParseError::new(
        ErrorCode::InvalidAttributeValue,
        format!("The value '{}' is not valid for the '{}' attribute.", value, name),
    )
}

fn mutually_exclusive(directive: &str, names: &[&str]) -> ParseError {
    ParseError::new(
        ErrorCode::AttributesMutuallyExclusive,
        format!(
            "The '{}' attributes of the '{}' directive are mutually exclusive.",
            names.join("', '"),
            directive
        ),
    )
}

fn only_one(directive: &str) -> ParseError {
    ParseError::new(
        ErrorCode::OnlyOneDirectiveAllowed,
        format!("Only one '{}' directive is allowed per file.", directive),
    )
}

impl ParseState<'_> {
    pub(super) fn consume_directive(&mut self, env: &ParseEnv, raw: Vec<RawAttribute>) -> Result<()> {
        let mut raw = raw.into_iter().peekable();
        let name = match raw.peek() {
            Some(first) if !first.has_equals => {
                let name = first.name.to_ascii_lowercase();
                raw.next();
                name
            }
            _ => String::new(),
        };

        let mut attributes = ParsedAttributeCollection::new();
        for attr in raw {
            let (filter, attr_name) = parse_property_device_filter(&attr.name);
            let position = self.scope.context.location(attr.value_offset);
            let added = attributes.add_with_position(
                &filter,
                &attr_name.to_ascii_lowercase(),
                &attr.value,
                position.line,
                position.column,
            );
            if let Err(full_name) = added {
                return Err(ParseError::new(
                    ErrorCode::DuplicateAttributeInDirective,
                    format!("The directive contains duplicate '{}' attributes.", full_name),
                ));
            }
        }

        let is_main = name.is_empty() || name == env.policy.default_directive;
        let directive = if name.is_empty() {
            env.policy.default_directive.to_string()
        } else {
            name
        };
        if let Some(filter) = self.scope.ctx(env).preprocessing_filter() {
            filter.preprocess_directive(&directive, &mut attributes);
        }
        log::trace!("directive '{}' with {} attributes", directive, attributes.len());

        if is_main {
            return self.process_main_directive(env, &directive, attributes);
        }
        if !KNOWN_DIRECTIVES.contains(&directive.as_str()) {
            if env.options.config.in_designer {
                log::warn!("ignoring unknown directive '{}' in designer mode", directive);
                return Ok(());
            }
            return Err(ParseError::new(
                ErrorCode::UnknownDirective,
                format!("The directive '{}' is unknown.", directive),
            ));
        }
        if !env.policy.allowed_directives.contains(&directive.as_str()) {
            return Err(ParseError::new(
                ErrorCode::DirectiveNotAllowed,
                format!("The '{}' directive is not allowed in this file.", directive),
            ));
        }
        if let Some(attr) = attributes.iter().find(|a| !a.filter.is_empty()) {
            return Err(ParseError::new(
                ErrorCode::DeviceFilterNotAllowedInDirective,
                format!(
                    "Device filters are not allowed on the '{}' directive ('{}').",
                    directive,
                    attr.full_name()
                ),
            ));
        }

        let attrs = DirectiveAttributes {
            directive: &directive,
            attributes,
        };
        match directive.as_str() {
            "register" => self.process_register(env, attrs),
            "import" => self.process_import(attrs),
            "assembly" => self.process_assembly(env, attrs),
            "implements" => self.process_implements(env, attrs),
            "reference" => self.process_reference(env, attrs),
            "outputcache" => self.process_output_cache(env, attrs),
            "mastertype" => {
                if self.document.master_type.is_some() {
                    return Err(only_one("mastertype"));
                }
                let reference = self.type_reference(env, attrs)?;
                self.document.master_type = Some(reference);
                Ok(())
            }
            "previouspagetype" => {
                if self.document.previous_page_type.is_some() {
                    return Err(only_one("previouspagetype"));
                }
                let reference = self.type_reference(env, attrs)?;
                self.document.previous_page_type = Some(reference);
                Ok(())
            }
            // Another kind's main directive
            _ => Err(ParseError::new(
                ErrorCode::DirectiveNotAllowed,
                format!("The '{}' directive is not allowed in this file.", directive),
            )),
        }
    }

    /// Check a referenced document against the filter and count it as a dependency
    fn add_virtual_reference(&mut self, env: &ParseEnv, virtual_path: &VirtualPath) -> Result<()> {
        if let Some(filter) = env.filter {
            if !filter.allow_virtual_reference(virtual_path) {
                return Err(ParseError::new(
                    ErrorCode::VirtualReferenceNotAllowed,
                    format!("The reference to '{}' is not allowed on this page.", virtual_path),
                ));
            }
            let total = env.options.type_resolution.dependencies(virtual_path).len().max(1);
            self.counters.count_direct_dependency(filter)?;
            self.counters.count_dependencies(filter, total)?;
        }
        self.document.add_source_dependency(virtual_path.clone());
        Ok(())
    }

    // Main directive

    fn process_main_directive(
        &mut self,
        env: &ParseEnv,
        directive: &str,
        mut attributes: ParsedAttributeCollection,
    ) -> Result<()> {
        if self.main_directive_seen {
            return Err(only_one(directive));
        }
        self.main_directive_seen = true;
        if env.options.config.in_designer {
            return Ok(());
        }

        if let Some(forbidden) = env
            .policy
            .forbidden_attributes
            .iter()
            .find(|name| attributes.iter().any(|a| a.name == **name))
        {
            return Err(ParseError::new(
                ErrorCode::AttributeNotAllowed,
                format!("The '{}' attribute is not allowed in the '{}' directive.", forbidden, directive),
            ));
        }

        if let Some(mode) = attributes.remove("compilationmode") {
            self.scope.compilation_mode =
                CompilationMode::parse(&mode).ok_or_else(|| invalid_value("compilationmode", &mode))?;
        }

        let has_code_file = attributes.contains("codefile");
        // Builtin settings first: root properties bind against the inherited type
        let (builtin, properties): (Vec<_>, Vec<_>) = attributes
            .iter()
            .partition(|a| BUILTIN_ATTRIBUTES.contains(&a.name.as_str()) || a.filter.eq_ignore_ascii_case("meta"));
        for attr in builtin {
            self.process_located(env, directive, attr)?;
        }

        let settings = &self.document.directive;
        if settings.code_file_base_class.is_some() && settings.code_file.is_none() {
            return Err(ParseError::new(
                ErrorCode::MissingAttribute,
                "The 'codefilebaseclass' attribute requires a 'codefile' attribute.",
            ));
        }
        if has_code_file && settings.inherits.is_none() {
            return Err(ParseError::new(
                ErrorCode::MissingAttribute,
                "The 'codefile' attribute requires an 'inherits' attribute.",
            ));
        }
        if let Some(inherits) = settings.inherits.clone() {
            if !has_code_file {
                self.rebind_root(env, &inherits)?;
            }
        }
        for attr in properties {
            self.process_located(env, directive, attr)?;
        }

        let settings = &self.document.directive;
        self.scope.template_control.type_name = settings.class_name.clone().or_else(|| settings.inherits.clone());
        Ok(())
    }

    fn process_located(&mut self, env: &ParseEnv, directive: &str, attr: &ParsedAttribute) -> Result<()> {
        let location = (attr.line > 0)
            .then(|| SourceLocation::new(self.scope.context.current_path().clone(), attr.line, attr.column));
        self.process_main_attribute(env, directive, attr, location.clone())
            .map_err(|e| match &location {
                Some(location) => e.or_location(location),
                None => e,
            })
    }

    fn process_main_attribute(
        &mut self,
        env: &ParseEnv,
        directive: &str,
        attr: &ParsedAttribute,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        let name = attr.name.as_str();
        let value = attr.value.trim();

        if attr.filter.eq_ignore_ascii_case("meta") {
            if name == "resourcekey" {
                self.builders.root_mut().resource_key = Some(value.to_string());
                return Ok(());
            }
            return Err(ParseError::new(
                ErrorCode::AttributeNotSupportedInDirective,
                format!("The 'meta:{}' attribute is not supported by the '{}' directive.", name, directive),
            ));
        }

        if !BUILTIN_ATTRIBUTES.contains(&name) {
            let ctx = self.scope.ctx(env);
            return self
                .builders
                .root_mut()
                .add_directive_property(&ctx, directive, &attr.filter, name, &attr.value, location);
        }
        if attr.value.contains("<%$") {
            return Err(ParseError::new(
                ErrorCode::IllegalExpressionBuilder,
                format!("Expression builders are not allowed on the '{}' attribute.", name),
            ));
        }
        if !attr.filter.is_empty() {
            return Err(ParseError::new(
                ErrorCode::IllegalDeviceFilter,
                format!("Device filters are not allowed on the '{}' attribute.", name),
            ));
        }

        let no_compile = self.scope.compilation_mode == CompilationMode::Never;
        let never = |name: &str| {
            ParseError::new(
                ErrorCode::CompilationModeNever,
                format!("The '{}' attribute is not allowed when the compilation mode is Never.", name),
            )
        };
        let settings = &mut self.document.directive;
        match name {
            "language" => settings.language = Some(value.to_string()),
            "inherits" => settings.inherits = Some(value.to_string()),
            "classname" => {
                if value.split('.').any(|part| !crate::parse_util::is_valid_identifier(part)) {
                    return Err(invalid_value(name, value));
                }
                settings.class_name = Some(value.to_string());
            }
            "codefilebaseclass" => settings.code_file_base_class = Some(value.to_string()),
            "codefile" | "src" => {
                if no_compile {
                    return Err(never(name));
                }
                let virtual_path = self.scope.context.current_path().combine(value)?;
                self.add_source_dependency(env, &virtual_path)?;
                if name == "src" {
                    self.document.directive.src = Some(virtual_path);
                } else {
                    self.document.directive.code_file = Some(virtual_path);
                }
            }
            "compileroptions" => {
                if no_compile {
                    return Err(never(name));
                }
                settings.compiler_options = Some(value.to_string());
            }
            "debug" => settings.debug = Some(parse_bool(name, value)?),
            "strict" => settings.strict = Some(parse_bool(name, value)?),
            "explicit" => settings.explicit = Some(parse_bool(name, value)?),
            "linepragmas" => settings.line_pragmas = Some(parse_bool(name, value)?),
            "autoeventwireup" => settings.auto_event_wireup = Some(parse_bool(name, value)?),
            "enableviewstate" => settings.enable_view_state = Some(parse_bool(name, value)?),
            "enabletheming" => settings.enable_theming = Some(parse_bool(name, value)?),
            "warninglevel" => {
                let level = value
                    .parse::<u32>()
                    .ok()
                    .filter(|l| *l <= 4)
                    .ok_or_else(|| invalid_value(name, value))?;
                settings.warning_level = Some(level);
            }
            "masterpagefile" => {
                if !matches!(env.kind, DocumentKind::Page | DocumentKind::MasterPage) {
                    return Err(not_supported(name, directive));
                }
                let virtual_path = self.scope.context.current_path().combine(value)?;
                self.add_virtual_reference(env, &virtual_path)?;
                self.document.directive.master_page_file = Some(virtual_path);
            }
            "theme" | "stylesheettheme" => {
                if env.kind != DocumentKind::Page {
                    return Err(not_supported(name, directive));
                }
                if name == "theme" {
                    settings.theme = Some(value.to_string());
                } else {
                    settings.stylesheet_theme = Some(value.to_string());
                }
            }
            "targetschema" => settings.target_schema = Some(value.to_string()),
            // Designer-only
            "codebehind" | "description" => {}
            _ => return Err(not_supported(name, directive)),
        }
        Ok(())
    }

    /// Type the root after the class named by `Inherits`
    fn rebind_root(&mut self, env: &ParseEnv, inherits: &str) -> Result<()> {
        let registry = &env.options.registry;
        let base_type = registry.find(inherits).ok_or_else(|| {
            ParseError::new(ErrorCode::TypeNotFound, format!("Could not load type '{}'.", inherits))
        })?;
        if let Some(required) = registry.find(env.policy.default_base_type) {
            if !registry.is_assignable(base_type, required) {
                return Err(ParseError::new(
                    ErrorCode::InvalidTypeToInherit,
                    format!(
                        "'{}' is not allowed here because it does not extend class '{}'.",
                        inherits, env.policy.default_base_type
                    ),
                ));
            }
        }
        let ctx = self.scope.ctx(env);
        self.builders.root_mut().set_root_type(&ctx, base_type);
        self.document.base_type = registry.full_name(base_type).to_string();
        Ok(())
    }

    // Secondary directives

    fn process_register(&mut self, env: &ParseEnv, mut attrs: DirectiveAttributes) -> Result<()> {
        let tag_prefix = attrs.take_required("tagprefix")?;
        let tag_name = attrs.take("tagname");
        let src = attrs.take("src");
        let namespace = attrs.take("namespace");
        let assembly = attrs.take("assembly");
        attrs.finish()?;

        match (namespace, src) {
            (Some(_), Some(_)) => Err(mutually_exclusive("register", &["namespace", "src"])),
            (None, Some(src)) => {
                let tag_name = tag_name.ok_or_else(|| {
                    ParseError::new(
                        ErrorCode::MissingAttribute,
                        "The 'register' directive needs a 'tagname' attribute together with 'src'.",
                    )
                })?;
                let virtual_path = self.scope.context.current_path().combine(&src)?;
                if virtual_path == *self.scope.context.document_path() {
                    return Err(ParseError::new(
                        ErrorCode::CircularReference,
                        format!("The file '{}' cannot register itself as a user control.", virtual_path),
                    ));
                }
                self.add_virtual_reference(env, &virtual_path)?;
                let entry = UserControlRegisterEntry {
                    tag_prefix,
                    tag_name,
                    virtual_path,
                };
                self.scope.tags.register_user_control(entry.clone());
                self.document.user_controls.push(entry);
                Ok(())
            }
            (Some(namespace), None) => {
                if tag_name.is_some() {
                    return Err(ParseError::new(
                        ErrorCode::AttributeNotSupportedInDirective,
                        "The 'tagname' attribute of the 'register' directive requires a 'src' attribute.",
                    ));
                }
                let entry = TagNamespaceRegisterEntry {
                    tag_prefix,
                    namespace,
                    assembly: assembly.clone(),
                };
                if let Some(assembly) = assembly {
                    if !self.document.assembly_dependencies.contains(&assembly) {
                        self.document.assembly_dependencies.push(assembly);
                    }
                }
                self.scope.tags.register_namespace(entry.clone());
                self.document.tag_namespaces.push(entry);
                Ok(())
            }
            (None, None) => Err(ParseError::new(
                ErrorCode::MissingAttribute,
                "The 'register' directive needs either a 'namespace' or a 'src' attribute.",
            )),
        }
    }

    fn process_import(&mut self, mut attrs: DirectiveAttributes) -> Result<()> {
        let namespace = attrs.take_required("namespace")?;
        attrs.finish()?;
        if !self.document.imports.contains(&namespace) {
            self.document.imports.push(namespace);
        }
        Ok(())
    }

    fn process_assembly(&mut self, env: &ParseEnv, mut attrs: DirectiveAttributes) -> Result<()> {
        let name = attrs.take("name");
        let src = attrs.take("src");
        attrs.finish()?;
        match (name, src) {
            (Some(_), Some(_)) => Err(mutually_exclusive("assembly", &["name", "src"])),
            (Some(name), None) => {
                if !self.document.assembly_dependencies.contains(&name) {
                    self.document.assembly_dependencies.push(name);
                }
                Ok(())
            }
            (None, Some(src)) => {
                let virtual_path = self.scope.context.current_path().combine(&src)?;
                self.add_virtual_reference(env, &virtual_path)
            }
            (None, None) => Err(ParseError::new(
                ErrorCode::MissingAttribute,
                "The 'assembly' directive needs either a 'name' or a 'src' attribute.",
            )),
        }
    }

    fn process_implements(&mut self, env: &ParseEnv, mut attrs: DirectiveAttributes) -> Result<()> {
        let interface = attrs.take_required("interface")?;
        attrs.finish()?;
        if self.scope.compilation_mode == CompilationMode::Never {
            return Err(ParseError::new(
                ErrorCode::CompilationModeNever,
                "The 'implements' directive is not allowed when the compilation mode is Never.",
            ));
        }
        let registry = &env.options.registry;
        let type_id = registry.find(&interface).ok_or_else(|| {
            ParseError::new(ErrorCode::TypeNotFound, format!("Could not load type '{}'.", interface))
        })?;
        if !registry.has_flag(type_id, TypeFlags::INTERFACE) {
            return Err(ParseError::new(
                ErrorCode::InvalidTypeToImplement,
                format!("'{}' is not an interface.", interface),
            ));
        }
        let full_name = registry.full_name(type_id).to_string();
        self.document.add_type_dependency(&full_name);
        if !self.document.implemented_interfaces.contains(&full_name) {
            self.document.implemented_interfaces.push(full_name);
        }
        Ok(())
    }

    fn process_reference(&mut self, env: &ParseEnv, mut attrs: DirectiveAttributes) -> Result<()> {
        let given: Vec<String> = ["page", "control", "virtualpath"]
            .iter()
            .filter_map(|name| attrs.take(name))
            .collect();
        attrs.finish()?;
        let path = match given.as_slice() {
            [path] => path,
            [] => {
                return Err(ParseError::new(
                    ErrorCode::MissingAttribute,
                    "The 'reference' directive needs a 'page', 'control' or 'virtualpath' attribute.",
                ))
            }
            _ => return Err(mutually_exclusive("reference", &["page", "control", "virtualpath"])),
        };
        let virtual_path = self.scope.context.current_path().combine(path)?;
        self.add_virtual_reference(env, &virtual_path)
    }

    fn process_output_cache(&mut self, env: &ParseEnv, attrs: DirectiveAttributes) -> Result<()> {
        if self.document.output_cache.is_some() {
            return Err(only_one("outputcache"));
        }
        let mut settings = IndexMap::new();
        for attr in attrs.attributes.iter() {
            let supported = match attr.name.as_str() {
                "location" | "nostore" | "varybyheader" | "varybycontentencoding" | "sqldependency" => {
                    env.kind == DocumentKind::Page
                }
                "shared" | "varybycontrol" => env.kind == DocumentKind::UserControl,
                "duration" | "varybyparam" | "varybycustom" | "cacheprofile" | "enabled" | "providername" => true,
                _ => false,
            };
            if !supported {
                return Err(not_supported(&attr.name, "outputcache"));
            }
            settings.insert(attr.name.clone(), attr.value.trim().to_string());
        }
        match settings.get("duration") {
            Some(duration) if duration.parse::<u32>().is_ok() => {}
            Some(duration) => return Err(invalid_value("duration", duration)),
            None if settings.contains_key("cacheprofile") => {}
            None => {
                return Err(ParseError::new(
                    ErrorCode::MissingAttribute,
                    "The 'outputcache' directive is missing a 'duration' attribute.",
                ))
            }
        }
        self.document.output_cache = Some(settings);
        Ok(())
    }

    fn type_reference(&mut self, env: &ParseEnv, mut attrs: DirectiveAttributes) -> Result<TypeReference> {
        let directive = attrs.directive;
        let type_name = attrs.take("typename");
        let virtual_path = attrs.take("virtualpath");
        attrs.finish()?;
        match (type_name, virtual_path) {
            (Some(_), Some(_)) => Err(mutually_exclusive(directive, &["typename", "virtualpath"])),
            (Some(type_name), None) => {
                self.document.add_type_dependency(&type_name);
                Ok(TypeReference::TypeName(type_name))
            }
            (None, Some(path)) => {
                let virtual_path = self.scope.context.current_path().combine(&path)?;
                self.add_virtual_reference(env, &virtual_path)?;
                Ok(TypeReference::VirtualPath(virtual_path))
            }
            (None, None) => Err(ParseError::new(
                ErrorCode::MissingAttribute,
                format!("The '{}' directive needs a 'typename' or a 'virtualpath' attribute.", directive),
            )),
        }
    }
}

fn not_supported(name: &str, directive: &str) -> ParseError {
    ParseError::new(
        ErrorCode::AttributeNotSupportedInDirective,
        format!("The '{}' attribute is not supported by the '{}' directive.", name, directive),
    )
}
