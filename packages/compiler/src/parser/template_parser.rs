//! Template Parser
//!
//! The parser engine shared by every document kind. It pulls tokens from the
//! markup [`Lexer`], keeps a stack of open builders and hands every construct
//! to the builder on top of it. What differs between a page, a user control, a
//! master page, a theme and the application file comes from the kind's
//! [`ParserPolicy`].

use super::context::ParseContext;
use super::document::{ParsedDocument, ScriptBlock};
use super::filter::{ConfiguredFilter, FilterCounters, PageParserFilter};
use super::kind::{CompilationMode, DocumentKind, ParserPolicy};
use super::recorder::{CompositeRecorder, ParseRecorder};
use super::registry::TagRegistry;
use super::services::{DefaultTypeResolution, TypeResolutionService, VirtualPathProvider};
use crate::builder::{BuildContext, BuilderKind, ChildBuilder, ControlBuilder, ObjectTagScope, TemplateControlInfo};
use crate::config::ParserConfig;
use crate::error::{ErrorCode, ParseError, Result};
use crate::expressions::ExpressionBuilderRegistry;
use crate::markup::html_tags::is_void_element;
use crate::markup::{
    parse_property_device_filter, CodeBlockType, LexMode, Lexer, ParsedAttributeCollection, RawAttribute, Token,
    TokenKind,
};
use crate::parse_util::{first_non_whitespace_index, is_valid_identifier, is_whitespace_string, SourceLocation};
use crate::schema::{TypeFlags, TypeRegistry};
use crate::virtual_path::VirtualPath;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::sync::Arc;

const CONTENT_TYPE: &str = "System.Web.UI.WebControls.Content";
const CONTENT_PLACEHOLDER_TYPE: &str = "System.Web.UI.WebControls.ContentPlaceHolder";

/// Everything a parse needs besides the text itself
pub struct ParserOptions {
    pub config: ParserConfig,
    pub registry: Arc<TypeRegistry>,
    pub expressions: Arc<ExpressionBuilderRegistry>,
    pub filter: Option<Box<dyn PageParserFilter>>,
    pub recorders: Vec<Box<dyn ParseRecorder>>,
    /// Source of included files and `<script src>` content
    pub path_provider: Option<Box<dyn VirtualPathProvider>>,
    pub type_resolution: Box<dyn TypeResolutionService>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            config: ParserConfig::default(),
            registry: TypeRegistry::builtin(),
            expressions: Arc::new(ExpressionBuilderRegistry::standard()),
            filter: None,
            recorders: Vec::new(),
            path_provider: None,
            type_resolution: Box::new(DefaultTypeResolution::new()),
        }
    }
}

impl ParserOptions {
    pub fn new(config: ParserConfig) -> Self {
        ParserOptions {
            config,
            ..Default::default()
        }
    }

    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_expressions(mut self, expressions: Arc<ExpressionBuilderRegistry>) -> Self {
        self.expressions = expressions;
        self
    }

    pub fn with_filter(mut self, filter: impl PageParserFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn with_recorder(mut self, recorder: impl ParseRecorder + 'static) -> Self {
        self.recorders.push(Box::new(recorder));
        self
    }

    pub fn with_path_provider(mut self, provider: impl VirtualPathProvider + 'static) -> Self {
        self.path_provider = Some(Box::new(provider));
        self
    }

    pub fn with_type_resolution(mut self, service: impl TypeResolutionService + 'static) -> Self {
        self.type_resolution = Box::new(service);
        self
    }
}

/// Parses markup documents into [`ParsedDocument`]s
pub struct TemplateParser {
    options: ParserOptions,
    recorder: CompositeRecorder,
    /// Stands in for a host filter when only limits are configured
    configured_filter: Option<ConfiguredFilter>,
}

impl TemplateParser {
    pub fn new(mut options: ParserOptions) -> Self {
        let recorder = CompositeRecorder::new(std::mem::take(&mut options.recorders));
        let configured_filter = match options.filter {
            Some(_) => None,
            None => options.config.filter_limits.map(ConfiguredFilter::new),
        };
        TemplateParser {
            options,
            recorder,
            configured_filter,
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn parse(&mut self, text: &str, virtual_path: &VirtualPath, kind: DocumentKind) -> Result<ParsedDocument> {
        log::debug!("parsing {} as {:?}", virtual_path, kind);
        let filter: Option<&dyn PageParserFilter> = match (&self.options.filter, &self.configured_filter) {
            (Some(filter), _) => Some(&**filter),
            (None, Some(filter)) => Some(filter),
            (None, None) => None,
        };
        let env = ParseEnv {
            options: &self.options,
            filter,
            kind,
            policy: kind.policy(),
        };
        let mut state = ParseState::new(&env, &mut self.recorder, virtual_path, text)?;
        state.parse_source(&env, text)?;
        let document = state.finish(&env)?;
        log::debug!(
            "parsed {}: {} source dependencies, {} script blocks",
            virtual_path,
            document.source_dependencies.len(),
            document.script_blocks.len()
        );
        Ok(document)
    }

    /// Read a document through the path provider and parse it as the kind its extension names
    pub fn parse_file(&mut self, virtual_path: &VirtualPath) -> Result<ParsedDocument> {
        let kind = virtual_path
            .extension()
            .as_deref()
            .and_then(DocumentKind::from_extension)
            .ok_or_else(|| {
                ParseError::new(
                    ErrorCode::InvalidVirtualPath,
                    format!("'{}' is not a markup document.", virtual_path),
                )
            })?;
        let text = read_source(&self.options, virtual_path)?;
        self.parse(&text, virtual_path, kind)
    }
}

/// Parse `text` with default options
pub fn parse_document(text: &str, virtual_path: &str, kind: DocumentKind) -> Result<ParsedDocument> {
    let virtual_path = VirtualPath::new(virtual_path)?;
    TemplateParser::new(ParserOptions::default()).parse(text, &virtual_path, kind)
}

pub(super) fn read_source(options: &ParserOptions, virtual_path: &VirtualPath) -> Result<String> {
    options
        .path_provider
        .as_ref()
        .and_then(|p| p.read(virtual_path))
        .ok_or_else(|| {
            ParseError::new(
                ErrorCode::FileNotFound,
                format!("The file '{}' does not exist.", virtual_path),
            )
        })
}

/// Read-only inputs of one parse
pub(super) struct ParseEnv<'p> {
    pub(super) options: &'p ParserOptions,
    pub(super) filter: Option<&'p dyn PageParserFilter>,
    pub(super) kind: DocumentKind,
    pub(super) policy: ParserPolicy,
}

/// Parse state builders see through their [`BuildContext`]
pub(super) struct ParseScope {
    pub(super) context: ParseContext,
    pub(super) tags: TagRegistry,
    pub(super) compilation_mode: CompilationMode,
    pub(super) template_control: TemplateControlInfo,
}

impl ParseScope {
    pub(super) fn ctx<'a>(&'a self, env: &'a ParseEnv<'_>) -> BuildContext<'a> {
        let options = env.options;
        BuildContext {
            registry: &options.registry,
            config: &options.config,
            expressions: &options.expressions,
            tags: &self.tags,
            type_resolution: options.type_resolution.as_ref(),
            filter_resolution: &options.config,
            filter: env.filter,
            compilation_mode: self.compilation_mode,
            document_kind: env.kind,
            in_designer: options.config.in_designer,
            virtual_path: self.context.current_path(),
            template_control: self.template_control.clone(),
        }
    }
}

struct StackEntry {
    builder: ControlBuilder,
    tag_name: String,
    location: SourceLocation,
    /// Source text the tag was opened in
    source_id: usize,
    /// Offset just past the begin tag
    content_start: usize,
    /// Plain markup tags opened inside this builder and not closed yet
    literal_tags: SmallVec<[String; 4]>,
    /// Whether the builder opened its own ID scope
    id_scope: bool,
}

/// The root builder plus the builders whose end tag hasn't been seen
pub(super) struct BuilderStack {
    root: ControlBuilder,
    open: Vec<StackEntry>,
}

impl BuilderStack {
    fn is_root(&self) -> bool {
        self.open.is_empty()
    }

    fn top(&self) -> &ControlBuilder {
        self.open.last().map_or(&self.root, |e| &e.builder)
    }

    fn top_mut(&mut self) -> &mut ControlBuilder {
        match self.open.last_mut() {
            Some(entry) => &mut entry.builder,
            None => &mut self.root,
        }
    }

    pub(super) fn root(&self) -> &ControlBuilder {
        &self.root
    }

    pub(super) fn root_mut(&mut self) -> &mut ControlBuilder {
        &mut self.root
    }
}

struct ScriptState {
    block: ScriptBlock,
    /// Content comes from `src`; the body is discarded
    ignore_content: bool,
}

pub(super) struct ParseState<'r> {
    pub(super) recorder: &'r mut CompositeRecorder,
    pub(super) scope: ParseScope,
    pub(super) document: ParsedDocument,
    pub(super) builders: BuilderStack,
    pub(super) counters: FilterCounters,
    pub(super) main_directive_seen: bool,
    collect_errors: bool,
    errors: Vec<ParseError>,
    ignore_next_space: bool,
    literal: String,
    literal_start: usize,
    /// Lower-cased IDs per naming scope
    id_scopes: Vec<HashSet<String>>,
    control_count: usize,
    script: Option<ScriptState>,
}

impl<'r> ParseState<'r> {
    fn new(
        env: &ParseEnv,
        recorder: &'r mut CompositeRecorder,
        virtual_path: &VirtualPath,
        text: &str,
    ) -> Result<Self> {
        let config = &env.options.config;
        let configured_base = match env.kind {
            DocumentKind::Page => config.page_base_type.as_deref(),
            DocumentKind::UserControl => config.user_control_base_type.as_deref(),
            _ => None,
        };
        let base_name = configured_base.unwrap_or(env.policy.default_base_type);
        let base_type = env.options.registry.find(base_name).ok_or_else(|| {
            ParseError::new(ErrorCode::TypeNotFound, format!("Could not load type '{}'.", base_name))
        })?;

        let mut context = ParseContext::new(virtual_path.clone(), config.target_framework_is_current);
        context.push_source(virtual_path.clone(), text)?;
        let scope = ParseScope {
            context,
            tags: TagRegistry::from_config(config)?,
            compilation_mode: config.default_compilation_mode,
            template_control: TemplateControlInfo {
                virtual_path: virtual_path.clone(),
                type_name: None,
            },
        };
        let mut root = ControlBuilder::root(&scope.ctx(env), base_type);
        root.location = Some(SourceLocation::new(virtual_path.clone(), 1, 1));

        let mut document = ParsedDocument::new(
            virtual_path.clone(),
            env.kind,
            ControlBuilder::new(BuilderKind::Root, ""),
        );
        document.base_type = env.options.registry.full_name(base_type).to_string();
        document.imports = config.namespaces.clone();

        Ok(ParseState {
            recorder,
            scope,
            document,
            builders: BuilderStack {
                root,
                open: Vec::new(),
            },
            counters: FilterCounters::default(),
            main_directive_seen: false,
            collect_errors: config.collect_errors,
            errors: Vec::new(),
            ignore_next_space: false,
            literal: String::new(),
            literal_start: 0,
            id_scopes: vec![HashSet::new()],
            control_count: 0,
            script: None,
        })
    }

    /// Fail, or record the error and keep going when collecting errors
    pub(super) fn process_error(&mut self, err: ParseError) -> Result<()> {
        if !self.collect_errors {
            return Err(err);
        }
        log::debug!("recovering from {}", err);
        self.errors.push(err);
        Ok(())
    }

    /// Run the token loop over `text`, the innermost source of the context
    pub(super) fn parse_source(&mut self, env: &ParseEnv, text: &str) -> Result<()> {
        let mut lexer = self.scope.context.lexer(text);
        loop {
            let mode = if self.script.is_some() {
                LexMode::Script
            } else {
                LexMode::Normal
            };
            let Some(token) = lexer.next_token(mode) else {
                break;
            };
            let location = self.scope.context.location(token.start);
            if let Err(err) = self.consume_token(env, &mut lexer, token) {
                self.process_error(err.or_location(&location))?;
            }
        }
        if let Err(err) = self.process_literal(env) {
            self.process_error(err)?;
        }
        Ok(())
    }

    fn consume_token(&mut self, env: &ParseEnv, lexer: &mut Lexer, token: Token) -> Result<()> {
        let Token { kind, start, end } = token;
        let raw = lexer.text().get(start..end).unwrap_or_default();
        if self.script.is_some() {
            return self.consume_script_token(env, kind, raw);
        }
        match kind {
            TokenKind::Text(text) => {
                self.append_literal(&text, start);
                Ok(())
            }
            TokenKind::Stray => {
                if let Some((code, message)) = lexer.detect_server_tag_error(start) {
                    return Err(ParseError::new(code, message));
                }
                self.append_literal("<", start);
                Ok(())
            }
            TokenKind::Comment => Ok(()),
            TokenKind::Directive { attributes } => {
                self.process_literal(env)?;
                self.ignore_next_space = true;
                self.consume_directive(env, attributes)
            }
            TokenKind::Include { path_type, file_name } => self.consume_include(env, &path_type, &file_name),
            TokenKind::CodeBlock {
                block_type,
                code,
                encode,
                code_offset,
            } => self.consume_code_block(env, block_type, &code, encode, code_offset, raw),
            TokenKind::BeginTag {
                name,
                attributes,
                self_closed,
            } => self.consume_begin_tag(env, lexer, name, &attributes, self_closed, start, end),
            TokenKind::EndTag { name } => self.consume_end_tag(env, lexer.text(), &name, start, end),
        }
    }

    // Literals

    fn append_literal(&mut self, text: &str, start: usize) {
        if self.literal.is_empty() {
            self.literal_start = start;
        }
        self.literal.push_str(text);
    }

    /// Hand the buffered literal text to the builder on top
    fn process_literal(&mut self, env: &ParseEnv) -> Result<()> {
        let ignore_space = std::mem::take(&mut self.ignore_next_space);
        if self.literal.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.literal);
        let Some(first) = first_non_whitespace_index(&text) else {
            if ignore_space || env.kind.is_application_file() || self.at_content_root() {
                return Ok(());
            }
            return self.builders.top_mut().append_literal_string(&text);
        };
        let location = self.scope.context.location(self.literal_start + first);
        if env.kind.is_application_file() {
            return Err(ParseError::at(
                ErrorCode::InvalidApplicationFileContent,
                "Only directives, object tags and server script blocks are allowed in the application file.",
                location,
            ));
        }
        if self.at_content_root() {
            return Err(ParseError::at(
                ErrorCode::OnlyContentAllowed,
                "Only Content controls are allowed directly in a content page.",
                location,
            ));
        }
        self.builders
            .top_mut()
            .append_literal_string(&text)
            .map_err(|e| e.or_location(&location))
    }

    fn at_content_root(&self) -> bool {
        self.document.is_content_page() && self.builders.is_root()
    }

    // Includes

    fn consume_include(&mut self, env: &ParseEnv, path_type: &str, file_name: &str) -> Result<()> {
        self.process_literal(env)?;
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(ParseError::new(
                ErrorCode::EmptyFileName,
                "The file name of the include directive is empty.",
            ));
        }
        if !path_type.eq_ignore_ascii_case("file") && !path_type.eq_ignore_ascii_case("virtual") {
            return Err(ParseError::new(
                ErrorCode::OnlyFileVirtualSupportedOnInclude,
                format!(
                    "'{}' is not supported on an include directive; only 'file' and 'virtual' are.",
                    path_type
                ),
            ));
        }
        let virtual_path = self.scope.context.current_path().combine(file_name)?;
        if let Some(filter) = env.filter {
            if !filter.allow_server_side_include(&virtual_path) {
                return Err(ParseError::new(
                    ErrorCode::IncludeNotAllowed,
                    format!("The server-side include '{}' is not allowed on this page.", virtual_path),
                ));
            }
        }
        self.add_source_dependency(env, &virtual_path)?;

        let text = read_source(env.options, &virtual_path)?;
        log::trace!("including {}", virtual_path);
        self.scope.context.push_source(virtual_path, &text)?;
        let result = self.parse_source(env, &text);
        self.scope.context.pop_source();
        self.ignore_next_space = true;
        result
    }

    /// Record a file the document reads its source from; it counts as a direct dependency
    pub(super) fn add_source_dependency(&mut self, env: &ParseEnv, virtual_path: &VirtualPath) -> Result<()> {
        if let Some(filter) = env.filter {
            self.counters.count_direct_dependency(filter)?;
            self.counters.count_dependencies(filter, 1)?;
        }
        self.document.add_source_dependency(virtual_path.clone());
        Ok(())
    }

    // Code blocks

    fn consume_code_block(
        &mut self,
        env: &ParseEnv,
        block_type: CodeBlockType,
        code: &str,
        encode: bool,
        code_offset: usize,
        raw: &str,
    ) -> Result<()> {
        self.process_literal(env)?;
        if block_type == CodeBlockType::Code && code.trim_start().starts_with('$') {
            return Err(ParseError::new(
                ErrorCode::LiteralExpressionsNotAllowed,
                format!(
                    "Literal expressions like '<%{}%>' are not allowed. Use <asp:Literal runat=\"server\" Text=\"<%{}%>\" /> instead.",
                    code, code
                ),
            ));
        }
        let (content, code_offset) = if block_type == CodeBlockType::Code {
            (code, code_offset)
        } else {
            let (trimmed, skipped) = trim_expression_lines(code);
            if is_whitespace_string(trimmed) {
                return Err(ParseError::new(ErrorCode::EmptyExpression, "The expression is empty."));
            }
            (trimmed, code_offset + skipped)
        };

        let ctx = self.scope.ctx(env);
        if let Some(filter) = ctx.preprocessing_filter() {
            if filter.process_code_construct(block_type, content) {
                return Ok(());
            }
        }
        ctx.ensure_code_allowed()?;
        let location = self.scope.context.location(code_offset);
        let builder = ControlBuilder::code_block(block_type, content, encode, Some(location));
        self.recorder.record_code_block(self.builders.top(), raw);
        self.builders.top_mut().append_sub_builder(builder)?;
        if block_type == CodeBlockType::Code {
            self.ignore_next_space = true;
        }
        Ok(())
    }

    // Script blocks

    fn begin_script(&mut self, env: &ParseEnv, attributes: &[RawAttribute], self_closed: bool, start: usize) -> Result<()> {
        let value_of = |name: &str| {
            attributes
                .iter()
                .find(|a| a.name.eq_ignore_ascii_case(name))
                .map(|a| a.value.trim().to_string())
        };
        let mut block = ScriptBlock {
            language: value_of("language"),
            src: None,
            content: String::new(),
            location: self.scope.context.location(start),
        };

        if let Some(src) = value_of("src") {
            self.scope.ctx(env).ensure_code_allowed()?;
            let virtual_path = self.scope.context.current_path().combine(&src)?;
            self.add_source_dependency(env, &virtual_path)?;
            block.content = read_source(env.options, &virtual_path)?;
            block.src = Some(virtual_path);
            if self_closed {
                self.document.script_blocks.push(block);
                self.ignore_next_space = true;
            } else {
                self.script = Some(ScriptState {
                    block,
                    ignore_content: true,
                });
            }
            return Ok(());
        }

        if self_closed {
            return Err(ParseError::new(
                ErrorCode::ScriptTagWithoutSrcMustHaveContent,
                "A server script tag without a 'src' attribute must have content.",
            ));
        }
        self.script = Some(ScriptState {
            block,
            ignore_content: false,
        });
        Ok(())
    }

    fn consume_script_token(&mut self, env: &ParseEnv, kind: TokenKind, raw: &str) -> Result<()> {
        match kind {
            TokenKind::EndTag { name } if name.eq_ignore_ascii_case("script") => {
                let Some(script) = self.script.take() else {
                    return Ok(());
                };
                if !script.ignore_content {
                    let ctx = self.scope.ctx(env);
                    let consumed = ctx
                        .preprocessing_filter()
                        .map_or(false, |f| f.process_code_construct(CodeBlockType::Code, &script.block.content));
                    if consumed {
                        return Ok(());
                    }
                    ctx.ensure_code_allowed()?;
                }
                self.document.script_blocks.push(script.block);
                self.ignore_next_space = true;
                Ok(())
            }
            TokenKind::Include { .. } => Err(ParseError::new(
                ErrorCode::IncludeNotAllowedInScriptTag,
                "Server-side include directives are not allowed inside a server script tag.",
            )),
            TokenKind::Comment => Ok(()),
            _ => {
                if let Some(script) = self.script.as_mut().filter(|s| !s.ignore_content) {
                    script.block.content.push_str(raw);
                }
                Ok(())
            }
        }
    }

    // Begin tags

    #[allow(clippy::too_many_arguments)]
    fn consume_begin_tag(
        &mut self,
        env: &ParseEnv,
        lexer: &mut Lexer,
        name: String,
        raw_attributes: &[RawAttribute],
        self_closed: bool,
        start: usize,
        end: usize,
    ) -> Result<()> {
        let runat = raw_attributes.iter().find(|a| a.name.eq_ignore_ascii_case("runat"));
        let is_server = match runat {
            Some(attr) if attr.value.trim().eq_ignore_ascii_case("server") => true,
            Some(_) => {
                return Err(ParseError::new(
                    ErrorCode::RunatCanOnlyBeServer,
                    "The Runat attribute must have the value Server.",
                ))
            }
            None => false,
        };

        if self.builders.top().takes_raw_content() {
            self.consume_literal_tag(lexer, name, self_closed, start);
            return Ok(());
        }

        self.process_literal(env)?;
        if is_server && name.eq_ignore_ascii_case("script") {
            return self.begin_script(env, raw_attributes, self_closed, start);
        }

        let mut attributes = ParsedAttributeCollection::new();
        let mut duplicate = None;
        for attr in raw_attributes.iter().filter(|a| !a.name.eq_ignore_ascii_case("runat")) {
            let (filter, attr_name) = parse_property_device_filter(&attr.name);
            let position = self.scope.context.location(attr.value_offset);
            if let Err(full_name) =
                attributes.add_with_position(&filter, &attr_name, &attr.value, position.line, position.column)
            {
                duplicate.get_or_insert(full_name);
            }
        }

        let location = self.scope.context.location(start);
        let has_body = !self_closed && (name.contains(':') || !is_void_element(&name));

        if is_server && name.eq_ignore_ascii_case("object") && !self.builders.top().handles_child_tags() {
            if let Some(full_name) = duplicate {
                return Err(duplicate_attribute(&full_name));
            }
            return self.consume_object_tag(env, &name, &attributes, location, has_body, end);
        }

        let builder = match self.create_builder(env, &name, &attributes, is_server, duplicate, &location) {
            Ok(Some(builder)) => builder,
            Ok(None) => {
                self.consume_literal_tag(lexer, name, self_closed, start);
                return Ok(());
            }
            Err(err) => {
                if has_body {
                    self.push_entry(ControlBuilder::ignored(&name, Some(location.clone())), name, location, end, false);
                }
                return Err(err);
            }
        };

        let raw = lexer.text().get(start..end).unwrap_or_default();
        if has_body {
            let id_scope = builder.template_data().map_or(false, |d| d.allow_multiple_instances);
            if id_scope {
                self.id_scopes.push(HashSet::new());
            }
            self.recorder.record_begin_tag(&builder, raw);
            self.push_entry(builder, name, location, end, id_scope);
            return Ok(());
        }

        let mut builder = builder;
        let ctx = self.scope.ctx(env);
        builder.close_control(&ctx)?;
        self.recorder.record_empty_tag(&builder, raw);
        self.builders.top_mut().append_sub_builder(builder)
    }

    /// Plain markup: only the `<` is consumed so code blocks in the attributes are still seen
    fn consume_literal_tag(&mut self, lexer: &mut Lexer, name: String, self_closed: bool, start: usize) {
        self.append_literal("<", start);
        lexer.set_position(start + 1);
        if self_closed || is_void_element(&name) {
            return;
        }
        if let Some(entry) = self.builders.open.last_mut() {
            entry.literal_tags.push(name);
        }
    }

    fn push_entry(&mut self, builder: ControlBuilder, tag_name: String, location: SourceLocation, end: usize, id_scope: bool) {
        self.builders.open.push(StackEntry {
            builder,
            tag_name,
            location,
            source_id: self.scope.context.source_id(),
            content_start: end,
            literal_tags: SmallVec::new(),
            id_scope,
        });
    }

    /// Resolve a begin tag to a builder; `Ok(None)` means the tag is plain markup
    fn create_builder(
        &mut self,
        env: &ParseEnv,
        name: &str,
        attributes: &ParsedAttributeCollection,
        is_server: bool,
        duplicate: Option<String>,
        location: &SourceLocation,
    ) -> Result<Option<ControlBuilder>> {
        let ctx = self.scope.ctx(env);
        let top = self.builders.top();
        let mut created = None;
        if top.handles_child_tags() {
            match top.create_child_builder(&ctx, name, attributes, Some(location.clone()))? {
                ChildBuilder::Created(builder) => created = Some(builder),
                ChildBuilder::Dropped => return Ok(Some(ControlBuilder::ignored(name, Some(location.clone())))),
                ChildBuilder::Default => {}
            }
        }
        let mut builder = match created {
            Some(builder) => builder,
            None if is_server => {
                let resolved = ctx.resolve_tag(name, attributes.get("type"))?;
                let mut builder =
                    ControlBuilder::for_control(&ctx, resolved.type_id, name, attributes, Some(location.clone()))?;
                builder.user_control = resolved.user_control;
                builder
            }
            None => return Ok(None),
        };
        if let Some(full_name) = duplicate {
            return Err(duplicate_attribute(&full_name));
        }

        let is_control_tag = matches!(builder.kind, BuilderKind::Control) && builder.property.is_none();
        if !is_control_tag {
            return Ok(Some(builder));
        }
        if env.kind.is_application_file() {
            return Err(ParseError::new(
                ErrorCode::ApplicationFileControls,
                "Server controls are not allowed in the application file.",
            ));
        }
        let type_name = builder.type_name.clone().unwrap_or_default();
        if let Some(filter) = env.filter {
            if !filter.allow_control(&type_name, &builder) {
                return Err(ParseError::new(
                    ErrorCode::ControlTypeNotAllowed,
                    format!("The control type '{}' is not allowed on this page.", type_name),
                ));
            }
            self.counters.count_control(filter)?;
        }
        if let Some(user_control) = builder.user_control.clone() {
            self.document.add_source_dependency(user_control);
        }
        self.control_count += 1;

        let partial_caching = builder
            .control_type
            .map_or(false, |t| env.options.registry.has_flag(t, TypeFlags::PARTIAL_CACHING));
        if builder.id.is_none() && partial_caching && env.kind != DocumentKind::PageTheme {
            builder.id = Some(format!("_ctrl_{}", self.control_count));
        }
        self.check_id(builder.id.as_deref())?;
        self.check_content(env, &builder)?;
        Ok(Some(builder))
    }

    fn check_id(&mut self, id: Option<&str>) -> Result<()> {
        let Some(id) = id else {
            return Ok(());
        };
        if !is_valid_identifier(id) {
            return Err(ParseError::new(
                ErrorCode::InvalidIdentifier,
                format!("'{}' is not a valid identifier.", id),
            ));
        }
        if let Some(scope) = self.id_scopes.last_mut() {
            if !scope.insert(id.to_ascii_lowercase()) {
                return Err(ParseError::new(
                    ErrorCode::IdAlreadyUsed,
                    format!("The ID '{}' is already used by another control.", id),
                ));
            }
        }
        Ok(())
    }

    /// Content pages hold only top-level `Content` controls; placeholders are recorded
    fn check_content(&mut self, env: &ParseEnv, builder: &ControlBuilder) -> Result<()> {
        let Some(control_type) = builder.control_type else {
            return Ok(());
        };
        let registry = &env.options.registry;
        let is_content = registry.is_a(control_type, CONTENT_TYPE);

        if is_content {
            if !self.document.is_content_page() || !self.builders.is_root() {
                return Err(ParseError::new(
                    ErrorCode::ContentMustBeTopLevel,
                    "Content controls have to be top-level controls in a content page.",
                ));
            }
            let region = builder
                .simple_property("ContentPlaceHolderID")
                .map(|e| e.persisted_value.trim().to_string())
                .filter(|r| !r.is_empty())
                .ok_or_else(|| {
                    ParseError::new(
                        ErrorCode::MissingAttribute,
                        "The 'ContentPlaceHolderID' attribute must be specified on a Content control.",
                    )
                })?;
            if self.document.content_regions.iter().any(|r| r.eq_ignore_ascii_case(&region)) {
                return Err(ParseError::new(
                    ErrorCode::DuplicateContentPlaceHolder,
                    format!("A Content control for ContentPlaceHolder '{}' already exists.", region),
                ));
            }
            self.document.content_regions.push(region);
            return Ok(());
        }

        if self.at_content_root() {
            return Err(ParseError::new(
                ErrorCode::OnlyContentAllowed,
                "Only Content controls are allowed directly in a content page.",
            ));
        }
        if registry.is_a(control_type, CONTENT_PLACEHOLDER_TYPE) {
            if let Some(id) = builder.id.as_deref() {
                if self.document.content_placeholders.iter().any(|p| p.eq_ignore_ascii_case(id)) {
                    return Err(ParseError::new(
                        ErrorCode::DuplicateContentPlaceHolder,
                        format!("The ContentPlaceHolder '{}' is declared more than once.", id),
                    ));
                }
                self.document.content_placeholders.push(id.to_string());
            }
        }
        Ok(())
    }

    fn consume_object_tag(
        &mut self,
        env: &ParseEnv,
        name: &str,
        attributes: &ParsedAttributeCollection,
        location: SourceLocation,
        has_body: bool,
        end: usize,
    ) -> Result<()> {
        let ctx = self.scope.ctx(env);
        let mut builder = ControlBuilder::object_tag(&ctx, name, attributes, Some(location.clone()))?;
        let declared = builder.object_tag_data().map_or(ObjectTagScope::Default, |d| d.scope);
        builder.set_object_tag_scope(env.kind.check_object_tag_scope(declared)?);
        self.check_id(builder.id.as_deref())?;
        if let Some(data) = builder.object_tag_data() {
            if let (false, Some(type_name)) = (data.late_bound, data.type_name.as_deref()) {
                self.document.add_type_dependency(type_name);
            }
        }
        if has_body {
            self.push_entry(builder, name.to_string(), location, end, false);
        } else {
            self.document.add_object_tag(builder);
        }
        Ok(())
    }

    // End tags

    fn consume_end_tag(&mut self, env: &ParseEnv, source: &str, name: &str, start: usize, end: usize) -> Result<()> {
        let raw = source.get(start..end).unwrap_or_default();
        if let Some(entry) = self.builders.open.last_mut() {
            if let Some(i) = entry.literal_tags.iter().rposition(|t| t.eq_ignore_ascii_case(name)) {
                entry.literal_tags.truncate(i);
                self.append_literal(raw, start);
                return Ok(());
            }
        }

        let Some(entry) = self.builders.open.last() else {
            self.append_literal(raw, start);
            return Ok(());
        };
        if !entry.tag_name.eq_ignore_ascii_case(name) {
            if entry.builder.takes_raw_content() {
                self.append_literal(raw, start);
                return Ok(());
            }
            return Err(ParseError::new(
                ErrorCode::MismatchedEndTag,
                format!(
                    "The end tag '</{}>' on line {} does not match the open tag '<{}>' on line {}.",
                    name,
                    self.scope.context.line(start),
                    entry.tag_name,
                    entry.location.line
                ),
            ));
        }

        self.process_literal(env)?;
        let Some(mut entry) = self.builders.open.pop() else {
            return Ok(());
        };
        if entry.source_id == self.scope.context.source_id() && entry.builder.needs_tag_inner_text() {
            if let Some(inner) = source.get(entry.content_start..start) {
                entry.builder.set_tag_inner_text(inner);
            }
        }
        if entry.id_scope {
            self.id_scopes.pop();
        }
        let mut builder = entry.builder;
        let ctx = self.scope.ctx(env);
        builder.close_control(&ctx).map_err(|e| e.or_location(&entry.location))?;
        self.recorder.record_end_tag(&builder, raw);
        if matches!(builder.kind, BuilderKind::ObjectTag(_)) {
            self.document.add_object_tag(builder);
            return Ok(());
        }
        self.builders
            .top_mut()
            .append_sub_builder(builder)
            .map_err(|e| e.or_location(&entry.location))
    }

    // End of document

    fn finish(mut self, env: &ParseEnv) -> Result<ParsedDocument> {
        if let Some(script) = self.script.take() {
            let err = ParseError::at(
                ErrorCode::UnexpectedEofLookingForTag,
                "Unexpected end of file looking for </script> tag.",
                script.block.location,
            );
            self.process_error(err)?;
        }
        if let Some(outermost) = self.builders.open.first() {
            let err = ParseError::at(
                ErrorCode::UnexpectedEofLookingForTag,
                format!("Unexpected end of file looking for </{}> tag.", outermost.tag_name),
                outermost.location.clone(),
            );
            self.process_error(err)?;
            self.builders.open.clear();
        }
        if let Some(filter) = env.filter {
            if !filter.allow_base_type(&self.document.base_type) {
                let err = ParseError::new(
                    ErrorCode::BaseTypeNotAllowed,
                    format!("The base type '{}' is not allowed for this page.", self.document.base_type),
                );
                self.process_error(err)?;
            }
        }

        let ctx = self.scope.ctx(env);
        if let Err(err) = self.builders.root.close_control(&ctx) {
            self.process_error(err)?;
        }
        if let Some(filter) = env.filter {
            filter.parse_complete(&self.builders.root);
        }
        self.recorder.parse_complete(&self.builders.root);

        if !self.errors.is_empty() {
            let mut first = self.errors.remove(0);
            first.additional_errors = std::mem::take(&mut self.errors);
            return Err(first);
        }
        let mut document = self.document;
        document.compilation_mode = self.scope.compilation_mode;
        document.root = self.builders.root;
        Ok(document)
    }
}

/// Drop leading blank lines and everything from the first newline after the last
/// non-blank character; indentation on the first code line is kept. Returns the
/// trimmed code and the number of leading bytes dropped.
fn trim_expression_lines(code: &str) -> (&str, usize) {
    let leading = code.len() - code.trim_start().len();
    let skipped = code[..leading].rfind(['\r', '\n']).map_or(0, |i| i + 1);
    let code = &code[skipped..];
    let body = code.trim_end().len();
    let end = code[body..].find(['\r', '\n']).map_or(code.len(), |i| body + i);
    (&code[..end], skipped)
}

fn duplicate_attribute(full_name: &str) -> ParseError {
    ParseError::new(
        ErrorCode::DuplicateAttribute,
        format!("The tag contains duplicate '{}' attributes.", full_name),
    )
}
