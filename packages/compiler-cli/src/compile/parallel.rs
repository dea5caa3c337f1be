use rayon::prelude::*;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use webforms_compiler::error::ErrorCode;
use webforms_compiler::parser::FileSystemPathProvider;
use webforms_compiler::{
    DocumentKind, ParseError, ParsedDocument, ParserConfig, ParserOptions, TemplateParser, TypeRegistry,
    VirtualPath,
};

/// Everything a worker needs to parse one file
#[derive(Debug, Clone)]
pub struct CompileSettings {
    /// Application root; `~/` maps here
    pub root: PathBuf,
    pub config: ParserConfig,
    pub registry: Arc<TypeRegistry>,
}

impl CompileSettings {
    pub fn new(root: impl Into<PathBuf>, config: ParserConfig) -> Self {
        CompileSettings {
            root: root.into(),
            config,
            registry: TypeRegistry::builtin(),
        }
    }

    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }
}

/// Result of parsing one file
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutcome {
    pub path: PathBuf,
    pub virtual_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<ParsedDocument>,
    /// Every error of a failed parse, flattened
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ParseError>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn failed(path: &Path, virtual_path: String, error: &ParseError) -> Self {
        let errors = error
            .all()
            .map(|e| ParseError {
                additional_errors: Vec::new(),
                ..e.clone()
            })
            .collect();
        FileOutcome {
            path: path.to_path_buf(),
            virtual_path,
            document: None,
            errors,
        }
    }
}

fn is_markup(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(DocumentKind::from_extension)
        .is_some()
}

/// Expand inputs (files, directories or glob patterns relative to `root`)
/// into a sorted list of markup files.
pub fn collect_inputs(root: &Path, inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let candidate: PathBuf = root.join(input).components().collect();
        if candidate.is_dir() {
            let pattern = candidate.join("**").join("*");
            files.extend(expand(&pattern.to_string_lossy())?);
        } else if candidate.is_file() {
            files.push(candidate);
        } else {
            let matched = expand(&candidate.to_string_lossy())?;
            if matched.is_empty() {
                log::warn!("'{}' matches no files", input);
            }
            files.extend(matched);
        }
    }
    files.retain(|f| is_markup(f));
    files.sort();
    files.dedup();
    Ok(files)
}

fn expand(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in glob::glob(pattern)? {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

/// App-relative virtual path (`~/dir/page.aspx`) of a file below `root`
pub fn virtual_path_for(root: &Path, file: &Path) -> webforms_compiler::Result<VirtualPath> {
    let relative = file.strip_prefix(root).map_err(|_| {
        ParseError::new(
            ErrorCode::InvalidVirtualPath,
            format!("'{}' is outside the application root '{}'.", file.display(), root.display()),
        )
    })?;
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    VirtualPath::new(&format!("~/{}", segments.join("/")))
}

/// Parse one file; includes and script sources resolve below the root
pub fn compile_file(file: &Path, settings: &CompileSettings) -> FileOutcome {
    let virtual_path = match virtual_path_for(&settings.root, file) {
        Ok(vp) => vp,
        Err(e) => return FileOutcome::failed(file, file.display().to_string(), &e),
    };
    let options = ParserOptions::new(settings.config.clone())
        .with_registry(settings.registry.clone())
        .with_path_provider(FileSystemPathProvider::new(settings.root.clone()));
    let mut parser = TemplateParser::new(options);
    match parser.parse_file(&virtual_path) {
        Ok(document) => FileOutcome {
            path: file.to_path_buf(),
            virtual_path: virtual_path.to_string(),
            document: Some(document),
            errors: Vec::new(),
        },
        Err(e) => {
            log::debug!("{} failed with {} error(s)", virtual_path, e.all().count());
            FileOutcome::failed(file, virtual_path.to_string(), &e)
        }
    }
}

/// Parse every file in parallel, one parser per file. Outcomes keep input order.
pub fn parallel_compile(files: &[PathBuf], settings: &CompileSettings) -> Vec<FileOutcome> {
    let start = Instant::now();
    log::info!("parsing {} files", files.len());
    let outcomes: Vec<FileOutcome> = files.par_iter().map(|f| compile_file(f, settings)).collect();
    log::info!(
        "parsed {} files ({} failed) in {:?}",
        outcomes.len(),
        outcomes.iter().filter(|o| !o.is_ok()).count(),
        start.elapsed()
    );
    outcomes
}
