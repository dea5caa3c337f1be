//! Parser Services
//!
//! Collaborators the parser consumes but does not own: user-control type
//! resolution, device filter knowledge and access to other documents.

use crate::config::ParserConfig;
use crate::virtual_path::VirtualPath;
use indexmap::IndexMap;
use std::path::PathBuf;

/// Resolves user controls referenced by `<%@ Register src=... %>`
pub trait TypeResolutionService {
    /// Type generated for the user control at `virtual_path`, when known
    fn user_control_type(&self, virtual_path: &VirtualPath) -> Option<String>;

    /// Documents the user control depends on, itself included
    fn dependencies(&self, virtual_path: &VirtualPath) -> Vec<VirtualPath> {
        vec![virtual_path.clone()]
    }
}

/// Type resolution backed by a fixed table; unknown user controls fall back
/// to the user-control base type.
#[derive(Debug, Clone, Default)]
pub struct DefaultTypeResolution {
    user_controls: IndexMap<String, String>,
    dependencies: IndexMap<String, Vec<VirtualPath>>,
}

impl DefaultTypeResolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_control(mut self, virtual_path: &str, type_name: &str) -> Self {
        self.user_controls.insert(virtual_path.to_ascii_lowercase(), type_name.to_string());
        self
    }

    pub fn with_dependencies(mut self, virtual_path: &str, dependencies: Vec<VirtualPath>) -> Self {
        self.dependencies.insert(virtual_path.to_ascii_lowercase(), dependencies);
        self
    }
}

impl TypeResolutionService for DefaultTypeResolution {
    fn user_control_type(&self, virtual_path: &VirtualPath) -> Option<String> {
        self.user_controls
            .get(&virtual_path.app_relative().to_ascii_lowercase())
            .cloned()
    }

    fn dependencies(&self, virtual_path: &VirtualPath) -> Vec<VirtualPath> {
        self.dependencies
            .get(&virtual_path.app_relative().to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| vec![virtual_path.clone()])
    }
}

/// Knows which device filters exist
pub trait FilterResolutionService {
    fn is_known_filter(&self, filter: &str) -> bool;
}

impl FilterResolutionService for ParserConfig {
    fn is_known_filter(&self, filter: &str) -> bool {
        self.is_known_device_filter(filter)
    }
}

/// Reads documents referenced by includes and `<script src>`
pub trait VirtualPathProvider {
    fn read(&self, virtual_path: &VirtualPath) -> Option<String>;

    fn exists(&self, virtual_path: &VirtualPath) -> bool {
        self.read(virtual_path).is_some()
    }
}

/// Documents held in memory, keyed by app-relative path
#[derive(Debug, Clone, Default)]
pub struct InMemoryPathProvider {
    files: IndexMap<String, String>,
}

impl InMemoryPathProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, virtual_path: &str, content: &str) -> Self {
        self.insert(virtual_path, content);
        self
    }

    pub fn insert(&mut self, virtual_path: &str, content: &str) {
        let key = VirtualPath::new(virtual_path)
            .map(|p| p.app_relative())
            .unwrap_or_else(|_| virtual_path.to_string());
        self.files.insert(key.to_ascii_lowercase(), content.to_string());
    }
}

impl VirtualPathProvider for InMemoryPathProvider {
    fn read(&self, virtual_path: &VirtualPath) -> Option<String> {
        self.files.get(&virtual_path.app_relative().to_ascii_lowercase()).cloned()
    }
}

/// Documents on disk below an application root directory
#[derive(Debug, Clone)]
pub struct FileSystemPathProvider {
    root: PathBuf,
}

impl FileSystemPathProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileSystemPathProvider { root: root.into() }
    }

    fn physical_path(&self, virtual_path: &VirtualPath) -> PathBuf {
        let relative = virtual_path.app_relative();
        let relative = relative.trim_start_matches('~').trim_start_matches('/');
        self.root.join(relative)
    }
}

impl VirtualPathProvider for FileSystemPathProvider {
    fn read(&self, virtual_path: &VirtualPath) -> Option<String> {
        let path = self.physical_path(virtual_path);
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                log::debug!("cannot read {}: {}", path.display(), e);
                None
            }
        }
    }
}
