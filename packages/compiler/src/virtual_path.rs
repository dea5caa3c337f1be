//! Virtual Paths
//!
//! A [`VirtualPath`] names a document inside the application. Three forms are
//! accepted: app-relative (`~/dir/page.aspx`), rooted (`/dir/page.aspx`) and
//! relative (`../shared/header.ascx`). Relative paths only make sense once
//! combined with the path of the document that references them.

use crate::error::{ErrorCode, ParseError, Result};
use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};

const INVALID_CHARS: &[char] = &['<', '>', '*', '%', '?', '"', '|', '\0'];

/// Immutable virtual path
#[derive(Debug, Clone)]
pub struct VirtualPath {
    path: String,
}

impl VirtualPath {
    /// Create a virtual path, normalizing backslashes and rejecting invalid characters
    pub fn new(path: &str) -> Result<Self> {
        let path = path.trim().replace('\\', "/");
        if path.is_empty() {
            return Err(ParseError::new(
                ErrorCode::InvalidVirtualPath,
                "The virtual path cannot be empty.",
            ));
        }
        if path.contains(INVALID_CHARS) || path.contains("//") {
            return Err(ParseError::new(
                ErrorCode::InvalidVirtualPath,
                format!("'{}' is not a valid virtual path.", path),
            ));
        }
        Ok(VirtualPath { path })
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn is_app_relative(&self) -> bool {
        self.path == "~" || self.path.starts_with("~/")
    }

    pub fn is_rooted(&self) -> bool {
        self.path.starts_with('/')
    }

    pub fn is_relative(&self) -> bool {
        !self.is_app_relative() && !self.is_rooted()
    }

    /// Last segment, e.g. `page.aspx`
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Lower-cased extension without the dot
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        name.rfind('.')
            .filter(|i| *i + 1 < name.len())
            .map(|i| name[i + 1..].to_ascii_lowercase())
    }

    /// Directory containing this path, with a trailing slash
    pub fn parent(&self) -> String {
        match self.path.rfind('/') {
            Some(i) => self.path[..=i].to_string(),
            None => String::new(),
        }
    }

    /// Resolve `relative` against the directory of this path.
    ///
    /// Non-relative inputs are returned normalized. Climbing above the
    /// application root is an error.
    pub fn combine(&self, relative: &str) -> Result<VirtualPath> {
        let other = VirtualPath::new(relative)?;
        if !other.is_relative() {
            return other.normalized();
        }
        let mut base = self.parent();
        if base.is_empty() {
            base = "~/".to_string();
        }
        VirtualPath::new(&format!("{}{}", base, other.path))?.normalized()
    }

    /// Collapse `.` and `..` segments
    pub fn normalized(&self) -> Result<VirtualPath> {
        let (prefix, rest) = if let Some(rest) = self.path.strip_prefix("~/") {
            ("~/", rest)
        } else if let Some(rest) = self.path.strip_prefix('/') {
            ("/", rest)
        } else if self.path == "~" {
            return Ok(VirtualPath { path: "~/".to_string() });
        } else {
            ("", self.path.as_str())
        };

        let mut segments: SmallVec<[&str; 8]> = SmallVec::new();
        for segment in rest.split('/') {
            match segment {
                "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(ParseError::new(
                            ErrorCode::InvalidVirtualPath,
                            format!(
                                "Cannot use a leading .. to exit above the top directory ('{}').",
                                self.path
                            ),
                        ));
                    }
                }
                s => segments.push(s),
            }
        }
        Ok(VirtualPath {
            path: format!("{}{}", prefix, segments.join("/")),
        })
    }

    /// App-relative form used for comparisons; the application lives at `/`
    pub fn app_relative(&self) -> String {
        if let Some(rest) = self.path.strip_prefix('/') {
            format!("~/{}", rest)
        } else {
            self.path.clone()
        }
    }

    fn key(&self) -> String {
        self.app_relative().to_ascii_lowercase()
    }
}

impl PartialEq for VirtualPath {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for VirtualPath {}

impl Hash for VirtualPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl Serialize for VirtualPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path)
    }
}
