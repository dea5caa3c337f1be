//! Document Kinds
//!
//! One parser engine serves every markup document; what differs between a
//! page, a user control, a master page, a theme skin and the application file
//! is captured by a [`ParserPolicy`].

use crate::builder::ObjectTagScope;
use crate::error::{ErrorCode, ParseError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    Page,
    UserControl,
    MasterPage,
    PageTheme,
    ApplicationFile,
}

/// How a document is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompilationMode {
    #[default]
    Always,
    /// Compile only when the document needs code
    Auto,
    /// Never compile; the page is materialised in process
    Never,
}

impl CompilationMode {
    pub fn parse(value: &str) -> Option<CompilationMode> {
        match value.trim().to_ascii_lowercase().as_str() {
            "always" => Some(CompilationMode::Always),
            "auto" => Some(CompilationMode::Auto),
            "never" => Some(CompilationMode::Never),
            _ => None,
        }
    }
}

/// Per-kind rules applied by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserPolicy {
    pub default_directive: &'static str,
    /// Directives besides the main one
    pub allowed_directives: &'static [&'static str],
    pub default_base_type: &'static str,
    pub code_allowed: bool,
    pub default_object_scope: Option<ObjectTagScope>,
    /// Main directive attributes this kind rejects
    pub forbidden_attributes: &'static [&'static str],
}

const PAGE_DIRECTIVES: &[&str] = &[
    "register", "import", "assembly", "implements", "reference", "outputcache", "mastertype", "previouspagetype",
];
const CONTROL_DIRECTIVES: &[&str] = &["register", "import", "assembly", "implements", "reference", "outputcache"];
const MASTER_DIRECTIVES: &[&str] = &["register", "import", "assembly", "implements", "reference", "mastertype"];
const THEME_DIRECTIVES: &[&str] = &["register"];
const APPLICATION_DIRECTIVES: &[&str] = &["import", "assembly", "implements", "reference"];
const THEME_FORBIDDEN: &[&str] = &["inherits", "compilationmode", "classname", "codefile", "src"];

impl DocumentKind {
    /// Kind from a file extension (`aspx`, `ascx`, `master`, `skin`, `asax`)
    pub fn from_extension(extension: &str) -> Option<DocumentKind> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "aspx" => Some(DocumentKind::Page),
            "ascx" => Some(DocumentKind::UserControl),
            "master" => Some(DocumentKind::MasterPage),
            "skin" => Some(DocumentKind::PageTheme),
            "asax" => Some(DocumentKind::ApplicationFile),
            _ => None,
        }
    }

    pub fn policy(self) -> ParserPolicy {
        match self {
            DocumentKind::Page => ParserPolicy {
                default_directive: "page",
                allowed_directives: PAGE_DIRECTIVES,
                default_base_type: "System.Web.UI.Page",
                code_allowed: true,
                default_object_scope: Some(ObjectTagScope::Page),
                forbidden_attributes: &[],
            },
            DocumentKind::UserControl => ParserPolicy {
                default_directive: "control",
                allowed_directives: CONTROL_DIRECTIVES,
                default_base_type: "System.Web.UI.UserControl",
                code_allowed: true,
                default_object_scope: Some(ObjectTagScope::Page),
                forbidden_attributes: &[],
            },
            DocumentKind::MasterPage => ParserPolicy {
                default_directive: "master",
                allowed_directives: MASTER_DIRECTIVES,
                default_base_type: "System.Web.UI.MasterPage",
                code_allowed: true,
                default_object_scope: Some(ObjectTagScope::Page),
                forbidden_attributes: &[],
            },
            DocumentKind::PageTheme => ParserPolicy {
                default_directive: "skin",
                allowed_directives: THEME_DIRECTIVES,
                default_base_type: "System.Web.UI.PageTheme",
                code_allowed: false,
                default_object_scope: None,
                forbidden_attributes: THEME_FORBIDDEN,
            },
            DocumentKind::ApplicationFile => ParserPolicy {
                default_directive: "application",
                allowed_directives: APPLICATION_DIRECTIVES,
                default_base_type: "System.Web.HttpApplication",
                code_allowed: true,
                default_object_scope: Some(ObjectTagScope::AppInstance),
                forbidden_attributes: &[],
            },
        }
    }

    /// Resolve the scope of an object tag, applying this kind's default
    pub fn check_object_tag_scope(self, scope: ObjectTagScope) -> Result<ObjectTagScope> {
        match self {
            DocumentKind::ApplicationFile => match scope {
                ObjectTagScope::Default => Ok(ObjectTagScope::AppInstance),
                ObjectTagScope::Page => Err(ParseError::new(
                    ErrorCode::InvalidObjectTagScope,
                    "The 'page' scope is not valid in global.asax.",
                )),
                other => Ok(other),
            },
            DocumentKind::PageTheme => Err(ParseError::new(
                ErrorCode::InvalidObjectTagScope,
                "Object tags are not allowed in a theme.",
            )),
            _ => match scope {
                ObjectTagScope::Default => Ok(ObjectTagScope::Page),
                ObjectTagScope::Application | ObjectTagScope::Session | ObjectTagScope::AppInstance => {
                    Err(ParseError::new(
                        ErrorCode::ApplicationScopeOnlyInGlobalAsax,
                        "Objects with application or session scope can only be declared in global.asax.",
                    ))
                }
                ObjectTagScope::Page => Ok(ObjectTagScope::Page),
            },
        }
    }

    pub fn is_application_file(self) -> bool {
        self == DocumentKind::ApplicationFile
    }
}
