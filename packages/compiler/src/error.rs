//! Parse Errors
//!
//! Every failure raised while parsing a markup document is a [`ParseError`].
//! Errors fall into three categories: structural problems in the markup
//! itself, binding failures while mapping markup onto the type registry, and
//! policy violations (document-kind rules, filter denials, limits).

use crate::parse_util::SourceLocation;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ParseError>;

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParseErrorKind {
    /// Malformed or unbalanced markup
    Structural,
    /// A name or value could not be bound to the type registry
    Binding,
    /// A document-kind rule, filter decision or limit was violated
    Policy,
}

/// Message keys for parse errors.
///
/// Codes in the 1000 range are structural, 2000 binding and 3000 policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    MalformedServerBlock = 1001,
    MalformedServerTag = 1002,
    ServerTagsCantContainPercentConstructs = 1003,
    MismatchedEndTag = 1004,
    UnexpectedEofLookingForTag = 1005,
    EmptyExpression = 1006,
    DuplicateAttribute = 1007,
    DuplicateAttributeInDirective = 1008,
    RunatCanOnlyBeServer = 1009,
    ScriptTagWithoutSrcMustHaveContent = 1010,
    IncludeNotAllowedInScriptTag = 1011,
    EmptyFileName = 1012,
    OnlyFileVirtualSupportedOnInclude = 1013,
    CircularInclude = 1014,
    FileNotFound = 1015,
    InvalidVirtualPath = 1016,
    LiteralExpressionsNotAllowed = 1017,
    InvalidExpressionSyntax = 1018,
    BadlyFormattedBind = 1019,
    InvalidIdentifier = 1020,
    IdAlreadyUsed = 1021,
    MissingAttribute = 1022,
    InvalidAttributeValue = 1023,

    UnknownServerTag = 2001,
    UnknownTagPrefix = 2002,
    TypeNotFound = 2003,
    TypeDoesntHaveProperty = 2004,
    PropertyNotClsCompliant = 2005,
    AmbiguousMatch = 2006,
    PropertyReadOnly = 2007,
    InvalidPropertyValue = 2008,
    InvalidEnumValue = 2009,
    InvalidCollectionItemType = 2010,
    LiteralContentNotAllowed = 2011,
    ChildrenNotSupported = 2012,
    CodeNotSupportedOnNotControls = 2013,
    DataBoundLiteralsCantBind = 2014,
    DatabindingRequiresEvent = 2015,
    TwoWayBindingRequiresId = 2016,
    NoCompileBindingRequiresId = 2017,
    TwoWayBindingNonProperty = 2018,
    MultipleBoundEntries = 2019,
    IdMustUseAttribute = 2020,
    EventHandlerCantBeEmpty = 2021,
    EventsCantBeFiltered = 2022,
    UnknownExpressionPrefix = 2023,
    MissingExpressionPrefix = 2024,
    MissingExpressionValue = 2025,
    CannotEvaluateExpression = 2026,
    ExpressionValueNotFound = 2027,
    InvalidResourceKey = 2028,
    MetaLocalizeNotAllowed = 2029,
    InvalidLocalizeValue = 2030,
    ResourceKeyWithLocalizeFalse = 2031,
    ObjectTagMustHaveClass = 2032,
    InvalidClassId = 2033,
    InvalidTypeToInherit = 2034,
    InvalidTypeToImplement = 2035,
    InvalidDeviceFilter = 2036,
    TemplateNotInstantiable = 2037,

    OnlyOneDirectiveAllowed = 3001,
    UnknownDirective = 3002,
    DirectiveNotAllowed = 3003,
    AttributeNotSupportedInDirective = 3004,
    AttributeNotAllowed = 3005,
    AttributesMutuallyExclusive = 3006,
    DeviceFilterNotAllowedInDirective = 3007,
    IllegalDeviceFilter = 3008,
    IllegalExpressionBuilder = 3009,
    CodeNotAllowed = 3010,
    CompilationModeNever = 3011,
    ControlTypeNotAllowed = 3012,
    BaseTypeNotAllowed = 3013,
    VirtualReferenceNotAllowed = 3014,
    IncludeNotAllowed = 3015,
    TooManyControls = 3016,
    TooManyDependencies = 3017,
    TooManyDirectDependencies = 3018,
    InvalidObjectTagScope = 3019,
    ApplicationScopeOnlyInGlobalAsax = 3020,
    InvalidApplicationFileContent = 3021,
    ApplicationFileControls = 3022,
    ExpressionsNotAllowedInThemes = 3023,
    EventNotAllowedInTheme = 3024,
    IdNotAllowedInTheme = 3025,
    ContentMustBeTopLevel = 3026,
    OnlyContentAllowed = 3027,
    DuplicateContentPlaceHolder = 3028,
    ContentPlaceHolderNotFound = 3029,
    CircularReference = 3030,
}

impl ErrorCode {
    /// Category for this code
    pub fn kind(self) -> ParseErrorKind {
        match self as u32 {
            1000..=1999 => ParseErrorKind::Structural,
            2000..=2999 => ParseErrorKind::Binding,
            _ => ParseErrorKind::Policy,
        }
    }

    /// Numeric code, e.g. `3001`
    pub fn number(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WF{}", self.number())
    }
}

/// A fatal parse error.
///
/// When the parser runs with error collection enabled, the first error is
/// returned and the remaining ones are attached as `additional_errors`.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{}", self.format())]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub code: ErrorCode,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub additional_errors: Vec<ParseError>,
}

impl ParseError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ParseError {
            kind: code.kind(),
            code,
            message: message.into(),
            location: None,
            additional_errors: Vec::new(),
        }
    }

    pub fn at(code: ErrorCode, message: impl Into<String>, location: SourceLocation) -> Self {
        ParseError::new(code, message).with_location(location)
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach a location unless the error already carries a more precise one
    pub fn or_location(mut self, location: &SourceLocation) -> Self {
        if self.location.is_none() {
            self.location = Some(location.clone());
        }
        self
    }

    /// All errors, this one first
    pub fn all(&self) -> impl Iterator<Item = &ParseError> {
        std::iter::once(self).chain(self.additional_errors.iter())
    }

    pub fn line(&self) -> Option<usize> {
        self.location.as_ref().map(|l| l.line)
    }

    fn format(&self) -> String {
        match &self.location {
            Some(loc) => format!("{}: {} ({})", loc, self.message, self.code),
            None => format!("{} ({})", self.message, self.code),
        }
    }
}
