//! Markup Patterns
//!
//! The regular expressions recognising each lexical construct. All patterns
//! are anchored and are run against the remainder of the document starting at
//! the scan position.
//!
//! Two tag pattern sets exist. The current one accepts any unquoted
//! `<% ... %>` construct as an attribute value; the legacy one only accepts
//! `<%# ... %>`. A parser picks one set when it is created.

use once_cell::sync::Lazy;
use regex::Regex;

pub static TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^<]+").unwrap());

pub static DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<%\s*@(?P<body>(?s:.*?))%>").unwrap());

pub static DIRECTIVE_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\s*(?P<name>\w[\w:]*)(?:\s*(?P<eq>=)\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<uq>[^\s"'%>]*)))?"#,
    )
    .unwrap()
});

pub static INCLUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^<!--\s*#(?i:include)\s*(?P<pathtype>\w+)\s*=\s*["']?(?P<filename>[^"']*)["']?\s*-->"#,
    )
    .unwrap()
});

pub static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<%--(?s:.*?)--%>").unwrap());

pub static EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<%\s*=(?P<code>(?s:.*?))%>").unwrap());

pub static ENCODED_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<%\s*:(?P<code>(?s:.*?))%>").unwrap());

pub static DATABINDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<%#(?P<encode>:)?(?P<code>(?s:.*?))%>").unwrap());

/// `<% ... %>`; the lexer rejects matches whose code starts with `@`
pub static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<%(?P<code>(?s:.*?))%>").unwrap());

pub static END_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^</(?P<tagname>[\w:.\-]+)\s*>").unwrap());

/// First `>` at or after the scan position
pub static GT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^%]>").unwrap());

pub static RUNAT_SERVER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)runat\W*server"#).unwrap());

pub static SERVER_CONSTRUCTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<%.*?%>").unwrap());

/// Attribute value that is a whole databinding expression
pub static DATABIND_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*<%\s*#(?P<encode>:)?(?P<code>(?s:.*?))%>\s*$").unwrap()
});

/// Attribute value that is an expression builder reference, `<%$ prefix: code %>`
pub static EXPRESSION_BUILDER_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*<%\s*\$\s*(?P<code>(?s:.*?))%>\s*$").unwrap());

/// A tag pattern set: the whole-tag matcher plus the matching attribute scanner
pub struct TagPatterns {
    pub tag: Regex,
    pub attribute: Regex,
}

fn tag_patterns(server_value: &str) -> TagPatterns {
    let value = format!(
        r#"\s*=\s*"[^"]*"|\s*=\s*'[^']*'|\s*=\s*{sv}|\s*=\s*[^\s=/"'>]+"#,
        sv = server_value
    );
    let tag = format!(
        r#"^<(?P<tagname>[\w:.]+)(?P<attrs>(?:\s+\w[-\w:.]*(?:{value})?)*)\s*(?P<empty>/)?>"#,
        value = value
    );
    let attribute = format!(
        r#"\s+(?P<name>\w[-\w:.]*)(?:\s*=\s*"(?P<dq>[^"]*)"|\s*=\s*'(?P<sq>[^']*)'|\s*=\s*(?P<code>{sv})|\s*=\s*(?P<uq>[^\s=/"'>]+))?"#,
        sv = server_value
    );
    TagPatterns {
        tag: Regex::new(&tag).unwrap(),
        attribute: Regex::new(&attribute).unwrap(),
    }
}

pub static CURRENT_TAG_PATTERNS: Lazy<TagPatterns> = Lazy::new(|| tag_patterns(r"<%(?s:.*?)%>"));

pub static LEGACY_TAG_PATTERNS: Lazy<TagPatterns> =
    Lazy::new(|| tag_patterns(r"<%#(?s:.*?)%>"));

/// Pick the tag pattern set for a target framework
pub fn tag_patterns_for(target_framework_is_current: bool) -> &'static TagPatterns {
    if target_framework_is_current {
        &CURRENT_TAG_PATTERNS
    } else {
        &LEGACY_TAG_PATTERNS
    }
}

// Databinding expression forms

pub static BIND_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*bind\s*\((?P<params>.*)\)\s*$").unwrap());

pub static BIND_PARAMETERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)^\s*(?:"(?P<dfield>[\w.]+|\[.+\])"|'(?P<sfield>[\w.]+|\[.+\])')\s*(?:,\s*(?:"(?P<dformat>.*)"|'(?P<sformat>.*)')\s*)?$"#,
    )
    .unwrap()
});

pub static BIND_ITEM_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*BindItem\.(?P<params>.*?)\s*$").unwrap());

pub static BIND_ITEM_PARAMETERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<field>[\w.]+)\s*$").unwrap());

pub static EVAL_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*eval\s*\((?P<params>.*)\)\s*$").unwrap());

pub static FORMAT_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(?:[^"]|\\")*$"#).unwrap());
