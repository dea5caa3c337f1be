//! HTML Tag Tables
//!
//! Maps plain HTML tags carrying `runat="server"` to their HTML control
//! types. Built once and shared by every parser.

use once_cell::sync::Lazy;
use std::collections::HashMap;

const HTML_CONTROLS: &str = "System.Web.UI.HtmlControls";

/// Lower-case tag name -> HTML control type name
pub static HTML_TAG_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (tag, ty) in [
        ("a", "HtmlAnchor"),
        ("button", "HtmlButton"),
        ("form", "HtmlForm"),
        ("head", "HtmlHead"),
        ("img", "HtmlImage"),
        ("link", "HtmlLink"),
        ("meta", "HtmlMeta"),
        ("select", "HtmlSelect"),
        ("table", "HtmlTable"),
        ("tr", "HtmlTableRow"),
        ("td", "HtmlTableCell"),
        ("th", "HtmlTableCell"),
        ("textarea", "HtmlTextArea"),
        ("title", "HtmlTitle"),
        ("iframe", "HtmlIframe"),
    ] {
        map.insert(tag, ty);
    }
    map
});

/// Lower-case `<input type=...>` value -> HTML control type name
pub static INPUT_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (kind, ty) in [
        ("text", "HtmlInputText"),
        ("password", "HtmlInputPassword"),
        ("checkbox", "HtmlInputCheckBox"),
        ("radio", "HtmlInputRadioButton"),
        ("submit", "HtmlInputSubmit"),
        ("reset", "HtmlInputReset"),
        ("button", "HtmlInputButton"),
        ("hidden", "HtmlInputHidden"),
        ("file", "HtmlInputFile"),
        ("image", "HtmlInputImage"),
    ] {
        map.insert(kind, ty);
    }
    map
});

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub fn is_void_element(tag_name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|t| t.eq_ignore_ascii_case(tag_name))
}

/// Full type name of the HTML control for a server tag.
///
/// `input_type` is the value of the tag's `type` attribute, if any. Unknown
/// tags map to `HtmlGenericControl`, unknown input types to
/// `HtmlInputGenericControl`.
pub fn html_control_type(tag_name: &str, input_type: Option<&str>) -> String {
    let tag = tag_name.to_ascii_lowercase();
    let simple = if tag == "input" {
        let kind = input_type.unwrap_or("text").to_ascii_lowercase();
        INPUT_TYPES.get(kind.as_str()).copied().unwrap_or("HtmlInputGenericControl")
    } else {
        HTML_TAG_TYPES.get(tag.as_str()).copied().unwrap_or("HtmlGenericControl")
    };
    format!("{}.{}", HTML_CONTROLS, simple)
}
