//! Page Parser Filter
//!
//! A [`PageParserFilter`] lets the host veto or preprocess constructs while a
//! document is parsed. Every `allow_*` hook denies and every limit is zero
//! unless the filter says otherwise; [`FilterCounters`] enforces the limits.

use crate::builder::ControlBuilder;
use crate::config::FilterLimits;
use crate::error::{ErrorCode, ParseError, Result};
use crate::markup::{CodeBlockType, ParsedAttributeCollection};
use crate::virtual_path::VirtualPath;

pub trait PageParserFilter {
    fn allow_code(&self) -> bool {
        false
    }

    fn allow_control(&self, _control_type: &str, _builder: &ControlBuilder) -> bool {
        false
    }

    fn allow_base_type(&self, _base_type: &str) -> bool {
        false
    }

    fn allow_virtual_reference(&self, _reference: &VirtualPath) -> bool {
        false
    }

    fn allow_server_side_include(&self, _include: &VirtualPath) -> bool {
        false
    }

    /// Ceiling on server controls; negative means unlimited
    fn number_of_controls_allowed(&self) -> i64 {
        0
    }

    fn total_number_of_dependencies_allowed(&self) -> i64 {
        0
    }

    fn number_of_direct_dependencies_allowed(&self) -> i64 {
        0
    }

    /// Return true when the filter consumed the code block
    fn process_code_construct(&self, _block_type: CodeBlockType, _code: &str) -> bool {
        false
    }

    /// Return true when the filter consumed the databinding attribute
    fn process_data_binding_attribute(&self, _control_id: Option<&str>, _name: &str, _value: &str) -> bool {
        false
    }

    /// Return true when the filter consumed the event hookup
    fn process_event_hookup(&self, _control_id: Option<&str>, _event_name: &str, _handler: &str) -> bool {
        false
    }

    /// Inspect or rewrite a directive before it is processed
    fn preprocess_directive(&self, _directive_name: &str, _attributes: &mut ParsedAttributeCollection) {}

    fn parse_complete(&self, _root: &ControlBuilder) {}
}

/// A filter allowing everything up to configured limits
#[derive(Debug, Clone, Copy)]
pub struct ConfiguredFilter {
    limits: FilterLimits,
}

impl ConfiguredFilter {
    pub fn new(limits: FilterLimits) -> Self {
        ConfiguredFilter { limits }
    }
}

impl PageParserFilter for ConfiguredFilter {
    fn allow_code(&self) -> bool {
        true
    }

    fn allow_control(&self, _control_type: &str, _builder: &ControlBuilder) -> bool {
        true
    }

    fn allow_base_type(&self, _base_type: &str) -> bool {
        true
    }

    fn allow_virtual_reference(&self, _reference: &VirtualPath) -> bool {
        true
    }

    fn allow_server_side_include(&self, _include: &VirtualPath) -> bool {
        true
    }

    fn number_of_controls_allowed(&self) -> i64 {
        self.limits.max_controls
    }

    fn total_number_of_dependencies_allowed(&self) -> i64 {
        self.limits.max_dependencies
    }

    fn number_of_direct_dependencies_allowed(&self) -> i64 {
        self.limits.max_direct_dependencies
    }
}

/// Running counts checked against the filter's ceilings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCounters {
    pub controls: i64,
    pub dependencies: i64,
    pub direct_dependencies: i64,
}

fn check(count: i64, limit: i64, code: ErrorCode, what: &str) -> Result<()> {
    if limit >= 0 && count > limit {
        return Err(ParseError::new(
            code,
            format!("The page exceeds the maximum number of {} allowed ({}).", what, limit),
        ));
    }
    Ok(())
}

impl FilterCounters {
    pub fn count_control(&mut self, filter: &dyn PageParserFilter) -> Result<()> {
        self.controls += 1;
        check(
            self.controls,
            filter.number_of_controls_allowed(),
            ErrorCode::TooManyControls,
            "controls",
        )
    }

    pub fn count_dependencies(&mut self, filter: &dyn PageParserFilter, count: usize) -> Result<()> {
        self.dependencies += count as i64;
        check(
            self.dependencies,
            filter.total_number_of_dependencies_allowed(),
            ErrorCode::TooManyDependencies,
            "dependencies",
        )
    }

    pub fn count_direct_dependency(&mut self, filter: &dyn PageParserFilter) -> Result<()> {
        self.direct_dependencies += 1;
        check(
            self.direct_dependencies,
            filter.number_of_direct_dependencies_allowed(),
            ErrorCode::TooManyDirectDependencies,
            "direct dependencies",
        )
    }
}
