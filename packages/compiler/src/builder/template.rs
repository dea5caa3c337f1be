//! Template Builder
//!
//! A property element of type `ITemplate` (`<ItemTemplate>`). Its content is
//! parsed like a page fragment and becomes a [`TemplateNode`]: a compiled
//! template only generated code can instantiate, or a live one the
//! no-compile path instantiates in process.

use super::build_object::{LiveObject, ObjectBuildContext};
use super::control_builder::ControlBuilder;
use super::property_entry::BoundPropertyEntry;
use super::BuildContext;
use crate::error::{ErrorCode, ParseError, Result};
use crate::schema::{MemberDescriptor, TypeId};
use crate::virtual_path::VirtualPath;
use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::sync::Arc;

/// The template control (page, user control, master) a template belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateControlInfo {
    pub virtual_path: VirtualPath,
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateData {
    #[serde(skip)]
    pub container_type: Option<TypeId>,
    pub container_type_name: Option<String>,
    /// Declared as a two-way bindable template
    pub bindable: bool,
    /// Each instance is its own ID scope
    pub allow_multiple_instances: bool,
    pub template_control: Option<TemplateControlInfo>,
    /// `Bind()` entries extracted from the template content when it closes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub two_way_bindings: Vec<BoundPropertyEntry>,
}

impl TemplateData {
    pub fn new(ctx: &BuildContext, member: &MemberDescriptor) -> Self {
        TemplateData {
            container_type: member.template_container,
            container_type_name: member
                .template_container
                .map(|t| ctx.registry.full_name(t).to_string()),
            bindable: member.bindable_template,
            allow_multiple_instances: !member.single_instance,
            template_control: Some(ctx.template_control.clone()),
            two_way_bindings: Vec::new(),
        }
    }
}

thread_local! {
    static CURRENT: RefCell<Vec<TemplateControlInfo>> = RefCell::new(Vec::new());
}

/// The template control whose template is being instantiated on this thread
pub fn current_template_control() -> Option<TemplateControlInfo> {
    CURRENT.with(|stack| stack.borrow().last().cloned())
}

/// Makes a template control current until dropped
#[must_use]
pub struct TemplateControlScope {
    depth: usize,
}

impl TemplateControlScope {
    pub fn enter(info: TemplateControlInfo) -> Self {
        let depth = CURRENT.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(info);
            stack.len()
        });
        TemplateControlScope { depth }
    }
}

impl Drop for TemplateControlScope {
    fn drop(&mut self) {
        CURRENT.with(|stack| stack.borrow_mut().truncate(self.depth - 1));
    }
}

/// A template property value
#[derive(Debug, Clone, Serialize)]
pub enum TemplateNode {
    Compiled { template_id: String },
    Live(#[serde(serialize_with = "serialize_live")] Arc<ControlBuilder>),
}

fn serialize_live<S: Serializer>(builder: &Arc<ControlBuilder>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    builder.as_ref().serialize(serializer)
}

impl TemplateNode {
    /// Build the template content into `container`
    pub fn instantiate_in(&self, container: &mut LiveObject, ctx: &ObjectBuildContext) -> Result<()> {
        let builder = match self {
            TemplateNode::Live(builder) => builder,
            TemplateNode::Compiled { template_id } => {
                return Err(ParseError::new(
                    ErrorCode::TemplateNotInstantiable,
                    format!("The compiled template '{}' can only be instantiated by generated code.", template_id),
                ))
            }
        };
        let info = builder
            .template_data()
            .and_then(|data| data.template_control.clone())
            .unwrap_or_else(|| ctx.template_control.clone());
        let _scope = TemplateControlScope::enter(info);
        let children = ctx.build_children(builder)?;
        container.children.extend(children);
        Ok(())
    }
}
