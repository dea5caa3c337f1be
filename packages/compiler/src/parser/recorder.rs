//! Parse Recorders
//!
//! Observers notified as the parser builds the tree, for tools that map
//! builders back to their markup (designers, code-behind generators).

use crate::builder::ControlBuilder;

pub trait ParseRecorder {
    /// A server tag was opened; `text` is the tag as written
    fn record_begin_tag(&mut self, _builder: &ControlBuilder, _text: &str) {}

    fn record_end_tag(&mut self, _builder: &ControlBuilder, _text: &str) {}

    /// A self-closed server tag
    fn record_empty_tag(&mut self, _builder: &ControlBuilder, _text: &str) {}

    fn record_code_block(&mut self, _parent: &ControlBuilder, _text: &str) {}

    fn parse_complete(&mut self, _root: &ControlBuilder) {}

    fn process_generated_code(&mut self, _root: &ControlBuilder, _code: &mut String) {}
}

/// Records nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRecorder;

impl ParseRecorder for NullRecorder {}

/// Fans notifications out to several recorders.
///
/// End tags are delivered in reverse registration order so recorders nest.
#[derive(Default)]
pub struct CompositeRecorder {
    recorders: Vec<Box<dyn ParseRecorder>>,
}

impl CompositeRecorder {
    pub fn new(recorders: Vec<Box<dyn ParseRecorder>>) -> Self {
        CompositeRecorder { recorders }
    }

    pub fn push(&mut self, recorder: Box<dyn ParseRecorder>) {
        self.recorders.push(recorder);
    }

    pub fn len(&self) -> usize {
        self.recorders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorders.is_empty()
    }
}

impl ParseRecorder for CompositeRecorder {
    fn record_begin_tag(&mut self, builder: &ControlBuilder, text: &str) {
        for recorder in &mut self.recorders {
            recorder.record_begin_tag(builder, text);
        }
    }

    fn record_end_tag(&mut self, builder: &ControlBuilder, text: &str) {
        for recorder in self.recorders.iter_mut().rev() {
            recorder.record_end_tag(builder, text);
        }
    }

    fn record_empty_tag(&mut self, builder: &ControlBuilder, text: &str) {
        for recorder in &mut self.recorders {
            recorder.record_empty_tag(builder, text);
        }
    }

    fn record_code_block(&mut self, parent: &ControlBuilder, text: &str) {
        for recorder in &mut self.recorders {
            recorder.record_code_block(parent, text);
        }
    }

    fn parse_complete(&mut self, root: &ControlBuilder) {
        for recorder in &mut self.recorders {
            recorder.parse_complete(root);
        }
    }

    fn process_generated_code(&mut self, root: &ControlBuilder, code: &mut String) {
        for recorder in &mut self.recorders {
            recorder.process_generated_code(root, code);
        }
    }
}
