//! Parsing Context
//!
//! The stack of documents being read: the document itself and the files it
//! pulls in through server-side includes. Positions are always reported
//! against the innermost one.

use crate::error::{ErrorCode, ParseError, Result};
use crate::markup::Lexer;
use crate::parse_util::{LineMap, SourceLocation};
use crate::virtual_path::VirtualPath;

#[derive(Debug)]
struct SourceFrame {
    id: usize,
    virtual_path: VirtualPath,
    line_map: LineMap,
}

#[derive(Debug)]
pub struct ParseContext {
    document: VirtualPath,
    frames: Vec<SourceFrame>,
    sources_read: usize,
    target_framework_is_current: bool,
}

impl ParseContext {
    pub fn new(document: VirtualPath, target_framework_is_current: bool) -> Self {
        ParseContext {
            document,
            frames: Vec::new(),
            sources_read: 0,
            target_framework_is_current,
        }
    }

    /// Start reading `text` from `virtual_path`; a file already on the stack is a circular include
    pub fn push_source(&mut self, virtual_path: VirtualPath, text: &str) -> Result<()> {
        if self.frames.iter().any(|f| f.virtual_path == virtual_path) {
            return Err(ParseError::new(
                ErrorCode::CircularInclude,
                format!("The file '{}' cannot include itself.", virtual_path),
            ));
        }
        self.sources_read += 1;
        self.frames.push(SourceFrame {
            id: self.sources_read,
            virtual_path,
            line_map: LineMap::new(text),
        });
        Ok(())
    }

    pub fn pop_source(&mut self) {
        self.frames.pop();
    }

    /// Number of documents being read; 1 for the document itself
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Identity of the source text being read; a file included twice gets a new one each time
    pub fn source_id(&self) -> usize {
        self.frames.last().map_or(0, |f| f.id)
    }

    pub fn current_path(&self) -> &VirtualPath {
        self.frames.last().map_or(&self.document, |f| &f.virtual_path)
    }

    pub fn document_path(&self) -> &VirtualPath {
        &self.document
    }

    pub fn location(&self, offset: usize) -> SourceLocation {
        match self.frames.last() {
            Some(frame) => {
                let (line, column) = frame.line_map.position(offset);
                SourceLocation::new(frame.virtual_path.clone(), line, column)
            }
            None => SourceLocation::new(self.document.clone(), 1, 1),
        }
    }

    pub fn line(&self, offset: usize) -> usize {
        self.frames.last().map_or(1, |f| f.line_map.line(offset))
    }

    /// Lexer over `text` using the tag pattern set for the target framework
    pub fn lexer<'t>(&self, text: &'t str) -> Lexer<'t> {
        Lexer::new(text, self.target_framework_is_current)
    }
}
