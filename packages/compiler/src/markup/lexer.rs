//! Markup Lexer
//!
//! Pull lexer over a markup document. The parser asks for one token at a time
//! and may move the cursor back (a non-server begin tag only consumes its `<`
//! so that code blocks inside its attributes are still seen).

use super::patterns::*;
use super::tokens::{CodeBlockType, RawAttribute, Token, TokenKind};
use crate::error::ErrorCode;
use crate::parse_util::html_decode;
use regex::Captures;

/// What the lexer recognises at the current position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    Normal,
    /// Inside a server `<script>` block: only includes, comments and end tags
    Script,
}

pub struct Lexer<'t> {
    text: &'t str,
    pos: usize,
    patterns: &'static TagPatterns,
    /// Index of the last `>` in the document; begin tags can't start after it
    last_gt: Option<usize>,
}

impl<'t> Lexer<'t> {
    pub fn new(text: &'t str, target_framework_is_current: bool) -> Self {
        Lexer {
            text,
            pos: 0,
            patterns: tag_patterns_for(target_framework_is_current),
            last_gt: text.rfind('>'),
        }
    }

    pub fn text(&self) -> &'t str {
        self.text
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.text.len());
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Next token, or `None` at the end of the document
    pub fn next_token(&mut self, mode: LexMode) -> Option<Token> {
        if self.is_at_end() {
            return None;
        }
        let start = self.pos;
        let rest = &self.text[start..];

        if let Some(m) = TEXT.find(rest) {
            return Some(self.emit(TokenKind::Text(m.as_str().to_string()), start, m.end()));
        }

        let token = match mode {
            LexMode::Normal => self.match_normal(start, rest),
            LexMode::Script => self.match_script(start, rest),
        };
        match token {
            Some(token) => {
                self.pos = token.end;
                log::trace!("token {:?} at {}", kind_name(&token.kind), token.start);
                Some(token)
            }
            None => Some(self.emit(TokenKind::Stray, start, 1)),
        }
    }

    fn emit(&mut self, kind: TokenKind, start: usize, len: usize) -> Token {
        self.pos = start + len;
        Token::new(kind, start, start + len)
    }

    fn match_normal(&self, start: usize, rest: &str) -> Option<Token> {
        if let Some(caps) = DIRECTIVE.captures(rest) {
            return Some(self.directive_token(start, &caps));
        }
        if let Some(token) = include_token(start, rest) {
            return Some(token);
        }
        if let Some(m) = COMMENT.find(rest) {
            return Some(Token::new(TokenKind::Comment, start, start + m.end()));
        }
        let code_patterns = [
            (&*EXPRESSION, CodeBlockType::Expression),
            (&*ENCODED_EXPRESSION, CodeBlockType::EncodedExpression),
            (&*DATABINDING, CodeBlockType::DataBinding),
            (&*CODE, CodeBlockType::Code),
        ];
        for (regex, block_type) in code_patterns {
            if let Some(caps) = regex.captures(rest) {
                let code = &caps["code"];
                if block_type == CodeBlockType::Code && code.starts_with('@') {
                    continue;
                }
                let whole = caps.get(0).map_or(0, |m| m.end());
                let code_offset = start + caps.name("code").map_or(0, |m| m.start());
                return Some(Token::new(
                    TokenKind::CodeBlock {
                        block_type,
                        code: code.replace("%\\>", "%>"),
                        encode: caps.name("encode").is_some(),
                        code_offset,
                    },
                    start,
                    start + whole,
                ));
            }
        }
        if self.last_gt.map_or(false, |gt| gt > start) {
            if let Some(caps) = self.patterns.tag.captures(rest) {
                return Some(self.begin_tag_token(start, &caps));
            }
        }
        end_tag_token(start, rest)
    }

    fn match_script(&self, start: usize, rest: &str) -> Option<Token> {
        if let Some(token) = include_token(start, rest) {
            return Some(token);
        }
        if let Some(m) = COMMENT.find(rest) {
            return Some(Token::new(TokenKind::Comment, start, start + m.end()));
        }
        end_tag_token(start, rest)
    }

    fn directive_token(&self, start: usize, caps: &Captures) -> Token {
        let whole = caps.get(0).map_or(0, |m| m.end());
        let body = caps.name("body");
        let body_offset = start + body.map_or(0, |m| m.start());
        let body = body.map_or("", |m| m.as_str());
        let attributes = DIRECTIVE_ATTRIBUTE
            .captures_iter(body)
            .map(|attr| {
                let value = ["dq", "sq", "uq"].iter().find_map(|g| attr.name(g));
                RawAttribute {
                    name: attr["name"].to_string(),
                    value: value.map_or(String::new(), |v| html_decode(v.as_str())),
                    has_equals: attr.name("eq").is_some(),
                    value_offset: body_offset + value.map_or(0, |v| v.start()),
                }
            })
            .collect();
        Token::new(TokenKind::Directive { attributes }, start, start + whole)
    }

    fn begin_tag_token(&self, start: usize, caps: &Captures) -> Token {
        let whole = caps.get(0).map_or(0, |m| m.end());
        let attributes = match caps.name("attrs") {
            Some(attrs) => {
                let attrs_offset = start + attrs.start();
                self.patterns
                    .attribute
                    .captures_iter(attrs.as_str())
                    .map(|attr| {
                        let (value, decoded) = if let Some(code) = attr.name("code") {
                            (Some(code), false)
                        } else {
                            (["dq", "sq", "uq"].iter().find_map(|g| attr.name(g)), true)
                        };
                        let text = value.map_or("", |v| v.as_str());
                        RawAttribute {
                            name: attr["name"].to_string(),
                            value: if decoded { html_decode(text) } else { text.to_string() },
                            has_equals: value.is_some(),
                            value_offset: attrs_offset + value.map_or(0, |v| v.start()),
                        }
                    })
                    .collect()
            }
            None => Vec::new(),
        };
        Token::new(
            TokenKind::BeginTag {
                name: caps["tagname"].to_string(),
                attributes,
                self_closed: caps.name("empty").is_some(),
            },
            start,
            start + whole,
        )
    }

    /// Explain why the `<` at `pos` failed to lex, if it is an error at all.
    ///
    /// An unmatched `<%` is a malformed server block. A tag carrying
    /// `runat=server` that doesn't match the tag pattern is a malformed server
    /// tag, or a tag with forbidden `<% %>` constructs when removing those
    /// would make it well formed.
    pub fn detect_server_tag_error(&self, pos: usize) -> Option<(ErrorCode, String)> {
        let rest = &self.text[pos..];
        if rest.starts_with("<%") {
            return Some((
                ErrorCode::MalformedServerBlock,
                "The server block is not well formed.".to_string(),
            ));
        }
        let gt = GT.find(rest)?;
        let tag = &rest[..gt.end()];
        if !RUNAT_SERVER.is_match(tag) {
            return None;
        }
        let stripped = SERVER_CONSTRUCTS.replace_all(tag, "");
        if stripped != tag && self.patterns.tag.is_match(&stripped) {
            Some((
                ErrorCode::ServerTagsCantContainPercentConstructs,
                "Server tags cannot contain <% ... %> constructs.".to_string(),
            ))
        } else {
            Some((
                ErrorCode::MalformedServerTag,
                "The server tag is not well formed.".to_string(),
            ))
        }
    }
}

fn include_token(start: usize, rest: &str) -> Option<Token> {
    let caps = INCLUDE.captures(rest)?;
    let whole = caps.get(0).map_or(0, |m| m.end());
    Some(Token::new(
        TokenKind::Include {
            path_type: caps["pathtype"].to_string(),
            file_name: caps["filename"].trim().to_string(),
        },
        start,
        start + whole,
    ))
}

fn end_tag_token(start: usize, rest: &str) -> Option<Token> {
    let caps = END_TAG.captures(rest)?;
    let whole = caps.get(0).map_or(0, |m| m.end());
    Some(Token::new(
        TokenKind::EndTag { name: caps["tagname"].to_string() },
        start,
        start + whole,
    ))
}

fn kind_name(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::Text(_) => "text",
        TokenKind::Directive { .. } => "directive",
        TokenKind::Include { .. } => "include",
        TokenKind::Comment => "comment",
        TokenKind::CodeBlock { .. } => "code",
        TokenKind::BeginTag { .. } => "begin-tag",
        TokenKind::EndTag { .. } => "end-tag",
        TokenKind::Stray => "stray",
    }
}
