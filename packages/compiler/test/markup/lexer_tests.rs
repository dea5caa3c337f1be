/**
 * Markup Lexer Tests
 *
 * Token recognition for every markup construct, both tag pattern sets,
 * script mode and the malformed server tag diagnostics.
 */

#[path = "../util/mod.rs"]
mod util;

#[cfg(test)]
mod markup_lexer_tests {
    use super::util::*;
    use webforms_compiler::markup::{CodeBlockType, LexMode, Lexer, TokenKind};
    use webforms_compiler::ErrorCode;

    mod directives {
        use super::*;

        #[test]
        fn should_read_directive_name_and_attributes() {
            assert_eq!(
                humanize_tokens(r#"<%@ Page Language="C#" Debug=true %>hello"#),
                vec!["DIRECTIVE(Page Language=C# Debug=true)", "TEXT(hello)"]
            );
        }

        #[test]
        fn should_read_directive_without_name() {
            assert_eq!(
                humanize_tokens(r#"<%@ Language='VB' %>"#),
                vec!["DIRECTIVE(Language=VB)"]
            );
        }

        #[test]
        fn should_decode_directive_values() {
            let mut lexer = Lexer::new(r#"<%@ Page Title="a &amp; b" %>"#, true);
            match lexer.next_token(LexMode::Normal).unwrap().kind {
                TokenKind::Directive { attributes } => {
                    assert_eq!(attributes[1].name, "Title");
                    assert_eq!(attributes[1].value, "a & b");
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn should_span_lines() {
            assert_eq!(
                humanize_tokens("<%@ Page\n  Language=\"C#\"\n%>"),
                vec!["DIRECTIVE(Page Language=C#)"]
            );
        }
    }

    mod code_blocks {
        use super::*;

        #[test]
        fn should_recognise_every_flavour() {
            assert_eq!(
                humanize_tokens("a<%= x %>b<%: y %><%# z %><% w(); %>"),
                vec![
                    "TEXT(a)",
                    "CODE(Expression:x)",
                    "TEXT(b)",
                    "CODE(EncodedExpression:y)",
                    "CODE(DataBinding:z)",
                    "CODE(Code:w();)",
                ]
            );
        }

        #[test]
        fn should_mark_encoded_databinding() {
            let mut lexer = Lexer::new("<%#: Item.Name %>", true);
            match lexer.next_token(LexMode::Normal).unwrap().kind {
                TokenKind::CodeBlock { block_type, encode, code, .. } => {
                    assert_eq!(block_type, CodeBlockType::DataBinding);
                    assert!(encode);
                    assert_eq!(code.trim(), "Item.Name");
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn should_report_offsets() {
            let mut lexer = Lexer::new("ab<%# x %>", true);
            lexer.next_token(LexMode::Normal);
            let token = lexer.next_token(LexMode::Normal).unwrap();
            assert_eq!((token.start, token.end), (2, 10));
            match token.kind {
                TokenKind::CodeBlock { code_offset, .. } => assert_eq!(code_offset, 5),
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn should_skip_server_comments() {
            assert_eq!(
                humanize_tokens(r#"<%-- <asp:Label runat="server" /> --%>after"#),
                vec!["COMMENT", "TEXT(after)"]
            );
        }
    }

    mod includes {
        use super::*;

        #[test]
        fn should_read_file_and_virtual_includes() {
            assert_eq!(
                humanize_tokens(r#"<!-- #include file="header.inc" --><!--#INCLUDE virtual='/shared/footer.inc'-->"#),
                vec!["INCLUDE(file=header.inc)", "INCLUDE(virtual=/shared/footer.inc)"]
            );
        }
    }

    mod tags {
        use super::*;

        #[test]
        fn should_read_begin_end_and_empty_tags() {
            assert_eq!(
                humanize_tokens(r#"<div>x</div><asp:Label runat="server" Text="Hi" />"#),
                vec!["BEGIN(div)", "TEXT(x)", "END(div)", "EMPTY(asp:Label)"]
            );
        }

        #[test]
        fn should_read_attribute_forms() {
            let mut lexer = Lexer::new(r#"<asp:Label runat=server Text='single' Width=100px Visible />"#, true);
            match lexer.next_token(LexMode::Normal).unwrap().kind {
                TokenKind::BeginTag { attributes, self_closed, .. } => {
                    assert!(self_closed);
                    let pairs: Vec<_> = attributes.iter().map(|a| (a.name.as_str(), a.value.as_str())).collect();
                    assert_eq!(
                        pairs,
                        vec![("runat", "server"), ("Text", "single"), ("Width", "100px"), ("Visible", "")]
                    );
                    assert!(!attributes[3].has_equals);
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn should_treat_lone_angle_bracket_as_stray() {
            assert_eq!(humanize_tokens("a < b >"), vec!["TEXT(a )", "STRAY", "TEXT( b >)"]);
        }
    }

    mod tag_pattern_sets {
        use super::*;

        const TAG: &str = r#"<asp:Label runat="server" Text=<%= Name %> />"#;

        #[test]
        fn should_accept_any_code_value_with_current_patterns() {
            assert_eq!(humanize_tokens_with(TAG, true), vec!["EMPTY(asp:Label)"]);
        }

        #[test]
        fn should_only_accept_databinding_values_with_legacy_patterns() {
            assert_eq!(
                humanize_tokens_with(TAG, false),
                vec![
                    "STRAY",
                    r#"TEXT(asp:Label runat="server" Text=)"#,
                    "CODE(Expression:Name)",
                    "TEXT( />)",
                ]
            );
            assert_eq!(
                humanize_tokens_with(r#"<asp:Label runat="server" Text=<%# Name %> />"#, false),
                vec!["EMPTY(asp:Label)"]
            );
        }
    }

    mod script_mode {
        use super::*;

        #[test]
        fn should_only_see_end_tags_in_script() {
            let mut lexer = Lexer::new(r#"var a = "<b>";</script>"#, true);
            let mut tokens = Vec::new();
            while let Some(token) = lexer.next_token(LexMode::Script) {
                tokens.push(humanize(&token.kind));
            }
            assert_eq!(
                tokens,
                vec![r#"TEXT(var a = ")"#, "STRAY", r#"TEXT(b>";)"#, "END(script)"]
            );
        }
    }

    mod diagnostics {
        use super::*;

        #[test]
        fn should_flag_malformed_server_tag() {
            let lexer = Lexer::new(r#"<asp:Label runat="server" Text='x' <b>"#, true);
            assert_eq!(
                lexer.detect_server_tag_error(0).map(|e| e.0),
                Some(ErrorCode::MalformedServerTag)
            );
        }

        #[test]
        fn should_ignore_plain_markup() {
            let lexer = Lexer::new("<p <b>", true);
            assert_eq!(lexer.detect_server_tag_error(0), None);
        }

        #[test]
        fn should_flag_unterminated_server_block() {
            let lexer = Lexer::new("x <% foo", true);
            assert_eq!(
                lexer.detect_server_tag_error(2).map(|e| e.0),
                Some(ErrorCode::MalformedServerBlock)
            );
        }
    }
}
