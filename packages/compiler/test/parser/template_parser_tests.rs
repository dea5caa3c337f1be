/**
 * Template Parser Tests
 *
 * The parser engine end to end: the builder tree it produces, literal and
 * code handling, tag balancing, includes, server script blocks, control IDs
 * and error collection.
 */

#[path = "../util/mod.rs"]
mod util;

#[cfg(test)]
mod template_parser_tests {
    use super::util::*;
    use webforms_compiler::builder::{BuilderKind, SubBuilder};
    use webforms_compiler::markup::CodeBlockType;
    use webforms_compiler::parser::{DocumentKind, ParserOptions, TemplateParser};
    use webforms_compiler::{parse_document, ErrorCode, ParseErrorKind, ParserConfig};

    mod tree {
        use super::*;

        #[test]
        fn should_build_controls_between_literals() {
            let doc = parse(
                r#"<%@ Page Language="C#" %><html><body><form id="form1" runat="server"><asp:Label ID="Greeting" runat="server" Text="Hello" /></form></body></html>"#,
            );
            assert_eq!(doc.root.sub_builders.len(), 3);
            assert_eq!(literal_text(&doc.root), "<html><body></body></html>");

            let form = child_builders(&doc.root)[0];
            assert_eq!(form.type_name.as_deref(), Some("System.Web.UI.HtmlControls.HtmlForm"));
            assert_eq!(form.id.as_deref(), Some("form1"));

            let label = child_builders(form)[0];
            assert_eq!(label.type_name.as_deref(), Some("System.Web.UI.WebControls.Label"));
            assert_eq!(label.simple_property("Text").unwrap().persisted_value, "Hello");
            assert!(label.closed);
            assert_eq!(doc.directive.language.as_deref(), Some("C#"));
        }

        #[test]
        fn should_type_root_as_document_base_type() {
            let doc = parse("hello");
            assert_eq!(doc.base_type, "System.Web.UI.Page");
            assert_eq!(doc.root.type_name.as_deref(), Some("System.Web.UI.Page"));
            assert!(matches!(doc.root.kind, BuilderKind::Root));
        }

        #[test]
        fn should_skip_whitespace_after_directive() {
            let doc = parse("<%@ Page %>\r\n\r\n<asp:Label runat=\"server\" />");
            assert_eq!(doc.root.sub_builders.len(), 1);
        }

        #[test]
        fn should_keep_text_after_directive() {
            let doc = parse("<%@ Page %>\nHello");
            assert_eq!(literal_text(&doc.root), "\nHello");
        }

        #[test]
        fn should_keep_plain_markup_around_server_tags_inside_controls() {
            let doc = parse(r#"<asp:Panel runat="server" ID="P"><div><b>x</b></div></asp:Panel>"#);
            let panel = find_by_id(&doc.root, "P").unwrap();
            assert_eq!(literal_text(panel), "<div><b>x</b></div>");
        }

        #[test]
        fn should_map_server_html_tags_to_html_controls() {
            let doc = parse(r#"<div runat="server" id="box"></div><input runat="server" type="checkbox" id="agree" />"#);
            let controls = child_builders(&doc.root);
            assert_eq!(
                controls[0].type_name.as_deref(),
                Some("System.Web.UI.HtmlControls.HtmlGenericControl")
            );
            assert_eq!(
                controls[1].type_name.as_deref(),
                Some("System.Web.UI.HtmlControls.HtmlInputCheckBox")
            );
        }

        #[test]
        fn should_parse_with_default_options() {
            let doc = parse_document("<asp:Literal runat=\"server\" ID=\"L\">Hi</asp:Literal>", "~/a.aspx", DocumentKind::Page)
                .unwrap();
            let literal = find_by_id(&doc.root, "L").unwrap();
            assert_eq!(literal.simple_property("Text").unwrap().persisted_value, "Hi");
        }
    }

    mod code_blocks {
        use super::*;

        #[test]
        fn should_keep_code_blocks_in_order() {
            let doc = parse("<% if (x) { %>hi<% } %>");
            let kinds: Vec<_> = doc
                .root
                .sub_builders
                .iter()
                .map(|s| match s {
                    SubBuilder::Literal(text) => format!("literal:{}", text),
                    SubBuilder::Builder(b) => format!("code:{}", b.code_block_data().unwrap().content),
                })
                .collect();
            assert_eq!(kinds, vec!["code: if (x) { ", "literal:hi", "code: } "]);
        }

        #[test]
        fn should_trim_blank_lines_around_expressions() {
            let doc = parse("<%=\r\n Name \r\n%>");
            let code = child_builders(&doc.root)[0].code_block_data().unwrap();
            assert_eq!(code.block_type, CodeBlockType::Expression);
            assert_eq!(code.content, " Name ");
        }

        #[test]
        fn should_keep_indentation_after_leading_newline() {
            let doc = parse("<%= \n  x %>");
            let block = child_builders(&doc.root)[0];
            assert_eq!(block.code_block_data().unwrap().content, "  x ");
            let location = block.location.as_ref().unwrap();
            assert_eq!((location.line, location.column), (2, 1));
        }

        #[test]
        fn should_cut_expression_at_first_trailing_newline() {
            let doc = parse("<%: Name \n \r\n %>");
            let code = child_builders(&doc.root)[0].code_block_data().unwrap();
            assert_eq!(code.content, " Name ");
        }

        #[test]
        fn should_leave_code_blocks_untrimmed() {
            let doc = parse("<%\n  Run();\n%>");
            let code = child_builders(&doc.root)[0].code_block_data().unwrap();
            assert_eq!(code.content, "\n  Run();\n");
        }

        #[test]
        fn should_reject_empty_expression() {
            assert_eq!(parse_err("<%=   %>").code, ErrorCode::EmptyExpression);
        }

        #[test]
        fn should_reject_literal_expressions() {
            let err = parse_err("<%$ AppSettings: Title %>");
            assert_eq!(err.code, ErrorCode::LiteralExpressionsNotAllowed);
            assert!(err.message.contains("<asp:Literal"));
        }

        #[test]
        fn should_report_malformed_server_block() {
            let err = parse_err("text\n<% unfinished");
            assert_eq!(err.code, ErrorCode::MalformedServerBlock);
            assert_eq!(err.line(), Some(2));
        }
    }

    mod data_bound_literals {
        use super::*;

        #[test]
        fn should_alternate_literals_and_bindings() {
            let doc = parse(r#"<asp:Panel runat="server" ID="P">a<%# Eval("x") %>b<%# Eval("y") %></asp:Panel>"#);
            let panel = find_by_id(&doc.root, "P").unwrap();
            assert_eq!(panel.sub_builders.len(), 1);
            let dbl = child_builders(panel)[0];
            assert!(is_data_bound_literal(dbl));
            assert_eq!(dbl.static_literals(), vec!["a", "b", ""]);
            let expressions: Vec<_> = dbl.data_bound_expressions().iter().map(|e| e.trim()).collect();
            assert_eq!(expressions, vec![r#"Eval("x")"#, r#"Eval("y")"#]);
            assert_eq!(dbl.static_literals_count(), dbl.data_bound_literal_count() + 1);
        }

        #[test]
        fn should_start_with_empty_literal_after_a_control() {
            let doc = parse(r#"<asp:Label runat="server" /><%# Title %> and more"#);
            let dbl = child_builders(&doc.root)[1];
            assert_eq!(dbl.static_literals(), vec!["", " and more"]);
        }

        #[test]
        fn should_reject_bind_in_literal_content() {
            let err = parse_err(r#"<%# Bind("Name") %>"#);
            assert_eq!(err.code, ErrorCode::DataBoundLiteralsCantBind);
        }
    }

    mod tag_balance {
        use super::*;

        #[test]
        fn should_report_mismatched_end_tag() {
            let err = parse_err("<asp:Panel runat=\"server\">\n<div>\n</asp:Label>");
            assert_eq!(err.code, ErrorCode::MismatchedEndTag);
            assert_eq!(
                err.message,
                "The end tag '</asp:Label>' on line 3 does not match the open tag '<asp:Panel>' on line 1."
            );
            assert_eq!(err.line(), Some(3));
            assert_eq!(err.kind, ParseErrorKind::Structural);
        }

        #[test]
        fn should_match_end_tags_case_insensitively() {
            let doc = parse(r#"<asp:Panel runat="server" ID="P">x</ASP:PANEL>"#);
            assert!(find_by_id(&doc.root, "P").unwrap().closed);
        }

        #[test]
        fn should_report_outermost_unclosed_tag_at_eof() {
            let err = parse_err("<asp:Panel runat=\"server\">\n<asp:PlaceHolder runat=\"server\">");
            assert_eq!(err.code, ErrorCode::UnexpectedEofLookingForTag);
            assert_eq!(err.message, "Unexpected end of file looking for </asp:Panel> tag.");
            assert_eq!(err.line(), Some(1));
        }

        #[test]
        fn should_tolerate_unclosed_plain_markup() {
            let doc = parse("<div><p>text");
            assert_eq!(literal_text(&doc.root), "<div><p>text");
        }

        #[test]
        fn should_keep_unmatched_end_tag_at_root_as_literal() {
            let doc = parse("</div>tail");
            assert_eq!(literal_text(&doc.root), "</div>tail");
        }

        #[test]
        fn should_keep_nested_markup_of_inner_text_control_raw() {
            let doc = parse(r#"<asp:TextBox runat="server" ID="T"><b>bold</i></asp:TextBox>"#);
            let text_box = find_by_id(&doc.root, "T").unwrap();
            assert_eq!(text_box.simple_property("Text").unwrap().persisted_value, "<b>bold</i>");
        }
    }

    mod includes {
        use super::*;

        #[test]
        fn should_splice_included_file() {
            let options = options_with_files(&[("~/inc/header.inc", "<b>Header</b>")]);
            let doc = parse_with(options, r#"<!-- #include file="inc/header.inc" -->body"#, PAGE_PATH, DocumentKind::Page)
                .unwrap();
            assert_eq!(literal_text(&doc.root), "<b>Header</b>body");
            assert!(doc.source_dependencies.contains(&vp("~/inc/header.inc")));
        }

        #[test]
        fn should_locate_controls_in_included_file() {
            let options = options_with_files(&[(
                "~/inc/header.inc",
                "\n<asp:Label runat=\"server\" ID=\"FromInclude\" />",
            )]);
            let doc = parse_with(options, r#"<!-- #include virtual="~/inc/header.inc" -->"#, PAGE_PATH, DocumentKind::Page)
                .unwrap();
            let label = find_by_id(&doc.root, "FromInclude").unwrap();
            let location = label.location.as_ref().unwrap();
            assert_eq!(location.virtual_path, vp("~/inc/header.inc"));
            assert_eq!(location.line, 2);
        }

        #[test]
        fn should_not_take_inner_text_across_sibling_includes() {
            let options = options_with_files(&[
                ("~/open.inc", r#"<asp:TextBox runat="server" ID="T">"#),
                ("~/close.inc", "abcdefghijklmnopqrstuvwxyzabcdefghijklmnop</asp:TextBox>"),
            ]);
            let doc = parse_with(
                options,
                r#"<!-- #include file="open.inc" --><!-- #include file="close.inc" -->"#,
                PAGE_PATH,
                DocumentKind::Page,
            )
            .unwrap();
            let text_box = find_by_id(&doc.root, "T").unwrap();
            assert!(text_box.simple_property("Text").is_none());
        }

        #[test]
        fn should_reject_circular_include() {
            let options = options_with_files(&[("~/inc/a.inc", r#"<!-- #include file="a.inc" -->"#)]);
            let err = parse_with(options, r#"<!-- #include file="inc/a.inc" -->"#, PAGE_PATH, DocumentKind::Page)
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::CircularInclude);
            assert!(err.message.contains("cannot include itself"));
        }

        #[test]
        fn should_report_missing_include() {
            let err = parse_err(r#"<!-- #include file="missing.inc" -->"#);
            assert_eq!(err.code, ErrorCode::FileNotFound);
            assert_eq!(err.message, "The file '~/missing.inc' does not exist.");
        }

        #[test]
        fn should_reject_empty_file_name() {
            assert_eq!(parse_err(r#"<!-- #include file="" -->"#).code, ErrorCode::EmptyFileName);
        }

        #[test]
        fn should_reject_other_path_types() {
            let err = parse_err(r#"<!-- #include page="a.inc" -->"#);
            assert_eq!(err.code, ErrorCode::OnlyFileVirtualSupportedOnInclude);
        }
    }

    mod script_blocks {
        use super::*;

        #[test]
        fn should_collect_inline_script() {
            let doc = parse(r#"<script runat="server" language="C#">bool Less() { return 1 < 2; }</script>"#);
            assert_eq!(doc.script_blocks.len(), 1);
            let block = &doc.script_blocks[0];
            assert_eq!(block.language.as_deref(), Some("C#"));
            assert_eq!(block.content, "bool Less() { return 1 < 2; }");
            assert!(block.src.is_none());
            assert!(doc.root.sub_builders.is_empty());
        }

        #[test]
        fn should_keep_client_scripts_as_literals() {
            let doc = parse("<script>var a = 1;</script>");
            assert!(doc.script_blocks.is_empty());
            assert_eq!(literal_text(&doc.root), "<script>var a = 1;</script>");
        }

        #[test]
        fn should_read_script_source() {
            let options = options_with_files(&[("~/scripts/code.cs", "int x;")]);
            let doc = parse_with(
                options,
                r#"<script runat="server" src="scripts/code.cs" />"#,
                PAGE_PATH,
                DocumentKind::Page,
            )
            .unwrap();
            let block = &doc.script_blocks[0];
            assert_eq!(block.content, "int x;");
            assert_eq!(block.src, Some(vp("~/scripts/code.cs")));
            assert!(doc.source_dependencies.contains(&vp("~/scripts/code.cs")));
        }

        #[test]
        fn should_require_content_without_src() {
            let err = parse_err(r#"<script runat="server" />"#);
            assert_eq!(err.code, ErrorCode::ScriptTagWithoutSrcMustHaveContent);
        }

        #[test]
        fn should_reject_include_in_script() {
            let err = parse_err(r#"<script runat="server"><!-- #include file="a.inc" --></script>"#);
            assert_eq!(err.code, ErrorCode::IncludeNotAllowedInScriptTag);
        }

        #[test]
        fn should_report_unterminated_script() {
            let err = parse_err("<script runat=\"server\">void F() {}");
            assert_eq!(err.code, ErrorCode::UnexpectedEofLookingForTag);
            assert_eq!(err.message, "Unexpected end of file looking for </script> tag.");
        }
    }

    mod ids {
        use super::*;

        #[test]
        fn should_reject_duplicate_ids_ignoring_case() {
            let err = parse_err(r#"<asp:Label runat="server" ID="Name" /><asp:Label runat="server" ID="name" />"#);
            assert_eq!(err.code, ErrorCode::IdAlreadyUsed);
            assert_eq!(err.message, "The ID 'name' is already used by another control.");
        }

        #[test]
        fn should_reject_invalid_identifier() {
            let err = parse_err(r#"<asp:Label runat="server" ID="1st" />"#);
            assert_eq!(err.code, ErrorCode::InvalidIdentifier);
        }

        #[test]
        fn should_scope_ids_per_repeated_template() {
            let doc = parse(
                r#"<asp:Label runat="server" ID="Name" />
<asp:Repeater runat="server" ID="Items">
  <ItemTemplate><asp:Label runat="server" ID="Name" /></ItemTemplate>
</asp:Repeater>"#,
            );
            let repeater = find_by_id(&doc.root, "Items").unwrap();
            let template = repeater.template_property("ItemTemplate").unwrap();
            assert_eq!(child_builders(&template.builder)[0].id.as_deref(), Some("Name"));
        }

        #[test]
        fn should_share_scope_with_single_instance_template() {
            let err = parse_err(
                r#"<asp:Label runat="server" ID="Name" />
<asp:GridView runat="server" ID="Grid">
  <EmptyDataTemplate><asp:Label runat="server" ID="Name" /></EmptyDataTemplate>
</asp:GridView>"#,
            );
            assert_eq!(err.code, ErrorCode::IdAlreadyUsed);
            assert_eq!(err.line(), Some(3));
        }

        #[test]
        fn should_generate_ids_for_cached_controls() {
            let registry = webforms_compiler::TypeRegistry::with_builtins(["Acme.Ticker^System.Web.UI.Control{cached}|"])
                .unwrap();
            let config = ParserConfig::default().with_tag_prefix(webforms_compiler::config::TagPrefixConfig {
                tag_prefix: "acme".to_string(),
                namespace: Some("Acme".to_string()),
                assembly: None,
                tag_name: None,
                src: None,
            });
            let options = options_with_config(config).with_registry(std::sync::Arc::new(registry));
            let doc = parse_with(
                options,
                r#"<asp:Label runat="server" /><acme:Ticker runat="server" />"#,
                PAGE_PATH,
                DocumentKind::Page,
            )
            .unwrap();
            let ticker = child_builders(&doc.root)[1];
            assert_eq!(ticker.id.as_deref(), Some("_ctrl_2"));
        }
    }

    mod error_collection {
        use super::*;

        #[test]
        fn should_collect_every_error_in_order() {
            let options = options_with_config(ParserConfig::default().with_collect_errors(true));
            let err = parse_with(
                options,
                "<asp:Label runat=\"server\" ID=\"A\" /><asp:Label runat=\"server\" ID=\"A\" />\n<asp:Nope runat=\"server\" />",
                PAGE_PATH,
                DocumentKind::Page,
            )
            .unwrap_err();
            let codes: Vec<_> = err.all().map(|e| e.code).collect();
            assert_eq!(codes, vec![ErrorCode::IdAlreadyUsed, ErrorCode::UnknownServerTag]);
            assert_eq!(err.additional_errors[0].line(), Some(2));
        }

        #[test]
        fn should_stop_at_first_error_by_default() {
            let err = parse_err("<asp:Nope runat=\"server\" /><asp:Nope2 runat=\"server\" />");
            assert_eq!(err.code, ErrorCode::UnknownServerTag);
            assert!(err.additional_errors.is_empty());
        }

        #[test]
        fn should_keep_parsing_body_of_failed_tag() {
            let options = options_with_config(ParserConfig::default().with_collect_errors(true));
            let err = parse_with(
                options,
                "<asp:Nope runat=\"server\"><asp:Label runat=\"server\" ID=\"x y\" /></asp:Nope>\n<%= %>",
                PAGE_PATH,
                DocumentKind::Page,
            )
            .unwrap_err();
            let codes: Vec<_> = err.all().map(|e| e.code).collect();
            assert_eq!(codes, vec![ErrorCode::UnknownServerTag, ErrorCode::EmptyExpression]);
        }

        #[test]
        fn should_format_error_with_location_and_code() {
            let err = parse_err("\n  <asp:Nope runat=\"server\" />");
            assert_eq!(err.to_string(), "~/default.aspx(2,3): Unknown server tag 'asp:Nope'. (WF2001)");
        }
    }

    mod files {
        use super::*;

        #[test]
        fn should_parse_file_by_extension() {
            let options = options_with_files(&[("~/pages/about.aspx", r#"<%@ Page Title="About" %>hi"#)]);
            let doc = TemplateParser::new(options).parse_file(&vp("~/pages/about.aspx")).unwrap();
            assert_eq!(doc.kind, DocumentKind::Page);
            assert_eq!(doc.root.simple_property("Title").unwrap().persisted_value, "About");
            assert_eq!(literal_text(&doc.root), "hi");
        }

        #[test]
        fn should_reject_unknown_extension() {
            let err = TemplateParser::new(ParserOptions::default())
                .parse_file(&vp("~/readme.txt"))
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidVirtualPath);
        }

        #[test]
        fn should_report_missing_file() {
            let err = TemplateParser::new(ParserOptions::default())
                .parse_file(&vp("~/missing.ascx"))
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::FileNotFound);
        }

        #[test]
        fn should_reuse_parser_for_several_documents() {
            let mut parser = TemplateParser::new(ParserOptions::default());
            let first = parser.parse("<asp:Label runat=\"server\" ID=\"A\" />", &vp("~/a.aspx"), DocumentKind::Page);
            let second = parser.parse("<asp:Label runat=\"server\" ID=\"A\" />", &vp("~/b.aspx"), DocumentKind::Page);
            assert!(first.is_ok());
            assert!(second.is_ok());
        }
    }
}
