/**
 * Build Object Tests
 *
 * Materialising a parsed tree into live objects without compiling it:
 * property application, literal controls, databinding records, evaluated
 * expressions, collections and template instantiation.
 */

#[path = "../util/mod.rs"]
mod util;

#[cfg(test)]
mod build_object_tests {
    use super::util::*;
    use indexmap::IndexMap;
    use webforms_compiler::builder::{current_template_control, LiveValue, TemplateNode};
    use webforms_compiler::parser::DocumentKind;
    use webforms_compiler::schema::PropertyValue;
    use webforms_compiler::{
        ErrorCode, ExpressionBuilderRegistry, LiveObject, ObjectBuildContext, ParseError, ParsedDocument,
        ParserConfig, TypeRegistry,
    };

    const NEVER: &str = r#"<%@ Page CompilationMode="Never" %>"#;

    fn build_with(doc: &ParsedDocument, config: &ParserConfig, compiled_templates: bool) -> Result<LiveObject, ParseError> {
        let registry = TypeRegistry::builtin();
        let expressions = ExpressionBuilderRegistry::standard();
        let mut ctx = ObjectBuildContext::new(&registry, config, &expressions, &doc.virtual_path);
        ctx.compiled_templates = compiled_templates;
        doc.build_object(&ctx)
    }

    fn build(doc: &ParsedDocument) -> LiveObject {
        build_with(doc, &ParserConfig::default(), false).unwrap()
    }

    fn parse_configured(config: &ParserConfig, text: &str) -> ParsedDocument {
        parse_with(options_with_config(config.clone()), text, PAGE_PATH, DocumentKind::Page).unwrap()
    }

    fn string(value: &str) -> PropertyValue {
        PropertyValue::String(value.to_string())
    }

    mod properties {
        use super::*;

        #[test]
        fn should_type_the_root_as_the_base_type() {
            let page = build(&parse(&format!("{}hello", NEVER)));
            assert_eq!(page.type_name, "System.Web.UI.Page");
            assert_eq!(page.children.len(), 1);
            assert_eq!(page.children[0].type_name, "System.Web.UI.LiteralControl");
            assert_eq!(page.children[0].value("Text"), Some(&string("hello")));
        }

        #[test]
        fn should_apply_simple_and_sub_properties() {
            let doc = parse(&format!(
                r#"{}<asp:Label runat="server" ID="Title" Text="Hi" Font-Bold="true" Width="40" />"#,
                NEVER
            ));
            let page = build(&doc);
            let label = page.find_control("title").unwrap();
            assert_eq!(label.type_name, "System.Web.UI.WebControls.Label");
            assert_eq!(label.id.as_deref(), Some("Title"));
            assert_eq!(label.value("ID"), Some(&string("Title")));
            assert_eq!(label.value("Text"), Some(&string("Hi")));
            assert_eq!(label.value("Font.Bold"), Some(&PropertyValue::Bool(true)));
            match label.get("Font") {
                Some(LiveValue::Object(font)) => assert_eq!(font.type_name, "System.Web.UI.WebControls.FontInfo"),
                other => panic!("unexpected {:?}", other),
            }
            assert_eq!(
                label.value("Width"),
                Some(&PropertyValue::Unit { value: 40.0, unit: "px".to_string() })
            );
        }

        #[test]
        fn should_route_unknown_attributes_to_accessor() {
            let page = build(&parse(r#"<asp:Label runat="server" ID="L" data-role="banner" Style="color: red" />"#));
            let label = page.find_control("L").unwrap();
            assert_eq!(label.attributes.get("data-role").map(String::as_str), Some("banner"));
            assert_eq!(label.attributes.get("Style").map(String::as_str), Some("color: red"));
            assert!(label.get("data-role").is_none());
        }

        #[test]
        fn should_record_tag_name_of_generic_html_controls() {
            let page = build(&parse(r#"<div runat="server" id="Box">x</div>"#));
            let div = page.find_control("Box").unwrap();
            assert_eq!(div.type_name, "System.Web.UI.HtmlControls.HtmlGenericControl");
            assert_eq!(div.value("TagName"), Some(&string("div")));
            assert_eq!(div.children[0].value("Text"), Some(&string("x")));
        }

        #[test]
        fn should_record_event_hookups() {
            let page = build(&parse(r#"<asp:Button runat="server" ID="Go" OnClick="Go_Click" />"#));
            let button = page.find_control("Go").unwrap();
            assert_eq!(button.events.get("Click").map(String::as_str), Some("Go_Click"));
        }

        #[test]
        fn should_build_complex_properties() {
            let page = build(&parse(
                r#"<asp:GridView runat="server" ID="G"><HeaderStyle BackColor="Red" HorizontalAlign="center" /></asp:GridView>"#,
            ));
            let grid = page.find_control("G").unwrap();
            match grid.get("HeaderStyle") {
                Some(LiveValue::Object(style)) => {
                    assert_eq!(style.type_name, "System.Web.UI.WebControls.TableItemStyle")
                }
                other => panic!("unexpected {:?}", other),
            }
            assert_eq!(grid.value("HeaderStyle.BackColor"), Some(&PropertyValue::Color("Red".into())));
            assert_eq!(
                grid.value("HeaderStyle.HorizontalAlign"),
                Some(&PropertyValue::Enum("Center".into()))
            );
        }

        #[test]
        fn should_build_collection_items() {
            let page = build(&parse(
                r#"<asp:ListBox runat="server" ID="LB"><asp:ListItem Value="1">One</asp:ListItem><asp:ListItem>Two</asp:ListItem></asp:ListBox>"#,
            ));
            let list = page.find_control("LB").unwrap();
            let Some(LiveValue::Collection(items)) = list.get("Items") else {
                panic!("Items is not a collection");
            };
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].type_name, "System.Web.UI.WebControls.ListItem");
            assert_eq!(items[0].value("Text"), Some(&string("One")));
            assert_eq!(items[0].value("Value"), Some(&string("1")));
            assert_eq!(items[1].value("Text"), Some(&string("Two")));
        }
    }

    mod children {
        use super::*;

        #[test]
        fn should_interleave_literals_and_controls() {
            let page = build(&parse(r#"<p>Hello</p><asp:Label runat="server" ID="L" />tail"#));
            let types: Vec<_> = page.children.iter().map(|c| c.type_name.as_str()).collect();
            assert_eq!(
                types,
                vec![
                    "System.Web.UI.LiteralControl",
                    "System.Web.UI.WebControls.Label",
                    "System.Web.UI.LiteralControl"
                ]
            );
            assert_eq!(page.children[0].value("Text"), Some(&string("<p>Hello</p>")));
            assert_eq!(page.children[2].value("Text"), Some(&string("tail")));
        }

        #[test]
        fn should_skip_code_blocks() {
            let page = build(&parse(r#"<asp:Panel runat="server" ID="P"><% Go(); %></asp:Panel>"#));
            assert!(page.find_control("P").unwrap().children.is_empty());
        }

        #[test]
        fn should_build_data_bound_literals() {
            let page = build(&parse(r#"<asp:Panel runat="server" ID="P">a<%# Eval("x") %>b</asp:Panel>"#));
            let panel = page.find_control("P").unwrap();
            assert_eq!(panel.children.len(), 1);
            let literal = &panel.children[0];
            assert_eq!(literal.type_name, "System.Web.UI.DataBoundLiteralControl");
            match literal.get("StaticLiterals") {
                Some(LiveValue::Strings(parts)) => assert_eq!(parts, &vec!["a".to_string(), "b".to_string()]),
                other => panic!("unexpected {:?}", other),
            }
            assert_eq!(literal.data_bindings.len(), 1);
            assert_eq!(literal.data_bindings[0].expression, r#"Eval("x")"#);
        }

        #[test]
        fn should_record_property_bindings() {
            let page = build(&parse(&format!(
                r#"{}<asp:Label runat="server" ID="L" Text='<%# Eval("Name") %>' />"#,
                NEVER
            )));
            let label = page.find_control("L").unwrap();
            assert!(label.get("Text").is_none());
            assert_eq!(label.data_bindings.len(), 1);
            assert_eq!(label.data_bindings[0].property, "Text");
            assert_eq!(label.data_bindings[0].expression, r#"Eval("Name")"#);
            assert!(!label.data_bindings[0].two_way);
        }

        #[test]
        fn should_record_two_way_bindings() {
            let page = build(&parse(r#"<asp:TextBox runat="server" ID="T" Text='<%# Bind("Name", "{0:N}") %>' />"#));
            let binding = &page.find_control("T").unwrap().data_bindings[0];
            assert!(binding.two_way);
            assert_eq!(binding.field_name.as_deref(), Some("Name"));
            assert_eq!(binding.format_string.as_deref(), Some("{0:N}"));
        }
    }

    mod expressions {
        use super::*;

        #[test]
        fn should_evaluate_app_settings() {
            let config = ParserConfig::default()
                .with_app_setting("Greeting", "Hello")
                .with_app_setting("LabelWidth", "200");
            let doc = parse_configured(
                &config,
                &format!(
                    r#"{}<asp:Label runat="server" ID="L" Text="<%$ AppSettings: greeting %>" Width="<%$ AppSettings: LabelWidth %>" />"#,
                    NEVER
                ),
            );
            let page = build_with(&doc, &config, false).unwrap();
            let label = page.find_control("L").unwrap();
            assert_eq!(label.value("Text"), Some(&string("Hello")));
            assert_eq!(
                label.value("Width"),
                Some(&PropertyValue::Unit { value: 200.0, unit: "px".to_string() })
            );
        }

        #[test]
        fn should_fail_on_missing_settings() {
            let config = ParserConfig::default();
            let doc = parse_configured(&config, r#"<asp:Label runat="server" Text="<%$ AppSettings: Missing %>" />"#);
            let err = build_with(&doc, &config, false).unwrap_err();
            assert_eq!(err.code, ErrorCode::ExpressionValueNotFound);
            assert_eq!(err.message, "The application setting 'Missing' was not found.");
        }

        #[test]
        fn should_evaluate_connection_strings() {
            let mut config = ParserConfig::default();
            config.connection_strings.insert("Main".to_string(), "Server=db;Database=shop".to_string());
            config.connection_strings.insert("Main.ProviderName".to_string(), "System.Data.SqlClient".to_string());
            let doc = parse_configured(
                &config,
                r#"<asp:Label runat="server" ID="L" Text="<%$ ConnectionStrings: Main %>" ToolTip="<%$ ConnectionStrings: Main.ProviderName %>" />"#,
            );
            let page = build_with(&doc, &config, false).unwrap();
            let label = page.find_control("L").unwrap();
            assert_eq!(label.value("Text"), Some(&string("Server=db;Database=shop")));
            assert_eq!(label.value("ToolTip"), Some(&string("System.Data.SqlClient")));
        }

        #[test]
        fn should_evaluate_global_resources() {
            let mut config = ParserConfig::default();
            let mut strings = IndexMap::new();
            strings.insert("Title".to_string(), "Welcome".to_string());
            config.resources.insert("Strings".to_string(), strings);
            let doc = parse_configured(&config, r#"<asp:Label runat="server" ID="L" Text="<%$ Resources: strings, title %>" />"#);
            let page = build_with(&doc, &config, false).unwrap();
            assert_eq!(page.find_control("L").unwrap().value("Text"), Some(&string("Welcome")));
        }

        #[test]
        fn should_evaluate_implicit_resources() {
            let mut config = ParserConfig::default();
            let mut local = IndexMap::new();
            local.insert("Greet.Text".to_string(), "Hello".to_string());
            local.insert("Greet.Font.Italic".to_string(), "true".to_string());
            config.local_resources.insert(PAGE_PATH.to_string(), local);
            let doc = parse_configured(&config, r#"<asp:Label runat="server" ID="L" meta:resourcekey="Greet" />"#);
            let page = build_with(&doc, &config, false).unwrap();
            let label = page.find_control("L").unwrap();
            assert_eq!(label.value("Text"), Some(&string("Hello")));
            assert_eq!(label.value("Font.Italic"), Some(&PropertyValue::Bool(true)));
        }

        #[test]
        fn should_refuse_expressions_that_need_compilation() {
            let config = ParserConfig::default();
            let doc = parse_configured(
                &config,
                r#"<asp:HyperLink runat="server" NavigateUrl="<%$ RouteUrl: RouteName=Products, id=5 %>" />"#,
            );
            let err = build_with(&doc, &config, false).unwrap_err();
            assert_eq!(err.code, ErrorCode::CannotEvaluateExpression);
        }

        #[test]
        fn should_reject_unevaluable_prefixes_when_never_compiled() {
            let err = parse_err(&format!(
                r#"{}<asp:HyperLink runat="server" NavigateUrl="<%$ RouteUrl: RouteName=Products %>" />"#,
                NEVER
            ));
            assert_eq!(err.code, ErrorCode::CannotEvaluateExpression);
        }
    }

    mod templates {
        use super::*;

        const REPEATER: &str = r#"<asp:Repeater runat="server" ID="R"><ItemTemplate><asp:Label runat="server" ID="Name" /></ItemTemplate></asp:Repeater>"#;

        #[test]
        fn should_keep_live_templates() {
            let doc = parse(REPEATER);
            let page = build(&doc);
            let repeater = page.find_control("R").unwrap();
            let Some(LiveValue::Template(template)) = repeater.get("ItemTemplate") else {
                panic!("ItemTemplate is not a template");
            };
            assert!(matches!(template, TemplateNode::Live(_)));
            assert!(page.find_control("Name").is_none());
        }

        #[test]
        fn should_instantiate_live_templates_repeatedly() {
            let doc = parse(REPEATER);
            let page = build(&doc);
            let Some(LiveValue::Template(template)) = page.find_control("R").unwrap().get("ItemTemplate") else {
                panic!("ItemTemplate is not a template");
            };

            let config = ParserConfig::default();
            let registry = TypeRegistry::builtin();
            let expressions = ExpressionBuilderRegistry::standard();
            let ctx = ObjectBuildContext::new(&registry, &config, &expressions, &doc.virtual_path);
            for _ in 0..2 {
                let mut item = LiveObject::new("System.Web.UI.WebControls.RepeaterItem");
                template.instantiate_in(&mut item, &ctx).unwrap();
                assert_eq!(item.children.len(), 1);
                assert_eq!(item.find_control("Name").unwrap().type_name, "System.Web.UI.WebControls.Label");
            }
            assert!(current_template_control().is_none());
        }

        #[test]
        fn should_reference_compiled_templates() {
            let doc = parse(REPEATER);
            let page = build_with(&doc, &ParserConfig::default(), true).unwrap();
            let Some(LiveValue::Template(template)) = page.find_control("R").unwrap().get("ItemTemplate") else {
                panic!("ItemTemplate is not a template");
            };
            match template {
                TemplateNode::Compiled { template_id } => assert_eq!(template_id, "~/default.aspx#R.ItemTemplate"),
                other => panic!("unexpected {:?}", other),
            }

            let config = ParserConfig::default();
            let registry = TypeRegistry::builtin();
            let expressions = ExpressionBuilderRegistry::standard();
            let ctx = ObjectBuildContext::new(&registry, &config, &expressions, &doc.virtual_path);
            let mut item = LiveObject::new("System.Web.UI.WebControls.RepeaterItem");
            let err = template.instantiate_in(&mut item, &ctx).unwrap_err();
            assert_eq!(err.code, ErrorCode::TemplateNotInstantiable);
        }

        #[test]
        fn should_resolve_local_resources_against_the_owning_control() {
            let widget_path = "~/controls/widget.ascx";
            let mut config = ParserConfig::default();
            let mut local = IndexMap::new();
            local.insert("Caption".to_string(), "Widget caption".to_string());
            config.local_resources.insert(widget_path.to_string(), local);

            let doc = parse_with(
                options_with_config(config.clone()),
                r#"<asp:Repeater runat="server" ID="R"><ItemTemplate><asp:Label runat="server" ID="C" Text="<%$ Resources: Caption %>" /></ItemTemplate></asp:Repeater>"#,
                widget_path,
                DocumentKind::UserControl,
            )
            .unwrap();
            let widget = build_with(&doc, &config, false).unwrap();
            let Some(LiveValue::Template(template)) = widget.find_control("R").unwrap().get("ItemTemplate") else {
                panic!("ItemTemplate is not a template");
            };

            // instantiated while building the hosting page
            let host = vp(PAGE_PATH);
            let registry = TypeRegistry::builtin();
            let expressions = ExpressionBuilderRegistry::standard();
            let ctx = ObjectBuildContext::new(&registry, &config, &expressions, &host);
            let mut item = LiveObject::new("System.Web.UI.WebControls.RepeaterItem");
            template.instantiate_in(&mut item, &ctx).unwrap();
            assert_eq!(item.find_control("C").unwrap().value("Text"), Some(&string("Widget caption")));
            assert!(current_template_control().is_none());
        }
    }
}
