/**
 * Property Binding Tests
 *
 * How attributes and nested elements of a server control resolve to entries
 * on its builder: converted simple properties, sub-properties, attribute
 * accessor fallbacks, events, device filters, databinding and expression
 * entries, implicit resources and property elements.
 */

#[path = "../util/mod.rs"]
mod util;

#[cfg(test)]
mod property_binding_tests {
    use super::util::*;
    use indexmap::IndexMap;
    use std::sync::Arc;
    use webforms_compiler::builder::PropertyEntryRef;
    use webforms_compiler::config::TagPrefixConfig;
    use webforms_compiler::parser::DocumentKind;
    use webforms_compiler::schema::PropertyValue;
    use webforms_compiler::{ControlBuilder, ErrorCode, ParserConfig, TypeRegistry};

    fn control<'d>(doc: &'d webforms_compiler::ParsedDocument) -> &'d ControlBuilder {
        child_builders(&doc.root)[0]
    }

    fn acme_options(schema: &'static str) -> webforms_compiler::ParserOptions {
        let registry = TypeRegistry::with_builtins([schema]).unwrap();
        let config = ParserConfig::default().with_tag_prefix(TagPrefixConfig {
            tag_prefix: "acme".to_string(),
            namespace: Some("Acme".to_string()),
            assembly: None,
            tag_name: None,
            src: None,
        });
        options_with_config(config).with_registry(Arc::new(registry))
    }

    mod simple_properties {
        use super::*;

        #[test]
        fn should_convert_units_and_colors() {
            let doc = parse(r##"<asp:Label runat="server" Width="100" Height="2.5em" BackColor="#f00" ForeColor="navy" />"##);
            let label = control(&doc);
            assert_eq!(
                label.simple_property("Width").unwrap().value,
                PropertyValue::Unit { value: 100.0, unit: "px".to_string() }
            );
            assert_eq!(
                label.simple_property("Height").unwrap().value,
                PropertyValue::Unit { value: 2.5, unit: "em".to_string() }
            );
            assert_eq!(label.simple_property("BackColor").unwrap().value, PropertyValue::Color("#FF0000".into()));
            assert_eq!(label.simple_property("ForeColor").unwrap().value, PropertyValue::Color("Navy".into()));
            assert_eq!(label.simple_property("BackColor").unwrap().persisted_value, "#f00");
        }

        #[test]
        fn should_canonicalize_enum_values() {
            let doc = parse(r#"<asp:TextBox runat="server" TextMode="password" />"#);
            assert_eq!(
                control(&doc).simple_property("TextMode").unwrap().value,
                PropertyValue::Enum("Password".into())
            );
        }

        #[test]
        fn should_join_flags_enum_values() {
            let doc = parse(r#"<asp:TreeView runat="server" ShowCheckBoxes="root,leaf" />"#);
            assert_eq!(
                control(&doc).simple_property("ShowCheckBoxes").unwrap().value,
                PropertyValue::Enum("Root, Leaf".into())
            );
        }

        #[test]
        fn should_treat_empty_boolean_as_true() {
            let doc = parse(r#"<asp:CheckBox runat="server" Checked="" AutoPostBack="False" />"#);
            let check = control(&doc);
            assert_eq!(check.simple_property("Checked").unwrap().value, PropertyValue::Bool(true));
            assert_eq!(check.simple_property("AutoPostBack").unwrap().value, PropertyValue::Bool(false));
        }

        #[test]
        fn should_match_names_case_insensitively() {
            let doc = parse(r#"<asp:Label runat="server" text="hi" />"#);
            let entry = control(&doc).simple_property("Text").unwrap();
            assert_eq!(entry.header.name, "Text");
            assert_eq!(entry.header.declaring_type.as_deref(), Some("System.Web.UI.WebControls.Label"));
            assert_eq!(entry.header.member_type.as_deref(), Some("System.String"));
        }

        #[test]
        fn should_reject_unconvertible_values() {
            let err = parse_err(r#"<asp:Label runat="server" Width="wide" />"#);
            assert_eq!(err.code, ErrorCode::InvalidPropertyValue);
            assert_eq!(
                err.message,
                "Cannot create an object of type 'System.Web.UI.WebControls.Unit' from its string representation 'wide' for the 'Width' property."
            );
        }

        #[test]
        fn should_reject_unknown_enum_members() {
            let err = parse_err(r#"<asp:TextBox runat="server" TextMode="secret" />"#);
            assert_eq!(err.code, ErrorCode::InvalidEnumValue);
        }

        #[test]
        fn should_locate_attribute_errors() {
            let err = parse_err("<asp:Label runat=\"server\"\n    Width=\"wide\" />");
            assert_eq!(err.line(), Some(2));
        }
    }

    mod sub_properties {
        use super::*;

        #[test]
        fn should_walk_dashed_names() {
            let doc = parse(r#"<asp:Label runat="server" Font-Bold="true" font-size="small" />"#);
            let label = control(&doc);
            let bold = label.simple_property("Font.Bold").unwrap();
            assert_eq!(bold.value, PropertyValue::Bool(true));
            assert_eq!(bold.header.declaring_type.as_deref(), Some("System.Web.UI.WebControls.FontInfo"));
            assert!(!bold.header.read_only);
            assert_eq!(
                label.simple_property("Font.Size").unwrap().value,
                PropertyValue::FontUnit("Small".into())
            );
        }

        #[test]
        fn should_reject_non_cls_compliant_types() {
            let options = acme_options("Acme.Counter^System.Web.UI.Control|Count:UInt32");
            let err = parse_with(options, r#"<acme:Counter runat="server" Count="3" />"#, PAGE_PATH, DocumentKind::Page)
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::PropertyNotClsCompliant);
        }
    }

    mod attribute_accessor {
        use super::*;

        #[test]
        fn should_pass_unknown_attributes_through() {
            let doc = parse(r#"<asp:Label runat="server" data-role="banner" />"#);
            let entry = control(&doc).simple_property("data-role").unwrap();
            assert!(entry.use_set_attribute);
            assert_eq!(entry.value, PropertyValue::String("banner".into()));
            assert!(entry.header.declaring_type.is_none());
        }

        #[test]
        fn should_pass_read_only_properties_through() {
            let doc = parse(r#"<asp:Label runat="server" Style="color: red" />"#);
            let entry = control(&doc).simple_property("Style").unwrap();
            assert!(entry.use_set_attribute);
            assert_eq!(entry.persisted_value, "color: red");
        }

        #[test]
        fn should_reject_unknown_attributes_without_accessor() {
            let err = parse_err(r#"<asp:Repeater runat="server" Colour="red"></asp:Repeater>"#);
            assert_eq!(err.code, ErrorCode::TypeDoesntHaveProperty);
            assert_eq!(
                err.message,
                "Type 'System.Web.UI.WebControls.Repeater' does not have a public property named 'Colour'."
            );
        }

        #[test]
        fn should_reject_read_only_properties_without_accessor() {
            let options = acme_options("Acme.Meter^System.Web.UI.Control|=Reading:Int32");
            let err = parse_with(options, r#"<acme:Meter runat="server" Reading="3" />"#, PAGE_PATH, DocumentKind::Page)
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::PropertyReadOnly);
            assert_eq!(err.message, "The 'Reading' property of 'Acme.Meter' is read-only and cannot be set.");
        }
    }

    mod events {
        use super::*;

        #[test]
        fn should_hook_up_events() {
            let doc = parse(r#"<asp:Button runat="server" ID="Go" OnClick="Go_Click" onCommand=" Go_Command " />"#);
            let button = control(&doc);
            assert_eq!(button.events.len(), 2);
            assert_eq!(button.events[0].name, "Click");
            assert_eq!(button.events[0].handler_method_name, "Go_Click");
            assert_eq!(button.events[1].name, "Command");
            assert_eq!(button.events[1].handler_method_name, "Go_Command");
            assert!(button.simple_property("OnClick").is_none());
        }

        #[test]
        fn should_hook_up_inherited_events() {
            let doc = parse(r#"<asp:Label runat="server" OnLoad="Label_Load" />"#);
            assert_eq!(control(&doc).events[0].name, "Load");
        }

        #[test]
        fn should_reject_empty_handlers() {
            let err = parse_err(r#"<asp:Button runat="server" OnClick=" " />"#);
            assert_eq!(err.code, ErrorCode::EventHandlerCantBeEmpty);
        }

        #[test]
        fn should_reject_filtered_events() {
            let err = parse_err(r#"<asp:Button runat="server" ie:OnClick="Go" />"#);
            assert_eq!(err.code, ErrorCode::EventsCantBeFiltered);
        }
    }

    mod device_filters {
        use super::*;

        #[test]
        fn should_keep_filtered_values_apart() {
            let doc = parse(r#"<asp:Label runat="server" Text="plain" ie:Text="for ie" />"#);
            let label = control(&doc);
            assert_eq!(label.simple_properties.len(), 2);
            assert_eq!(label.simple_property("Text").unwrap().persisted_value, "plain");
            let persist = label.persist_data();
            match persist.get_filtered("IE", "text") {
                Some(PropertyEntryRef::Simple(entry)) => {
                    assert_eq!(entry.persisted_value, "for ie");
                    assert_eq!(entry.header.filter, "ie");
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn should_reject_unknown_filters() {
            let err = parse_err(r#"<asp:Label runat="server" zune:Text="x" />"#);
            assert_eq!(err.code, ErrorCode::InvalidDeviceFilter);
            assert_eq!(err.message, "The device filter 'zune' is not defined.");
        }

        #[test]
        fn should_reject_duplicate_attributes() {
            let err = parse_err(r#"<asp:Label runat="server" Text="a" TEXT="b" />"#);
            assert_eq!(err.code, ErrorCode::DuplicateAttribute);
        }

        #[test]
        fn should_reject_filtered_ids() {
            let err = parse_err(r#"<asp:Label runat="server" ie:ID="L" />"#);
            assert_eq!(err.code, ErrorCode::IdMustUseAttribute);
        }
    }

    mod databinding {
        use super::*;

        #[test]
        fn should_record_eval_bindings() {
            let doc = parse(r#"<asp:Label runat="server" ID="L" Text='<%# Eval("Name") %>' />"#);
            let entry = control(&doc).bound_property("Text").unwrap();
            assert!(entry.is_databinding());
            assert_eq!(entry.expression.trim(), r#"Eval("Name")"#);
            assert!(!entry.two_way_bound);
            assert!(!entry.encoded);
            assert_eq!(entry.control_id.as_deref(), Some("L"));
            assert_eq!(entry.header.member_type.as_deref(), Some("System.String"));
            assert!(control(&doc).simple_property("Text").is_none());
        }

        #[test]
        fn should_record_encoded_bindings() {
            let doc = parse(r#"<asp:Label runat="server" Text='<%#: Eval("Name") %>' />"#);
            assert!(control(&doc).bound_property("Text").unwrap().encoded);
        }

        #[test]
        fn should_extract_bind_field_and_format() {
            let doc = parse(r#"<asp:TextBox runat="server" ID="T" Text='<%# Bind("Date", "{0:d}") %>' />"#);
            let entry = control(&doc).bound_property("Text").unwrap();
            assert!(entry.two_way_bound);
            assert_eq!(entry.field_name.as_deref(), Some("Date"));
            assert_eq!(entry.format_string.as_deref(), Some("{0:d}"));
            assert_eq!(entry.control_id.as_deref(), Some("T"));
        }

        #[test]
        fn should_extract_bind_item_field() {
            let doc = parse(r#"<asp:TextBox runat="server" ID="T" Text="<%# BindItem.Title %>" />"#);
            let entry = control(&doc).bound_property("Text").unwrap();
            assert!(entry.two_way_bound);
            assert_eq!(entry.field_name.as_deref(), Some("Title"));
            assert!(entry.format_string.is_none());
        }

        #[test]
        fn should_require_id_for_two_way_binding() {
            let err = parse_err(r#"<asp:TextBox runat="server" Text='<%# Bind("Name") %>' />"#);
            assert_eq!(err.code, ErrorCode::TwoWayBindingRequiresId);
        }

        #[test]
        fn should_require_a_property_for_two_way_binding() {
            let err = parse_err(r#"<asp:TextBox runat="server" ID="T" data-x='<%# Bind("Name") %>' />"#);
            assert_eq!(err.code, ErrorCode::TwoWayBindingNonProperty);
        }

        #[test]
        fn should_reject_badly_formatted_bind() {
            let err = parse_err(r#"<asp:TextBox runat="server" ID="T" Text="<%# Bind(Name) %>" />"#);
            assert_eq!(err.code, ErrorCode::BadlyFormattedBind);
        }

        #[test]
        fn should_reject_empty_expressions() {
            let err = parse_err(r#"<asp:Label runat="server" Text="<%# %>" />"#);
            assert_eq!(err.code, ErrorCode::EmptyExpression);
        }

        #[test]
        fn should_require_databinding_event() {
            let err = parse_err(
                r#"<asp:ListBox runat="server"><asp:ListItem Text="<%# Name %>" /></asp:ListBox>"#,
            );
            assert_eq!(err.code, ErrorCode::DatabindingRequiresEvent);
            assert!(err.message.ends_with("System.Web.UI.WebControls.ListItem does not have a DataBinding event."));
        }

        #[test]
        fn should_bind_unknown_attributes_through_accessor() {
            let doc = parse(r#"<asp:Label runat="server" data-id='<%# Eval("Id") %>' />"#);
            let entry = control(&doc).bound_property("data-id").unwrap();
            assert!(entry.use_set_attribute);
            assert!(entry.header.member_type.is_none());
        }
    }

    mod expressions {
        use super::*;

        #[test]
        fn should_parse_app_settings_expressions() {
            let doc = parse(r#"<asp:Label runat="server" Text="<%$ AppSettings: Greeting %>" />"#);
            let entry = control(&doc).bound_property("Text").unwrap();
            assert!(!entry.is_databinding());
            assert_eq!(entry.expression_prefix, "AppSettings");
            assert_eq!(entry.expression, "Greeting");
            assert_eq!(entry.parsed_expression_data, Some(serde_json::json!({ "key": "Greeting" })));
        }

        #[test]
        fn should_match_prefixes_case_insensitively() {
            let doc = parse(r#"<asp:Label runat="server" Text="<%$ resources: Strings, Title %>" />"#);
            let entry = control(&doc).bound_property("Text").unwrap();
            assert_eq!(entry.expression_prefix, "Resources");
            assert_eq!(
                entry.parsed_expression_data,
                Some(serde_json::json!({ "classKey": "Strings", "resourceKey": "Title" }))
            );
        }

        #[test]
        fn should_reject_unknown_prefixes() {
            let err = parse_err(r#"<asp:Label runat="server" Text="<%$ Weather: Today %>" />"#);
            assert_eq!(err.code, ErrorCode::UnknownExpressionPrefix);
            assert!(err.message.starts_with("The expression prefix 'Weather' was not recognized."));
        }

        #[test]
        fn should_require_a_prefix() {
            let err = parse_err(r#"<asp:Label runat="server" Text="<%$ Greeting %>" />"#);
            assert_eq!(err.code, ErrorCode::MissingExpressionPrefix);
        }

        #[test]
        fn should_require_a_value() {
            let err = parse_err(r#"<asp:Label runat="server" Text="<%$ AppSettings: %>" />"#);
            assert_eq!(err.code, ErrorCode::MissingExpressionValue);
        }

        #[test]
        fn should_reject_malformed_resource_expressions() {
            let err = parse_err(r#"<asp:Label runat="server" Text="<%$ Resources: a, b, c %>" />"#);
            assert_eq!(err.code, ErrorCode::InvalidResourceKey);
        }
    }

    mod implicit_resources {
        use super::*;

        fn localized_options() -> webforms_compiler::ParserOptions {
            let mut resources = IndexMap::new();
            resources.insert("Greet.Text".to_string(), "Hello".to_string());
            resources.insert("Greet.ToolTip".to_string(), "Says hello".to_string());
            resources.insert("Greet.Font.Bold".to_string(), "true".to_string());
            resources.insert("Other.Text".to_string(), "unused".to_string());
            let mut config = ParserConfig::default();
            config.local_resources.insert(PAGE_PATH.to_string(), resources);
            options_with_config(config)
        }

        fn parse_localized(text: &str) -> webforms_compiler::ParsedDocument {
            parse_with(localized_options(), text, PAGE_PATH, DocumentKind::Page).unwrap()
        }

        #[test]
        fn should_generate_resource_entries() {
            let doc = parse_localized(r#"<asp:Label runat="server" meta:resourcekey="Greet" />"#);
            let label = control(&doc);
            assert_eq!(label.resource_key.as_deref(), Some("Greet"));
            let names: Vec<_> = label.bound_properties.iter().map(|e| e.header.name.as_str()).collect();
            assert_eq!(names, vec!["Text", "ToolTip", "Font.Bold"]);
            let text = label.bound_property("Text").unwrap();
            assert!(text.generated);
            assert_eq!(text.expression_prefix, "Resources");
            assert_eq!(text.expression, "Greet.Text");
        }

        #[test]
        fn should_keep_explicit_values() {
            let doc = parse_localized(r#"<asp:Label runat="server" Text="Hi" meta:resourcekey="Greet" />"#);
            let label = control(&doc);
            assert!(label.bound_property("Text").is_none());
            assert!(label.bound_property("ToolTip").is_some());
            assert_eq!(label.simple_property("Text").unwrap().persisted_value, "Hi");
        }

        #[test]
        fn should_record_localize_flag() {
            let doc = parse_localized(r#"<asp:Label runat="server" meta:localize="false" />"#);
            let label = control(&doc);
            assert!(!label.localize);
            assert!(!label.persist_data().localize);
        }

        #[test]
        fn should_reject_resource_key_when_not_localized() {
            let err = parse_with(
                localized_options(),
                r#"<asp:Label runat="server" meta:resourcekey="Greet" meta:localize="false" />"#,
                PAGE_PATH,
                DocumentKind::Page,
            )
            .unwrap_err();
            assert_eq!(err.code, ErrorCode::ResourceKeyWithLocalizeFalse);
        }

        #[test]
        fn should_reject_bad_localize_values() {
            let err = parse_err(r#"<asp:Label runat="server" meta:localize="maybe" />"#);
            assert_eq!(err.code, ErrorCode::InvalidLocalizeValue);
        }

        #[test]
        fn should_reject_unknown_meta_attributes() {
            let err = parse_err(r#"<asp:Label runat="server" meta:colour="red" />"#);
            assert_eq!(err.code, ErrorCode::TypeDoesntHaveProperty);
            assert_eq!(err.message, "The attribute 'meta:colour' is not recognized.");
        }
    }

    mod property_elements {
        use super::*;

        const GRID: &str = r#"<asp:GridView runat="server" ID="G">
  <HeaderStyle BackColor="Red" Font-Bold="true" />
  <EmptyDataText>Nothing here</EmptyDataText>
  <Columns>
    <asp:BoundField DataField="Name" HeaderText="Name" />
    <asp:TemplateField HeaderText="Edit">
      <EditItemTemplate><asp:TextBox runat="server" ID="Box" Text='<%# Bind("Name") %>' /></EditItemTemplate>
    </asp:TemplateField>
  </Columns>
  <EmptyDataTemplate>none</EmptyDataTemplate>
</asp:GridView>"#;

        #[test]
        fn should_build_complex_properties() {
            let doc = parse(GRID);
            let grid = control(&doc);
            let style = grid.complex_property("HeaderStyle").unwrap();
            assert!(style.header.read_only);
            assert_eq!(style.header.member_type.as_deref(), Some("System.Web.UI.WebControls.TableItemStyle"));
            assert_eq!(style.builder.simple_property("BackColor").unwrap().value, PropertyValue::Color("Red".into()));
            assert_eq!(style.builder.simple_property("Font.Bold").unwrap().value, PropertyValue::Bool(true));
        }

        #[test]
        fn should_read_string_property_elements() {
            let doc = parse(GRID);
            let entry = control(&doc).simple_property("EmptyDataText").unwrap();
            assert_eq!(entry.value, PropertyValue::String("Nothing here".into()));
            assert!(!entry.use_set_attribute);
        }

        #[test]
        fn should_collect_collection_items() {
            let doc = parse(GRID);
            let columns = control(&doc).complex_property("Columns").unwrap();
            assert!(columns.builder.persist_data().is_collection);
            let items: Vec<_> = columns.builder.collection_items().collect();
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].type_name.as_deref(), Some("System.Web.UI.WebControls.BoundField"));
            assert_eq!(items[0].simple_property("DataField").unwrap().persisted_value, "Name");
            assert_eq!(items[1].type_name.as_deref(), Some("System.Web.UI.WebControls.TemplateField"));
        }

        #[test]
        fn should_build_templates() {
            let doc = parse(GRID);
            let grid = control(&doc);
            let template = grid.template_property("EmptyDataTemplate").unwrap();
            assert!(!template.bindable);
            assert_eq!(literal_text(&template.builder), "none");
            let data = template.builder.template_data().unwrap();
            assert_eq!(data.container_type_name.as_deref(), Some("System.Web.UI.WebControls.GridViewRow"));
            assert!(!data.allow_multiple_instances);
        }

        #[test]
        fn should_extract_two_way_bindings_from_bindable_templates() {
            let doc = parse(GRID);
            let columns = control(&doc).complex_property("Columns").unwrap();
            let field = columns.builder.collection_items().nth(1).unwrap();
            let template = field.template_property("EditItemTemplate").unwrap();
            assert!(template.bindable);
            let data = template.builder.template_data().unwrap();
            assert!(data.allow_multiple_instances);
            assert_eq!(data.two_way_bindings.len(), 1);
            assert_eq!(data.two_way_bindings[0].field_name.as_deref(), Some("Name"));
            assert_eq!(data.two_way_bindings[0].control_id.as_deref(), Some("Box"));
        }

        #[test]
        fn should_keep_the_last_of_repeated_elements() {
            let doc = parse(
                r#"<asp:GridView runat="server"><HeaderStyle BackColor="Red" /><HeaderStyle BackColor="Blue" /></asp:GridView>"#,
            );
            let grid = control(&doc);
            assert_eq!(grid.complex_properties.len(), 1);
            let style = grid.complex_property("HeaderStyle").unwrap();
            assert_eq!(style.builder.simple_property("BackColor").unwrap().value, PropertyValue::Color("Blue".into()));
        }

        #[test]
        fn should_route_children_to_default_property() {
            let doc = parse(
                r#"<asp:ListBox runat="server" ID="LB">
  <asp:ListItem Value="1">One</asp:ListItem>
  <asp:ListItem Selected="true">A &amp; B</asp:ListItem>
</asp:ListBox>"#,
            );
            let list = control(&doc);
            let items_entry = list.complex_property("Items").unwrap();
            let items: Vec<_> = items_entry.builder.collection_items().collect();
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].simple_property("Value").unwrap().persisted_value, "1");
            assert_eq!(items[0].simple_property("Text").unwrap().value, PropertyValue::String("One".into()));
            assert_eq!(items[1].simple_property("Text").unwrap().value, PropertyValue::String("A & B".into()));
            assert_eq!(items[1].simple_property("Selected").unwrap().value, PropertyValue::Bool(true));
        }

        #[test]
        fn should_reject_wrong_collection_items() {
            let err = parse_err(r#"<asp:GridView runat="server"><Columns><asp:Label runat="server" /></Columns></asp:GridView>"#);
            assert_eq!(err.code, ErrorCode::InvalidCollectionItemType);
        }

        #[test]
        fn should_reject_unknown_property_elements() {
            let err = parse_err(r#"<asp:GridView runat="server"><Footer /></asp:GridView>"#);
            assert_eq!(err.code, ErrorCode::TypeDoesntHaveProperty);
        }
    }

    mod content {
        use super::*;

        #[test]
        fn should_reject_literal_content_in_property_containers() {
            let err = parse_err(r#"<asp:GridView runat="server">text</asp:GridView>"#);
            assert_eq!(err.code, ErrorCode::LiteralContentNotAllowed);
            assert_eq!(
                err.message,
                "Literal content ('text') is not allowed within a 'System.Web.UI.WebControls.GridView'."
            );
        }

        #[test]
        fn should_reject_code_in_property_containers() {
            let err = parse_err(r#"<asp:GridView runat="server"><% Go(); %></asp:GridView>"#);
            assert_eq!(err.code, ErrorCode::CodeNotSupportedOnNotControls);
        }

        #[test]
        fn should_reject_code_in_string_properties() {
            let err = parse_err(r#"<asp:GridView runat="server"><EmptyDataText>a<% Go(); %></EmptyDataText></asp:GridView>"#);
            assert_eq!(err.code, ErrorCode::CodeNotSupportedOnNotControls);
        }

        #[test]
        fn should_apply_inner_text() {
            let doc = parse(r#"<asp:TextBox runat="server" ID="T">hello</asp:TextBox>"#);
            let entry = control(&doc).simple_property("Text").unwrap();
            assert_eq!(entry.value, PropertyValue::String("hello".into()));
            assert!(control(&doc).sub_builders.is_empty());
        }

        #[test]
        fn should_prefer_explicit_property_over_inner_text() {
            let doc = parse(r#"<asp:TextBox runat="server" Text="set">ignored</asp:TextBox>"#);
            let text = control(&doc);
            assert_eq!(text.simple_properties.len(), 1);
            assert_eq!(text.simple_property("Text").unwrap().persisted_value, "set");
        }
    }

    mod persist_data {
        use super::*;

        #[test]
        fn should_group_entries_by_filter() {
            let doc = parse(
                r#"<asp:Label runat="server" ID="L" Text="plain" ie:Text="for ie" ToolTip='<%# Eval("Tip") %>' />"#,
            );
            let persist = control(&doc).persist_data();
            assert_eq!(persist.object_type, Some("System.Web.UI.WebControls.Label"));
            assert_eq!(persist.filters().collect::<Vec<_>>(), vec!["", "ie"]);
            let names: Vec<_> = persist.all_property_entries().iter().map(|e| e.header().name.clone()).collect();
            assert_eq!(names, vec!["Text", "ToolTip"]);
            assert_eq!(persist.entries_for_filter("IE").len(), 1);
            assert!(persist.entries_for_filter("mozilla").is_empty());
        }

        #[test]
        fn should_look_entries_up_by_name() {
            let doc = parse(r#"<asp:Label runat="server" ID="L" Text="plain" ToolTip='<%# Eval("Tip") %>' />"#);
            let persist = control(&doc).persist_data();
            assert!(matches!(persist.get("text"), Some(PropertyEntryRef::Simple(_))));
            assert!(matches!(persist.get("TOOLTIP"), Some(PropertyEntryRef::Bound(_))));
            assert!(persist.get("Width").is_none());
            assert_eq!(persist.databinding_entries().len(), 1);
            assert_eq!(persist.bound_entries.len(), 1);
        }

        #[test]
        fn should_keep_document_order_across_entry_kinds() {
            let doc = parse(
                r#"<asp:GridView runat="server" PageSize="5"><HeaderStyle Wrap="false" /><EmptyDataTemplate>x</EmptyDataTemplate></asp:GridView>"#,
            );
            let persist = control(&doc).persist_data();
            let kinds: Vec<_> = persist
                .all_property_entries()
                .iter()
                .map(|e| match e {
                    PropertyEntryRef::Simple(_) => "simple",
                    PropertyEntryRef::Complex(_) => "complex",
                    PropertyEntryRef::Template(_) => "template",
                    PropertyEntryRef::Bound(_) => "bound",
                })
                .collect();
            assert_eq!(kinds, vec!["simple", "complex", "template"]);
        }

        #[test]
        fn should_expose_events_and_items() {
            let doc = parse(
                r#"<asp:DropDownList runat="server" OnSelectedIndexChanged="Changed"><asp:ListItem>a</asp:ListItem></asp:DropDownList>"#,
            );
            let list = control(&doc);
            let persist = list.persist_data();
            assert_eq!(persist.events.len(), 1);
            assert_eq!(persist.events[0].handler_method_name, "Changed");
            let items = list.complex_property("Items").unwrap();
            assert_eq!(items.builder.persist_data().collection_items.len(), 1);
        }
    }
}
