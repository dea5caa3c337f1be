//! Built-in Schema
//!
//! Descriptions of the framework types every document can use: primitives,
//! the control base classes, the standard web controls and the HTML controls.
//! The line format is documented in [`super::type_registry`].

use super::type_registry::{RegistryError, TypeRegistry};
use once_cell::sync::Lazy;
use std::sync::Arc;

pub static BUILTIN_SCHEMA: &[&str] = &[
    // System
    "System.Object{value=object}|",
    "System.String{value=string}|",
    "System.Boolean{value=bool}|",
    "System.Int32{value=int}|",
    "System.UInt32{value=uint;noncls}|",
    "System.Double{value=double}|",
    "System.Collections.IList{interface}|",
    "System.Collections.ArrayList^System.Object{implements=IList}|Capacity:Int32",
    "System.Drawing.Color{value=color}|",
    // System.Web
    "System.Web.HttpApplication^System.Object|",
    // System.Web.UI
    "System.Web.UI.ITemplate{interface}|",
    "System.Web.UI.INamingContainer{interface}|",
    "System.Web.UI.IAttributeAccessor{interface}|",
    "System.Web.UI.IDataItemContainer{interface}|",
    "System.Web.UI.IPostBackEventHandler{interface}|",
    "System.Web.UI.ICallbackEventHandler{interface}|",
    "System.Web.UI.CssStyleCollection^System.Object|",
    "System.Web.UI.Control^System.Object|ID,Visible:Boolean,EnableViewState:Boolean,EnableTheming:Boolean,SkinID,*DataBinding,*Init,*Load,*PreRender,*Unload,*Disposed",
    "System.Web.UI.TemplateControl^Control{implements=INamingContainer}|*Error,*CommitTransaction,*AbortTransaction",
    "System.Web.UI.Page^TemplateControl|Title,Culture,UICulture,ErrorPage,ClientTarget,MetaDescription,MetaKeywords,MaintainScrollPositionOnPostBack:Boolean,EnableEventValidation:Boolean,*PreInit,*InitComplete,*LoadComplete,*PreRenderComplete,*SaveStateComplete",
    "System.Web.UI.UserControl^TemplateControl{implements=IAttributeAccessor}|",
    "System.Web.UI.MasterPage^UserControl|MasterPageFile",
    "System.Web.UI.PageTheme^System.Object|",
    "System.Web.UI.LiteralControl^Control|Text",
    "System.Web.UI.DataBoundLiteralControl^Control|=Text",
    // System.Web.UI.WebControls: value types
    "System.Web.UI.WebControls.Unit{value=unit}|",
    "System.Web.UI.WebControls.FontUnit{value=fontunit}|",
    "System.Web.UI.WebControls.HorizontalAlign{values=NotSet/Left/Center/Right/Justify}|",
    "System.Web.UI.WebControls.VerticalAlign{values=NotSet/Top/Middle/Bottom}|",
    "System.Web.UI.WebControls.BorderStyle{values=NotSet/None/Dotted/Dashed/Solid/Double/Groove/Ridge/Inset/Outset}|",
    "System.Web.UI.WebControls.TextBoxMode{values=SingleLine/MultiLine/Password}|",
    "System.Web.UI.WebControls.RepeatDirection{values=Horizontal/Vertical}|",
    "System.Web.UI.WebControls.GridLines{values=None/Horizontal/Vertical/Both}|",
    "System.Web.UI.WebControls.TreeNodeTypes{values=None/Root/Parent/Leaf/All;flags}|",
    // styles
    "System.Web.UI.WebControls.FontInfo^System.Object|Bold:Boolean,Italic:Boolean,Underline:Boolean,Strikeout:Boolean,Name,Names,Size:FontUnit",
    "System.Web.UI.WebControls.Style^System.Object|BackColor:Color,ForeColor:Color,BorderColor:Color,BorderStyle:BorderStyle,BorderWidth:Unit,CssClass,=Font:FontInfo,Height:Unit,Width:Unit",
    "System.Web.UI.WebControls.TableItemStyle^Style|HorizontalAlign:HorizontalAlign,VerticalAlign:VerticalAlign,Wrap:Boolean",
    // controls
    "System.Web.UI.WebControls.WebControl^System.Web.UI.Control{implements=IAttributeAccessor}|AccessKey,BackColor:Color,ForeColor:Color,BorderColor:Color,BorderStyle:BorderStyle,BorderWidth:Unit,CssClass,Enabled:Boolean,=Font:FontInfo,Height:Unit,Width:Unit,ToolTip,TabIndex:Int32,=Style:CssStyleCollection",
    "System.Web.UI.WebControls.Label^WebControl|Text,AssociatedControlID",
    "System.Web.UI.WebControls.TextBox^WebControl{innertext=Text}|Text,TextMode:TextBoxMode,MaxLength:Int32,ReadOnly:Boolean,Columns:Int32,Rows:Int32,AutoPostBack:Boolean,*TextChanged",
    "System.Web.UI.WebControls.Button^WebControl|Text,CommandName,CommandArgument,CausesValidation:Boolean,OnClientClick,PostBackUrl,ValidationGroup,*Click,*Command",
    "System.Web.UI.WebControls.HyperLink^WebControl|Text,NavigateUrl,Target,ImageUrl",
    "System.Web.UI.WebControls.Image^WebControl|ImageUrl,AlternateText",
    "System.Web.UI.WebControls.CheckBox^WebControl|Text,Checked:Boolean,AutoPostBack:Boolean,*CheckedChanged",
    "System.Web.UI.WebControls.Panel^WebControl|HorizontalAlign:HorizontalAlign,Wrap:Boolean,GroupingText,DefaultButton",
    "System.Web.UI.WebControls.PlaceHolder^System.Web.UI.Control|",
    "System.Web.UI.WebControls.Literal^System.Web.UI.Control{innertext=Text}|Text",
    "System.Web.UI.WebControls.Xml^System.Web.UI.Control{innertext=DocumentContent}|DocumentContent,DocumentSource,TransformSource",
    "System.Web.UI.WebControls.RepeaterItem^System.Web.UI.Control{implements=INamingContainer/IDataItemContainer}|ItemIndex:Int32",
    "System.Web.UI.WebControls.Repeater^System.Web.UI.Control{props;implements=INamingContainer}|DataSourceID,DataMember,ItemTemplate:ITemplate@RepeaterItem,AlternatingItemTemplate:ITemplate@RepeaterItem,HeaderTemplate:ITemplate@RepeaterItem,FooterTemplate:ITemplate@RepeaterItem,SeparatorTemplate:ITemplate@RepeaterItem,*ItemDataBound,*ItemCommand",
    "System.Web.UI.WebControls.ListItem^System.Object{implements=IAttributeAccessor;innertext=Text;nows;decode}|Text,Value,Selected:Boolean,Enabled:Boolean",
    "System.Web.UI.WebControls.ListItemCollection^System.Object{implements=IList;item=ListItem}|",
    "System.Web.UI.WebControls.DataBoundControl^WebControl|DataSourceID,DataMember,*DataBound",
    "System.Web.UI.WebControls.ListControl^DataBoundControl{props;default=Items}|=Items:ListItemCollection,DataTextField,DataValueField,AutoPostBack:Boolean,SelectedValue,*SelectedIndexChanged",
    "System.Web.UI.WebControls.DropDownList^ListControl|",
    "System.Web.UI.WebControls.ListBox^ListControl|Rows:Int32",
    "System.Web.UI.WebControls.RadioButtonList^ListControl|RepeatDirection:RepeatDirection",
    "System.Web.UI.WebControls.TreeView^DataBoundControl{props}|ShowCheckBoxes:TreeNodeTypes,ShowLines:Boolean",
    "System.Web.UI.WebControls.GridViewRow^System.Web.UI.Control{implements=INamingContainer/IDataItemContainer}|RowIndex:Int32",
    "System.Web.UI.WebControls.DataControlField^System.Object|HeaderText,FooterText,SortExpression,Visible:Boolean,=HeaderStyle:TableItemStyle,=ItemStyle:TableItemStyle",
    "System.Web.UI.WebControls.BoundField^DataControlField|DataField,DataFormatString,NullDisplayText,ReadOnly:Boolean",
    "System.Web.UI.WebControls.ButtonField^DataControlField|Text,CommandName",
    "System.Web.UI.WebControls.TemplateField^DataControlField|~ItemTemplate:ITemplate@GridViewRow,~EditItemTemplate:ITemplate@GridViewRow,HeaderTemplate:ITemplate@GridViewRow,FooterTemplate:ITemplate@GridViewRow",
    "System.Web.UI.WebControls.DataControlFieldCollection^System.Object{implements=IList;item=DataControlField}|",
    "System.Web.UI.WebControls.GridView^DataBoundControl{props;implements=INamingContainer}|AutoGenerateColumns:Boolean,AllowPaging:Boolean,AllowSorting:Boolean,PageSize:Int32,EmptyDataText,DataKeyNames,GridLines:GridLines,=Columns:DataControlFieldCollection,=HeaderStyle:TableItemStyle,=RowStyle:TableItemStyle,=AlternatingRowStyle:TableItemStyle,=FooterStyle:TableItemStyle,EmptyDataTemplate:ITemplate@GridViewRow!,*RowCommand,*RowDataBound,*RowEditing,*RowUpdating",
    "System.Web.UI.WebControls.ContentPlaceHolder^System.Web.UI.Control{implements=INamingContainer}|",
    "System.Web.UI.WebControls.Content^System.Web.UI.Control{implements=INamingContainer}|ContentPlaceHolderID",
    // System.Web.UI.HtmlControls
    "System.Web.UI.HtmlControls.HtmlControl^System.Web.UI.Control{implements=IAttributeAccessor}|Disabled:Boolean,=Style:CssStyleCollection",
    "System.Web.UI.HtmlControls.HtmlContainerControl^HtmlControl|InnerHtml,InnerText",
    "System.Web.UI.HtmlControls.HtmlGenericControl^HtmlContainerControl|TagName",
    "System.Web.UI.HtmlControls.HtmlForm^HtmlContainerControl|Action,Method,DefaultButton,DefaultFocus,Enctype,Target",
    "System.Web.UI.HtmlControls.HtmlAnchor^HtmlContainerControl|HRef,Name,Target,Title,*ServerClick",
    "System.Web.UI.HtmlControls.HtmlButton^HtmlContainerControl|CausesValidation:Boolean,ValidationGroup,*ServerClick",
    "System.Web.UI.HtmlControls.HtmlHead^HtmlGenericControl|Title",
    "System.Web.UI.HtmlControls.HtmlTitle^HtmlControl{innertext=Text}|Text",
    "System.Web.UI.HtmlControls.HtmlImage^HtmlControl|Src,Alt,Align,Border:Int32,Width:Int32,Height:Int32",
    "System.Web.UI.HtmlControls.HtmlLink^HtmlControl|Href",
    "System.Web.UI.HtmlControls.HtmlMeta^HtmlControl|Content,Name,HttpEquiv,Scheme",
    "System.Web.UI.HtmlControls.HtmlSelect^HtmlContainerControl|Value,Multiple:Boolean,Size:Int32,DataSourceID,*ServerChange",
    "System.Web.UI.HtmlControls.HtmlTable^HtmlContainerControl|Align,BgColor,Border:Int32,BorderColor,CellPadding:Int32,CellSpacing:Int32,Width,Height",
    "System.Web.UI.HtmlControls.HtmlTableRow^HtmlContainerControl|Align,BgColor,VAlign,Height",
    "System.Web.UI.HtmlControls.HtmlTableCell^HtmlContainerControl|Align,BgColor,VAlign,ColSpan:Int32,RowSpan:Int32,NoWrap:Boolean,Width,Height",
    "System.Web.UI.HtmlControls.HtmlTextArea^HtmlContainerControl{innertext=Value}|Value,Name,Rows:Int32,Cols:Int32,*ServerChange",
    "System.Web.UI.HtmlControls.HtmlIframe^HtmlContainerControl|Src,Name",
    "System.Web.UI.HtmlControls.HtmlInputControl^HtmlControl|Name,Value,Type",
    "System.Web.UI.HtmlControls.HtmlInputText^HtmlInputControl|MaxLength:Int32,Size:Int32,*ServerChange",
    "System.Web.UI.HtmlControls.HtmlInputPassword^HtmlInputText|",
    "System.Web.UI.HtmlControls.HtmlInputCheckBox^HtmlInputControl|Checked:Boolean,*ServerChange",
    "System.Web.UI.HtmlControls.HtmlInputRadioButton^HtmlInputControl|Checked:Boolean,*ServerChange",
    "System.Web.UI.HtmlControls.HtmlInputButton^HtmlInputControl|CausesValidation:Boolean,ValidationGroup,*ServerClick",
    "System.Web.UI.HtmlControls.HtmlInputSubmit^HtmlInputButton|",
    "System.Web.UI.HtmlControls.HtmlInputReset^HtmlInputButton|",
    "System.Web.UI.HtmlControls.HtmlInputHidden^HtmlInputControl|*ServerChange",
    "System.Web.UI.HtmlControls.HtmlInputFile^HtmlInputControl|Accept,MaxLength:Int32,Size:Int32",
    "System.Web.UI.HtmlControls.HtmlInputImage^HtmlInputControl|Src,Alt,Align,Border:Int32,*ServerClick",
    "System.Web.UI.HtmlControls.HtmlInputGenericControl^HtmlInputControl|*ServerChange",
    // object tag samples: a classic COM component
    "ADODB.Recordset^System.Object{comclassic;guid=00000535-0000-0010-8000-00AA006D2EA4;progid=ADODB.Recordset}|",
];

/// The built-in registry, shared by every parse that doesn't supply its own
pub static BUILTIN_REGISTRY: Lazy<Arc<TypeRegistry>> = Lazy::new(|| {
    Arc::new(
        TypeRegistry::from_schema(BUILTIN_SCHEMA.iter().copied())
            .expect("built-in schema is well formed"),
    )
});

impl TypeRegistry {
    /// Built-in types plus application types described by `extra` lines
    pub fn with_builtins<'a>(extra: impl IntoIterator<Item = &'a str>) -> Result<Self, RegistryError> {
        TypeRegistry::from_schema(BUILTIN_SCHEMA.iter().copied().chain(extra))
    }

    pub fn builtin() -> Arc<TypeRegistry> {
        Arc::clone(&BUILTIN_REGISTRY)
    }
}
