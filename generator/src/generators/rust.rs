use std::collections::BTreeSet;

use syn::{
    Attribute, Expr, FieldMutability, Ident, ImplItemFn, Item, Type, __private::Span, parse_quote,
};

use xsdgen_front::{Primitive, SimpleTypeDef};

use crate::emitter::{Emitter, Field, FieldKind, FieldType};

use check_keyword::CheckKeyword;
use heck::{ToPascalCase, ToSnakeCase};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum BuiltinSource {
    RustPrimitive,
    /// Emitted once per file as an alias of `String` holding the lexical form.
    HelperType,
}

/// Module the helper aliases live in, apart from the generated structs.
const HELPER_MODULE: &str = "xs";

struct DraftField {
    field: syn::Field,
    serde: Vec<Attribute>,
}

/// The type between `begin_type` and `end_type`.
struct Draft {
    name: Ident,
    docs: Vec<String>,
    derives: Vec<syn::Path>,
    fields: Vec<DraftField>,
    methods: Vec<ImplItemFn>,
    serde: bool,
}

/// Renders each type as a struct with accessor methods; the base type
/// becomes a flattened `base` field.
#[derive(Default)]
pub struct RustEmitter {
    output_items: Vec<Item>,
    helpers: BTreeSet<&'static str>,
    uses_serde: bool,
    current: Option<Draft>,
}

impl RustEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn name_to_ident(name: &str) -> Ident {
        if ["crate", "self", "super", "Self"].contains(&name) {
            // These are keywords that are not allowed as raw identifiers
            Ident::new(&format!("{}_", name), Span::call_site())
        } else if name.is_keyword() {
            Ident::new_raw(name, Span::call_site())
        } else {
            Ident::new(name, Span::call_site())
        }
    }

    fn type_ident(name: &str) -> Ident {
        Self::name_to_ident(&name.to_pascal_case())
    }

    fn field_ident(name: &str) -> Ident {
        Self::name_to_ident(&name.to_snake_case())
    }

    fn get_builtin_source_name(primitive: Primitive) -> (BuiltinSource, &'static str) {
        use BuiltinSource::*;
        match primitive.local_name() {
            "boolean" => (RustPrimitive, "bool"),
            "double" => (RustPrimitive, "f64"),
            "float" => (RustPrimitive, "f32"),
            "long" => (RustPrimitive, "i64"),
            "int" => (RustPrimitive, "i32"),
            "short" => (RustPrimitive, "i16"),
            "byte" => (RustPrimitive, "i8"),
            "unsignedLong" => (RustPrimitive, "u64"),
            "unsignedInt" => (RustPrimitive, "u32"),
            "unsignedShort" => (RustPrimitive, "u16"),
            "unsignedByte" => (RustPrimitive, "u8"),
            "string" => (RustPrimitive, "String"),
            "anySimpleType" => (HelperType, "AnySimpleType"),
            "decimal" => (HelperType, "Decimal"),
            "dateTime" => (HelperType, "DateTime"),
            "duration" => (HelperType, "Duration"),
            "time" => (HelperType, "Time"),
            "date" => (HelperType, "Date"),
            "gMonth" => (HelperType, "GMonth"),
            "gMonthDay" => (HelperType, "GMonthDay"),
            "gDay" => (HelperType, "GDay"),
            "gYear" => (HelperType, "GYear"),
            "gYearMonth" => (HelperType, "GYearMonth"),
            "hexBinary" => (HelperType, "HexBinary"),
            "base64Binary" => (HelperType, "Base64Binary"),
            "anyURI" => (HelperType, "AnyUri"),
            "QName" => (HelperType, "QName"),
            "NOTATION" => (HelperType, "Notation"),
            "normalizedString" => (HelperType, "NormalizedString"),
            "token" => (HelperType, "Token"),
            "language" => (HelperType, "Language"),
            "NMTOKEN" => (HelperType, "NmToken"),
            "NMTOKENS" => (HelperType, "NmTokens"),
            "Name" => (HelperType, "Name"),
            "NCName" => (HelperType, "NcName"),
            "ID" => (HelperType, "Id"),
            "IDREF" => (HelperType, "IdRef"),
            "IDREFS" => (HelperType, "IdRefs"),
            "ENTITY" => (HelperType, "Entity"),
            "ENTITIES" => (HelperType, "Entities"),
            "integer" => (HelperType, "Integer"),
            "nonPositiveInteger" => (HelperType, "NonPositiveInteger"),
            "negativeInteger" => (HelperType, "NegativeInteger"),
            "nonNegativeInteger" => (HelperType, "NonNegativeInteger"),
            "positiveInteger" => (HelperType, "PositiveInteger"),
            _ => (RustPrimitive, "String"),
        }
    }

    fn helper_type(&mut self, name: &'static str) -> Type {
        self.helpers.insert(name);
        let module = Ident::new(HELPER_MODULE, Span::call_site());
        let name = Ident::new(name, Span::call_site());
        parse_quote!(#module::#name)
    }

    /// The type of a single value of `field`, before any `Vec`/`Option` wrapping.
    fn value_type(&mut self, field: &Field, owner: &Ident) -> Type {
        match &field.type_ {
            FieldType::Primitive(primitive) => match Self::get_builtin_source_name(*primitive) {
                (BuiltinSource::RustPrimitive, name) => {
                    let name = Ident::new(name, Span::call_site());
                    parse_quote!(#name)
                }
                (BuiltinSource::HelperType, name) => self.helper_type(name),
            },
            FieldType::Complex(name) => {
                let name = Self::type_ident(name);
                if name == *owner && !field.repeated {
                    parse_quote!(Box<#name>)
                } else {
                    parse_quote!(#name)
                }
            }
            FieldType::Any => self.helper_type("AnyType"),
        }
    }

    fn serde_attributes(field: &Field) -> Vec<Attribute> {
        let mut attrs: Vec<Attribute> = Vec::new();
        match field.kind {
            FieldKind::Element => {
                let name = &field.name;
                attrs.push(parse_quote!(#[serde(rename = #name)]));
            }
            FieldKind::Attribute => {
                let name = format!("@{}", field.name);
                attrs.push(parse_quote!(#[serde(rename = #name)]));
            }
            FieldKind::Value => attrs.push(parse_quote!(#[serde(rename = "$text")])),
            FieldKind::AnyAttributes => attrs.push(parse_quote!(#[serde(flatten)])),
            FieldKind::Wildcard | FieldKind::ExtensionType => {
                attrs.push(parse_quote!(#[serde(skip)]))
            }
        }
        if field.optional || field.repeated {
            attrs.push(parse_quote!(#[serde(default)]));
        }
        attrs
    }

    fn accessors(field: &Field, ident: &Ident, ty: &Type, inner: &Type) -> Vec<ImplItemFn> {
        let method = |prefix: &str| Self::name_to_ident(&format!("{prefix}{}", field.accessor).to_snake_case());
        let getter = method("get");
        let setter = method("set");
        let mut methods: Vec<ImplItemFn> = vec![
            parse_quote! {
                pub fn #getter(&self) -> &#ty {
                    &self.#ident
                }
            },
            parse_quote! {
                pub fn #setter(&mut self, value: #ty) {
                    self.#ident = value;
                }
            },
        ];
        if field.repeated && matches!(field.kind, FieldKind::Element | FieldKind::Wildcard) {
            let adder = method("add");
            let inserter = method("insert");
            let remover = method("remove");
            methods.push(parse_quote! {
                pub fn #adder(&mut self, value: #inner) {
                    self.#ident.push(value);
                }
            });
            methods.push(parse_quote! {
                pub fn #inserter(&mut self, index: usize, value: #inner) {
                    self.#ident.insert(index, value);
                }
            });
            methods.push(parse_quote! {
                pub fn #remover(&mut self, index: usize) -> #inner {
                    self.#ident.remove(index)
                }
            });
        }
        methods
    }

    fn validation_expr(simple_type: &SimpleTypeDef) -> Option<Expr> {
        let facets = &simple_type.facets;
        let mut checks: Vec<Expr> = Vec::new();
        if !facets.enumeration.is_empty() {
            let values = &facets.enumeration;
            checks.push(parse_quote!([#(#values),*].contains(&value)));
        }
        if let Some(minimum) = facets.minimum.as_deref().and_then(|m| m.trim().parse::<f64>().ok()) {
            checks.push(parse_quote!(value.trim().parse::<f64>().map_or(false, |v| v >= #minimum)));
        }
        if let Some(maximum) = facets.maximum.as_deref().and_then(|m| m.trim().parse::<f64>().ok()) {
            checks.push(parse_quote!(value.trim().parse::<f64>().map_or(false, |v| v <= #maximum)));
        }
        checks
            .into_iter()
            .reduce(|all, check| parse_quote!(#all && #check))
    }
}

impl Emitter for RustEmitter {
    fn begin_type(&mut self, parent: Option<&str>, name: &str) {
        let mut fields = Vec::new();
        if let Some(parent) = parent {
            let parent = Self::type_ident(parent);
            fields.push(DraftField {
                field: syn::Field {
                    attrs: vec![],
                    vis: parse_quote!(pub),
                    mutability: FieldMutability::None,
                    ident: Some(Ident::new("base", Span::call_site())),
                    colon_token: Some(Default::default()),
                    ty: parse_quote!(#parent),
                },
                serde: vec![parse_quote!(#[serde(flatten)])],
            });
        }
        self.current = Some(Draft {
            name: Self::type_ident(name),
            docs: Vec::new(),
            derives: vec![parse_quote!(Debug), parse_quote!(Clone), parse_quote!(Default)],
            fields,
            methods: Vec::new(),
            serde: false,
        });
    }

    fn documentation(&mut self, text: &str) {
        if let Some(draft) = &mut self.current {
            draft.docs.extend(text.lines().map(|line| format!(" {}", line.trim())));
        }
    }

    fn field(&mut self, field: &Field) {
        let Some(owner) = self.current.as_ref().map(|draft| draft.name.clone()) else {
            return;
        };
        let ident = Self::field_ident(&field.name);
        let inner = self.value_type(field, &owner);
        let ty: Type = match field.kind {
            FieldKind::AnyAttributes => parse_quote!(std::collections::BTreeMap<String, String>),
            FieldKind::ExtensionType => parse_quote!(Option<String>),
            _ if field.repeated => parse_quote!(Vec<#inner>),
            _ if field.optional => parse_quote!(Option<#inner>),
            _ => parse_quote!(#inner),
        };
        let mut attrs: Vec<Attribute> = Vec::new();
        if let Some(documentation) = &field.documentation {
            let documentation = format!(" {documentation}");
            attrs.push(parse_quote!(#[doc = #documentation]));
        }
        let methods = Self::accessors(field, &ident, &ty, &inner);
        let Some(draft) = &mut self.current else {
            return;
        };
        draft.fields.push(DraftField {
            field: syn::Field {
                attrs,
                vis: parse_quote!(pub),
                mutability: FieldMutability::None,
                ident: Some(ident),
                colon_token: Some(Default::default()),
                ty,
            },
            serde: Self::serde_attributes(field),
        });
        draft.methods.extend(methods);
    }

    fn validator(&mut self, simple_type: &SimpleTypeDef) {
        let Some(draft) = &mut self.current else {
            return;
        };
        let name = Self::name_to_ident(&format!("validate_{}", simple_type.name.to_snake_case()));
        let method: ImplItemFn = match Self::validation_expr(simple_type) {
            Some(check) => parse_quote! {
                pub fn #name(value: &str) -> bool {
                    #check
                }
            },
            None => parse_quote! {
                pub fn #name(_value: &str) -> bool {
                    true
                }
            },
        };
        draft.methods.push(method);
    }

    fn comparators(&mut self) {
        if let Some(draft) = &mut self.current {
            draft.derives.push(parse_quote!(PartialEq));
        }
    }

    fn serialize_hooks(&mut self) {
        if let Some(draft) = &mut self.current {
            draft.derives.push(parse_quote!(Serialize));
            draft.serde = true;
            self.uses_serde = true;
        }
    }

    fn deserialize_hooks(&mut self) {
        if let Some(draft) = &mut self.current {
            draft.derives.push(parse_quote!(Deserialize));
            draft.serde = true;
            self.uses_serde = true;
        }
    }

    fn user_methods(&mut self, source: &str) {
        let Some(draft) = &mut self.current else {
            return;
        };
        match syn::parse_str::<ImplItemFn>(source) {
            Ok(method) => draft.methods.push(method),
            Err(err) => tracing::warn!(
                type_name = %draft.name,
                "user method is not a valid Rust method, skipped: {err}"
            ),
        }
    }

    fn end_type(&mut self) {
        let Some(draft) = self.current.take() else {
            return;
        };
        let Draft {
            name,
            docs,
            derives,
            fields,
            methods,
            serde,
        } = draft;
        let fields = fields.into_iter().map(|DraftField { mut field, serde: attrs }| {
            if serde {
                field.attrs.extend(attrs);
            }
            field
        });
        self.output_items.push(parse_quote! {
            #(#[doc = #docs])*
            #[derive(#(#derives),*)]
            pub struct #name {
                #(#fields),*
            }
        });
        if !methods.is_empty() {
            self.output_items.push(parse_quote! {
                impl #name {
                    #(#methods)*
                }
            });
        }
    }

    fn finish(&mut self) -> String {
        let mut items: Vec<Item> = Vec::new();
        if self.uses_serde {
            items.push(Item::Use(parse_quote!(
                use serde::{Deserialize, Serialize};
            )));
        }
        let helpers = std::mem::take(&mut self.helpers);
        if !helpers.is_empty() {
            let module = Ident::new(HELPER_MODULE, Span::call_site());
            let names = helpers.iter().map(|helper| Ident::new(helper, Span::call_site()));
            let docs = helpers
                .iter()
                .map(|helper| format!(" Lexical form of a `{helper}` value."));
            items.push(parse_quote! {
                /// Built-in schema types without a Rust counterpart.
                pub mod #module {
                    #(
                        #[doc = #docs]
                        pub type #names = String;
                    )*
                }
            });
        }
        items.append(&mut self.output_items);
        self.uses_serde = false;

        let doc_comment = concat!(
            "Generated by ",
            env!("CARGO_PKG_NAME"),
            " ",
            env!("CARGO_PKG_VERSION")
        );
        let root = syn::File {
            shebang: None,
            attrs: vec![
                parse_quote!(#![doc = #doc_comment]),
                parse_quote!(#![allow(dead_code, unused_imports)]),
            ],
            items,
        };
        prettyplease::unparse(&root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, MethodSpec};
    use crate::orchestrator::generate;
    use xsdgen_front::{read_schema, Options};

    fn render(body: &str, config: &Config) -> String {
        let source = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="urn:t" targetNamespace="urn:t">{body}</xs:schema>"#
        );
        let (model, _) = read_schema(&source, &Options::default()).unwrap();
        let mut emitter = RustEmitter::new();
        generate(&model, config, &mut emitter);
        emitter.finish()
    }

    #[test]
    fn keywords_become_raw_identifiers() {
        assert_eq!(RustEmitter::name_to_ident("type").to_string(), "r#type");
        assert_eq!(RustEmitter::name_to_ident("self").to_string(), "self_");
        assert_eq!(RustEmitter::name_to_ident("line").to_string(), "line");
    }

    #[test]
    fn renders_struct_with_accessors() {
        let output = render(
            r#"<xs:complexType name="purchase-order">
                 <xs:annotation><xs:documentation>An order.</xs:documentation></xs:annotation>
                 <xs:sequence>
                   <xs:element name="lineItem" type="xs:string" maxOccurs="unbounded"/>
                   <xs:element name="total" type="xs:decimal" minOccurs="0"/>
                 </xs:sequence>
                 <xs:attribute name="type" type="xs:int" use="required"/>
               </xs:complexType>"#,
            &Config::default(),
        );
        assert!(output.contains("/// An order."), "{output}");
        assert!(output.contains("#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]"), "{output}");
        assert!(output.contains("pub struct PurchaseOrder {"), "{output}");
        assert!(output.contains("pub line_item: Vec<String>,"), "{output}");
        assert!(output.contains("pub total: Option<xs::Decimal>,"), "{output}");
        assert!(output.contains("pub r#type: i32,"), "{output}");
        assert!(output.contains("#[serde(rename = \"@type\")]"), "{output}");
        assert!(output.contains("pub type Decimal = String;"), "{output}");
        assert!(output.contains("pub fn get_line_item(&self) -> &Vec<String>"), "{output}");
        assert!(output.contains("pub fn add_line_item(&mut self, value: String)"), "{output}");
        assert!(output.contains("pub fn remove_line_item(&mut self, index: usize) -> String"), "{output}");
        assert!(output.contains("pub fn set_type(&mut self, value: i32)"), "{output}");
    }

    #[test]
    fn base_becomes_flattened_field_and_validators_are_rendered() {
        let output = render(
            r#"<xs:simpleType name="Size">
                 <xs:restriction base="xs:int"><xs:minInclusive value="1"/><xs:maxInclusive value="9"/></xs:restriction>
               </xs:simpleType>
               <xs:complexType name="Base"><xs:attribute name="id"/></xs:complexType>
               <xs:complexType name="Shirt">
                 <xs:complexContent><xs:extension base="tns:Base">
                   <xs:sequence><xs:element name="size" type="tns:Size"/></xs:sequence>
                 </xs:extension></xs:complexContent>
               </xs:complexType>"#,
            &Config::default(),
        );
        let base = output.find("pub struct Base").unwrap();
        let shirt = output.find("pub struct Shirt").unwrap();
        assert!(base < shirt);
        assert!(output.contains("#[serde(flatten)]\n    pub base: Base,"), "{output}");
        assert!(output.contains("pub fn validate_size(value: &str) -> bool"), "{output}");
        assert!(output.contains("v >= 1f64"), "{output}");
        assert!(output.contains("v <= 9f64"), "{output}");
    }

    #[test]
    fn user_methods_are_parsed_into_the_impl() {
        let config = Config {
            methods: vec![
                MethodSpec::new("Item", "pub fn describe(&self) -> &'static str { \"{class_name}\" }").unwrap(),
                MethodSpec::new("Item", "not rust at all").unwrap(),
            ],
            ..Config::default()
        };
        let output = render(r#"<xs:complexType name="Item"><xs:attribute name="a"/></xs:complexType>"#, &config);
        assert!(output.contains("pub fn describe(&self) -> &'static str"), "{output}");
        assert!(output.contains("\"Item\""), "{output}");
        assert!(!output.contains("not rust"), "{output}");
    }

    #[test]
    fn helper_aliases_do_not_clash_with_generated_types() {
        let output = render(
            r#"<xs:complexType name="Date">
                 <xs:sequence><xs:element name="value" type="xs:date"/></xs:sequence>
               </xs:complexType>
               <xs:complexType name="Token"><xs:attribute name="text" type="xs:token"/></xs:complexType>"#,
            &Config::default(),
        );
        assert!(output.contains("pub struct Date {"), "{output}");
        assert!(output.contains("pub struct Token {"), "{output}");
        assert!(output.contains("pub mod xs {"), "{output}");
        assert!(output.contains("pub value: xs::Date,"), "{output}");
        assert!(output.contains("pub text: Option<xs::Token>,"), "{output}");
        assert_eq!(output.matches("pub type Date = String;").count(), 1);
    }
}
