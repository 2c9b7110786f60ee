use tracing::debug;

use super::{Resolver, MAX_ALIAS_HOPS};
use crate::builtins::{Primitive, TypeRef};
use crate::diagnostics::Diagnostics;
use crate::model::{Facets, NodeId, ResolvedType};
use crate::SchemaModel;

/// What chasing a simple-type alias chain produced.
#[derive(Debug, Default)]
struct SimpleChain {
    primitive: Option<Primitive>,
    facets: Option<Facets>,
    is_list: bool,
    collapse_white_space: bool,
}

impl SimpleChain {
    fn primitive_or_string(&self) -> Primitive {
        self.primitive.unwrap_or(Primitive::String)
    }
}

/// Resolution result for one node, applied after the read-only walk.
#[derive(Debug)]
struct Resolution {
    resolved: ResolvedType,
    complex: bool,
    facets: Option<Facets>,
    simple_type_name: Option<String>,
    is_list: bool,
    collapse_white_space: bool,
}

impl Resolution {
    fn new(resolved: ResolvedType) -> Self {
        Self {
            resolved,
            complex: false,
            facets: None,
            simple_type_name: None,
            is_list: false,
            collapse_white_space: false,
        }
    }

    fn complex(name: &str) -> Self {
        Self {
            complex: true,
            ..Self::new(ResolvedType::Named(name.to_owned()))
        }
    }

    fn from_simple(name: &str, chain: SimpleChain) -> Self {
        Self {
            facets: chain.facets.clone(),
            simple_type_name: Some(name.to_owned()),
            is_list: chain.is_list,
            collapse_white_space: chain.collapse_white_space,
            ..Self::new(ResolvedType::Primitive(chain.primitive_or_string()))
        }
    }
}

/// Follows `base` links from the simple type `start` to a primitive.
///
/// Gives up with the string primitive after [`MAX_ALIAS_HOPS`] hops or at a
/// base that is not declared anywhere.
fn chase_simple(
    model: &SchemaModel,
    diagnostics: &mut Diagnostics,
    owner: &str,
    start: &str,
) -> SimpleChain {
    let mut chain = SimpleChain::default();
    let mut current = start.to_owned();
    let mut hops = 0;
    loop {
        let Some(def) = model.tables.simple_type(&current) else {
            diagnostics.warning(
                owner,
                format!("simple type {current:?} is not declared; using string"),
            );
            return chain;
        };
        chain.is_list |= def.is_list;
        chain.collapse_white_space |= def.collapse_white_space;
        if chain.facets.is_none() && def.facets.is_restricted() {
            chain.facets = Some(def.facets.clone());
        }
        let Some(base) = def.base.as_deref() else {
            // unions without a base, and bare restrictions
            return chain;
        };
        match model.builtins.classify(base) {
            TypeRef::Primitive(primitive) => {
                chain.primitive = Some(primitive);
                return chain;
            }
            TypeRef::AnyType => return chain,
            TypeRef::Named(next) => {
                if model.tables.simple_type(&next).is_none() {
                    diagnostics.warning(
                        owner,
                        format!("base {next:?} of simple type {current:?} is not a simple type; using string"),
                    );
                    return chain;
                }
                hops += 1;
                if hops > MAX_ALIAS_HOPS {
                    diagnostics.warning(
                        owner,
                        format!(
                            "simple type chain from {start:?} exceeds {MAX_ALIAS_HOPS} hops; assuming a cycle and using string"
                        ),
                    );
                    chain.primitive = None;
                    return chain;
                }
                current = next;
            }
        }
    }
}

fn resolve_node(model: &SchemaModel, diagnostics: &mut Diagnostics, id: NodeId) -> Resolution {
    let node = model.node(id);
    if node.is_wildcard() {
        return Resolution::new(ResolvedType::Any);
    }
    if node.raw_type.is_empty() {
        if let Some(simple) = &node.simple_type_name {
            if model.tables.simple_type(simple).is_some() {
                let chain = chase_simple(model, diagnostics, &node.name, simple);
                return Resolution::from_simple(simple, chain);
            }
        }
    }

    let declared = if node.raw_type.is_empty() {
        &node.name
    } else {
        &node.raw_type
    };
    let name = match model.builtins.classify(declared) {
        TypeRef::Primitive(primitive) => return Resolution::new(ResolvedType::Primitive(primitive)),
        TypeRef::AnyType => return Resolution::new(ResolvedType::Any),
        TypeRef::Named(name) => name,
    };

    if model.tables.element(&name).is_some() {
        return chase_elements(model, diagnostics, &node.name, &name);
    }
    if model.tables.simple_type(&name).is_some() {
        let chain = chase_simple(model, diagnostics, &node.name, &name);
        return Resolution::from_simple(&name, chain);
    }
    if !node.raw_type.is_empty() {
        diagnostics.warning(
            &node.name,
            format!("type {name:?} is not declared; using string"),
        );
        return Resolution::new(ResolvedType::Primitive(Primitive::String));
    }
    // self-typed, with no content that would have registered it
    match node
        .simple_bases
        .first()
        .and_then(|base| model.builtins.primitive(base))
    {
        Some(primitive) => Resolution::new(ResolvedType::Primitive(primitive)),
        None => Resolution::new(ResolvedType::Any),
    }
}

/// Follows element-to-element type references starting at the registered
/// node `start`, picking up enumeration values along the way.
fn chase_elements(
    model: &SchemaModel,
    diagnostics: &mut Diagnostics,
    owner: &str,
    start: &str,
) -> Resolution {
    let mut current = start.to_owned();
    let mut facets = None;
    for _ in 0..=MAX_ALIAS_HOPS {
        let Some(id) = model.tables.element(&current) else {
            break;
        };
        let element = model.node(id);
        if element.facets.is_restricted() {
            facets = Some(element.facets.clone());
        }
        let declared = if element.raw_type.is_empty() {
            &element.name
        } else {
            &element.raw_type
        };
        let mut resolution = match model.builtins.classify(declared) {
            TypeRef::Primitive(primitive) => Resolution::new(ResolvedType::Primitive(primitive)),
            TypeRef::AnyType => Resolution::new(ResolvedType::Any),
            TypeRef::Named(next) => {
                if model.tables.simple_type(&next).is_some() {
                    let chain = chase_simple(model, diagnostics, owner, &next);
                    Resolution::from_simple(&next, chain)
                } else if next == current {
                    Resolution::complex(&current)
                } else if model.tables.element(&next).is_some() {
                    current = next;
                    continue;
                } else {
                    diagnostics.warning(
                        owner,
                        format!("type {next:?} is not declared; using string"),
                    );
                    Resolution::new(ResolvedType::Primitive(Primitive::String))
                }
            }
        };
        if resolution.facets.is_none() {
            resolution.facets = facets;
        }
        return resolution;
    }
    diagnostics.warning(
        owner,
        format!("element type chain from {start:?} exceeds {MAX_ALIAS_HOPS} hops; using string"),
    );
    Resolution::new(ResolvedType::Primitive(Primitive::String))
}

impl Resolver<'_> {
    pub(super) fn resolve_types(&mut self) {
        for id in self.declarations() {
            let resolution = resolve_node(self.model, &mut self.diagnostics, id);
            debug!(node = %self.model.node(id).name, resolved = ?resolution.resolved, "resolved");

            let collapse_from_base = self
                .model
                .node(id)
                .base
                .as_deref()
                .and_then(|base| self.model.tables.simple_type(base))
                .is_some_and(|def| def.collapse_white_space);

            let node = self.model.node_mut(id);
            node.is_complex = !node.attribute_defs.is_empty() || resolution.complex;
            node.resolved_type = Some(resolution.resolved);
            node.is_list_type = resolution.is_list;
            node.collapse_white_space |= resolution.collapse_white_space || collapse_from_base;
            if !node.facets.is_restricted() {
                if let Some(facets) = resolution.facets {
                    node.facets = facets;
                }
            }
            if node.simple_type_name.is_none() {
                node.simple_type_name = resolution.simple_type_name;
            }

            self.resolve_attribute_types(id);
        }
    }

    fn resolve_attribute_types(&mut self, id: NodeId) {
        let node_name = self.model.node(id).name.clone();
        let declared: Vec<_> = self
            .model
            .node(id)
            .attribute_defs
            .iter()
            .map(|(key, def)| (key.to_owned(), def.declared_type.clone()))
            .collect();

        for (key, declared_type) in declared {
            let (primitive, simple) = match self.model.builtins.classify(&declared_type) {
                TypeRef::Primitive(p) if p.is_identifier() => (Primitive::String, None),
                TypeRef::Primitive(p) => (p, None),
                TypeRef::AnyType => (Primitive::String, None),
                TypeRef::Named(name) if self.model.tables.simple_type(&name).is_some() => {
                    let chain = chase_simple(self.model, &mut self.diagnostics, &node_name, &name);
                    (chain.primitive_or_string(), Some((name, chain)))
                }
                TypeRef::Named(name) => {
                    self.diagnostics.warning(
                        &node_name,
                        format!("attribute {key:?} has undeclared type {name:?}; using string"),
                    );
                    (Primitive::String, None)
                }
            };
            let Some(attribute) = self.model.node_mut(id).attribute_defs.get_mut(&key) else {
                continue;
            };
            attribute.resolved_type = Some(primitive);
            if let Some((name, chain)) = simple {
                attribute.simple_type_name = Some(name);
                if !attribute.facets.is_restricted() {
                    if let Some(facets) = chain.facets {
                        attribute.facets = facets;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{child, named, resolve_source};
    use crate::builtins::Primitive;
    use crate::model::ResolvedType;

    #[test]
    fn builtin_types_resolve_immediately() {
        let (model, diagnostics) = resolve_source(
            r#"<xs:complexType name="T"><xs:sequence>
                 <xs:element name="count" type="xs:int"/>
               </xs:sequence></xs:complexType>"#,
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let count = child(&model, "T", "count");
        assert_eq!(count.resolved_type, Some(ResolvedType::Primitive(Primitive::Int)));
        assert!(!count.is_complex);
        let t = named(&model, "T");
        assert_eq!(t.resolved_type, Some(ResolvedType::Named("T".into())));
        assert!(t.is_complex);
    }

    #[test]
    fn simple_type_chain_resolves_to_primitive_with_facets() {
        let (model, diagnostics) = resolve_source(
            r#"<xs:simpleType name="Code">
                 <xs:restriction base="xs:token">
                   <xs:enumeration value="A"/><xs:enumeration value="B"/>
                 </xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="ShortCode"><xs:restriction base="tns:Code"/></xs:simpleType>
               <xs:simpleType name="Codes"><xs:list itemType="tns:ShortCode"/></xs:simpleType>
               <xs:complexType name="T"><xs:sequence>
                 <xs:element name="code" type="tns:ShortCode"/>
                 <xs:element name="codes" type="Codes"/>
               </xs:sequence></xs:complexType>"#,
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let code = child(&model, "T", "code");
        assert_eq!(code.resolved_type, Some(ResolvedType::Primitive(Primitive::Token)));
        assert_eq!(code.facets.enumeration, vec!["A", "B"]);
        assert_eq!(code.simple_type_name.as_deref(), Some("ShortCode"));
        assert!(!code.is_list_type);
        let codes = child(&model, "T", "codes");
        assert!(codes.is_list_type);
        assert_eq!(codes.resolved_type, Some(ResolvedType::Primitive(Primitive::Token)));
    }

    #[test]
    fn cyclic_alias_chain_falls_back_to_string() {
        let mut body = String::new();
        for i in 0..15 {
            let next = (i + 1) % 15;
            body.push_str(&format!(
                r#"<xs:simpleType name="S{i}"><xs:restriction base="tns:S{next}"/></xs:simpleType>"#
            ));
        }
        body.push_str(
            r#"<xs:complexType name="T"><xs:sequence><xs:element name="v" type="S0"/></xs:sequence></xs:complexType>"#,
        );
        let (model, diagnostics) = resolve_source(&body);
        let v = child(&model, "T", "v");
        assert_eq!(v.resolved_type, Some(ResolvedType::Primitive(Primitive::String)));
        assert!(!v.is_complex);
        assert_eq!(diagnostics.matching("assuming a cycle").count(), 1);
    }

    #[test]
    fn element_reference_chains_and_enumerations() {
        let (model, diagnostics) = resolve_source(
            r#"<xs:element name="ReallyCool" type="ReallyCool"/>
               <xs:simpleType name="ReallyCool">
                 <xs:restriction base="xs:string"><xs:enumeration value="MyThing"/></xs:restriction>
               </xs:simpleType>
               <xs:element name="colour">
                 <xs:simpleType>
                   <xs:restriction base="xs:string"><xs:enumeration value="red"/></xs:restriction>
                 </xs:simpleType>
               </xs:element>
               <xs:complexType name="T"><xs:sequence>
                 <xs:element ref="tns:ReallyCool"/>
                 <xs:element ref="colour"/>
                 <xs:element name="missing" type="Nowhere"/>
               </xs:sequence></xs:complexType>"#,
        );
        let cool = child(&model, "T", "ReallyCool");
        assert_eq!(cool.resolved_type, Some(ResolvedType::Primitive(Primitive::String)));
        assert_eq!(cool.facets.enumeration, vec!["MyThing"]);
        assert!(!cool.is_complex);
        let colour = child(&model, "T", "colour");
        assert_eq!(colour.facets.enumeration, vec!["red"]);
        assert!(!colour.is_complex);
        let missing = child(&model, "T", "missing");
        assert_eq!(missing.resolved_type, Some(ResolvedType::Primitive(Primitive::String)));
        assert_eq!(diagnostics.matching("\"Nowhere\" is not declared").count(), 1);
    }

    #[test]
    fn references_to_complex_types_are_complex() {
        let (model, _) = resolve_source(
            r#"<xs:complexType name="Address"><xs:sequence>
                 <xs:element name="street" type="xs:string"/>
               </xs:sequence></xs:complexType>
               <xs:complexType name="Person"><xs:sequence>
                 <xs:element name="home" type="tns:Address"/>
                 <xs:element name="any"><xs:complexType><xs:sequence><xs:any/></xs:sequence></xs:complexType></xs:element>
               </xs:sequence></xs:complexType>"#,
        );
        let home = child(&model, "Person", "home");
        assert_eq!(home.resolved_type, Some(ResolvedType::Named("Address".into())));
        assert!(home.is_complex);
        assert!(!home.is_explicitly_defined);
        let wildcard = model.node(child(&model, "Person", "any").children[0]);
        assert_eq!(wildcard.resolved_type, Some(ResolvedType::Any));
    }

    #[test]
    fn attribute_types_are_resolved_and_identifiers_coerced() {
        let (model, _) = resolve_source(
            r#"<xs:simpleType name="Size">
                 <xs:restriction base="xs:int"><xs:minInclusive value="1"/></xs:restriction>
               </xs:simpleType>
               <xs:complexType name="T">
                 <xs:attribute name="id" type="xs:ID"/>
                 <xs:attribute name="refs" type="xs:IDREFS"/>
                 <xs:attribute name="size" type="tns:Size"/>
                 <xs:attribute name="flag" type="xs:boolean"/>
               </xs:complexType>"#,
        );
        let t = named(&model, "T");
        let attr = |key: &str| t.attribute_defs.get(key).unwrap();
        assert_eq!(attr("id").resolved_type, Some(Primitive::String));
        assert_eq!(attr("refs").resolved_type, Some(Primitive::String));
        assert_eq!(attr("size").resolved_type, Some(Primitive::Int));
        assert_eq!(attr("size").simple_type_name.as_deref(), Some("Size"));
        assert_eq!(attr("size").facets.minimum.as_deref(), Some("1"));
        assert_eq!(attr("flag").resolved_type, Some(Primitive::Boolean));
    }

    #[test]
    fn union_without_base_is_string_without_diagnostic() {
        let (model, diagnostics) = resolve_source(
            r#"<xs:simpleType name="Either"><xs:union memberTypes="xs:int xs:date"/></xs:simpleType>
               <xs:complexType name="T"><xs:sequence><xs:element name="e" type="Either"/></xs:sequence></xs:complexType>"#,
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(
            child(&model, "T", "e").resolved_type,
            Some(ResolvedType::Primitive(Primitive::String))
        );
    }
}
