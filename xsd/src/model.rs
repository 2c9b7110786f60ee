use std::fmt;
use std::num::NonZeroU32;

use crate::builtins::Primitive;

/// Handle to a [`SchemaNode`] stored in a [`crate::SchemaModel`].
///
/// Nodes spliced into several parents by group expansion share one id, so
/// identity comparisons go through this type rather than through names.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index + 1)
            .ok()
            .and_then(NonZeroU32::new)
            .expect("schema node arena overflow");
        Self(raw)
    }

    pub(crate) fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<SchemaNode #{}>", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaxOccurs {
    Unbounded,
    Count(u32),
}

impl MaxOccurs {
    pub fn is_repeated(self) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Count(n) => n > 1,
        }
    }
}

impl Default for MaxOccurs {
    fn default() -> Self {
        Self::Count(1)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AttributeUse {
    #[default]
    Optional,
    Required,
}

/// Restrictions collected from `enumeration`, `minInclusive` and `maxInclusive`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Facets {
    pub enumeration: Vec<String>,
    pub minimum: Option<String>,
    pub maximum: Option<String>,
}

impl Facets {
    pub fn is_restricted(&self) -> bool {
        !self.enumeration.is_empty() || self.minimum.is_some() || self.maximum.is_some()
    }
}

/// What a node's declared type finally resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedType {
    Primitive(Primitive),
    /// A complex type, by its registered name.
    Named(String),
    /// `xs:any` particles and `xs:anyType` content.
    Any,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Schema,
    Element,
    ComplexType,
    /// A top-level `group` definition; never part of the tree.
    Group,
    /// A `group ref=".."` placeholder, replaced during group flattening.
    GroupRef,
    Wildcard,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeDef {
    pub name: String,
    pub clean_name: String,
    pub declared_type: String,
    pub use_: AttributeUse,
    pub default: Option<String>,
    pub facets: Facets,
    /// Set by the resolver.
    pub resolved_type: Option<Primitive>,
    /// The user simple type the declared type resolved through, if any.
    pub simple_type_name: Option<String>,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            clean_name: name.clone(),
            name,
            declared_type: declared_type.into(),
            use_: AttributeUse::Optional,
            default: None,
            facets: Facets::default(),
            resolved_type: None,
            simple_type_name: None,
        }
    }
}

/// Attribute definitions keyed by name, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: Vec<(String, AttributeDef)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts under `key`, replacing an existing entry in place.
    pub fn insert(&mut self, key: impl Into<String>, def: AttributeDef) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = def,
            None => self.entries.push((key, def)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeDef> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut AttributeDef> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Moves the entry under `from` to `to`, keeping its position. Returns
    /// `false` if `from` is absent or `to` is already taken.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if self.contains_key(to) {
            return false;
        }
        match self.entries.iter_mut().find(|(k, _)| k == from) {
            Some((key, _)) => {
                *key = to.to_owned();
                true
            }
            None => false,
        }
    }

    pub fn last_mut(&mut self) -> Option<&mut AttributeDef> {
        self.entries.last_mut().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &AttributeDef> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut AttributeDef> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeDef)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimpleTypeDef {
    pub name: String,
    /// Raw (possibly prefixed) base or list item type.
    pub base: Option<String>,
    pub is_list: bool,
    pub facets: Facets,
    pub union_members: Vec<String>,
    pub documentation: String,
    pub collapse_white_space: bool,
}

impl SimpleTypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeGroupDef {
    pub name: String,
    pub attributes: AttributeMap,
    /// Other attribute groups this one pulls in.
    pub group_refs: Vec<String>,
}

/// An element, complex type or group declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaNode {
    pub kind: NodeKind,
    pub name: String,
    pub clean_name: String,
    /// Declared type as written; built-ins keep their prefix, other names do not.
    pub raw_type: String,
    pub reference: Option<String>,
    pub base: Option<String>,
    pub restriction_base: Option<String>,
    /// Built-in bases reached through simple-content extension.
    pub simple_bases: Vec<String>,
    pub children: Vec<NodeId>,
    pub attribute_defs: AttributeMap,
    pub attribute_group_refs: Vec<String>,
    pub group_ref: Option<String>,
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
    pub mixed: bool,
    /// The literal `mixed` attribute, when one was written.
    pub mixed_declared: Option<bool>,
    pub is_abstract: bool,
    pub is_explicitly_defined: bool,
    pub is_top_level: bool,
    pub has_simple_content: bool,
    pub any_attribute: bool,
    pub documentation: String,
    pub default: Option<String>,
    pub facets: Facets,
    pub simple_type_name: Option<String>,
    pub collapse_white_space: bool,

    // Resolver output
    pub resolved_type: Option<ResolvedType>,
    pub is_complex: bool,
    pub is_list_type: bool,
    pub mixed_extension_error: bool,
    pub is_extended: bool,
}

impl SchemaNode {
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind,
            clean_name: name.clone(),
            name,
            raw_type: String::new(),
            reference: None,
            base: None,
            restriction_base: None,
            simple_bases: Vec::new(),
            children: Vec::new(),
            attribute_defs: AttributeMap::new(),
            attribute_group_refs: Vec::new(),
            group_ref: None,
            min_occurs: 1,
            max_occurs: MaxOccurs::default(),
            mixed: false,
            mixed_declared: None,
            is_abstract: false,
            is_explicitly_defined: false,
            is_top_level: false,
            has_simple_content: false,
            any_attribute: false,
            documentation: String::new(),
            default: None,
            facets: Facets::default(),
            simple_type_name: None,
            collapse_white_space: false,
            resolved_type: None,
            is_complex: false,
            is_list_type: false,
            mixed_extension_error: false,
            is_extended: false,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.min_occurs == 0
    }

    pub fn is_repeated(&self) -> bool {
        self.max_occurs.is_repeated()
    }

    pub fn is_wildcard(&self) -> bool {
        self.kind == NodeKind::Wildcard
    }

    /// Whether this node should become a generated type of its own.
    pub fn is_emittable(&self) -> bool {
        self.is_explicitly_defined && self.is_complex
    }

    pub fn primitive(&self) -> Option<Primitive> {
        match self.resolved_type {
            Some(ResolvedType::Primitive(p)) => Some(p),
            _ => None,
        }
    }
}
