use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Prefix assumed when neither the caller nor the document names one.
pub const DEFAULT_PREFIX: &str = "xs";

macro_rules! primitives {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// The closed set of XSD built-in simple types.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Primitive {
            $($variant),*
        }

        impl Primitive {
            pub const ALL: &'static [Primitive] = &[$(Primitive::$variant),*];

            pub fn local_name(self) -> &'static str {
                match self {
                    $(Primitive::$variant => $name),*
                }
            }
        }
    };
}

primitives! {
    String => "string",
    NormalizedString => "normalizedString",
    Token => "token",
    Language => "language",
    Name => "Name",
    NcName => "NCName",
    QName => "QName",
    NmToken => "NMTOKEN",
    NmTokens => "NMTOKENS",
    Id => "ID",
    IdRef => "IDREF",
    IdRefs => "IDREFS",
    Entity => "ENTITY",
    Entities => "ENTITIES",
    Notation => "NOTATION",
    AnyUri => "anyURI",
    Base64Binary => "base64Binary",
    HexBinary => "hexBinary",
    Boolean => "boolean",
    Float => "float",
    Double => "double",
    Decimal => "decimal",
    Integer => "integer",
    NonPositiveInteger => "nonPositiveInteger",
    NegativeInteger => "negativeInteger",
    NonNegativeInteger => "nonNegativeInteger",
    PositiveInteger => "positiveInteger",
    Long => "long",
    Int => "int",
    Short => "short",
    Byte => "byte",
    UnsignedLong => "unsignedLong",
    UnsignedInt => "unsignedInt",
    UnsignedShort => "unsignedShort",
    UnsignedByte => "unsignedByte",
    Date => "date",
    DateTime => "dateTime",
    Time => "time",
    Duration => "duration",
    GDay => "gDay",
    GMonth => "gMonth",
    GMonthDay => "gMonthDay",
    GYear => "gYear",
    GYearMonth => "gYearMonth",
    AnySimpleType => "anySimpleType",
}

lazy_static! {
    static ref PRIMITIVES_BY_NAME: HashMap<&'static str, Primitive> = Primitive::ALL
        .iter()
        .map(|p| (p.local_name(), *p))
        .collect();
}

impl Primitive {
    pub fn from_local_name(name: &str) -> Option<Self> {
        PRIMITIVES_BY_NAME.get(name).copied()
    }

    pub fn is_integer(self) -> bool {
        use Primitive::*;
        matches!(
            self,
            Integer
                | NonPositiveInteger
                | NegativeInteger
                | NonNegativeInteger
                | PositiveInteger
                | Long
                | Int
                | Short
                | Byte
                | UnsignedLong
                | UnsignedInt
                | UnsignedShort
                | UnsignedByte
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, Self::Float | Self::Double | Self::Decimal)
    }

    pub fn is_boolean(self) -> bool {
        self == Self::Boolean
    }

    /// `ID`, `IDREF` and `IDREFS`, which generated code treats as plain strings.
    pub fn is_identifier(self) -> bool {
        matches!(self, Self::Id | Self::IdRef | Self::IdRefs)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.local_name())
    }
}

/// Schema constructs the builder reacts to; everything else is [`Tag::Other`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    Schema,
    Element,
    ComplexType,
    Group,
    Sequence,
    Choice,
    All,
    Any,
    AnyAttribute,
    Attribute,
    AttributeGroup,
    SimpleType,
    SimpleContent,
    ComplexContent,
    Restriction,
    Extension,
    Enumeration,
    MinInclusive,
    MaxInclusive,
    Union,
    List,
    WhiteSpace,
    Annotation,
    Documentation,
    Other,
}

impl Tag {
    fn from_local_name(name: &str) -> Self {
        match name {
            "schema" => Self::Schema,
            "element" => Self::Element,
            "complexType" => Self::ComplexType,
            "group" => Self::Group,
            "sequence" => Self::Sequence,
            "choice" => Self::Choice,
            "all" => Self::All,
            "any" => Self::Any,
            "anyAttribute" => Self::AnyAttribute,
            "attribute" => Self::Attribute,
            "attributeGroup" => Self::AttributeGroup,
            "simpleType" => Self::SimpleType,
            "simpleContent" => Self::SimpleContent,
            "complexContent" => Self::ComplexContent,
            "restriction" => Self::Restriction,
            "extension" => Self::Extension,
            "enumeration" => Self::Enumeration,
            "minInclusive" => Self::MinInclusive,
            "maxInclusive" => Self::MaxInclusive,
            "union" => Self::Union,
            "list" => Self::List,
            "whiteSpace" => Self::WhiteSpace,
            "annotation" => Self::Annotation,
            "documentation" => Self::Documentation,
            _ => Self::Other,
        }
    }
}

/// How a raw (possibly prefixed) type name classifies under the active prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRef {
    Primitive(Primitive),
    AnyType,
    Named(String),
}

/// Splits `prefix:local` into its parts; an unprefixed name has an empty prefix.
pub fn split_qname(raw: &str) -> (&str, &str) {
    match raw.rfind(':') {
        Some(index) => (&raw[..index], &raw[index + 1..]),
        None => ("", raw),
    }
}

/// Drops everything up to and including the last `:`.
pub fn strip_prefix(raw: &str) -> &str {
    split_qname(raw).1
}

/// The built-in type namespace bound to the prefix the schema uses for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltinTypes {
    prefix: String,
}

impl Default for BuiltinTypes {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl BuiltinTypes {
    /// `prefix` may be given with or without its trailing colon.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches(':').to_owned(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn local_in_namespace<'a>(&self, raw: &'a str) -> Option<&'a str> {
        let (prefix, local) = split_qname(raw);
        (prefix == self.prefix).then_some(local)
    }

    pub fn primitive(&self, raw: &str) -> Option<Primitive> {
        self.local_in_namespace(raw)
            .and_then(Primitive::from_local_name)
    }

    pub fn is_any_type(&self, raw: &str) -> bool {
        self.local_in_namespace(raw) == Some("anyType")
    }

    pub fn classify(&self, raw: &str) -> TypeRef {
        if let Some(primitive) = self.primitive(raw) {
            TypeRef::Primitive(primitive)
        } else if self.is_any_type(raw) {
            TypeRef::AnyType
        } else {
            TypeRef::Named(strip_prefix(raw).to_owned())
        }
    }

    pub fn tag(&self, raw: &str) -> Tag {
        self.local_in_namespace(raw)
            .map(Tag::from_local_name)
            .unwrap_or(Tag::Other)
    }

    /// Writes `local` the way the schema would spell a built-in, e.g. `xs:string`.
    pub fn qualify(&self, local: &str) -> String {
        if self.prefix.is_empty() {
            local.to_owned()
        } else {
            format!("{}:{}", self.prefix, local)
        }
    }

    pub fn string_type(&self) -> String {
        self.qualify(Primitive::String.local_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_primitive_round_trips_through_its_name() {
        assert_eq!(Primitive::ALL.len(), 45);
        for primitive in Primitive::ALL {
            assert_eq!(Primitive::from_local_name(primitive.local_name()), Some(*primitive));
        }
    }

    #[test]
    fn primitives_require_the_active_prefix() {
        let builtins = BuiltinTypes::new("xsd:");
        assert_eq!(builtins.primitive("xsd:int"), Some(Primitive::Int));
        assert_eq!(builtins.primitive("xs:int"), None);
        assert_eq!(builtins.primitive("int"), None);
        assert_eq!(
            builtins.classify("tns:Address"),
            TypeRef::Named("Address".into())
        );
        assert_eq!(builtins.classify("xsd:anyType"), TypeRef::AnyType);
    }

    #[test]
    fn empty_prefix_accepts_bare_names() {
        let builtins = BuiltinTypes::new("");
        assert_eq!(builtins.primitive("string"), Some(Primitive::String));
        assert_eq!(builtins.tag("element"), Tag::Element);
        assert_eq!(builtins.tag("xs:element"), Tag::Other);
        assert_eq!(builtins.string_type(), "string");
    }

    #[test]
    fn qualify_uses_prefix() {
        let builtins = BuiltinTypes::default();
        assert_eq!(builtins.string_type(), "xs:string");
        assert_eq!(builtins.tag("xs:complexType"), Tag::ComplexType);
        assert_eq!(builtins.tag("xs:pattern"), Tag::Other);
    }

    #[test]
    fn identifier_types() {
        assert!(Primitive::IdRefs.is_identifier());
        assert!(!Primitive::NcName.is_identifier());
        assert!(Primitive::UnsignedShort.is_integer());
        assert!(Primitive::Decimal.is_floating());
    }
}
