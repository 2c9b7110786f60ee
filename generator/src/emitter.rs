use xsdgen_front::{Facets, Primitive, SimpleTypeDef};

/// Where a field comes from in the schema.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Element,
    /// `xs:any` content, collected into `anytypeobjs_`.
    Wildcard,
    Attribute,
    /// Character content of simple-content or mixed types (`valueOf_`).
    Value,
    /// Attributes matched by `xs:anyAttribute` (`anyAttributes_`).
    AnyAttributes,
    /// Name of the concrete subtype on types others extend (`extensiontype_`).
    ExtensionType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    Primitive(Primitive),
    /// A generated type, by its clean name.
    Complex(String),
    Any,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    /// Name part used to build accessors, styled by the configuration.
    pub accessor: String,
    pub kind: FieldKind,
    pub type_: FieldType,
    pub repeated: bool,
    pub optional: bool,
    pub default: Option<String>,
    pub documentation: Option<String>,
    /// The user simple type the field's value is declared with.
    pub simple_type: Option<String>,
    pub facets: Facets,
}

/// A target-language backend.
///
/// For every generated type the hooks are called in a fixed order:
/// `begin_type`, `documentation` (if any), `field` for each field in
/// declaration order with `validator` after the first field using a given
/// restricted simple type, `comparators`, `serialize_hooks`,
/// `deserialize_hooks`, `user_methods` per matching method spec and finally
/// `end_type`. A type's base is always finished before the type begins.
pub trait Emitter {
    fn begin_type(&mut self, parent: Option<&str>, name: &str);

    fn documentation(&mut self, text: &str);

    fn field(&mut self, field: &Field);

    fn validator(&mut self, simple_type: &SimpleTypeDef);

    fn comparators(&mut self);

    fn serialize_hooks(&mut self);

    fn deserialize_hooks(&mut self);

    fn user_methods(&mut self, source: &str);

    fn end_type(&mut self);

    /// Takes everything rendered so far.
    fn finish(&mut self) -> String;
}
