//! Schema front end: reads an XSD document as a stream of structural events,
//! builds a tree of declarations with its symbol tables, and resolves it into
//! a type graph ready for code generation.

pub mod builder;
pub mod builtins;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod model;
pub mod names;
pub mod resolver;
pub mod tables;

pub use builtins::{BuiltinTypes, Primitive};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::XsdError;
pub use events::{build_from_events, build_from_str, Attributes, SchemaEvent};
pub use model::{
    AttributeDef, AttributeGroupDef, AttributeMap, AttributeUse, Facets, MaxOccurs, NodeId,
    NodeKind, ResolvedType, SchemaNode, SimpleTypeDef,
};
pub use names::NameTable;
pub use resolver::resolve;
pub use tables::{SchemaModel, SymbolTables};

#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Prefix for built-in type names, overriding what the document declares.
    pub namespace_prefix: Option<String>,
    pub name_table: NameTable,
}

/// Builds and resolves `source` in one go.
///
/// Only a malformed document fails; everything the resolver stumbles over ends
/// up in the returned diagnostics.
pub fn read_schema(source: &str, options: &Options) -> Result<(SchemaModel, Diagnostics), XsdError> {
    let mut model = build_from_str(source, options)?;
    let diagnostics = resolve(&mut model, &options.name_table);
    Ok((model, diagnostics))
}
