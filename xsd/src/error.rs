use thiserror::Error;

/// A fatal error while building the schema tree. Anything that is not fatal is
/// reported through [`crate::Diagnostics`] instead.
#[derive(Debug, Error)]
pub enum XsdError {
    #[error("XML syntax error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("Schema source is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("End tag {found:?} does not match open tag {expected:?}")]
    UnbalancedEnd { expected: String, found: String },
    #[error("End tag {0:?} without a matching start tag")]
    UnexpectedEnd(String),
    #[error("Event stream ended with {0} unclosed tag(s)")]
    Unclosed(usize),
    #[error("Document has no schema root element")]
    MissingSchemaRoot,
    #[error("<{tag}> {reason}")]
    MalformedNesting { tag: String, reason: &'static str },
    #[error("Top-level <{tag}> is missing the {attribute:?} attribute")]
    MissingAttribute { tag: String, attribute: &'static str },
    #[error("<{tag}> has an invalid {attribute} value {value:?}")]
    InvalidOccurs {
        tag: String,
        attribute: &'static str,
        value: String,
    },
}
