use quick_xml::events::Event;
use quick_xml::Reader;

use crate::builder::SchemaBuilder;
use crate::error::XsdError;
use crate::{Options, SchemaModel};

/// Attributes of a start tag in document order, with raw (prefixed) names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    pairs: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One structural event of the schema document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaEvent {
    Start { name: String, attributes: Attributes },
    Text(String),
    End { name: String },
}

impl SchemaEvent {
    pub fn start<K, V>(name: &str, attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Start {
            name: name.to_owned(),
            attributes: attributes.into_iter().collect(),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::Text(text.to_owned())
    }

    pub fn end(name: &str) -> Self {
        Self::End {
            name: name.to_owned(),
        }
    }
}

/// Streams `source` through the builder without materializing a DOM.
pub fn build_from_str(source: &str, options: &Options) -> Result<SchemaModel, XsdError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().expand_empty_elements = true;
    reader.config_mut().check_end_names = true;

    let mut builder = SchemaBuilder::new(options);
    loop {
        let event = match reader.read_event()? {
            Event::Start(tag) => {
                let name = std::str::from_utf8(tag.name().as_ref())?.to_owned();
                let mut attributes = Attributes::new();
                for attribute in tag.attributes() {
                    let attribute = attribute?;
                    let key = std::str::from_utf8(attribute.key.as_ref())?.to_owned();
                    let value = attribute.unescape_value()?.into_owned();
                    attributes.push(key, value);
                }
                SchemaEvent::Start { name, attributes }
            }
            Event::End(tag) => SchemaEvent::End {
                name: std::str::from_utf8(tag.name().as_ref())?.to_owned(),
            },
            Event::Text(text) => SchemaEvent::Text(text.unescape()?.into_owned()),
            Event::CData(data) => {
                SchemaEvent::Text(std::str::from_utf8(&data.into_inner())?.to_owned())
            }
            Event::Eof => break,
            // comments, processing instructions, the prolog and DOCTYPE
            _ => continue,
        };
        builder.feed(event)?;
    }
    builder.finish()
}

/// Builds from an already tokenized event stream.
pub fn build_from_events(
    events: impl IntoIterator<Item = SchemaEvent>,
    options: &Options,
) -> Result<SchemaModel, XsdError> {
    let mut builder = SchemaBuilder::new(options);
    for event in events {
        builder.feed(event)?;
    }
    builder.finish()
}
