use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;
use xsdgen::{generate_source, write_output, Config, Emitter, Field, Generator};
use xsdgen_front::{SimpleTypeDef, XsdError};

const CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- product catalog -->
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:cat="urn:catalog" targetNamespace="urn:catalog">
  <xs:element name="catalog">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="book" type="cat:Book" maxOccurs="unbounded"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>

  <xs:complexType name="Book">
    <xs:complexContent>
      <xs:extension base="cat:Item">
        <xs:sequence>
          <xs:group ref="cat:Credits"/>
          <xs:element name="format" type="cat:Format" minOccurs="0"/>
        </xs:sequence>
        <xs:attributeGroup ref="cat:Audit"/>
      </xs:extension>
    </xs:complexContent>
  </xs:complexType>

  <xs:complexType name="Item">
    <xs:annotation><xs:documentation>Anything for sale.</xs:documentation></xs:annotation>
    <xs:sequence>
      <xs:element name="title" type="xs:string"/>
      <xs:element name="price" type="cat:Price"/>
    </xs:sequence>
    <xs:attribute name="sku" type="xs:ID" use="required"/>
  </xs:complexType>

  <xs:complexType name="Price">
    <xs:simpleContent>
      <xs:extension base="xs:decimal">
        <xs:attribute name="currency" type="xs:string" default="EUR"/>
      </xs:extension>
    </xs:simpleContent>
  </xs:complexType>

  <xs:group name="Credits">
    <xs:sequence>
      <xs:element name="author" type="xs:string" maxOccurs="unbounded"/>
    </xs:sequence>
  </xs:group>

  <xs:attributeGroup name="Audit">
    <xs:attribute name="created" type="xs:dateTime"/>
  </xs:attributeGroup>

  <xs:simpleType name="Format">
    <xs:restriction base="xs:string">
      <xs:enumeration value="hardcover"/>
      <xs:enumeration value="paperback"/>
    </xs:restriction>
  </xs:simpleType>
</xs:schema>
"#;

#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
}

impl Emitter for Recorder {
    fn begin_type(&mut self, parent: Option<&str>, name: &str) {
        self.calls.push(format!("begin {name} {parent:?}"));
    }
    fn documentation(&mut self, text: &str) {
        self.calls.push(format!("doc {text}"));
    }
    fn field(&mut self, field: &Field) {
        self.calls.push(format!("field {}", field.name));
    }
    fn validator(&mut self, simple_type: &SimpleTypeDef) {
        self.calls.push(format!("validator {}", simple_type.name));
    }
    fn comparators(&mut self) {}
    fn serialize_hooks(&mut self) {}
    fn deserialize_hooks(&mut self) {}
    fn user_methods(&mut self, _source: &str) {}
    fn end_type(&mut self) {
        self.calls.push("end".to_owned());
    }
    fn finish(&mut self) -> String {
        self.calls.join("\n")
    }
}

#[test]
fn catalog_generates_every_type_base_first() {
    let mut recorder = Recorder::default();
    let generated = generate_source(CATALOG, None, &Config::default(), &mut recorder).unwrap();

    assert_eq!(generated.report.emitted, vec!["catalog", "Item", "Price", "Book"]);
    assert_eq!(generated.report.cycles, 1);
    assert!(generated.report.rejected.is_empty());
    assert!(!generated.diagnostics.has_errors(), "{:?}", generated.diagnostics);

    let code = generated.code;
    let book = code.find("begin Book Some(\"Item\")").unwrap();
    let item = code.find("begin Item None").unwrap();
    assert!(item < book);

    let book_calls: Vec<&str> = code[book..].lines().take_while(|l| *l != "end").collect();
    assert_eq!(
        book_calls,
        vec![
            "begin Book Some(\"Item\")",
            "field author",
            "field format",
            "validator Format",
            "field created",
        ]
    );
    assert!(code.contains("doc Anything for sale."));
    assert!(code.contains("field valueOf_"));
    assert!(code.contains("field extensiontype_"));
}

#[cfg(feature = "generator-rust")]
#[test]
fn catalog_renders_rust() {
    let mut emitter = Generator::Rust.emitter();
    let generated = generate_source(CATALOG, None, &Config::default(), emitter.as_mut()).unwrap();
    let code = generated.code;
    assert!(code.contains("pub struct Catalog {"), "{code}");
    assert!(code.contains("pub book: Vec<Book>,"), "{code}");
    assert!(code.contains("pub base: Item,"), "{code}");
    assert!(code.contains("pub author: Vec<String>,"), "{code}");
    assert!(code.contains("pub fn validate_format(value: &str) -> bool"), "{code}");
    assert!(code.find("pub struct Item").unwrap() < code.find("pub struct Book").unwrap());
}

#[cfg(feature = "generator-typescript")]
#[test]
fn catalog_renders_typescript() {
    let mut emitter = Generator::Typescript.emitter();
    let generated = generate_source(CATALOG, None, &Config::default(), emitter.as_mut()).unwrap();
    let code = generated.code;
    assert!(code.contains("export class Book extends Item {"), "{code}");
    assert!(code.contains("  currency: string = \"EUR\";"), "{code}");
    assert!(code.contains("  sku!: string;"), "{code}");
}

#[test]
fn namespace_prefix_override() {
    let source = r#"<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema">
        <xsd:complexType name="Point">
          <xsd:attribute name="x" type="xsd:int"/>
        </xsd:complexType>
      </xsd:schema>"#;
    let mut recorder = Recorder::default();
    let generated =
        generate_source(source, Some("xsd".to_owned()), &Config::default(), &mut recorder).unwrap();
    assert_eq!(generated.report.emitted, vec!["Point"]);
    assert!(generated.diagnostics.is_empty(), "{:?}", generated.diagnostics);
}

#[test]
fn malformed_schema_is_fatal() {
    let mut recorder = Recorder::default();
    let err = generate_source(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"><xs:element name="a"></xs:schema>"#,
        None,
        &Config::default(),
        &mut recorder,
    )
    .unwrap_err();
    assert!(matches!(err, XsdError::Xml(_)), "{err:?}");
    assert!(recorder.calls.is_empty());
}

#[test]
fn output_file_is_not_overwritten_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.txt");
    let mut recorder = Recorder::default();
    let generated = generate_source(CATALOG, None, &Config::default(), &mut recorder).unwrap();

    write_output(&path, &generated.code, false).unwrap();
    assert!(write_output(&path, "", false).is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), generated.code);
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn diagnostics_stay_out_of_the_default_log() {
    let source = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:t="urn:t">
        <xs:complexType name="Holder">
          <xs:sequence><xs:element name="v" type="t:Nowhere"/></xs:sequence>
        </xs:complexType>
      </xs:schema>"#;
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_writer(move || writer.clone())
        .finish();

    let mut recorder = Recorder::default();
    let generated = tracing::subscriber::with_default(subscriber, || {
        generate_source(source, None, &Config::default(), &mut recorder).unwrap()
    });

    assert_eq!(generated.diagnostics.matching("is not declared").count(), 1);
    let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(log.is_empty(), "{log}");
}
