use xsdgen_front::{Primitive, SimpleTypeDef};

use crate::emitter::{Emitter, Field, FieldKind, FieldType};

/// Renders each type as an exported class; the base type becomes `extends`.
#[derive(Default)]
pub struct TypescriptEmitter {
    output: String,
    class_name: String,
    members: Vec<String>,
    methods: Vec<String>,
}

impl TypescriptEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn value_type(type_: &FieldType) -> String {
        match type_ {
            FieldType::Primitive(primitive) => Self::primitive_type(*primitive).to_owned(),
            FieldType::Complex(name) => name.clone(),
            FieldType::Any => "unknown".to_owned(),
        }
    }

    fn primitive_type(primitive: Primitive) -> &'static str {
        if primitive.is_boolean() {
            "boolean"
        } else if primitive.is_integer() || primitive.is_floating() {
            "number"
        } else {
            "string"
        }
    }

    fn literal(field: &Field, value: &str) -> String {
        match &field.type_ {
            FieldType::Primitive(p) if p.is_boolean() => value.trim().to_owned(),
            FieldType::Primitive(p) if p.is_integer() || p.is_floating() => value.trim().to_owned(),
            _ => format!("{value:?}"),
        }
    }

    fn member(field: &Field, type_: &str) -> String {
        let name = &field.name;
        match field.kind {
            FieldKind::AnyAttributes => format!("{name}: Record<string, string> = {{}};"),
            FieldKind::ExtensionType => format!("{name}?: string;"),
            _ if field.repeated => format!("{name}: {type_}[] = [];"),
            _ => match &field.default {
                Some(default) => format!("{name}: {type_} = {};", Self::literal(field, default)),
                None if field.optional => format!("{name}?: {type_};"),
                None => format!("{name}!: {type_};"),
            },
        }
    }
}

impl Emitter for TypescriptEmitter {
    fn begin_type(&mut self, parent: Option<&str>, name: &str) {
        self.class_name = name.to_owned();
        self.members.clear();
        self.methods.clear();
        match parent {
            Some(parent) => self
                .output
                .push_str(&format!("export class {name} extends {parent} {{\n")),
            None => self.output.push_str(&format!("export class {name} {{\n")),
        }
    }

    fn documentation(&mut self, text: &str) {
        // The class line is already written, so the comment goes on top of it.
        let Some(start) = self.output.rfind("export class ") else {
            return;
        };
        let mut comment = String::from("/**\n");
        for line in text.lines() {
            comment.push_str(&format!(" * {}\n", line.trim()));
        }
        comment.push_str(" */\n");
        self.output.insert_str(start, &comment);
    }

    fn field(&mut self, field: &Field) {
        let value = Self::value_type(&field.type_);
        let type_ = match field.kind {
            FieldKind::AnyAttributes => "Record<string, string>".to_owned(),
            FieldKind::ExtensionType => "string | undefined".to_owned(),
            _ if field.repeated => format!("{value}[]"),
            _ if field.optional && field.default.is_none() => format!("{value} | undefined"),
            _ => value.clone(),
        };
        if let Some(documentation) = &field.documentation {
            self.members.push(format!("/** {} */", documentation.replace('\n', " ")));
        }
        self.members.push(Self::member(field, &value));

        let name = &field.name;
        let accessor = &field.accessor;
        self.methods.push(format!("get{accessor}(): {type_} {{\n    return this.{name};\n  }}"));
        self.methods.push(format!("set{accessor}(value: {type_}): void {{\n    this.{name} = value;\n  }}"));
        if field.repeated && matches!(field.kind, FieldKind::Element | FieldKind::Wildcard) {
            self.methods.push(format!(
                "add{accessor}(value: {value}): void {{\n    this.{name}.push(value);\n  }}"
            ));
            self.methods.push(format!(
                "insert{accessor}(index: number, value: {value}): void {{\n    this.{name}.splice(index, 0, value);\n  }}"
            ));
            self.methods.push(format!(
                "remove{accessor}(index: number): {value} {{\n    return this.{name}.splice(index, 1)[0];\n  }}"
            ));
        }
    }

    fn validator(&mut self, simple_type: &SimpleTypeDef) {
        let facets = &simple_type.facets;
        let mut checks = Vec::new();
        if !facets.enumeration.is_empty() {
            let values: Vec<String> = facets.enumeration.iter().map(|v| format!("{v:?}")).collect();
            checks.push(format!("[{}].includes(value)", values.join(", ")));
        }
        if let Some(minimum) = &facets.minimum {
            checks.push(format!("Number(value) >= {}", minimum.trim()));
        }
        if let Some(maximum) = &facets.maximum {
            checks.push(format!("Number(value) <= {}", maximum.trim()));
        }
        if checks.is_empty() {
            checks.push("true".to_owned());
        }
        self.methods.push(format!(
            "static validate{}(value: string): boolean {{\n    return {};\n  }}",
            simple_type.name,
            checks.join(" && ")
        ));
    }

    fn comparators(&mut self) {
        let class_name = &self.class_name;
        self.methods.push(format!(
            "equals(other: {class_name}): boolean {{\n    return JSON.stringify(this) === JSON.stringify(other);\n  }}"
        ));
    }

    fn serialize_hooks(&mut self) {
        self.methods
            .push("toJSON(): Record<string, unknown> {\n    return { ...this };\n  }".to_owned());
    }

    fn deserialize_hooks(&mut self) {
        let class_name = &self.class_name;
        self.methods.push(format!(
            "static fromJSON(data: Record<string, unknown>): {class_name} {{\n    return Object.assign(new {class_name}(), data);\n  }}"
        ));
    }

    fn user_methods(&mut self, source: &str) {
        self.methods.push(source.trim().to_owned());
    }

    fn end_type(&mut self) {
        for member in self.members.drain(..) {
            self.output.push_str(&format!("  {member}\n"));
        }
        for method in self.methods.drain(..) {
            self.output.push_str(&format!("\n  {method}\n"));
        }
        self.output.push_str("}\n\n");
    }

    fn finish(&mut self) -> String {
        let body = std::mem::take(&mut self.output);
        format!(
            "// Generated by {} {}\n\n{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            body.trim_end()
        ) + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AccessorStyle, Config};
    use crate::orchestrator::generate;
    use xsdgen_front::{read_schema, Options};

    fn render(body: &str, config: &Config) -> String {
        let source = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="urn:t" targetNamespace="urn:t">{body}</xs:schema>"#
        );
        let (model, _) = read_schema(&source, &Options::default()).unwrap();
        let mut emitter = TypescriptEmitter::new();
        generate(&model, config, &mut emitter);
        emitter.finish()
    }

    #[test]
    fn renders_classes_with_extends_and_accessors() {
        let config = Config {
            accessor_style: AccessorStyle::Capitalized,
            ..Config::default()
        };
        let output = render(
            r#"<xs:complexType name="Base">
                 <xs:annotation><xs:documentation>Shared part.</xs:documentation></xs:annotation>
                 <xs:attribute name="id" type="xs:int" use="required"/>
               </xs:complexType>
               <xs:complexType name="Item">
                 <xs:complexContent><xs:extension base="tns:Base">
                   <xs:sequence>
                     <xs:element name="tag" type="xs:string" maxOccurs="unbounded"/>
                     <xs:element name="note" type="xs:string" minOccurs="0"/>
                     <xs:element name="active" type="xs:boolean" default="true"/>
                   </xs:sequence>
                 </xs:extension></xs:complexContent>
               </xs:complexType>"#,
            &config,
        );
        assert!(output.starts_with("// Generated by xsdgen "), "{output}");
        assert!(output.contains("/**\n * Shared part.\n */\nexport class Base {"), "{output}");
        assert!(output.contains("  id!: number;"), "{output}");
        assert!(output.contains("  extensiontype_?: string;"), "{output}");
        assert!(output.contains("export class Item extends Base {"), "{output}");
        assert!(output.contains("  tag: string[] = [];"), "{output}");
        assert!(output.contains("  note?: string;"), "{output}");
        assert!(output.contains("  active: boolean = true;"), "{output}");
        assert!(output.contains("addTag(value: string): void"), "{output}");
        assert!(output.contains("getNote(): string | undefined"), "{output}");
        assert!(output.contains("static fromJSON(data: Record<string, unknown>): Item"), "{output}");
        assert!(output.find("export class Base").unwrap() < output.find("export class Item").unwrap());
    }

    #[test]
    fn enumeration_validator() {
        let output = render(
            r#"<xs:simpleType name="Colour">
                 <xs:restriction base="xs:string"><xs:enumeration value="red"/><xs:enumeration value="blue"/></xs:restriction>
               </xs:simpleType>
               <xs:complexType name="Paint"><xs:attribute name="colour" type="tns:Colour"/></xs:complexType>"#,
            &Config::default(),
        );
        assert!(output.contains("static validateColour(value: string): boolean {\n    return [\"red\", \"blue\"].includes(value);"), "{output}");
        assert!(output.contains("get_colour(): string | undefined"), "{output}");
    }
}
