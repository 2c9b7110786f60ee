use super::Resolver;

impl Resolver<'_> {
    /// Cleans every name and registers the declarations later passes look up
    /// by name: top-level ones, and any node with children, attributes or a
    /// base.
    ///
    /// A second declaration under an existing key replaces the first. That is
    /// kept for compatibility but always reported.
    pub(super) fn register_symbols(&mut self) {
        for id in self.declarations() {
            let clean_name = self.names.clean(&self.model.node(id).name);
            let node = self.model.node_mut(id);
            node.clean_name = clean_name;
            for attribute in node.attribute_defs.values_mut() {
                attribute.clean_name = self.names.clean(&attribute.name);
            }

            let node = self.model.node(id);
            let wanted = node.is_top_level
                || !node.children.is_empty()
                || !node.attribute_defs.is_empty()
                || node.base.is_some();
            if !wanted || node.name.is_empty() {
                continue;
            }
            let name = node.name.clone();
            if let Some(previous) = self.model.tables.register_element(&name, id) {
                if previous != id {
                    self.diagnostics.warning(
                        &name,
                        "declared more than once; the later declaration replaces the earlier one",
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::resolve_source;
    use crate::names::NameTable;
    use crate::{read_schema, Options};

    #[test]
    fn registers_only_relevant_nodes() {
        let (model, _) = resolve_source(
            r#"<xs:element name="top" type="xs:string"/>
               <xs:complexType name="T">
                 <xs:sequence>
                   <xs:element name="plain" type="xs:string"/>
                   <xs:element name="withAttr"><xs:complexType><xs:attribute name="a"/></xs:complexType></xs:element>
                   <xs:element name="derived"><xs:complexType><xs:complexContent><xs:extension base="T"/></xs:complexContent></xs:complexType></xs:element>
                 </xs:sequence>
               </xs:complexType>"#,
        );
        let tables = &model.tables;
        assert!(tables.element("top").is_some());
        assert!(tables.element("T").is_some());
        assert!(tables.element("withAttr").is_some());
        assert!(tables.element("derived").is_some());
        assert!(tables.element("plain").is_none());
        assert!(tables.element("schema").is_none());
    }

    #[test]
    fn duplicate_registration_is_reported_and_later_wins() {
        let (model, diagnostics) = resolve_source(
            r#"<xs:complexType name="Dup"><xs:attribute name="first"/></xs:complexType>
               <xs:complexType name="Dup"><xs:attribute name="second"/></xs:complexType>"#,
        );
        let dup = model.node(model.tables.element("Dup").unwrap());
        assert!(dup.attribute_defs.contains_key("second"));
        assert_eq!(diagnostics.matching("declared more than once").count(), 1);
    }

    #[test]
    fn clean_names_use_the_name_table() {
        let mut name_table = NameTable::new();
        name_table.insert("type", "type_");
        let options = Options {
            name_table,
            ..Options::default()
        };
        let source = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:complexType name="order-line">
                <xs:attribute name="type" type="xs:string"/>
              </xs:complexType>
            </xs:schema>"#;
        let (model, _) = read_schema(source, &options).unwrap();
        let node = model.node(model.tables.element("order-line").unwrap());
        assert_eq!(node.clean_name, "order_line");
        assert_eq!(node.attribute_defs.get("type").unwrap().clean_name, "type_");
    }
}
