use super::{registered_base, Resolver};

impl Resolver<'_> {
    /// Flags every node some other node extends.
    pub(super) fn mark_extended(&mut self) {
        for id in self.declarations() {
            if let Some(base) = registered_base(self.model, id) {
                if base != id {
                    self.model.node_mut(base).is_extended = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{named, resolve_source};

    #[test]
    fn bases_are_marked_extended() {
        let (model, _) = resolve_source(
            r#"<xs:complexType name="Base"><xs:attribute name="a"/></xs:complexType>
               <xs:complexType name="Derived">
                 <xs:complexContent><xs:extension base="tns:Base"/></xs:complexContent>
               </xs:complexType>
               <xs:complexType name="Narrowed">
                 <xs:complexContent><xs:restriction base="tns:Derived"/></xs:complexContent>
               </xs:complexType>"#,
        );
        assert!(named(&model, "Base").is_extended);
        assert!(!named(&model, "Derived").is_extended);
        assert!(!named(&model, "Narrowed").is_extended);
    }
}
