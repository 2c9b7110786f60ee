use std::collections::HashSet;

use super::{extension_chain, Resolver};

impl Resolver<'_> {
    /// An attribute sharing its name with a child element (own or inherited)
    /// moves to `<name>_attr`; the element keeps the plain name. When that
    /// name is taken too, a number is appended and a warning reported.
    pub(super) fn disambiguate_names(&mut self) {
        for id in self.declarations() {
            if self.model.node(id).attribute_defs.is_empty() {
                continue;
            }
            let chain = extension_chain(self.model, id).unwrap_or_else(|partial| partial);
            let element_names: HashSet<String> = chain
                .iter()
                .flat_map(|link| self.model.node(*link).children.iter())
                .map(|child| self.model.node(*child).clean_name.clone())
                .collect();

            let clashing: Vec<String> = self
                .model
                .node(id)
                .attribute_defs
                .iter()
                .filter(|(_, def)| element_names.contains(&def.clean_name))
                .map(|(key, _)| key.to_owned())
                .collect();

            for key in clashing {
                let node = self.model.node(id);
                let Some(clean_name) = node.attribute_defs.get(&key).map(|def| def.clean_name.clone())
                else {
                    continue;
                };
                let taken = |suffix: &str| {
                    node.attribute_defs.contains_key(&format!("{key}{suffix}"))
                        || node
                            .attribute_defs
                            .values()
                            .any(|def| def.clean_name == format!("{clean_name}{suffix}"))
                        || element_names.contains(&format!("{clean_name}{suffix}"))
                };
                let suffix = std::iter::once("_attr".to_owned())
                    .chain((2..).map(|n| format!("_attr{n}")))
                    .find(|suffix| !taken(suffix))
                    .unwrap_or_default();
                let name = node.name.clone();
                if suffix != "_attr" {
                    let wanted = format!("{key}_attr");
                    self.diagnostics.warning(
                        &name,
                        format!("attribute {key:?} clashes with a child element and {wanted:?} is taken"),
                    );
                }

                let new_key = format!("{key}{suffix}");
                let node = self.model.node_mut(id);
                if node.attribute_defs.rename(&key, &new_key) {
                    if let Some(def) = node.attribute_defs.get_mut(&new_key) {
                        def.clean_name = format!("{clean_name}{suffix}");
                    }
                    self.diagnostics.info(
                        name,
                        format!("attribute {key:?} clashes with a child element; renamed to {new_key:?}"),
                    );
                }
            }
        }
    }
}
