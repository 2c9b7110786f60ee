use std::collections::HashMap;

/// Replaces characters that cannot appear in identifiers (`:`, `-`, `.`) by `_`.
pub fn cleanup_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ':' | '-' | '.' => '_',
            c => c,
        })
        .collect()
}

/// User supplied renames applied after [`cleanup_name`], typically to steer clear
/// of target-language keywords (`type` -> `type_`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameTable {
    entries: HashMap<String, String>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.entries.insert(from.into(), to.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn map<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries.get(name).map(String::as_str).unwrap_or(name)
    }

    /// The sanitized identifier for a raw schema name.
    pub fn clean(&self, name: &str) -> String {
        let cleaned = cleanup_name(name);
        self.map(&cleaned).to_owned()
    }
}

impl FromIterator<(String, String)> for NameTable {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_replaces_separators() {
        assert_eq!(cleanup_name("tns:order-line.item"), "tns_order_line_item");
        assert_eq!(cleanup_name("plain"), "plain");
    }

    #[test]
    fn name_table_applies_after_cleanup() {
        let mut table = NameTable::new();
        table.insert("type", "type_");
        table.insert("a_b", "ab");
        assert_eq!(table.clean("type"), "type_");
        assert_eq!(table.clean("a-b"), "ab");
        assert_eq!(table.clean("other"), "other");
    }
}
