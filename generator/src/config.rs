//! Generator configuration.
//!
//! Loaded from a TOML file given on the command line:
//! ```toml
//! accessor_style = "capitalized"
//!
//! [name_table]
//! type = "type_"
//!
//! [[methods]]
//! pattern = "^Order"
//! source = "// extra members for {class_name}"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use xsdgen_front::NameTable;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file")]
    Parse(#[from] toml::de::Error),
    #[error("invalid pattern {pattern:?} in method spec")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// How field names turn into accessor names.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessorStyle {
    /// `name` becomes `_name`, giving `get_name`/`set_name`.
    #[default]
    Underscored,
    /// `name` becomes `Name`, giving `getName`/`setName`.
    Capitalized,
}

impl AccessorStyle {
    pub fn accessor(self, name: &str) -> String {
        match self {
            Self::Underscored => format!("_{name}"),
            Self::Capitalized => {
                let mut chars = name.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

/// Extra source attached to every generated type whose name matches.
#[derive(Clone, Debug)]
pub struct MethodSpec {
    pattern: Regex,
    source: String,
}

impl MethodSpec {
    pub fn new(pattern: &str, source: impl Into<String>) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern).map_err(|source| ConfigError::Pattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(Self {
            pattern,
            source: source.into(),
        })
    }

    /// Unanchored, like a search: anchor the pattern to match whole names.
    pub fn matches(&self, class_name: &str) -> bool {
        self.pattern.is_match(class_name)
    }

    pub fn render(&self, class_name: &str) -> String {
        self.source.replace("{class_name}", class_name)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMethodSpec {
    pattern: String,
    source: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    name_table: HashMap<String, String>,
    accessor_style: AccessorStyle,
    methods: Vec<RawMethodSpec>,
}

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub name_table: NameTable,
    pub accessor_style: AccessorStyle,
    pub methods: Vec<MethodSpec>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        content.parse()
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let raw: RawConfig = toml::from_str(content)?;
        let methods = raw
            .methods
            .into_iter()
            .map(|spec| MethodSpec::new(&spec.pattern, spec.source))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            name_table: raw.name_table.into_iter().collect(),
            accessor_style: raw.accessor_style,
            methods,
        })
    }
}
