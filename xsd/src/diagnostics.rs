use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A non-fatal finding, attributed to the schema node (by name) it concerns.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub severity: Severity,
    pub node: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.node.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{}: {}: {}", self.severity, self.node, self.message)
        }
    }
}

/// Ordered collection of diagnostics for one pipeline run.
///
/// Every record is also mirrored to `tracing` at debug level as it is pushed,
/// so a subscriber sees diagnostics in context. The collection itself is what
/// callers print, once the run is over.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, node: impl Into<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            severity,
            node: node.into(),
            message: message.into(),
        };
        tracing::debug!(
            severity = %diagnostic.severity,
            node = %diagnostic.node,
            "{}",
            diagnostic.message
        );
        self.records.push(diagnostic);
    }

    pub fn info(&mut self, node: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Info, node, message)
    }

    pub fn warning(&mut self, node: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, node, message)
    }

    pub fn error(&mut self, node: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Error, node, message)
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.records.extend(other.records);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.records.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.records.iter().any(|d| d.severity == Severity::Error)
    }

    /// Records whose message contains `needle`; mostly useful in tests.
    pub fn matching<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.records.iter().filter(move |d| d.message.contains(needle))
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
