//! Offense types for lint findings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Severity level of an offense
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,
    /// Warning - should be fixed but not critical
    Warning,
    /// Error - must be fixed
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// Source location of an offense
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// File path
    pub file: PathBuf,

    /// Line number (1-based)
    pub line: usize,

    /// Column number (1-based)
    pub column: usize,

    /// Length of the offending span in characters
    pub length: usize,
}

impl Location {
    /// Create a new location with a single-character span
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self {
            file,
            line,
            column,
            length: 1,
        }
    }

    /// Set the span length
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }
}

/// A node that contributed to an offense, kept for downstream
/// suppression or correction tooling
#[derive(Debug, Clone, PartialEq)]
pub enum OffenseNode {
    /// An attribute on the offending tag (e.g. a valueless `autocomplete`)
    Attribute { name: String, location: Location },

    /// A whole embedded-code region
    Region { location: Location },

    /// A call expression found inside a region
    Call { method: String, location: Location },
}

impl OffenseNode {
    /// Location of the contributing node
    pub fn location(&self) -> &Location {
        match self {
            OffenseNode::Attribute { location, .. } => location,
            OffenseNode::Region { location } => location,
            OffenseNode::Call { location, .. } => location,
        }
    }

    /// Short description used by the text formatter
    pub fn describe(&self) -> String {
        match self {
            OffenseNode::Attribute { name, .. } => format!("attribute `{}`", name),
            OffenseNode::Region { .. } => "embedded code region".to_string(),
            OffenseNode::Call { method, .. } => format!("call to `{}`", method),
        }
    }
}

/// A single lint finding
#[derive(Debug, Clone, PartialEq)]
pub struct Offense {
    /// Name of the linter that produced this offense
    pub linter: String,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Where the offense occurred
    pub location: Location,

    /// The source line containing the offense
    pub source_line: Option<String>,

    /// Lines before the offense (line number, content)
    pub context_before: Vec<(usize, String)>,

    /// Lines after the offense (line number, content)
    pub context_after: Vec<(usize, String)>,

    /// Optional help text
    pub help: Option<String>,

    /// Nodes that contributed to the finding, in reporting order
    pub nodes: Vec<OffenseNode>,
}

impl Offense {
    /// Create a new offense
    pub fn new(
        linter: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            linter: linter.into(),
            severity,
            message: message.into(),
            location,
            source_line: None,
            context_before: Vec::new(),
            context_after: Vec::new(),
            help: None,
            nodes: Vec::new(),
        }
    }

    /// Attach the source line
    pub fn with_source_line(mut self, line: impl Into<String>) -> Self {
        self.source_line = Some(line.into());
        self
    }

    /// Attach context lines before the offense
    pub fn with_context_before(mut self, lines: Vec<(usize, String)>) -> Self {
        self.context_before = lines;
        self
    }

    /// Attach context lines after the offense
    pub fn with_context_after(mut self, lines: Vec<(usize, String)>) -> Self {
        self.context_after = lines;
        self
    }

    /// Attach help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attach a contributing node
    pub fn with_node(mut self, node: OffenseNode) -> Self {
        self.nodes.push(node);
        self
    }
}

/// Collector that linters report offenses into.
///
/// Preserves insertion order; the host drains it once per linter run.
#[derive(Debug, Default)]
pub struct OffenseSink {
    offenses: Vec<Offense>,
}

impl OffenseSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an offense
    pub fn add(&mut self, offense: Offense) {
        self.offenses.push(offense);
    }

    /// Number of collected offenses
    pub fn len(&self) -> usize {
        self.offenses.len()
    }

    /// Whether the sink is empty
    pub fn is_empty(&self) -> bool {
        self.offenses.is_empty()
    }

    /// Collected offenses in insertion order
    pub fn offenses(&self) -> &[Offense] {
        &self.offenses
    }

    /// Consume the sink, yielding offenses in insertion order
    pub fn into_offenses(self) -> Vec<Offense> {
        self.offenses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Info.to_string(), "info");
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Error.to_string(), "error");
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("info".parse::<Severity>().unwrap(), Severity::Info);
        assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("ERROR".parse::<Severity>().unwrap(), Severity::Error);
        assert!("critical".parse::<Severity>().is_err());
    }

    #[test]
    fn test_location() {
        let loc = Location::new(PathBuf::from("form.html.erb"), 3, 2).with_length(5);
        assert_eq!(loc.line, 3);
        assert_eq!(loc.column, 2);
        assert_eq!(loc.length, 5);
    }

    #[test]
    fn test_offense_builder() {
        let offense = Offense::new(
            "require-input-autocomplete",
            Severity::Warning,
            "Input tag is missing an autocomplete attribute.",
            Location::new(PathBuf::from("form.html.erb"), 1, 2),
        )
        .with_source_line("<input type=\"email\">")
        .with_help("Add an autocomplete attribute")
        .with_node(OffenseNode::Attribute {
            name: "autocomplete".to_string(),
            location: Location::new(PathBuf::from("form.html.erb"), 1, 22),
        });

        assert_eq!(offense.linter, "require-input-autocomplete");
        assert_eq!(offense.severity, Severity::Warning);
        assert!(offense.source_line.is_some());
        assert!(offense.help.is_some());
        assert_eq!(offense.nodes.len(), 1);
        assert_eq!(offense.nodes[0].describe(), "attribute `autocomplete`");
    }

    #[test]
    fn test_sink_preserves_order() {
        let mut sink = OffenseSink::new();
        let file = PathBuf::from("a.erb");
        sink.add(Offense::new(
            "first",
            Severity::Warning,
            "one",
            Location::new(file.clone(), 1, 1),
        ));
        sink.add(Offense::new(
            "second",
            Severity::Error,
            "two",
            Location::new(file, 2, 1),
        ));

        assert_eq!(sink.len(), 2);
        let offenses = sink.into_offenses();
        assert_eq!(offenses[0].linter, "first");
        assert_eq!(offenses[1].linter, "second");
    }
}
