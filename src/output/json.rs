//! JSON output formatter

use super::OutputFormatter;
use crate::engine::LintResult;
use crate::offense::{Offense, OffenseNode, Severity};
use serde::Serialize;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    offenses: Vec<JsonOffense<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonOffense<'a> {
    linter: &'a str,
    severity: &'a str,
    message: &'a str,
    file: String,
    line: usize,
    column: usize,
    length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_line: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<JsonNode<'a>>,
}

#[derive(Serialize)]
struct JsonNode<'a> {
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    line: usize,
    column: usize,
    length: usize,
}

#[derive(Serialize)]
struct JsonSummary {
    files_processed: usize,
    files_with_errors: usize,
    files_with_warnings: usize,
    error_count: usize,
    warning_count: usize,
    info_count: usize,
    duration_ms: u128,
}

fn severity_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "info",
    }
}

fn json_node(node: &OffenseNode) -> JsonNode<'_> {
    let (kind, name) = match node {
        OffenseNode::Attribute { name, .. } => ("attribute", Some(name.as_str())),
        OffenseNode::Region { .. } => ("region", None),
        OffenseNode::Call { method, .. } => ("call", Some(method.as_str())),
    };
    let location = node.location();
    JsonNode {
        kind,
        name,
        line: location.line,
        column: location.column,
        length: location.length,
    }
}

fn json_offense(offense: &Offense) -> JsonOffense<'_> {
    JsonOffense {
        linter: &offense.linter,
        severity: severity_str(offense.severity),
        message: &offense.message,
        file: offense.location.file.display().to_string(),
        line: offense.location.line,
        column: offense.location.column,
        length: offense.location.length,
        source_line: offense.source_line.as_deref(),
        help: offense.help.as_deref(),
        nodes: offense.nodes.iter().map(json_node).collect(),
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &LintResult) -> String {
        let output = JsonOutput {
            offenses: result.offenses.iter().map(json_offense).collect(),
            summary: JsonSummary {
                files_processed: result.files_processed,
                files_with_errors: result.files_with_errors,
                files_with_warnings: result.files_with_warnings,
                error_count: result.error_count,
                warning_count: result.warning_count,
                info_count: result.info_count,
                duration_ms: result.duration.as_millis(),
            },
        };

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_default()
        } else {
            serde_json::to_string(&output).unwrap_or_default()
        }
    }

    fn format_offense(&self, offense: &Offense) -> String {
        let json = json_offense(offense);

        if self.pretty {
            serde_json::to_string_pretty(&json).unwrap_or_default()
        } else {
            serde_json::to_string(&json).unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offense::Location;
    use std::path::PathBuf;

    #[test]
    fn test_json_format_offense() {
        let formatter = JsonFormatter::new();
        let offense = Offense::new(
            "require-input-autocomplete",
            Severity::Warning,
            "Test message",
            Location::new(PathBuf::from("form.html.erb"), 10, 5),
        );

        let output = formatter.format_offense(&offense);
        assert!(output.contains("\"linter\":\"require-input-autocomplete\""));
        assert!(output.contains("\"severity\":\"warning\""));
        assert!(output.contains("\"line\":10"));
    }

    #[test]
    fn test_json_serializes_contributing_nodes() {
        let formatter = JsonFormatter::new();
        let offense = Offense::new(
            "require-input-autocomplete",
            Severity::Warning,
            "Test message",
            Location::new(PathBuf::from("form.html.erb"), 2, 1).with_length(24),
        )
        .with_node(OffenseNode::Call {
            method: "date_field_tag".to_string(),
            location: Location::new(PathBuf::from("form.html.erb"), 2, 5).with_length(14),
        });

        let output = formatter.format_offense(&offense);
        assert!(output.contains("\"kind\":\"call\""));
        assert!(output.contains("\"name\":\"date_field_tag\""));
        assert!(output.contains("\"length\":14"));
    }

    #[test]
    fn test_json_format_result() {
        let formatter = JsonFormatter::new();
        let result = LintResult {
            offenses: vec![],
            files_processed: 5,
            error_count: 2,
            warning_count: 3,
            ..Default::default()
        };

        let output = formatter.format(&result);
        assert!(output.contains("\"files_processed\":5"));
        assert!(output.contains("\"error_count\":2"));
        assert!(output.contains("\"warning_count\":3"));
    }

    #[test]
    fn test_json_pretty() {
        let formatter = JsonFormatter::new().pretty();
        let offense = Offense::new(
            "require-input-autocomplete",
            Severity::Warning,
            "msg",
            Location::new(PathBuf::from("form.html.erb"), 1, 1),
        );

        let output = formatter.format_offense(&offense);
        assert!(output.contains('\n'));
    }
}
