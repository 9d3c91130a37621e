//! Linter definition and the check interface

use crate::offense::{OffenseSink, Severity};
use crate::template::Template;

/// A lint check run against one parsed template.
///
/// Linters are stateless: `run` may be called for any number of
/// templates, concurrently, on one shared instance.
pub trait Linter: Send + Sync {
    /// Unique linter identifier (e.g. "require-input-autocomplete")
    fn name(&self) -> &'static str;

    /// Short description shown in listings
    fn description(&self) -> &'static str;

    /// Default severity for offenses from this linter
    fn severity(&self) -> Severity {
        Severity::Warning
    }

    /// Run the check against a template, reporting into the sink
    fn run(&self, template: &Template, sink: &mut OffenseSink);
}
