//! Tinter - ERB Template Linter
//!
//! Finds form inputs in ERB templates that leave autocomplete behaviour
//! unspecified, whether written as literal `<input>` tags or through the
//! Rails helpers that render one.
//!
//! # Architecture
//!
//! ```text
//! CLI -> Engine -> Linter -> Template (tags + embedded-code regions)
//!                                          `-> ruby expression parser
//! ```
//!
//! The engine loads configuration, parses each template into flat tag and
//! embedded-code streams, runs every registered linter over them, and
//! collects offenses. Linters are registered explicitly from the
//! [`linters::all_linters`] table.
//!
//! # Suppressing findings inline
//!
//! ```text
//! <%# tinter-disable require-input-autocomplete %>
//! <%# tinter-disable-next-line require-input-autocomplete %>
//! <%# tinter-disable-file all %>
//! ```

pub mod config;
pub mod engine;
pub mod linter;
pub mod linters;
pub mod offense;
pub mod output;
pub mod ruby;
pub mod template;

// Re-export main types
pub use config::Config;
pub use engine::{Engine, LintResult, LinterTiming};
pub use linter::Linter;
pub use linters::all_linters;
pub use offense::{Location, Offense, OffenseNode, OffenseSink, Severity};
pub use output::{JsonFormatter, OutputFormatter, TextFormatter};
pub use ruby::{parse_fragment, Expr, ExprKind, RubySyntaxError};
pub use template::{ErbKind, ErbRegion, TagNode, Template};
