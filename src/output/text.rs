//! Human-readable text output formatter

use super::OutputFormatter;
use crate::engine::LintResult;
use crate::offense::{Offense, Severity};
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show source context
    pub show_source: bool,

    /// Show help text
    pub show_help: bool,

    /// Show statistics
    pub show_stats: bool,

    /// Show context lines before/after
    pub show_context: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_source: true,
            show_help: true,
            show_stats: true,
            show_context: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn severity_str(&self, severity: Severity) -> ColoredString {
        let s = format!("{}", severity);
        if !self.colored {
            return s.normal();
        }
        match severity {
            Severity::Error => s.red().bold(),
            Severity::Warning => s.yellow().bold(),
            Severity::Info => s.blue(),
        }
    }

    fn format_location(&self, offense: &Offense) -> String {
        format!(
            "{}:{}:{}",
            offense.location.file.display(),
            offense.location.line,
            offense.location.column
        )
    }

    fn pipe(&self) -> String {
        if self.colored {
            "|".blue().to_string()
        } else {
            "|".to_string()
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &LintResult) -> String {
        let mut output = String::new();

        // Group offenses by file
        let mut by_file: std::collections::HashMap<_, Vec<_>> = std::collections::HashMap::new();
        for offense in &result.offenses {
            by_file
                .entry(offense.location.file.clone())
                .or_default()
                .push(offense);
        }

        for (file, offenses) in &by_file {
            if self.colored {
                output.push_str(&format!("{}\n", file.display().to_string().underline()));
            } else {
                output.push_str(&format!("{}\n", file.display()));
            }

            for offense in offenses {
                output.push_str(&self.format_offense(offense));
                output.push('\n');
            }
            output.push('\n');
        }

        if self.show_stats {
            output.push_str(&format!(
                "\n{} {} processed",
                result.files_processed,
                if result.files_processed == 1 {
                    "file"
                } else {
                    "files"
                }
            ));

            let mut counts = Vec::new();
            if result.error_count > 0 {
                let s = format!(
                    "{} {}",
                    result.error_count,
                    if result.error_count == 1 {
                        "error"
                    } else {
                        "errors"
                    }
                );
                counts.push(if self.colored {
                    s.red().to_string()
                } else {
                    s
                });
            }
            if result.warning_count > 0 {
                let s = format!(
                    "{} {}",
                    result.warning_count,
                    if result.warning_count == 1 {
                        "warning"
                    } else {
                        "warnings"
                    }
                );
                counts.push(if self.colored {
                    s.yellow().to_string()
                } else {
                    s
                });
            }
            if result.info_count > 0 {
                let s = format!(
                    "{} {}",
                    result.info_count,
                    if result.info_count == 1 { "info" } else { "infos" }
                );
                counts.push(if self.colored {
                    s.blue().to_string()
                } else {
                    s
                });
            }

            if !counts.is_empty() {
                output.push_str(&format!(": {}", counts.join(", ")));
            }
            output.push('\n');

            output.push_str(&format!(
                "Finished in {:.2}s\n",
                result.duration.as_secs_f64()
            ));
        }

        output
    }

    fn format_offense(&self, offense: &Offense) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}: {}[{}]: {}\n",
            self.format_location(offense),
            self.severity_str(offense.severity),
            if self.colored {
                offense.linter.cyan().to_string()
            } else {
                offense.linter.clone()
            },
            offense.message
        ));

        if self.show_source {
            output.push_str(&format!("   {}\n", self.pipe()));

            if self.show_context {
                for (line_num, line) in &offense.context_before {
                    let num_str = format!("{:>4}", line_num);
                    output.push_str(&format!(
                        "{} {} {}\n",
                        if self.colored {
                            num_str.dimmed().to_string()
                        } else {
                            num_str
                        },
                        self.pipe(),
                        if self.colored {
                            line.dimmed().to_string()
                        } else {
                            line.clone()
                        }
                    ));
                }
            }

            if let Some(source) = &offense.source_line {
                let line_num = format!("{:>4}", offense.location.line);
                output.push_str(&format!(
                    "{} {} {}\n",
                    if self.colored {
                        line_num.blue().to_string()
                    } else {
                        line_num
                    },
                    self.pipe(),
                    source
                ));

                // Underline the offending span
                if offense.location.column > 0 {
                    let padding = " ".repeat(offense.location.column - 1);
                    let underline = "^".repeat(offense.location.length.max(1));
                    output.push_str(&format!(
                        "   {} {}{}\n",
                        self.pipe(),
                        padding,
                        if self.colored {
                            underline.red().to_string()
                        } else {
                            underline
                        }
                    ));
                }
            }

            if self.show_context {
                for (line_num, line) in &offense.context_after {
                    let num_str = format!("{:>4}", line_num);
                    output.push_str(&format!(
                        "{} {} {}\n",
                        if self.colored {
                            num_str.dimmed().to_string()
                        } else {
                            num_str
                        },
                        self.pipe(),
                        if self.colored {
                            line.dimmed().to_string()
                        } else {
                            line.clone()
                        }
                    ));
                }
            }
        }

        if self.show_help {
            if let Some(help) = &offense.help {
                output.push_str(&format!(
                    "   {} help: {}\n",
                    if self.colored {
                        "=".blue().to_string()
                    } else {
                        "=".to_string()
                    },
                    help
                ));
            }
        }

        for node in &offense.nodes {
            let location = node.location();
            output.push_str(&format!(
                "   {} note: {} at {}:{}\n",
                if self.colored {
                    "=".blue().to_string()
                } else {
                    "=".to_string()
                },
                node.describe(),
                location.line,
                location.column
            ));
        }

        output
    }
}
