//! Core lint engine
//!
//! Owns the registered linters and drives them over template files,
//! applying configuration (enable/disable, severity overrides, per-file
//! ignores) and inline suppression comments before offenses reach the
//! caller.

use crate::config::Config;
use crate::linter::Linter;
use crate::offense::{Location, Offense, OffenseSink, Severity};
use crate::template::Template;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Per-linter timing statistics
#[derive(Debug, Clone, Default)]
pub struct LinterTiming {
    /// Linter name
    pub linter: String,
    /// Total time spent in this linter
    pub total_time: Duration,
    /// Number of files the linter ran over
    pub runs: usize,
    /// Number of offenses kept after suppression
    pub offense_count: usize,
}

impl LinterTiming {
    /// Create a new timing entry
    pub fn new(linter: &str) -> Self {
        Self {
            linter: linter.to_string(),
            ..Default::default()
        }
    }

    /// Average time per run
    pub fn avg_time(&self) -> Duration {
        if self.runs > 0 {
            self.total_time / self.runs as u32
        } else {
            Duration::ZERO
        }
    }
}

/// Result of a lint run
#[derive(Debug, Default)]
pub struct LintResult {
    /// All offenses, tag-rule findings before call-rule findings per file
    pub offenses: Vec<Offense>,

    /// Files processed
    pub files_processed: usize,

    /// Files with errors
    pub files_with_errors: usize,

    /// Files with warnings
    pub files_with_warnings: usize,

    /// Total errors
    pub error_count: usize,

    /// Total warnings
    pub warning_count: usize,

    /// Total info messages
    pub info_count: usize,

    /// Processing duration
    pub duration: Duration,

    /// Per-linter timing statistics (linter name -> timing)
    pub timings: HashMap<String, LinterTiming>,
}

impl LintResult {
    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        self.warning_count > 0
    }

    /// Check if result is clean (no errors or warnings)
    pub fn is_clean(&self) -> bool {
        self.error_count == 0 && self.warning_count == 0
    }

    /// Get exit code (0 = success, 1 = warnings, 2 = errors)
    pub fn exit_code(&self) -> i32 {
        if self.error_count > 0 {
            2
        } else if self.warning_count > 0 {
            1
        } else {
            0
        }
    }

    /// Merge another result into this one
    pub fn merge(&mut self, other: LintResult) {
        self.offenses.extend(other.offenses);
        self.files_processed += other.files_processed;
        self.files_with_errors += other.files_with_errors;
        self.files_with_warnings += other.files_with_warnings;
        self.error_count += other.error_count;
        self.warning_count += other.warning_count;
        self.info_count += other.info_count;

        for (name, timing) in other.timings {
            let entry = self
                .timings
                .entry(name)
                .or_insert_with(|| LinterTiming::new(&timing.linter));
            entry.total_time += timing.total_time;
            entry.runs += timing.runs;
            entry.offense_count += timing.offense_count;
        }
    }

    /// Get timings sorted by total time (descending)
    pub fn sorted_timings(&self) -> Vec<&LinterTiming> {
        let mut timings: Vec<_> = self.timings.values().collect();
        timings.sort_by(|a, b| b.total_time.cmp(&a.total_time));
        timings
    }

    /// Format timing statistics as a string
    pub fn format_timings(&self) -> String {
        let mut output = String::new();
        let timings = self.sorted_timings();

        if timings.is_empty() {
            return "No timing data available".to_string();
        }

        output.push_str("Linter Timing Statistics:\n");
        output.push_str(&format!(
            "{:<40} {:>12} {:>12} {:>10} {:>12}\n",
            "Linter", "Total", "Avg", "Files", "Offenses"
        ));
        output.push_str(&"-".repeat(90));
        output.push('\n');

        for timing in timings {
            let total_ms = timing.total_time.as_secs_f64() * 1000.0;
            let avg_us = timing.avg_time().as_secs_f64() * 1_000_000.0;

            output.push_str(&format!(
                "{:<40} {:>10.2}ms {:>10.2}µs {:>10} {:>12}\n",
                timing.linter, total_ms, avg_us, timing.runs, timing.offense_count
            ));
        }

        output
    }
}

/// The main lint engine
pub struct Engine {
    /// Configuration
    config: Config,

    /// Registered linters, run in registration order
    linters: Vec<Box<dyn Linter>>,

    /// Number of context lines to include
    context_lines: usize,
}

impl Engine {
    /// Create a new engine with configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            linters: Vec::new(),
            context_lines: 0,
        }
    }

    /// Set the number of context lines to include
    pub fn with_context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    /// Register a linter
    pub fn register(&mut self, linter: Box<dyn Linter>) {
        log::debug!("Registered linter {}", linter.name());
        self.linters.push(linter);
    }

    /// Lint multiple files
    pub fn lint(&self, files: &[PathBuf]) -> LintResult {
        let start = Instant::now();

        let results: Vec<LintResult> = if self.config.engine.parallel {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(if self.config.engine.jobs > 0 {
                    self.config.engine.jobs
                } else {
                    num_cpus::get()
                })
                .build()
                .unwrap_or_else(|_| rayon::ThreadPoolBuilder::new().build().unwrap());

            pool.install(|| files.par_iter().map(|f| self.lint_file(f)).collect())
        } else {
            files.iter().map(|f| self.lint_file(f)).collect()
        };

        let mut combined = LintResult::default();
        for result in results {
            combined.merge(result);
        }

        combined.duration = start.elapsed();
        combined
    }

    /// Lint a single file
    pub fn lint_file(&self, path: &Path) -> LintResult {
        let mut result = LintResult {
            files_processed: 1,
            ..LintResult::default()
        };

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                result.offenses.push(Offense::new(
                    "file-read-error",
                    Severity::Error,
                    format!("Failed to read file: {}", e),
                    Location::new(path.to_path_buf(), 0, 0),
                ));
                result.error_count = 1;
                result.files_with_errors = 1;
                return result;
            }
        };

        let template = match Template::parse(&content, path) {
            Ok(t) => t,
            Err(e) => {
                let (line, column) = e.position();
                result.offenses.push(
                    Offense::new(
                        "parse-error",
                        Severity::Error,
                        format!("Template parse error: {}", e),
                        Location::new(path.to_path_buf(), line, column),
                    )
                    .with_help("Check for unterminated ERB tags or quoted attribute values"),
                );
                result.error_count = 1;
                result.files_with_errors = 1;
                return result;
            }
        };

        let (offenses, timings) = self.run_linters(&template);

        for offense in &offenses {
            match offense.severity {
                Severity::Error => result.error_count += 1,
                Severity::Warning => result.warning_count += 1,
                Severity::Info => result.info_count += 1,
            }
        }

        if result.error_count > 0 {
            result.files_with_errors = 1;
        }
        if result.warning_count > 0 {
            result.files_with_warnings = 1;
        }

        result.offenses = offenses;
        result.timings = timings;
        result
    }

    /// Run every enabled linter over a parsed template
    fn run_linters(&self, template: &Template) -> (Vec<Offense>, HashMap<String, LinterTiming>) {
        let mut offenses = Vec::new();
        let mut timings: HashMap<String, LinterTiming> = HashMap::new();

        for linter in &self.linters {
            let name = linter.name();
            if !self.config.is_linter_enabled(name) {
                continue;
            }
            if self
                .config
                .should_ignore_linter_for_file(name, template.path())
            {
                continue;
            }
            if template.is_rule_disabled_for_file(name) {
                continue;
            }

            let start = Instant::now();
            let mut sink = OffenseSink::new();
            linter.run(template, &mut sink);
            let elapsed = start.elapsed();

            let mut kept = 0;
            for mut offense in sink.into_offenses() {
                if template.is_rule_disabled(name, offense.location.line) {
                    continue;
                }
                if let Some(severity) = self.config.get_severity_override(name) {
                    offense.severity = severity;
                }
                offenses.push(self.attach_source(offense, template));
                kept += 1;
            }

            let timing = timings
                .entry(name.to_string())
                .or_insert_with(|| LinterTiming::new(name));
            timing.total_time += elapsed;
            timing.runs += 1;
            timing.offense_count += kept;
        }

        (offenses, timings)
    }

    /// Attach the source line and surrounding context to an offense
    fn attach_source(&self, mut offense: Offense, template: &Template) -> Offense {
        let line = offense.location.line;
        let Some(source_line) = template.get_source_line(line) else {
            return offense;
        };
        offense = offense.with_source_line(source_line);

        if self.context_lines > 0 {
            let first = line.saturating_sub(self.context_lines).max(1);
            let before: Vec<(usize, String)> = (first..line)
                .filter_map(|n| template.get_source_line(n).map(|l| (n, l.to_string())))
                .collect();
            let after: Vec<(usize, String)> = (line + 1..=line + self.context_lines)
                .filter_map(|n| template.get_source_line(n).map(|l| (n, l.to_string())))
                .collect();
            offense = offense.with_context_before(before).with_context_after(after);
        }

        offense
    }
}
