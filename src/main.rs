//! Tinter CLI - ERB Template Linter
//!
//! Lints ERB templates for form inputs with no declared autocomplete
//! behaviour.

use clap::{Parser, ValueEnum};
use colored::Colorize;
use glob::glob;
use std::path::PathBuf;
use tinter::config::{ColorMode, Config, OutputFormat};
use tinter::engine::Engine;
use tinter::linters::all_linters;
use tinter::output::{JsonFormatter, OutputFormatter, TextFormatter};
use tinter::{Linter, Severity};

#[derive(Parser)]
#[command(
    name = "tinter",
    version,
    about = "ERB template linter",
    long_about = "A fast linter for ERB templates. Flags form inputs that leave \
                  autocomplete behaviour unspecified, in literal markup and in \
                  Rails form-helper calls alike."
)]
struct Cli {
    /// Files or glob patterns to lint
    files: Vec<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value = "0")]
    jobs: usize,

    /// Disable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// Only enable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,

    /// Minimum severity to report
    #[arg(long, value_enum)]
    min_severity: Option<MinSeverity>,

    /// Show statistics
    #[arg(long)]
    stats: bool,

    /// List available rules and exit
    #[arg(long)]
    list_rules: bool,

    /// Show detailed information about a specific rule
    #[arg(long)]
    explain: Option<String>,

    /// Exit with 0 even if offenses are found
    #[arg(long)]
    exit_zero: bool,

    /// Show source context lines around offenses
    #[arg(long, default_value = "0")]
    context: usize,

    /// Show per-rule timing statistics
    #[arg(long)]
    timing: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum MinSeverity {
    Info,
    Warning,
    Error,
}

fn severity_colored(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "error".red(),
        Severity::Warning => "warning".yellow(),
        Severity::Info => "info".blue(),
    }
}

/// Helper function to print a rule in a consistent format
fn print_rule(linter: &dyn Linter) {
    println!(
        "    {} [{}]",
        linter.name().cyan(),
        severity_colored(linter.severity())
    );
    println!("      {}", linter.description());
}

/// Print detailed rule explanation
fn explain_rule(linter: &dyn Linter) {
    println!("{}", "Rule Details".bold());
    println!();
    println!("  {}: {}", "ID".bold(), linter.name().cyan());
    println!(
        "  {}: {}",
        "Severity".bold(),
        severity_colored(linter.severity())
    );
    println!();
    println!("  {}", "Description".bold());
    println!("  {}", linter.description());
}

/// Handle the --explain flag
fn handle_explain(name: &str) {
    for linter in all_linters() {
        if linter.name() == name {
            explain_rule(linter.as_ref());
            return;
        }
    }

    eprintln!("{}: Rule '{}' not found", "error".red().bold(), name);
    eprintln!();
    eprintln!("Use {} to see all available rules", "--list-rules".cyan());
    std::process::exit(1);
}

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    // Handle --no-color
    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Some(name) = &cli.explain {
        handle_explain(name);
        return;
    }

    if cli.list_rules {
        println!("{}", "Available rules:".bold());
        println!();
        for linter in all_linters() {
            print_rule(linter.as_ref());
        }
        println!();
        return;
    }

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path).unwrap_or_else(|e| {
            eprintln!("{}: Failed to load config: {}", "error".red().bold(), e);
            std::process::exit(1);
        })
    } else {
        Config::load_default().unwrap_or_default()
    };

    // Merge CLI arguments
    let format = match cli.format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
    };

    config.merge_cli(
        Some(format),
        Some(cli.verbose),
        Some(cli.jobs),
        cli.disable.clone(),
        cli.select.clone(),
    );

    if cli.files.is_empty() {
        eprintln!("{}: No files specified", "error".red().bold());
        eprintln!();
        eprintln!("Usage: tinter [OPTIONS] <FILES>...");
        eprintln!();
        eprintln!("For more information, try '--help'");
        std::process::exit(2);
    }

    // Create engine and register all built-in linters
    let mut engine = Engine::new(config.clone());
    if cli.context > 0 {
        engine = engine.with_context_lines(cli.context);
    }
    for linter in all_linters() {
        engine.register(linter);
    }

    // Expand glob patterns
    let mut files: Vec<PathBuf> = Vec::new();
    for pattern in &cli.files {
        match glob(pattern) {
            Ok(paths) => {
                for entry in paths.flatten() {
                    if entry.is_file() {
                        files.push(entry);
                    }
                }
            }
            Err(e) => {
                eprintln!(
                    "{}: Invalid pattern '{}': {}",
                    "error".red().bold(),
                    pattern,
                    e
                );
                std::process::exit(1);
            }
        }
    }

    if files.is_empty() {
        eprintln!("{}: No files found to lint", "error".red().bold());
        std::process::exit(1);
    }

    if cli.verbose {
        eprintln!("Linting {} files...", files.len());
    }

    let mut result = engine.lint(&files);

    // Filter by minimum severity
    if let Some(min_sev) = cli.min_severity {
        let min = match min_sev {
            MinSeverity::Info => Severity::Info,
            MinSeverity::Warning => Severity::Warning,
            MinSeverity::Error => Severity::Error,
        };
        result.offenses.retain(|o| o.severity >= min);

        // Recalculate counts
        result.error_count = result
            .offenses
            .iter()
            .filter(|o| o.severity == Severity::Error)
            .count();
        result.warning_count = result
            .offenses
            .iter()
            .filter(|o| o.severity == Severity::Warning)
            .count();
        result.info_count = result
            .offenses
            .iter()
            .filter(|o| o.severity == Severity::Info)
            .count();
    }

    // Create formatter
    let formatter: Box<dyn OutputFormatter> = match config.output.format {
        OutputFormat::Text => {
            let mut f = TextFormatter::new();
            if cli.no_color || config.output.color == ColorMode::Never {
                f = f.without_color();
            }
            f.show_stats = cli.stats || config.output.statistics;
            Box::new(f)
        }
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
    };

    // Output results
    let output = formatter.format(&result);
    print!("{}", output);

    // Show timing statistics if requested
    if cli.timing {
        eprintln!();
        eprintln!("{}", result.format_timings());
    }

    // Exit with appropriate code
    let exit_code = if cli.exit_zero {
        0
    } else {
        result.exit_code()
    };
    std::process::exit(exit_code);
}
