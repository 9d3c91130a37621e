//! Configuration for lint runs
//!
//! Reads configuration from:
//! - `.tinterrc.yaml` / `.tinterrc.json` (project-level)
//! - `~/.tinterrc.yaml` (user-level)
//!
//! Files may extend other files via `extends`; later layers win.

use crate::offense::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Enable parallel processing
    pub parallel: bool,

    /// Number of parallel jobs (0 = auto-detect)
    pub jobs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormat,

    /// Color mode
    pub color: ColorMode,

    /// Verbose output
    pub verbose: bool,

    /// Show statistics
    pub statistics: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: ColorMode::Auto,
            verbose: false,
            statistics: true,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// File handling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Include patterns
    pub include: Vec<String>,

    /// Exclude patterns
    pub exclude: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: vec!["**/*.html.erb".to_string(), "**/*.erb".to_string()],
            exclude: vec![
                "**/node_modules/**".to_string(),
                "**/vendor/**".to_string(),
                "**/tmp/**".to_string(),
            ],
        }
    }
}

/// Linter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LintersConfig {
    /// Disabled linters
    pub disabled: Vec<String>,

    /// Enabled linters (empty = all)
    pub enabled: Vec<String>,

    /// Severity overrides (linter name -> severity)
    pub severity: HashMap<String, Severity>,

    /// Per-file linter ignores (glob pattern -> linter names)
    pub per_file: HashMap<String, Vec<String>>,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extend from other configuration files
    pub extends: Vec<String>,

    /// Engine settings
    pub engine: EngineConfig,

    /// Output settings
    pub output: OutputConfig,

    /// File handling settings
    pub files: FilesConfig,

    /// Linter configuration
    pub linters: LintersConfig,
}

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_depth(path, 0)
    }

    /// Load with recursion depth limit (to prevent extends cycles)
    fn load_with_depth(path: &Path, depth: usize) -> Result<Self, ConfigError> {
        const MAX_DEPTH: usize = 10;
        if depth >= MAX_DEPTH {
            return Err(ConfigError::Invalid(
                "Maximum config inheritance depth exceeded".to_string(),
            ));
        }

        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let mut config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        if !config.extends.is_empty() {
            let base_dir = path.parent().unwrap_or(Path::new("."));
            let mut base_config = Self::default();

            for extend in &config.extends.clone() {
                let extend_path = if Path::new(extend).is_absolute() {
                    PathBuf::from(extend)
                } else {
                    base_dir.join(extend)
                };
                let extended = Self::load_with_depth(&extend_path, depth + 1)?;
                base_config.merge(extended);
            }

            base_config.merge(config);
            config = base_config;
        }

        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        // extends are resolved at load time, not inherited

        if other.engine.jobs != 0 {
            self.engine.jobs = other.engine.jobs;
        }
        self.engine.parallel = other.engine.parallel;

        if other.output.format != OutputFormat::Text {
            self.output.format = other.output.format;
        }
        if other.output.verbose {
            self.output.verbose = true;
        }
        if other.output.color != ColorMode::Auto {
            self.output.color = other.output.color;
        }

        self.files.include.extend(other.files.include);
        self.files.exclude.extend(other.files.exclude);

        self.linters.disabled.extend(other.linters.disabled);
        if !other.linters.enabled.is_empty() {
            self.linters.enabled = other.linters.enabled;
        }
        self.linters.severity.extend(other.linters.severity);
        for (pattern, linters) in other.linters.per_file {
            self.linters
                .per_file
                .entry(pattern)
                .or_default()
                .extend(linters);
        }
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_names = [
            ".tinterrc.yaml",
            ".tinterrc.yml",
            ".tinterrc.json",
            "tinter.yaml",
            "tinter.yml",
            "tinter.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            for name in &config_names {
                let path = home.join(name);
                if path.exists() {
                    return Self::load(&path);
                }
            }
        }

        Ok(Self::default())
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(
        &mut self,
        format: Option<OutputFormat>,
        verbose: Option<bool>,
        jobs: Option<usize>,
        disabled_linters: Option<Vec<String>>,
        enabled_linters: Option<Vec<String>>,
    ) {
        if let Some(f) = format {
            self.output.format = f;
        }
        if let Some(v) = verbose {
            self.output.verbose = v;
        }
        if let Some(j) = jobs {
            self.engine.jobs = j;
        }
        if let Some(disabled) = disabled_linters {
            self.linters.disabled.extend(disabled);
        }
        if let Some(enabled) = enabled_linters {
            self.linters.enabled = enabled;
        }
    }

    /// Check if a linter is enabled
    pub fn is_linter_enabled(&self, name: &str) -> bool {
        if self.linters.disabled.iter().any(|d| d == name) {
            return false;
        }

        // a non-empty enabled list is an allow-list
        if !self.linters.enabled.is_empty() {
            return self.linters.enabled.iter().any(|e| e == name);
        }

        true
    }

    /// Get severity override for a linter
    pub fn get_severity_override(&self, name: &str) -> Option<Severity> {
        self.linters.severity.get(name).copied()
    }

    /// Check if a linter should be ignored for a file
    pub fn should_ignore_linter_for_file(&self, name: &str, file_path: &Path) -> bool {
        let file_str = file_path.to_string_lossy();

        for (pattern, linters) in &self.linters.per_file {
            if let Ok(glob) = globset::Glob::new(pattern) {
                let matcher = glob.compile_matcher();
                if matcher.is_match(file_str.as_ref())
                    && (linters.iter().any(|l| l == "all") || linters.iter().any(|l| l == name))
                {
                    return true;
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::new();
        assert!(config.engine.parallel);
        assert_eq!(config.engine.jobs, 0);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config
            .files
            .include
            .contains(&"**/*.html.erb".to_string()));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_config_merge_cli() {
        let mut config = Config::new();
        config.merge_cli(
            Some(OutputFormat::Json),
            Some(true),
            Some(4),
            Some(vec!["linter-one".to_string()]),
            None,
        );

        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.verbose);
        assert_eq!(config.engine.jobs, 4);
        assert!(config.linters.disabled.contains(&"linter-one".to_string()));
    }

    #[test]
    fn test_linter_enabled() {
        let mut config = Config::new();

        assert!(config.is_linter_enabled("any-linter"));

        config.linters.disabled.push("disabled-linter".to_string());
        assert!(!config.is_linter_enabled("disabled-linter"));
        assert!(config.is_linter_enabled("other-linter"));

        config.linters.enabled = vec!["only-this".to_string()];
        assert!(!config.is_linter_enabled("other-linter"));
        assert!(config.is_linter_enabled("only-this"));
    }

    #[test]
    fn test_severity_override() {
        let mut config = Config::new();
        config
            .linters
            .severity
            .insert("linter-one".to_string(), Severity::Error);

        assert_eq!(
            config.get_severity_override("linter-one"),
            Some(Severity::Error)
        );
        assert_eq!(config.get_severity_override("linter-two"), None);
    }

    #[test]
    fn test_per_file_ignore() {
        let mut config = Config::new();
        config.linters.per_file.insert(
            "**/admin/**".to_string(),
            vec!["require-input-autocomplete".to_string()],
        );

        assert!(config.should_ignore_linter_for_file(
            "require-input-autocomplete",
            Path::new("app/views/admin/form.html.erb")
        ));
        assert!(!config.should_ignore_linter_for_file(
            "require-input-autocomplete",
            Path::new("app/views/public/form.html.erb")
        ));
        assert!(!config.should_ignore_linter_for_file(
            "other-linter",
            Path::new("app/views/admin/form.html.erb")
        ));
    }

    #[test]
    fn test_yaml_deserialize() {
        let yaml = r#"
engine:
  parallel: false
  jobs: 4
output:
  format: json
  verbose: true
linters:
  disabled:
    - linter-one
    - linter-two
  severity:
    linter-three: error
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.engine.parallel);
        assert_eq!(config.engine.jobs, 4);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.verbose);
        assert_eq!(config.linters.disabled.len(), 2);
        assert_eq!(
            config.get_severity_override("linter-three"),
            Some(Severity::Error)
        );
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tinter.yaml");
        fs::write(&path, "engine:\n  jobs: 2\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.engine.jobs, 2);
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tinter.toml");
        fs::write(&path, "jobs = 2\n").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_extends_inheritance() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base.yaml");
        fs::write(
            &base,
            "linters:\n  disabled:\n    - linter-one\n",
        )
        .unwrap();

        let child = dir.path().join("child.yaml");
        fs::write(
            &child,
            "extends:\n  - base.yaml\nlinters:\n  disabled:\n    - linter-two\n",
        )
        .unwrap();

        let config = Config::load(&child).unwrap();
        assert!(!config.is_linter_enabled("linter-one"));
        assert!(!config.is_linter_enabled("linter-two"));
        assert!(config.is_linter_enabled("linter-three"));
    }
}
