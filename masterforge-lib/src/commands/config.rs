use crate::Result;
use crate::schema::ReaderOptions;
use camino::{Utf8Path, Utf8PathBuf};
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "masterforge.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root of the schema source tree
    #[serde(default = "default_schema_dir")]
    pub schema_dir: Utf8PathBuf,

    /// Directory of tabular master data files
    #[serde(default = "default_tabular_dir")]
    pub tabular_dir: Utf8PathBuf,

    /// Directory receiving per-target binary snapshots
    #[serde(default = "default_output_dir")]
    pub output_dir: Utf8PathBuf,

    /// Directory of generated Rust sources
    #[serde(default = "default_generated_dir")]
    pub generated_dir: Utf8PathBuf,

    /// Descriptor set written by the schema compiler
    #[serde(default = "default_descriptor_out")]
    pub descriptor_out: Utf8PathBuf,

    /// Namespace recorded in generated code and snapshots
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Import path of the extension options used by scaffolded schema files
    #[serde(default = "default_options_import")]
    pub options_import: String,

    /// Schema files that never declare tables
    #[serde(default = "default_library_files")]
    pub library_files: Vec<String>,

    /// Explicit schema compiler path
    #[serde(default)]
    pub protoc: Option<Utf8PathBuf>,

    /// Bundled tool directory
    #[serde(default = "default_tools_dir")]
    pub tools_dir: Utf8PathBuf,

    /// Reject unsupported field types instead of reading them as int32
    #[serde(default)]
    pub strict_types: bool,

    /// Build targets, each owning one deploy bit
    #[serde(default = "default_targets")]
    pub targets: Vec<TargetConfig>,

    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub name: String,
    pub bit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub path: Utf8PathBuf,

    /// Schemas to seed, dump and diff. Tables outside `main` use `schema.table` tabular files
    #[serde(default = "default_database_schemas")]
    pub schemas: Vec<String>,

    /// Application-owned tables, seeded after every master table
    #[serde(default)]
    pub user_tables: Vec<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            schemas: default_database_schemas(),
            user_tables: Vec::new(),
        }
    }
}

fn default_schema_dir() -> Utf8PathBuf {
    "schema".into()
}

fn default_tabular_dir() -> Utf8PathBuf {
    "data".into()
}

fn default_output_dir() -> Utf8PathBuf {
    "build".into()
}

fn default_generated_dir() -> Utf8PathBuf {
    "generated".into()
}

fn default_descriptor_out() -> Utf8PathBuf {
    "build/schema.pb".into()
}

fn default_namespace() -> String {
    "masterdata".into()
}

fn default_options_import() -> String {
    "masterforge/options.proto".into()
}

fn default_library_files() -> Vec<String> {
    vec![default_options_import()]
}

fn default_tools_dir() -> Utf8PathBuf {
    "tools".into()
}

fn default_targets() -> Vec<TargetConfig> {
    vec![
        TargetConfig { name: "client".into(), bit: 1 },
        TargetConfig { name: "server".into(), bit: 2 },
        TargetConfig { name: "tool".into(), bit: 4 },
    ]
}

fn default_database_path() -> Utf8PathBuf {
    "build/master.db".into()
}

fn default_database_schemas() -> Vec<String> {
    vec!["main".into()]
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds invalid values
    pub fn load(workspace_root: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading masterforge configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = workspace_root.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading masterforge configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if targets are missing, duplicated or lack a deploy bit, or the namespace is empty
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(app_err!("namespace must not be empty"));
        }

        if self.targets.is_empty() {
            return Err(app_err!("at least one [[targets]] entry is required"));
        }

        let mut names = BTreeSet::new();
        for target in &self.targets {
            if target.name.trim().is_empty() {
                return Err(app_err!("target names must not be empty"));
            }

            if target.bit == 0 {
                return Err(app_err!("target '{}' must have a non-zero bit", target.name));
            }

            if !names.insert(target.name.as_str()) {
                return Err(app_err!("target '{}' is declared more than once", target.name));
            }
        }

        Ok(())
    }

    /// Looks up a target by name.
    ///
    /// # Errors
    ///
    /// Returns an error naming the known targets if `name` is not one of them
    pub fn target(&self, name: &str) -> Result<&TargetConfig> {
        self.targets.iter().find(|t| t.name == name).ok_or_else(|| {
            let known: Vec<_> = self.targets.iter().map(|t| t.name.as_str()).collect();
            app_err!("unknown target '{name}' (known targets: {})", known.join(", "))
        })
    }

    /// The targets named in `selected`, or every target when nothing is selected.
    ///
    /// # Errors
    ///
    /// Returns an error if a selected name is not a configured target
    pub fn select_targets(&self, selected: &[String]) -> Result<Vec<&TargetConfig>> {
        if selected.is_empty() {
            return Ok(self.targets.iter().collect());
        }
        selected.iter().map(|name| self.target(name)).collect()
    }

    #[must_use]
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            library_files: self.library_files.clone(),
            strict_types: self.strict_types,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}
