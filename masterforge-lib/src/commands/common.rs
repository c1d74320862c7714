//! Processing shared by every command: global flags, logging, colors and project loading.

use super::LOG_TARGET;
use super::config::Config;
use crate::Result;
use crate::meta::TableMeta;
use crate::schema::{EVERY_TARGET, Precompiled, Protoc, SchemaReader, TableDefinition};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use core::fmt::Display;
use ohno::EnrichableExt;
use owo_colors::OwoColorize;

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Arguments accepted by every command
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to configuration file (default is `masterforge.toml`)
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Read tables from a precompiled descriptor set instead of running protoc
    #[arg(long, value_name = "PATH", global = true)]
    pub descriptor_set: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,
}

/// How a piece of console output should stand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Warn,
    Bad,
    Strong,
}

/// Initialize logger based on log level
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // a second command in the same process keeps the first logger
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}

fn use_colors(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            use std::io::{IsTerminal, stdout};
            stdout().is_terminal()
        }
    }
}

/// A loaded configuration together with the directory its relative paths hang off.
#[derive(Debug)]
pub struct Project {
    pub root: Utf8PathBuf,
    pub config: Config,
    descriptor_set: Option<Utf8PathBuf>,
    colors: bool,
}

impl Project {
    pub fn load(args: &CommonArgs) -> Result<Self> {
        let root = args
            .config
            .as_ref()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_str().is_empty())
            .map_or_else(|| Utf8PathBuf::from("."), Utf8Path::to_path_buf);

        let config = Config::load(&root, args.config.as_ref())?;
        log::debug!(target: LOG_TARGET, "Loaded configuration rooted at '{root}'");

        Ok(Self {
            root,
            config,
            descriptor_set: args.descriptor_set.clone(),
            colors: use_colors(args.color),
        })
    }

    /// Resolves a configured path against the project root.
    #[must_use]
    pub fn path(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() { path.to_path_buf() } else { self.root.join(path) }
    }

    #[must_use]
    pub fn schema_dir(&self) -> Utf8PathBuf {
        self.path(&self.config.schema_dir)
    }

    #[must_use]
    pub fn tabular_dir(&self) -> Utf8PathBuf {
        self.path(&self.config.tabular_dir)
    }

    #[must_use]
    pub fn output_dir(&self) -> Utf8PathBuf {
        self.path(&self.config.output_dir)
    }

    #[must_use]
    pub fn generated_dir(&self) -> Utf8PathBuf {
        self.path(&self.config.generated_dir)
    }

    #[must_use]
    pub fn database_path(&self) -> Utf8PathBuf {
        self.path(&self.config.database.path)
    }

    /// Compiles and reads every table definition of the schema tree.
    pub fn read_schema(&self) -> Result<Vec<TableDefinition>> {
        let schema_dir = self.schema_dir();
        let descriptor_out = self.path(&self.config.descriptor_out);
        let options = self.config.reader_options();

        let tables = if let Some(set) = &self.descriptor_set {
            SchemaReader::new(&Precompiled::new(set.clone()), options).read(&schema_dir, &descriptor_out)
        } else {
            let protoc = Protoc::new(self.config.protoc.as_ref().map(|p| self.path(p)), self.path(&self.config.tools_dir));
            SchemaReader::new(&protoc, options).read(&schema_dir, &descriptor_out)
        };

        tables.map_err(|e| e.enrich_with(|| format!("reading schema from '{schema_dir}'")))
    }

    /// Runtime metadata of every table with every column, regardless of deploy masks.
    pub fn catalog(&self, defs: &[TableDefinition]) -> Result<Vec<TableMeta>> {
        let mut catalog = Vec::with_capacity(defs.len());
        for def in defs {
            if let Some(meta) = TableMeta::from_definition(def, &self.config.namespace, EVERY_TARGET)? {
                catalog.push(meta);
            }
        }
        Ok(catalog)
    }

    /// Styles `text` when colored output is enabled.
    pub fn paint(&self, text: impl Display, tone: Tone) -> String {
        if !self.colors {
            return text.to_string();
        }

        match tone {
            Tone::Good => text.green().bold().to_string(),
            Tone::Warn => text.yellow().bold().to_string(),
            Tone::Bad => text.red().bold().to_string(),
            Tone::Strong => text.bold().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(config: Option<&str>) -> CommonArgs {
        CommonArgs {
            config: config.map(Utf8PathBuf::from),
            descriptor_set: None,
            color: ColorMode::Never,
            log_level: LogLevel::None,
        }
    }

    #[test]
    fn test_paths_resolve_against_config_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let config = root.join("masterforge.toml");
        std::fs::write(&config, "tabular_dir = \"/abs/data\"\n").unwrap();

        let project = Project::load(&args(Some(config.as_str()))).unwrap();
        assert_eq!(project.root, root);
        assert_eq!(project.schema_dir(), root.join("schema"));
        assert_eq!(project.tabular_dir(), Utf8PathBuf::from("/abs/data"));
        assert_eq!(project.database_path(), root.join("build/master.db"));
    }

    #[test]
    fn test_paint_without_colors_is_plain() {
        let project = Project {
            root: ".".into(),
            config: Config::default(),
            descriptor_set: None,
            colors: false,
        };
        assert_eq!(project.paint("ok", Tone::Good), "ok");

        let colored = Project { colors: true, ..project };
        assert_ne!(colored.paint("ok", Tone::Good), "ok");
        assert!(colored.paint("ok", Tone::Good).contains("ok"));
    }

    #[test]
    fn test_catalog_keeps_every_column() {
        use crate::schema::test_tables::item_table;

        let project = Project {
            root: ".".into(),
            config: Config::default(),
            descriptor_set: None,
            colors: false,
        };
        let catalog = project.catalog(&[item_table()]).unwrap();
        assert_eq!(catalog[0].namespace, "masterdata");
        assert!(catalog[0].find_column("DropWeight").is_some());
    }
}
