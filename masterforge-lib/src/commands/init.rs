use super::Host;
use super::common::CommonArgs;
use super::config::{CONFIG_FILE_NAME, Config};
use crate::Result;
use crate::schema::options::OPTIONS_PROTO;
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::{IntoAppError, bail};
use std::fs;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite files that already exist
    #[arg(long)]
    pub force: bool,
}

/// Writes the default configuration and the extension options schema next to it.
pub fn init_project<H: Host>(host: &mut H, common: &CommonArgs, args: &InitArgs) -> Result<()> {
    let config_path = common.config.clone().unwrap_or_else(|| Utf8PathBuf::from(CONFIG_FILE_NAME));
    let root = config_path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .map_or_else(|| Utf8PathBuf::from("."), Utf8PathBuf::from);

    let defaults = Config::default();
    let options_path = root.join(&defaults.schema_dir).join(&defaults.options_import);

    for path in [&config_path, &options_path] {
        if path.exists() && !args.force {
            bail!("'{path}' already exists, use --force to overwrite it");
        }
    }

    if !root.as_str().is_empty() {
        fs::create_dir_all(&root).into_app_err_with(|| format!("could not create directory '{root}'"))?;
    }
    Config::save_default(&config_path)?;
    let _ = writeln!(host.output(), "Generated default configuration file: {config_path}");

    if let Some(parent) = options_path.parent() {
        fs::create_dir_all(parent).into_app_err_with(|| format!("could not create directory '{parent}'"))?;
    }
    fs::write(&options_path, OPTIONS_PROTO).into_app_err_with(|| format!("writing '{options_path}'"))?;
    let _ = writeln!(host.output(), "Generated extension options schema: {options_path}");

    Ok(())
}
