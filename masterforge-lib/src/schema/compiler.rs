use super::LOG_TARGET;
use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use ohno::{IntoAppError, bail};
use std::fs;
use std::process::{Command, Output, Stdio};

#[cfg(windows)]
const PROTOC_EXE: &str = "protoc.exe";
#[cfg(not(windows))]
const PROTOC_EXE: &str = "protoc";

/// Compiles schema source files into a self-contained descriptor set.
pub trait SchemaCompiler {
    /// Compiles `files` (relative to `schema_dir`) and writes the descriptor set to `descriptor_out`.
    fn compile(&self, schema_dir: &Utf8Path, files: &[String], descriptor_out: &Utf8Path) -> Result<()>;
}

/// Runs `protoc` as a child process.
#[derive(Debug, Clone)]
pub struct Protoc {
    explicit: Option<Utf8PathBuf>,
    tools_dir: Utf8PathBuf,
}

impl Protoc {
    #[must_use]
    pub const fn new(explicit: Option<Utf8PathBuf>, tools_dir: Utf8PathBuf) -> Self {
        Self { explicit, tools_dir }
    }

    /// Locates the compiler: the configured path, then the bundled tool directory, then `PATH`.
    pub fn resolve(&self) -> Result<Utf8PathBuf> {
        if let Some(path) = &self.explicit {
            if path.is_file() {
                return Ok(path.clone());
            }
            bail!("configured protoc '{path}' does not exist");
        }

        let bundled = self.tools_dir.join(PROTOC_EXE);
        if bundled.is_file() {
            return Ok(bundled);
        }

        if let Some(paths) = std::env::var_os("PATH") {
            for dir in std::env::split_paths(&paths) {
                let candidate = dir.join(PROTOC_EXE);
                if candidate.is_file()
                    && let Ok(candidate) = Utf8PathBuf::try_from(candidate)
                {
                    return Ok(candidate);
                }
            }
        }

        bail!(
            "unable to locate protoc: place it in '{}', install it on PATH, or set `protoc` in masterforge.toml",
            self.tools_dir
        );
    }
}

impl SchemaCompiler for Protoc {
    fn compile(&self, schema_dir: &Utf8Path, files: &[String], descriptor_out: &Utf8Path) -> Result<()> {
        let protoc = self.resolve()?;

        if let Some(parent) = descriptor_out.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent).into_app_err_with(|| format!("could not create directory '{parent}'"))?;
        }

        let mut cmd = Command::new(&protoc);
        let _ = cmd
            .arg("--include_imports")
            .arg(format!("--descriptor_set_out={descriptor_out}"))
            .arg(format!("--proto_path={schema_dir}"));

        let include = self.tools_dir.join("include");
        if include.is_dir() {
            let _ = cmd.arg(format!("--proto_path={include}"));
        }

        let _ = cmd.args(files).stdout(Stdio::piped()).stderr(Stdio::piped());

        log::debug!(target: LOG_TARGET, "Running {protoc} on {} file(s)", files.len());
        let output = cmd.output().into_app_err_with(|| format!("could not run '{protoc}'"))?;
        check_protoc_output(&output)
    }
}

/// Uses a descriptor set compiled ahead of time, for machines without `protoc`.
#[derive(Debug, Clone)]
pub struct Precompiled {
    path: Utf8PathBuf,
}

impl Precompiled {
    #[must_use]
    pub const fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }
}

impl SchemaCompiler for Precompiled {
    fn compile(&self, _schema_dir: &Utf8Path, _files: &[String], descriptor_out: &Utf8Path) -> Result<()> {
        if !self.path.is_file() {
            bail!("descriptor set '{}' does not exist", self.path);
        }
        if self.path == descriptor_out {
            return Ok(());
        }

        if let Some(parent) = descriptor_out.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent).into_app_err_with(|| format!("could not create directory '{parent}'"))?;
        }

        log::debug!(target: LOG_TARGET, "Using precompiled descriptor set '{}'", self.path);
        let _ = fs::copy(&self.path, descriptor_out).into_app_err_with(|| format!("copying '{}' to '{descriptor_out}'", self.path))?;
        Ok(())
    }
}

fn check_protoc_output(output: &Output) -> Result<()> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("protoc failed ({}): {}", output.status, stderr.trim_end());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::ExitStatus;

    fn status(code: i32) -> ExitStatus {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            ExitStatus::from_raw(code << 8)
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::ExitStatusExt;
            ExitStatus::from_raw(code.cast_unsigned())
        }
    }

    #[test]
    fn test_check_output_success() {
        let output = Output {
            status: status(0),
            stdout: vec![],
            stderr: vec![],
        };
        check_protoc_output(&output).unwrap();
    }

    #[test]
    fn test_check_output_passes_stderr_through() {
        let output = Output {
            status: status(1),
            stdout: vec![],
            stderr: b"item.proto:3:5: \"strng\" is not defined.\n".to_vec(),
        };

        let msg = check_protoc_output(&output).unwrap_err().to_string();
        assert!(msg.contains("protoc failed"));
        assert!(msg.contains("\"strng\" is not defined."));
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let protoc = Protoc::new(Some(dir.join("nope")), dir);

        let msg = protoc.resolve().unwrap_err().to_string();
        assert!(msg.contains("does not exist"));
    }

    #[test]
    fn test_bundled_tool_is_found() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        fs::write(dir.join(PROTOC_EXE), b"").unwrap();

        let protoc = Protoc::new(None, dir.clone());
        assert_eq!(protoc.resolve().unwrap(), dir.join(PROTOC_EXE));
    }

    #[test]
    fn test_precompiled_copies_descriptor() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        fs::write(dir.join("set.pb"), b"\x0a\x00").unwrap();

        Precompiled::new(dir.join("set.pb")).compile(&dir, &[], &dir.join("out/schema.pb")).unwrap();
        assert_eq!(fs::read(dir.join("out/schema.pb")).unwrap(), b"\x0a\x00");

        assert!(Precompiled::new(dir.join("missing.pb")).compile(&dir, &[], &dir.join("x.pb")).is_err());
    }
}
