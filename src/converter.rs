//! External kepub converter
//!
//! The conversion to kepub is delegated to the `kepubify` executable. The
//! pipeline talks to it through the [ConverterProcess] trait so tests can swap
//! the subprocess for a fake.

use std::{
    ffi::OsStr,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Command,
};

use log::{debug, info, warn};

use crate::error::ConverterError;

/// Exit status and captured output of one converter invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// A converter executable that can be run with arguments
pub trait ConverterProcess {
    /// The executable, used in log lines and error messages
    fn program(&self) -> &Path;

    /// Runs the executable to completion with `args`
    ///
    /// An `Err` means the process could not be started at all; an
    /// unsuccessful exit is reported through [CommandOutput::code].
    fn run(&self, args: &[&OsStr]) -> std::io::Result<CommandOutput>;
}

impl<C: ConverterProcess + ?Sized> ConverterProcess for &C {
    fn program(&self) -> &Path {
        (**self).program()
    }

    fn run(&self, args: &[&OsStr]) -> std::io::Result<CommandOutput> {
        (**self).run(args)
    }
}

/// The real `kepubify` executable
#[derive(Debug, Clone)]
pub struct Kepubify {
    program: PathBuf,
}

impl Kepubify {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ConverterProcess for Kepubify {
    fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, args: &[&OsStr]) -> std::io::Result<CommandOutput> {
        debug!("Running {} with {:?}", self.program.display(), args);
        let output = Command::new(&self.program).args(args).output()?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Checks that the converter can be run by asking it for its version
///
/// Any failure, including an unsuccessful exit, is reported as
/// [ConverterError::Unavailable].
///
/// # Return
/// - `Ok(String)`: The trimmed version output
pub fn probe<C: ConverterProcess + ?Sized>(converter: &C) -> Result<String, ConverterError> {
    let program = converter.program().to_path_buf();

    let output = converter
        .run(&[OsStr::new("--version")])
        .map_err(|source| ConverterError::Unavailable {
            program: program.clone(),
            source,
        })?;

    if !output.success() {
        return Err(ConverterError::Unavailable {
            program,
            source: std::io::Error::other(format!(
                "--version exited with {:?}: {}",
                output.code,
                output.stderr.trim()
            )),
        });
    }

    let version = output.stdout.trim().to_string();
    debug!("{} is available, version {}", program.display(), version);
    Ok(version)
}

/// Converts `input` into a kepub file inside `output_dir`
///
/// Runs `<program> -o <output_dir> -v <input>`. A missing executable is
/// [ConverterError::Unavailable], a non-zero exit is [ConverterError::Failed].
pub fn convert<C: ConverterProcess + ?Sized>(
    converter: &C,
    input: &Path,
    output_dir: &Path,
) -> Result<CommandOutput, ConverterError> {
    let program = converter.program().to_path_buf();
    let args = [
        OsStr::new("-o"),
        output_dir.as_os_str(),
        OsStr::new("-v"),
        input.as_os_str(),
    ];

    let output = converter.run(&args).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ConverterError::Unavailable {
            program: program.clone(),
            source,
        },
        _ => ConverterError::Io {
            program: program.clone(),
            source,
        },
    })?;

    for line in output.stdout.lines().filter(|line| !line.trim().is_empty()) {
        info!("{}", line);
    }

    if !output.success() {
        for line in output.stderr.lines().filter(|line| !line.trim().is_empty()) {
            warn!("{}", line);
        }
        return Err(ConverterError::Failed {
            program,
            code: output.code,
            stderr: output.stderr,
        });
    }

    info!("{} executed successfully.", program.display());
    Ok(output)
}
