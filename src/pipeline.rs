//! Conversion pipeline
//!
//! One run loads the input book, classifies its script, writes a
//! transliterated copy to scratch space when the book is Simplified Chinese,
//! and hands the resulting file to the kepub converter.
//!
//! The scratch copy lives in a [ScratchSpace] that is removed when the run
//! ends, whatever the outcome. A book that does not need transliteration never
//! touches the filesystem before the converter runs.

use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use log::{debug, error, info};
use tempfile::TempDir;

use crate::{
    classify::classify,
    config::Config,
    converter::{ConverterProcess, Kepubify, convert, probe},
    epub::EpubDoc,
    error::PipelineError,
    rewrite::rewrite,
    transliterate::{Transliterate, ZhconvTransliterator},
    types::ScriptVariant,
};

/// Suffix appended to the stem of a transliterated copy
const TRADITIONAL_SUFFIX: &str = "_tc";

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    /// The input book
    pub source: PathBuf,

    /// The file handed to the converter, either `source` or the scratch copy
    ///
    /// A scratch copy no longer exists once the run has returned.
    pub converted_from: PathBuf,

    pub variant: ScriptVariant,

    /// Whether the markup was transliterated
    pub rewritten: bool,

    /// The kepub file the converter is expected to have produced
    pub output_file: PathBuf,
}

/// Temporary directory holding the transliterated copy of a book
///
/// The directory and its content are removed on drop. Removal failures are
/// logged and otherwise ignored.
pub struct ScratchSpace {
    path: PathBuf,

    // Taken only by `drop`
    dir: Option<TempDir>,
}

impl ScratchSpace {
    pub fn new() -> Result<Self, PipelineError> {
        let dir = tempfile::Builder::new()
            .prefix("kepub-converter-")
            .tempdir()
            .map_err(|source| PipelineError::ScratchSpace { source })?;
        debug!("Created scratch space {}", dir.path().display());

        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        match dir.close() {
            Ok(()) => info!(
                "Temporary files in \"{}\" removed successfully.",
                self.path.display()
            ),
            Err(err) => error!(
                "Error occurred while removing temporary files in \"{}\": {}",
                self.path.display(),
                err
            ),
        }
    }
}

/// Drives a single book through classification, rewriting and conversion
pub struct Pipeline<C, T> {
    converter: C,
    transliterator: T,
    output_dir: PathBuf,
}

impl Pipeline<Kepubify, ZhconvTransliterator> {
    /// Builds the production pipeline described by `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Kepubify::new(&config.kepub_cmd),
            ZhconvTransliterator::new(config.target),
            &config.output_folder,
        )
    }
}

impl<C, T> Pipeline<C, T>
where
    C: ConverterProcess,
    T: Transliterate,
{
    pub fn new<P: Into<PathBuf>>(converter: C, transliterator: T, output_dir: P) -> Self {
        Self {
            converter,
            transliterator,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Converts the book at `input` to kepub
    ///
    /// # Return
    /// - `Err(PipelineError::InvalidInput)`: `input` is not a readable EPUB book;
    ///   nothing was written and the converter was not invoked
    /// - `Err(PipelineError::Rewrite)`: a markup document could not be
    ///   transliterated; the converter was not invoked
    /// - `Err(PipelineError::Converter)`: the converter is unavailable or failed
    pub fn run(&self, input: &Path) -> Result<ConversionReport, PipelineError> {
        let doc = EpubDoc::open(input).map_err(|source| PipelineError::InvalidInput {
            path: input.to_path_buf(),
            source,
        })?;
        debug!("It is likely a valid EPUB file: {}", input.display());

        let variant = classify(&doc.metadata);
        info!(
            "Detected language {:?} for \"{}\", script: {}",
            doc.metadata.languages(),
            input.display(),
            variant
        );

        // Must outlive the converter call below.
        let mut scratch = None;
        let working_file = match variant {
            ScriptVariant::SimplifiedChinese => {
                let rewritten = rewrite(&doc, &self.transliterator)
                    .map_err(|source| PipelineError::Rewrite { source })?;

                let space = ScratchSpace::new()?;
                let path = space.path().join(traditional_file_name(input));
                rewritten
                    .save(&path)
                    .map_err(|source| PipelineError::WriteRewritten {
                        path: path.clone(),
                        source,
                    })?;
                scratch = Some(space);

                info!(
                    "SC->TC conversion completed. New EPUB file saved as: {}",
                    path.display()
                );
                path
            }
            _ => input.to_path_buf(),
        };

        probe(&self.converter)?;
        convert(&self.converter, &working_file, &self.output_dir)?;

        let output_file = self.output_dir.join(kepub_file_name(&working_file));
        info!("Output: {}", output_file.display());
        drop(scratch);

        Ok(ConversionReport {
            source: input.to_path_buf(),
            converted_from: working_file,
            variant,
            rewritten: variant == ScriptVariant::SimplifiedChinese,
            output_file,
        })
    }
}

fn file_stem(path: &Path) -> &OsStr {
    path.file_stem().unwrap_or_else(|| OsStr::new("book"))
}

/// `<stem>_tc.epub` for an input named `<stem>.epub`
fn traditional_file_name(input: &Path) -> OsString {
    let mut name = file_stem(input).to_os_string();
    name.push(TRADITIONAL_SUFFIX);
    name.push(".epub");
    name
}

/// The name kepubify gives the converted form of `input`
fn kepub_file_name(input: &Path) -> OsString {
    let mut name = file_stem(input).to_os_string();
    name.push(".kepub.epub");
    name
}
