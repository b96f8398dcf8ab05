//! Error Type Definition Module
//!
//! This module defines the error types that may be encountered while loading,
//! rewriting and converting a book. Each concern has its own enumeration so the
//! command line front end can report them distinctly.
//!
//! ## Main Error Types
//!
//! - [EpubError] - Errors while reading, rewriting or writing an EPUB container
//! - [ConfigError] - Errors while loading the configuration file
//! - [ConverterError] - Errors while running the external kepub converter
//! - [PipelineError] - Errors of a whole conversion run

use std::path::PathBuf;

use thiserror::Error;

/// Types of errors that can occur during EPUB processing
///
/// This enumeration defines the error cases that can be encountered when
/// loading an EPUB container into memory, transliterating its markup and
/// writing it back out.
#[derive(Debug, Error)]
pub enum EpubError {
    /// ZIP archive related errors
    ///
    /// Errors occur when processing the ZIP structure of EPUB files,
    /// such as file corruption, unreadability, etc.
    #[error("Archive error: {source}")]
    ArchiveError { source: zip::result::ZipError },

    /// Data Decoding Error - Null data
    ///
    /// This error occurs when trying to decode or parse an empty stream.
    #[error("Decode error: The data is empty.")]
    EmptyDataError,

    #[error("IO error: {source}")]
    IOError { source: std::io::Error },

    /// Markup decoding error
    ///
    /// A markup content document could not be decoded as UTF-8. Rewriting
    /// stops here rather than producing a book with mixed scripts.
    #[error("Decode error: The markup resource \"{resource}\" is not valid UTF-8: {source}")]
    MarkupDecodeError {
        resource: String,
        source: std::string::FromUtf8Error,
    },

    /// Missing required attribute error
    ///
    /// Triggered when an XML element in an EPUB file lacks the required
    /// attributes required by the EPUB specification.
    #[error(
        "Missing required attribute: The \"{attribute}\" attribute is a must attribute for the \"{tag}\" element."
    )]
    MissingRequiredAttribute { tag: String, attribute: String },

    /// Non-canonical EPUB structure error
    ///
    /// This error occurs when an EPUB file lacks some files or directory
    /// structure that is required in EPUB specification.
    #[error("Non-canonical epub: The \"{expected_file}\" file was not found.")]
    NonCanonicalEpub { expected_file: String },

    /// Non-canonical file structure error
    ///
    /// This error is triggered when the required XML elements in the
    /// specification are missing from the EPUB file.
    #[error("Non-canonical file: The \"{tag}\" elements was not found.")]
    NonCanonicalFile { tag: String },

    /// Relative link leak error
    ///
    /// This error occurs when a relative path link is outside the scope
    /// of an EPUB container.
    #[error("Relative link leakage: Path \"{path}\" is out of container range.")]
    RelativeLinkLeakage { path: String },

    /// Unusable compression method error
    ///
    /// This error occurs when an EPUB file uses an unsupported compression method.
    #[error(
        "Unusable compression method: The \"{file}\" file uses the unsupported \"{method}\" compression method."
    )]
    UnusableCompressionMethod { file: String, method: String },

    /// UTF-8 decoding error
    ///
    /// This error occurs when attempting to decode byte data into a UTF-8 string
    /// but the data is not formatted correctly.
    #[error("Decode error: {source}")]
    Utf8DecodeError { source: std::string::FromUtf8Error },

    /// UTF-16 decoding error
    ///
    /// This error occurs when attempting to decode byte data into a UTF-16 string
    /// but the data is not formatted correctly.
    #[error("Decode error: {source}")]
    Utf16DecodeError { source: std::string::FromUtf16Error },

    /// QuickXml error
    ///
    /// This error occurs when parsing XML data using the QuickXml library.
    #[error("QuickXml error: {source}")]
    QuickXmlError { source: quick_xml::Error },
}

impl From<zip::result::ZipError> for EpubError {
    fn from(value: zip::result::ZipError) -> Self {
        EpubError::ArchiveError { source: value }
    }
}

impl From<quick_xml::Error> for EpubError {
    fn from(value: quick_xml::Error) -> Self {
        EpubError::QuickXmlError { source: value }
    }
}

impl From<std::io::Error> for EpubError {
    fn from(value: std::io::Error) -> Self {
        EpubError::IOError { source: value }
    }
}

impl From<std::string::FromUtf8Error> for EpubError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        EpubError::Utf8DecodeError { source: value }
    }
}

impl From<std::string::FromUtf16Error> for EpubError {
    fn from(value: std::string::FromUtf16Error) -> Self {
        EpubError::Utf16DecodeError { source: value }
    }
}

#[cfg(test)]
impl PartialEq for EpubError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::MarkupDecodeError {
                    resource: l_resource,
                    ..
                },
                Self::MarkupDecodeError {
                    resource: r_resource,
                    ..
                },
            ) => l_resource == r_resource,
            (
                Self::MissingRequiredAttribute {
                    tag: l_tag,
                    attribute: l_attribute,
                },
                Self::MissingRequiredAttribute {
                    tag: r_tag,
                    attribute: r_attribute,
                },
            ) => l_tag == r_tag && l_attribute == r_attribute,
            (
                Self::NonCanonicalEpub {
                    expected_file: l_expected_file,
                },
                Self::NonCanonicalEpub {
                    expected_file: r_expected_file,
                },
            ) => l_expected_file == r_expected_file,
            (Self::NonCanonicalFile { tag: l_tag }, Self::NonCanonicalFile { tag: r_tag }) => {
                l_tag == r_tag
            }
            (
                Self::RelativeLinkLeakage { path: l_path },
                Self::RelativeLinkLeakage { path: r_path },
            ) => l_path == r_path,
            (
                Self::UnusableCompressionMethod {
                    file: l_file,
                    method: l_method,
                },
                Self::UnusableCompressionMethod {
                    file: r_file,
                    method: r_method,
                },
            ) => l_file == r_file && l_method == r_method,
            (
                Self::Utf8DecodeError { source: l_source },
                Self::Utf8DecodeError { source: r_source },
            ) => l_source == r_source,

            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

/// Types of errors that can occur while loading the configuration
///
/// Every variant is fatal: the program stops before touching the input file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Unable to read config file \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has a value of the wrong type
    #[error("An error occurred while parsing config file \"{}\": {source}", path.display())]
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },

    /// A required key is absent
    #[error("The key \"{key}\" was not found in the [{section}] section of the config file.")]
    MissingKey { section: String, key: String },

    /// A key is present but its value is not acceptable
    #[error("The value \"{value}\" is not valid for the config key \"{key}\".")]
    InvalidValue { key: String, value: String },
}

/// Types of errors reported by the external kepub converter
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The converter executable could not be found
    #[error("Converter \"{}\" is not available: {source}", program.display())]
    Unavailable {
        program: PathBuf,
        source: std::io::Error,
    },

    /// The converter ran but exited unsuccessfully
    ///
    /// `code` is `None` when the process was terminated by a signal.
    #[error("Converter \"{}\" failed with exit code {}: {stderr}", program.display(), exit_code_text(code))]
    Failed {
        program: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    /// The converter could not be started for a reason other than a missing executable
    #[error("Unable to run converter \"{}\": {source}", program.display())]
    Io {
        program: PathBuf,
        source: std::io::Error,
    },
}

fn exit_code_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

/// Types of errors of a whole conversion run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input is not a readable EPUB book
    #[error("\"{}\" is not a valid EPUB file: {source}", path.display())]
    InvalidInput { path: PathBuf, source: EpubError },

    /// Transliterating the book failed
    #[error("Simplified to Traditional Chinese conversion failed: {source}")]
    Rewrite { source: EpubError },

    /// The rewritten book could not be written to its temporary location
    #[error("Unable to write converted book to \"{}\": {source}", path.display())]
    WriteRewritten { path: PathBuf, source: EpubError },

    /// The temporary directory could not be created
    #[error("Unable to create temporary directory: {source}")]
    ScratchSpace { source: std::io::Error },

    #[error(transparent)]
    Converter(#[from] ConverterError),
}
