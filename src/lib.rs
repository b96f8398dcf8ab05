//! Kepub converter
//!
//! A command line tool and library that converts EPUB books to Kobo's kepub
//! format with the external `kepubify` executable.
//!
//! Books whose `dc:language` marks them as Simplified Chinese are
//! transliterated to Traditional Chinese first. The transliterated copy is
//! written to a temporary directory, handed to the converter and removed
//! afterwards, so the input book is never modified.
//!
//! ## Features
//!
//! - Load an EPUB container into memory and write it back out.
//! - Classify a book's script from its package metadata.
//! - Transliterate every markup content document, leaving other resources byte-identical.
//! - Run the external converter behind a replaceable [converter::ConverterProcess] capability.
//!
//! ## Quick Start
//!
//! ```rust, ignore
//! # use kepub_converter::{config::Config, pipeline::Pipeline};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("kepub_converter.toml")?;
//! let report = Pipeline::from_config(&config).run("path/to/book.epub".as_ref())?;
//!
//! println!("Written: {}", report.output_file.display());
//! # Ok(())
//! # }
//! ```

pub(crate) mod utils;

pub mod classify;
pub mod config;
pub mod converter;
pub mod epub;
pub mod error;
pub mod logger;
pub mod pipeline;
pub mod reveal;
pub mod rewrite;
pub mod transliterate;
pub mod types;
mod writer;

#[cfg(test)]
mod test_support;

pub use utils::DecodeBytes;
