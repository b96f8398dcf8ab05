//! Epub Writer
//!
//! Serializes an in-memory [EpubDoc] back into an OCF ZIP container. Entries
//! are written in the document's item order; the `mimetype` entry is stored
//! uncompressed as the OCF specification requires, every other entry is
//! deflated.

use std::{
    fs::{self, File},
    io::{BufWriter, Seek, Write},
    path::Path,
};

use log::debug;
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

use crate::{epub::EpubDoc, error::EpubError};

impl EpubDoc {
    /// Writes the publication as an EPUB container into `writer`
    ///
    /// # Return
    /// - `Ok(W)`: The writer, positioned after the ZIP central directory
    /// - `Err(EpubError)`: Error occurred while writing the archive
    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<W, EpubError> {
        let mut zip = ZipWriter::new(writer);

        for item in &self.items {
            let method = if item.name == "mimetype" {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let options = FileOptions::<()>::default().compression_method(method);

            zip.start_file(item.name.as_str(), options)?;
            zip.write_all(&item.data)?;
        }

        Ok(zip.finish()?)
    }

    /// Writes the publication to a file at `output_path`
    ///
    /// Missing parent directories are created. An existing file is overwritten.
    pub fn save<P: AsRef<Path>>(&self, output_path: P) -> Result<(), EpubError> {
        let output_path = output_path.as_ref();

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(output_path)?;
        let mut writer = self.write(BufWriter::new(file))?;
        writer.flush()?;

        debug!("Wrote {} files to \"{}\".", self.items.len(), output_path.display());
        Ok(())
    }
}
