//! In-memory EPUB fixtures and a fake converter shared by the unit tests

use std::{
    cell::RefCell,
    ffi::{OsStr, OsString},
    io::{Cursor, ErrorKind, Write},
    path::{Path, PathBuf},
};

use zip::{CompressionMethod, ZipWriter, write::FileOptions};

use crate::converter::{CommandOutput, ConverterProcess};

/// A PNG signature followed by bytes that are not valid UTF-8
pub const COVER_PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0xFF, 0x00, 0xFE, 0xC3, 0x28,
];

pub const STYLE_CSS: &[u8] = b"p { text-indent: 2em; }";

/// Zips `entries` in order, storing `mimetype` and deflating everything else
pub fn build_epub(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, data) in entries {
        let method = if *name == "mimetype" {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        let options = FileOptions::<()>::default().compression_method(method);

        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

pub fn container_xml(package_path: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{package_path}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#
    )
}

/// An EPUB 3 package document with the given languages and `(id, href, media-type)` items
pub fn package_document(languages: &[&str], manifest: &[(&str, &str, &str)]) -> String {
    let languages = languages
        .iter()
        .map(|language| format!("    <dc:language>{language}</dc:language>\n"))
        .collect::<String>();
    let items = manifest
        .iter()
        .map(|(id, href, mime)| {
            format!("    <item id=\"{id}\" href=\"{href}\" media-type=\"{mime}\"/>\n")
        })
        .collect::<String>();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="pub-id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="pub-id">urn:uuid:00000000-0000-0000-0000-000000000000</dc:identifier>
    <dc:title>Sample Book</dc:title>
{languages}  </metadata>
  <manifest>
{items}  </manifest>
  <spine>
    <itemref idref="chapter1"/>
  </spine>
</package>"#
    )
}

pub fn chapter_xhtml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>Chapter</title></head><body>{body}</body></html>"#
    )
}

/// A small book with one chapter, a stylesheet and a cover image
pub fn sample_epub(languages: &[&str], body: &str) -> Vec<u8> {
    let opf = package_document(
        languages,
        &[
            ("chapter1", "chapter1.xhtml", "application/xhtml+xml"),
            ("css", "style.css", "text/css"),
            ("cover", "images/cover.png", "image/png"),
        ],
    );
    let chapter = chapter_xhtml(body);

    build_epub(&[
        ("mimetype", b"application/epub+zip".as_slice()),
        ("META-INF/container.xml", container_xml("OEBPS/content.opf").as_bytes()),
        ("OEBPS/content.opf", opf.as_bytes()),
        ("OEBPS/chapter1.xhtml", chapter.as_bytes()),
        ("OEBPS/style.css", STYLE_CSS),
        ("OEBPS/images/cover.png", COVER_PNG),
    ])
}

/// How a [FakeConverter] responds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehavior {
    /// Reports a version and copies the input to `<output>/<stem>.kepub.epub`
    Succeed,

    /// Behaves like an executable that does not exist
    Missing,

    /// Answers `--version` but exits with the given code when converting
    Exit(i32),
}

#[derive(Debug, Clone)]
pub struct FakeCall {
    pub args: Vec<OsString>,

    /// Whether the last argument named an existing file at call time
    pub input_existed: bool,
}

/// A converter that records its invocations instead of spawning a process
pub struct FakeConverter {
    behavior: FakeBehavior,
    calls: RefCell<Vec<FakeCall>>,
}

impl FakeConverter {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.borrow().clone()
    }

    /// Input files handed to conversion calls, in order
    pub fn converted_inputs(&self) -> Vec<PathBuf> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.args.len() == 4)
            .map(|call| PathBuf::from(&call.args[3]))
            .collect()
    }
}

impl ConverterProcess for FakeConverter {
    fn program(&self) -> &Path {
        Path::new("fake-kepubify")
    }

    fn run(&self, args: &[&OsStr]) -> std::io::Result<CommandOutput> {
        let args = args.iter().map(|arg| arg.to_os_string()).collect::<Vec<_>>();
        let input_existed = args.last().is_some_and(|arg| Path::new(arg).is_file());
        self.calls.borrow_mut().push(FakeCall {
            args: args.clone(),
            input_existed,
        });

        if self.behavior == FakeBehavior::Missing {
            return Err(std::io::Error::new(ErrorKind::NotFound, "No such file or directory"));
        }

        if args == [OsString::from("--version")] {
            return Ok(CommandOutput {
                code: Some(0),
                stdout: "kepubify v4.0.4\n".to_string(),
                stderr: String::new(),
            });
        }

        if let FakeBehavior::Exit(code) = self.behavior {
            return Ok(CommandOutput {
                code: Some(code),
                stdout: String::new(),
                stderr: "conversion failed\n".to_string(),
            });
        }

        let output_dir = Path::new(&args[1]);
        let input = Path::new(&args[3]);
        let mut name = input.file_stem().unwrap_or_default().to_os_string();
        name.push(".kepub.epub");
        std::fs::copy(input, output_dir.join(name))?;

        Ok(CommandOutput {
            code: Some(0),
            stdout: "converted 1 book\n".to_string(),
            stderr: String::new(),
        })
    }
}
