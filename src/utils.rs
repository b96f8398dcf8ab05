use std::{
    collections::HashMap,
    io::{Read, Seek},
};

use quick_xml::{
    NsReader,
    encoding::Decoder,
    escape::resolve_predefined_entity,
    events::{BytesStart, Event},
};
use zip::{CompressionMethod, ZipArchive};

use crate::error::EpubError;

/// Extracts the contents of a specified file from a ZIP archive
///
/// ## Parameters
/// - `zip_file`: A mutable reference to a ZIP archive object
/// - `file_name`: The path to the file to extract (relative to the ZIP archive root directory)
///
/// ## Return
/// - `Ok(Vec<u8>)`: The raw bytes of the file
/// - `Err(EpubError)`: The file does not exist or an error occurred during the read operation
pub fn get_file_in_zip_archive<R: Read + Seek>(
    zip_file: &mut ZipArchive<R>,
    file_name: &str,
) -> Result<Vec<u8>, EpubError> {
    let mut buffer = Vec::<u8>::new();
    match zip_file.by_name(file_name) {
        Ok(mut file) => {
            file.read_to_end(&mut buffer)?;
            Ok(buffer)
        }
        Err(zip::result::ZipError::FileNotFound) => Err(EpubError::NonCanonicalEpub {
            expected_file: file_name.to_string(),
        }),
        Err(err) => Err(EpubError::from(err)),
    }
}

/// Checks if the compression method of all entries in the EPUB file
/// conforms to the specification requirements.
///
/// According to the OCF specification, EPUB files can only use either
/// Stored (uncompressed) or Deflated (deflate compression).
pub fn compression_method_check<R: Read + Seek>(
    zip_archive: &mut ZipArchive<R>,
) -> Result<(), EpubError> {
    for index in 0..zip_archive.len() {
        let file = zip_archive.by_index_raw(index)?;

        match file.compression() {
            CompressionMethod::Stored | CompressionMethod::Deflated => continue,
            method => {
                return Err(EpubError::UnusableCompressionMethod {
                    file: file.name().to_string(),
                    method: method.to_string(),
                });
            }
        };
    }

    Ok(())
}

/// Resolves a manifest href to a path inside the container
///
/// Hrefs starting with `/` are relative to the container root, all others are
/// relative to `base_dir`, the directory holding the package document. `.`
/// and `..` segments are folded; climbing above the container root is an error.
///
/// ## Return
/// - `Ok(String)`: The normalized path, using `/` as separator
/// - `Err(EpubError)`: The href points outside of the container
pub fn resolve_href(base_dir: &str, href: &str) -> Result<String, EpubError> {
    let joined = match href.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None if base_dir.is_empty() => href.to_string(),
        None => format!("{}/{}", base_dir.trim_end_matches('/'), href),
    };

    let mut segments = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(EpubError::RelativeLinkLeakage {
                        path: href.to_string(),
                    });
                }
            }
            segment => segments.push(segment),
        }
    }

    Ok(segments.join("/"))
}

/// Guess the media type of a container file from its name
///
/// Used for files that are not declared in the manifest.
pub fn guess_media_type(name: &str) -> String {
    if name == "mimetype" {
        return "text/plain".to_string();
    }

    let extension = name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "xhtml" | "xht" => "application/xhtml+xml",
        "html" | "htm" => "text/html",
        "opf" => "application/oebps-package+xml",
        "ncx" => "application/x-dtbncx+xml",
        "xml" => "application/xml",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Provides functionality for decoding byte data into strings
///
/// Supports UTF-8 (with or without BOM), UTF-16 BE and UTF-16 LE with BOM.
/// Used for the container and package documents, which the EPUB
/// specification allows to be encoded in either UTF-8 or UTF-16.
pub trait DecodeBytes {
    fn decode(&self) -> Result<String, EpubError>;
}

impl DecodeBytes for Vec<u8> {
    fn decode(&self) -> Result<String, EpubError> {
        if self.len() < 4 {
            return Err(EpubError::EmptyDataError);
        }

        match self[0..3] {
            // UTF-8 BOM (0xEF, 0xBB, 0xBF)
            [0xEF, 0xBB, 0xBF, ..] => {
                String::from_utf8(self[3..].to_vec()).map_err(EpubError::from)
            }

            // UTF-16 BE BOM (0xFE, 0xFF)
            [0xFE, 0xFF, ..] => decode_utf16(&self[2..], u16::from_be_bytes),

            // UTF-16 LE BOM (0xFF, 0xFE)
            [0xFF, 0xFE, ..] => decode_utf16(&self[2..], u16::from_le_bytes),

            _ => String::from_utf8(self.to_vec()).map_err(EpubError::from),
        }
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String, EpubError> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units).map_err(EpubError::from)
}

/// Collapses runs of whitespace into a single space and trims both ends
pub trait NormalizeWhitespace {
    fn normalize_whitespace(&self) -> String;
}

impl NormalizeWhitespace for &str {
    fn normalize_whitespace(&self) -> String {
        self.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl NormalizeWhitespace for String {
    fn normalize_whitespace(&self) -> String {
        self.as_str().normalize_whitespace()
    }
}

/// Represents an element node in an XML document
#[derive(Debug)]
pub struct XmlElement {
    /// The local name of the element (excluding namespace prefix)
    pub name: String,

    /// The namespace prefix of the element
    pub prefix: Option<String>,

    /// The namespace of the element
    pub namespace: Option<String>,

    /// The attributes of the element, keyed by their qualified name
    pub attributes: HashMap<String, String>,

    /// The text content of the element
    pub text: Option<String>,

    /// The children of the element
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: String) -> Self {
        Self {
            name,
            prefix: None,
            namespace: None,
            attributes: HashMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Get the full tag name of the element, `prefix:name` when prefixed
    pub fn tag_name(&self) -> String {
        if let Some(prefix) = &self.prefix {
            format!("{}:{}", prefix, self.name)
        } else {
            self.name.clone()
        }
    }

    /// Gets the text content of the element and all its child elements
    pub fn text(&self) -> String {
        let mut result = String::new();

        if let Some(text_value) = &self.text {
            result.push_str(text_value);
        }

        for child in &self.children {
            result.push_str(&child.text());
        }

        result.trim().to_string()
    }

    pub fn get_attr(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    /// Find all elements with the specified name, depth first, including `self`
    pub fn find_elements_by_name<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        let mut elements = Vec::new();
        collect_elements(self, &mut elements);
        elements
            .into_iter()
            .filter(move |element| element.name == name)
    }

    /// Find the child elements with the specified name
    pub fn find_children_by_name<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    pub fn children(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter()
    }
}

fn collect_elements<'a>(element: &'a XmlElement, collection: &mut Vec<&'a XmlElement>) {
    collection.push(element);
    for child in &element.children {
        collect_elements(child, collection);
    }
}

/// XML parser used to build an [XmlElement] tree
pub struct XmlReader;

impl XmlReader {
    /// Parses an XML string and builds the root element
    ///
    /// ## Return
    /// - `Ok(XmlElement)`: The root element of the XML element tree
    /// - `Err(EpubError)`: An error occurred during parsing, or the document has no root
    pub fn parse(content: &str) -> Result<XmlElement, EpubError> {
        if content.is_empty() {
            return Err(EpubError::EmptyDataError);
        }

        let mut reader = NsReader::from_str(content);

        let mut stack = Vec::<XmlElement>::new();
        let mut root = None;
        let mut namespace_map = HashMap::new();

        loop {
            match reader.read_event()? {
                Event::Eof => break,

                Event::Start(e) => {
                    let element = Self::element_from_start(&e, reader.decoder(), &mut namespace_map);
                    stack.push(element);
                }

                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(element),
                            None => root = Some(element),
                        }
                    }
                }

                Event::Empty(e) => {
                    let element = Self::element_from_start(&e, reader.decoder(), &mut namespace_map);
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }

                Event::Text(e) => {
                    let text = e.xml10_content().map_err(quick_xml::Error::from)?;
                    Self::push_text(&mut stack, &text);
                }

                Event::CData(e) => {
                    let text = e.decode().map_err(quick_xml::Error::from)?;
                    Self::push_text(&mut stack, &text);
                }

                Event::GeneralRef(e) => {
                    let text = match e.resolve_char_ref()? {
                        Some(ch) => ch.to_string(),
                        None => {
                            let name = e.decode().map_err(quick_xml::Error::from)?;
                            match resolve_predefined_entity(&name) {
                                Some(value) => value.to_string(),
                                // DTD-declared entities are kept as written
                                None => format!("&{};", name),
                            }
                        }
                    };
                    Self::push_text(&mut stack, &text);
                }

                // Comment, PI, Declaration, Doctype
                _ => continue,
            }
        }

        let mut root = root.ok_or(EpubError::EmptyDataError)?;
        Self::assign_namespace(&mut root, &namespace_map);
        Ok(root)
    }

    /// Appends text to the innermost open element
    ///
    /// Text is split around entity references, so chunks are concatenated.
    /// Whitespace before the first meaningful chunk is dropped.
    fn push_text(stack: &mut [XmlElement], text: &str) {
        let Some(element) = stack.last_mut() else {
            return;
        };

        match &mut element.text {
            Some(existing) => existing.push_str(text),
            None if !text.trim().is_empty() => element.text = Some(text.to_string()),
            None => {}
        }
    }

    /// Parse XML from bytes and builds the root element
    pub fn parse_bytes(bytes: Vec<u8>) -> Result<XmlElement, EpubError> {
        let content = bytes.decode()?;
        Self::parse(&content)
    }

    fn element_from_start(
        start: &BytesStart,
        decoder: Decoder,
        namespace_map: &mut HashMap<String, String>,
    ) -> XmlElement {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).to_string();
        let mut element = XmlElement::new(name);

        if let Some(prefix) = start.name().prefix() {
            element.prefix = Some(String::from_utf8_lossy(prefix.as_ref()).to_string());
        }

        for attr in start.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = match attr.decode_and_unescape_value(decoder) {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).to_string(),
            };

            // `xmlns` declares the default namespace, `xmlns:dc` a prefixed one
            if key == "xmlns" {
                namespace_map.insert(key, value);
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                namespace_map.insert(prefix.to_string(), value);
            } else {
                element.attributes.insert(key, value);
            }
        }

        element
    }

    fn assign_namespace(element: &mut XmlElement, namespace_map: &HashMap<String, String>) {
        let key = element.prefix.as_deref().unwrap_or("xmlns");
        if let Some(namespace) = namespace_map.get(key) {
            element.namespace = Some(namespace.clone());
        }

        for child in element.children.iter_mut() {
            Self::assign_namespace(child, namespace_map);
        }
    }
}
