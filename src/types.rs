use std::fmt;

use indexmap::IndexMap;

/// Media types treated as renderable markup
///
/// Only manifest items declared with one of these media types are
/// transliterated; everything else is carried through untouched.
pub const MARKUP_MEDIA_TYPES: [&str; 2] = ["application/xhtml+xml", "text/html"];

/// Namespace of a metadata field in the package document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataNamespace {
    /// Dublin Core elements (`http://purl.org/dc/elements/1.1/`), e.g. `dc:language`
    DublinCore,

    /// OPF `<meta>` elements, keyed by their `name` (EPUB 2) or `property` (EPUB 3)
    Opf,
}

impl fmt::Display for MetadataNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataNamespace::DublinCore => write!(f, "DC"),
            MetadataNamespace::Opf => write!(f, "OPF"),
        }
    }
}

/// Key of a metadata field: a namespace plus the local field name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataKey {
    pub namespace: MetadataNamespace,
    pub name: String,
}

impl MetadataKey {
    pub fn new(namespace: MetadataNamespace, name: &str) -> Self {
        Self {
            namespace,
            name: name.to_string(),
        }
    }
}

/// Metadata of the publication extracted from the package document
///
/// The block maps every namespaced field to the values it carries, in the
/// order the fields first appear in the package document. A field may have
/// several values, e.g. a bilingual book with two `dc:language` entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataBlock {
    fields: IndexMap<MetadataKey, Vec<String>>,
}

impl MetadataBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to a field, creating the field if needed
    pub fn insert(&mut self, namespace: MetadataNamespace, name: &str, value: String) {
        self.fields
            .entry(MetadataKey::new(namespace, name))
            .or_default()
            .push(value);
    }

    /// Retrieves all values of a field
    ///
    /// A missing field yields an empty slice, never an error.
    pub fn get(&self, namespace: MetadataNamespace, name: &str) -> &[String] {
        self.fields
            .get(&MetadataKey::new(namespace, name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Retrieves all `dc:language` values
    pub fn languages(&self) -> &[String] {
        self.get(MetadataNamespace::DublinCore, "language")
    }

    /// Retrieves the first `dc:title` value
    pub fn title(&self) -> Option<&str> {
        self.get(MetadataNamespace::DublinCore, "title")
            .first()
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetadataKey, &Vec<String>)> {
        self.fields.iter()
    }
}

/// Represents a file stored in the EPUB container
///
/// Every non-directory entry of the container becomes one content item, in
/// archive order. Items declared in the manifest carry their manifest id and
/// declared media type; container files such as `mimetype`, `META-INF/*` and
/// the package document itself have no id and a media type guessed from the
/// file extension.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    /// Path of the file inside the container, e.g. `OEBPS/chapter1.xhtml`
    pub name: String,

    /// Manifest id, if the file is declared in the manifest
    pub id: Option<String>,

    /// The media type of the resource
    pub media_type: String,

    /// Raw bytes of the file
    pub data: Vec<u8>,
}

impl ContentItem {
    /// Whether this item is a manifest-declared HTML/XHTML content document
    pub fn is_markup(&self) -> bool {
        self.id.is_some() && MARKUP_MEDIA_TYPES.contains(&self.media_type.as_str())
    }
}

/// Script variant of a book, derived from its language metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScriptVariant {
    /// Not classified yet
    #[default]
    Unknown,

    /// Simplified Chinese, to be transliterated before conversion
    SimplifiedChinese,

    /// Anything else, converted as-is
    Other,
}

impl fmt::Display for ScriptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptVariant::Unknown => write!(f, "unknown"),
            ScriptVariant::SimplifiedChinese => write!(f, "simplified chinese"),
            ScriptVariant::Other => write!(f, "other"),
        }
    }
}
