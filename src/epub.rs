use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};

use log::{debug, warn};
use percent_encoding::percent_decode_str;
use zip::ZipArchive;

use crate::{
    error::EpubError,
    types::{ContentItem, MetadataBlock, MetadataNamespace},
    utils::{
        DecodeBytes, NormalizeWhitespace, XmlElement, XmlReader, compression_method_check,
        get_file_in_zip_archive, guess_media_type, resolve_href,
    },
};

const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
const OPF_NAMESPACE: &str = "http://www.idpf.org/2007/opf";

/// An EPUB publication loaded into memory
///
/// `EpubDoc` holds every file of the container as an ordered list of
/// [ContentItem]s together with the metadata block of the package document.
/// Holding the whole container lets a rewritten copy be produced without
/// touching the source file, and lets it be written back with the same
/// entries in the same order.
///
/// A document is loaded once with [EpubDoc::open] or [EpubDoc::from_reader],
/// and written with [EpubDoc::save] or [EpubDoc::write].
#[derive(Debug, Clone, PartialEq)]
pub struct EpubDoc {
    /// The path of the package (OPF) document inside the container
    pub package_path: String,

    /// The `version` attribute of the package element, if present
    pub version: Option<String>,

    /// Publication metadata extracted from the package document
    pub metadata: MetadataBlock,

    /// Every file of the container, in archive order
    pub items: Vec<ContentItem>,
}

struct ManifestEntry {
    id: String,
    mime: String,
}

impl EpubDoc {
    /// Opens and loads the EPUB file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EpubError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Loads an EPUB publication from a reader
    ///
    /// # Parameters
    /// - `reader`: The data source, usually a file or memory buffer
    ///
    /// # Return
    /// - `Ok(EpubDoc)`: The loaded publication
    /// - `Err(EpubError)`: The data is not a ZIP archive, or it lacks the
    ///   container or package documents, or those are malformed
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, EpubError> {
        // 1. Verify that the ZIP compression method conforms to the EPUB specification
        // 2. Parse `META-INF/container.xml` to locate the package document
        // 3. Parse metadata and manifest from the package document
        // 4. Load every file of the archive, tagging the ones the manifest declares

        let mut archive = ZipArchive::new(reader)?;
        compression_method_check(&mut archive)?;

        let container =
            get_file_in_zip_archive(&mut archive, "META-INF/container.xml")?.decode()?;
        let package_path = Self::parse_container(&container)?;

        let package = XmlReader::parse_bytes(get_file_in_zip_archive(&mut archive, &package_path)?)?;
        if package.name != "package" {
            return Err(EpubError::NonCanonicalFile {
                tag: "package".to_string(),
            });
        }

        let metadata_element = package.find_elements_by_name("metadata").next().ok_or_else(|| {
            EpubError::NonCanonicalFile {
                tag: "metadata".to_string(),
            }
        })?;
        let manifest_element = package.find_elements_by_name("manifest").next().ok_or_else(|| {
            EpubError::NonCanonicalFile {
                tag: "manifest".to_string(),
            }
        })?;

        let base_dir = package_path
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or_default();

        let mut metadata = MetadataBlock::new();
        Self::parse_metadata(metadata_element, &mut metadata)?;
        let mut manifest = Self::parse_manifest(manifest_element, base_dir)?;

        let mut items = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }

            let name = file.name().to_string();
            // The declared size comes from the archive and is not trusted for allocation
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;

            let (id, media_type) = match manifest.remove(&name) {
                Some(entry) => (Some(entry.id), entry.mime),
                None => (None, guess_media_type(&name)),
            };

            items.push(ContentItem {
                name,
                id,
                media_type,
                data,
            });
        }

        for (path, entry) in &manifest {
            warn!(
                "Manifest item \"{}\" refers to \"{}\", which is missing from the container.",
                entry.id, path
            );
        }

        let doc = Self {
            package_path,
            version: package.get_attr("version"),
            metadata,
            items,
        };
        debug!(
            "Loaded EPUB {} with {} files, {} of them markup.",
            doc.version.as_deref().unwrap_or("(unversioned)"),
            doc.items.len(),
            doc.markup_items().count()
        );

        Ok(doc)
    }

    /// Parse the EPUB container file (META-INF/container.xml)
    ///
    /// When multiple `rootfile` elements exist, the first one is the default
    /// rendition and is used.
    fn parse_container(data: &str) -> Result<String, EpubError> {
        let root = XmlReader::parse(data)?;
        let rootfile = root
            .find_elements_by_name("rootfile")
            .next()
            .ok_or_else(|| EpubError::NonCanonicalFile {
                tag: "rootfile".to_string(),
            })?;

        let path =
            rootfile
                .get_attr("full-path")
                .ok_or_else(|| EpubError::MissingRequiredAttribute {
                    tag: "rootfile".to_string(),
                    attribute: "full-path".to_string(),
                })?;

        resolve_href("", &path)
    }

    /// Parse the `<metadata>` section of the package document
    ///
    /// Dublin Core elements are stored under their local name. OPF `<meta>`
    /// elements are stored under their `property` (EPUB 3) or `name` (EPUB 2);
    /// refining metas and `<link>` elements are skipped. Legacy OPF 1.x
    /// `<dc-metadata>`/`<x-metadata>` wrappers are descended into.
    fn parse_metadata(element: &XmlElement, metadata: &mut MetadataBlock) -> Result<(), EpubError> {
        for child in element.children() {
            if child.name == "dc-metadata" || child.name == "x-metadata" {
                Self::parse_metadata(child, metadata)?;
                continue;
            }

            let is_dc = match child.namespace.as_deref() {
                Some(namespace) => namespace == DC_NAMESPACE,
                None => child.prefix.as_deref() == Some("dc"),
            };
            if is_dc {
                let value = child.text().normalize_whitespace();
                metadata.insert(MetadataNamespace::DublinCore, &child.name, value);
                continue;
            }

            let is_opf = matches!(child.namespace.as_deref(), None | Some(OPF_NAMESPACE));
            if is_opf && child.name == "meta" {
                Self::parse_meta_element(child, metadata)?;
            }
        }

        Ok(())
    }

    fn parse_meta_element(element: &XmlElement, metadata: &mut MetadataBlock) -> Result<(), EpubError> {
        if let Some(property) = element.get_attr("property") {
            if element.get_attr("refines").is_none() {
                let value = element.text().normalize_whitespace();
                metadata.insert(MetadataNamespace::Opf, &property, value);
            }
        } else if let Some(name) = element.get_attr("name") {
            let value = element
                .get_attr("content")
                .ok_or_else(|| EpubError::MissingRequiredAttribute {
                    tag: element.tag_name(),
                    attribute: "content".to_string(),
                })?
                .normalize_whitespace();
            metadata.insert(MetadataNamespace::Opf, &name, value);
        }

        Ok(())
    }

    /// Parse the `<manifest>` section of the package document
    ///
    /// Returns the declared items keyed by their resolved container path.
    /// Hrefs are percent-decoded before resolution, so `%E7%AC%AC1.xhtml`
    /// matches the archive entry `第1.xhtml`.
    fn parse_manifest(
        manifest_element: &XmlElement,
        base_dir: &str,
    ) -> Result<HashMap<String, ManifestEntry>, EpubError> {
        let mut resources = HashMap::new();

        for element in manifest_element.find_children_by_name("item") {
            let id = element
                .get_attr("id")
                .ok_or_else(|| EpubError::MissingRequiredAttribute {
                    tag: element.tag_name(),
                    attribute: "id".to_string(),
                })?;
            let href = element
                .get_attr("href")
                .ok_or_else(|| EpubError::MissingRequiredAttribute {
                    tag: element.tag_name(),
                    attribute: "href".to_string(),
                })?;
            let mime = element
                .get_attr("media-type")
                .ok_or_else(|| EpubError::MissingRequiredAttribute {
                    tag: element.tag_name(),
                    attribute: "media-type".to_string(),
                })?;

            // Hrefs are URLs, archive entry names are not
            let path = match percent_decode_str(&href).decode_utf8() {
                Ok(decoded) => resolve_href(base_dir, &decoded)?,
                Err(_) => {
                    warn!("Manifest href \"{}\" does not decode to UTF-8, using it verbatim.", href);
                    resolve_href(base_dir, &href)?
                }
            };
            resources.insert(path, ManifestEntry { id, mime });
        }

        Ok(resources)
    }

    /// Iterates over the markup content documents
    pub fn markup_items(&self) -> impl Iterator<Item = &ContentItem> {
        self.items.iter().filter(|item| item.is_markup())
    }

    /// Retrieves a content item by its path inside the container
    pub fn get_item(&self, name: &str) -> Option<&ContentItem> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Retrieves a content item by its manifest id
    pub fn get_item_by_id(&self, id: &str) -> Option<&ContentItem> {
        self.items
            .iter()
            .find(|item| item.id.as_deref() == Some(id))
    }
}
