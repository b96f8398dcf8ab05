//! Content rewriting
//!
//! Produces a transliterated copy of a publication. The source document is
//! only borrowed, so a failed rewrite leaves nothing half-converted behind.

use log::debug;

use crate::{epub::EpubDoc, error::EpubError, transliterate::Transliterate, types::ContentItem};

/// Rewrites every markup content document of `doc` through `transliterator`
///
/// Markup payloads are decoded as UTF-8, transliterated and re-encoded as
/// UTF-8. All other items, the metadata block and the package location are
/// copied unchanged, and item order, names, ids and media types are kept.
///
/// # Return
/// - `Ok(EpubDoc)`: The rewritten copy
/// - `Err(EpubError::MarkupDecodeError)`: A markup document is not valid UTF-8;
///   no document is produced
pub fn rewrite<T>(doc: &EpubDoc, transliterator: &T) -> Result<EpubDoc, EpubError>
where
    T: Transliterate + ?Sized,
{
    let items = doc
        .items
        .iter()
        .map(|item| rewrite_item(item, transliterator))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EpubDoc {
        package_path: doc.package_path.clone(),
        version: doc.version.clone(),
        metadata: doc.metadata.clone(),
        items,
    })
}

fn rewrite_item<T>(item: &ContentItem, transliterator: &T) -> Result<ContentItem, EpubError>
where
    T: Transliterate + ?Sized,
{
    if !item.is_markup() {
        return Ok(item.clone());
    }

    let text = String::from_utf8(item.data.clone()).map_err(|source| {
        EpubError::MarkupDecodeError {
            resource: item.name.clone(),
            source,
        }
    })?;
    debug!("Transliterating \"{}\" ({} bytes).", item.name, item.data.len());

    Ok(ContentItem {
        data: transliterator.transliterate(&text).into_bytes(),
        ..item.clone()
    })
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, io::Cursor};

    use crate::{
        epub::EpubDoc,
        error::EpubError,
        rewrite::rewrite,
        test_support::{
            COVER_PNG, STYLE_CSS, build_epub, chapter_xhtml, container_xml, package_document,
            sample_epub,
        },
        transliterate::ZhconvTransliterator,
    };

    fn load(data: Vec<u8>) -> EpubDoc {
        EpubDoc::from_reader(Cursor::new(data)).unwrap()
    }

    #[test]
    fn test_rewrite_preserves_structure() {
        let doc = load(sample_epub(&["zh-cn"], "<p>text</p>"));
        let rewritten = rewrite(&doc, &|text: &str| text.replace("text", "TEXT")).unwrap();

        assert_eq!(rewritten.items.len(), doc.items.len());
        for (before, after) in doc.items.iter().zip(&rewritten.items) {
            assert_eq!(before.name, after.name);
            assert_eq!(before.id, after.id);
            assert_eq!(before.media_type, after.media_type);
            if !before.is_markup() {
                assert_eq!(before.data, after.data, "{}", before.name);
            }
        }
        assert_eq!(rewritten.metadata, doc.metadata);
        assert_eq!(rewritten.package_path, doc.package_path);

        let chapter = rewritten.get_item("OEBPS/chapter1.xhtml").unwrap();
        assert!(String::from_utf8_lossy(&chapter.data).contains("<p>TEXT</p>"));
    }

    #[test]
    fn test_rewrite_only_touches_markup() {
        let doc = load(sample_epub(&["zh-cn"], "<p/>"));
        let seen = RefCell::new(Vec::new());

        rewrite(&doc, &|text: &str| {
            seen.borrow_mut().push(text.to_string());
            text.to_string()
        })
        .unwrap();

        let seen = seen.into_inner();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], chapter_xhtml("<p/>"));
    }

    #[test]
    fn test_rewrite_simplified_to_traditional() {
        let doc = load(sample_epub(&["zh-cn"], "<p>我爱你</p>"));
        let rewritten = rewrite(&doc, &ZhconvTransliterator::default()).unwrap();

        let chapter = String::from_utf8(
            rewritten
                .get_item("OEBPS/chapter1.xhtml")
                .unwrap()
                .data
                .clone(),
        )
        .unwrap();
        assert!(chapter.contains("愛"));
        assert!(!chapter.contains("爱"));
        assert!(chapter.contains(r#"<html xmlns="http://www.w3.org/1999/xhtml">"#));

        assert_eq!(rewritten.get_item("OEBPS/images/cover.png").unwrap().data, COVER_PNG);
        assert_eq!(rewritten.get_item("OEBPS/style.css").unwrap().data, STYLE_CSS);
    }

    #[test]
    fn test_rewrite_already_traditional_content() {
        let doc = load(sample_epub(&["zh"], "<p>我愛你 and some English</p>"));
        let rewritten = rewrite(&doc, &ZhconvTransliterator::default()).unwrap();

        assert_eq!(
            rewritten.get_item("OEBPS/chapter1.xhtml").unwrap().data,
            doc.get_item("OEBPS/chapter1.xhtml").unwrap().data
        );
    }

    #[test]
    fn test_rewrite_invalid_utf8_markup() {
        let opf = package_document(
            &["zh-cn"],
            &[
                ("chapter1", "chapter1.xhtml", "application/xhtml+xml"),
                ("chapter2", "chapter2.xhtml", "application/xhtml+xml"),
            ],
        );
        let chapter = chapter_xhtml("<p>ok</p>");
        let data = build_epub(&[
            ("mimetype", b"application/epub+zip".as_slice()),
            ("META-INF/container.xml", container_xml("content.opf").as_bytes()),
            ("content.opf", opf.as_bytes()),
            ("chapter1.xhtml", chapter.as_bytes()),
            ("chapter2.xhtml", b"<p>\xD6\xD0\xCE\xC4</p>".as_slice()),
        ]);
        let doc = load(data);

        let result = rewrite(&doc, &ZhconvTransliterator::default());
        assert_eq!(
            result.unwrap_err(),
            EpubError::MarkupDecodeError {
                resource: "chapter2.xhtml".to_string(),
                source: String::from_utf8(vec![0xFF]).unwrap_err(),
            }
        );
    }
}
