//! Script variant detection from package metadata

use crate::types::{MetadataBlock, ScriptVariant};

/// `dc:language` values that mark a book as Simplified Chinese
///
/// Matching is exact and case-sensitive. The bare `zh` tag is counted as
/// Simplified even though it does not name a script.
pub const SIMPLIFIED_CHINESE_LANGUAGES: [&str; 3] = ["zh-cn", "chi", "zh"];

/// Classifies the script variant of a book from its metadata block
///
/// Returns [ScriptVariant::SimplifiedChinese] when any `dc:language` value is
/// one of [SIMPLIFIED_CHINESE_LANGUAGES], and [ScriptVariant::Other] otherwise,
/// including when the book declares no language at all.
pub fn classify(metadata: &MetadataBlock) -> ScriptVariant {
    let simplified = metadata
        .languages()
        .iter()
        .any(|language| SIMPLIFIED_CHINESE_LANGUAGES.contains(&language.as_str()));

    if simplified {
        ScriptVariant::SimplifiedChinese
    } else {
        ScriptVariant::Other
    }
}
