//! Simplified to Traditional Chinese transliteration
//!
//! The rewriter only depends on the [Transliterate] trait. The real
//! implementation, [ZhconvTransliterator], delegates to the `zhconv` crate;
//! tests can pass any `Fn(&str) -> String` instead.

use std::{fmt, str::FromStr};

use zhconv::{Variant, zhconv};

use crate::error::ConfigError;

/// Maps text to another Chinese script
///
/// Implementations must return text with the same meaning, leaving
/// non-Chinese text unchanged.
pub trait Transliterate {
    fn transliterate(&self, text: &str) -> String;
}

impl<F> Transliterate for F
where
    F: Fn(&str) -> String,
{
    fn transliterate(&self, text: &str) -> String {
        self(text)
    }
}

/// Traditional Chinese flavour to convert to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TargetScript {
    /// Generic Traditional Chinese
    #[default]
    Traditional,

    /// Traditional Chinese with Taiwan vocabulary
    Taiwan,

    /// Traditional Chinese with Hong Kong vocabulary
    HongKong,
}

impl TargetScript {
    fn variant(self) -> Variant {
        match self {
            TargetScript::Traditional => Variant::ZhHant,
            TargetScript::Taiwan => Variant::ZhTW,
            TargetScript::HongKong => Variant::ZhHK,
        }
    }
}

impl fmt::Display for TargetScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetScript::Traditional => write!(f, "zh-Hant"),
            TargetScript::Taiwan => write!(f, "zh-TW"),
            TargetScript::HongKong => write!(f, "zh-HK"),
        }
    }
}

impl FromStr for TargetScript {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zh-hant" => Ok(TargetScript::Traditional),
            "zh-tw" => Ok(TargetScript::Taiwan),
            "zh-hk" => Ok(TargetScript::HongKong),
            _ => Err(ConfigError::InvalidValue {
                key: "target".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Transliterator backed by the `zhconv` conversion tables
#[derive(Debug, Clone, Copy, Default)]
pub struct ZhconvTransliterator {
    target: TargetScript,
}

impl ZhconvTransliterator {
    pub fn new(target: TargetScript) -> Self {
        Self { target }
    }

    pub fn target(&self) -> TargetScript {
        self.target
    }
}

impl Transliterate for ZhconvTransliterator {
    fn transliterate(&self, text: &str) -> String {
        zhconv(text, self.target.variant())
    }
}

#[cfg(test)]
mod tests {
    use crate::transliterate::{TargetScript, Transliterate, ZhconvTransliterator};

    #[test]
    fn test_zhconv_simplified_to_traditional() {
        let transliterator = ZhconvTransliterator::default();
        assert_eq!(transliterator.transliterate("爱"), "愛");
    }

    #[test]
    fn test_zhconv_keeps_non_chinese_text() {
        let transliterator = ZhconvTransliterator::default();
        let markup = r#"<p class="intro">Hello, world! 123</p>"#;
        assert_eq!(transliterator.transliterate(markup), markup);
    }

    #[test]
    fn test_zhconv_traditional_input_is_stable() {
        let transliterator = ZhconvTransliterator::new(TargetScript::Traditional);
        let once = transliterator.transliterate("我爱读书");
        assert_eq!(transliterator.transliterate(&once), once);
    }

    #[test]
    fn test_closure_transliterator() {
        let upper = |text: &str| text.to_uppercase();
        assert_eq!(upper.transliterate("abc"), "ABC");
    }

    #[test]
    fn test_target_script_from_str() {
        assert_eq!("zh-Hant".parse::<TargetScript>().unwrap(), TargetScript::Traditional);
        assert_eq!("zh-tw".parse::<TargetScript>().unwrap(), TargetScript::Taiwan);
        assert_eq!("ZH-HK".parse::<TargetScript>().unwrap(), TargetScript::HongKong);
        assert!("zh-Hans".parse::<TargetScript>().is_err());
    }
}
