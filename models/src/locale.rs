//! Supported UI locales and normalisation of arbitrary locale tags.

use crate::ModelError;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A locale the shell ships resources for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocaleCode {
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-CN")]
    ZhCn,
}

/// Display metadata for a supported locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppLocale {
    pub code: LocaleCode,
    pub label: &'static str,
    pub native_label: &'static str,
}

pub const SUPPORTED_LOCALES: [AppLocale; 2] = [
    AppLocale {
        code: LocaleCode::EnUs,
        label: "English (US)",
        native_label: "English (US)",
    },
    AppLocale {
        code: LocaleCode::ZhCn,
        label: "Simplified Chinese",
        native_label: "简体中文",
    },
];

pub const DEFAULT_LOCALE: LocaleCode = LocaleCode::EnUs;

impl LocaleCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            LocaleCode::EnUs => "en-US",
            LocaleCode::ZhCn => "zh-CN",
        }
    }

    /// Map any BCP 47-ish tag onto a supported locale.
    ///
    /// Simplified Chinese tags (`zh`, `zh-CN`, `zh-Hans`, ...) map to `zh-CN`;
    /// Traditional variants (`zh-TW`, `zh-HK`, `zh-MO`) and everything else map
    /// to `en-US`.
    pub fn normalize(input: &str) -> Self {
        let normalized = input.trim().to_lowercase();
        let is_traditional = ["zh-tw", "zh-hk", "zh-mo"]
            .iter()
            .any(|tag| normalized.contains(tag));

        if normalized.starts_with("zh") && !is_traditional {
            LocaleCode::ZhCn
        } else {
            DEFAULT_LOCALE
        }
    }

    /// CSS class applied to the document root, e.g. `locale-en-us`.
    pub fn css_class(self) -> String {
        let mut class = String::from("locale-");
        let mut pending_dash = false;
        for ch in self.as_str().chars() {
            if ch.is_ascii_alphanumeric() {
                if pending_dash {
                    class.push('-');
                    pending_dash = false;
                }
                class.push(ch.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        class
    }

    pub fn info(self) -> AppLocale {
        SUPPORTED_LOCALES
            .iter()
            .copied()
            .find(|locale| locale.code == self)
            .unwrap_or(SUPPORTED_LOCALES[0])
    }
}

/// CSS classes for every supported locale (used to clear the previous one).
pub fn all_locale_css_classes() -> Vec<String> {
    SUPPORTED_LOCALES
        .iter()
        .map(|locale| locale.code.css_class())
        .collect()
}

impl Default for LocaleCode {
    fn default() -> Self {
        DEFAULT_LOCALE
    }
}

impl Display for LocaleCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

/// Strict parse: only exact supported codes (case-insensitive) are accepted.
impl FromStr for LocaleCode {
    type Err = ModelError;

    #[track_caller]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SUPPORTED_LOCALES
            .iter()
            .map(|locale| locale.code)
            .find(|code| code.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ModelError::validation(format!("Unsupported locale code: '{value}'")))
    }
}
