use crate::locale::all_locale_css_classes;
use crate::{DEFAULT_LOCALE, LocaleCode, SUPPORTED_LOCALES};

use std::str::FromStr;

/// **VALUE**: Verifies simplified Chinese tags normalise to `zh-CN`.
///
/// **WHY THIS MATTERS**: `setLocale` accepts whatever the view hands it (OS tags included);
/// a round-trip must always land on a supported code.
///
/// **BUG THIS CATCHES**: Would catch case-sensitive matching or a dropped `zh` prefix rule.
#[test]
fn given_simplified_chinese_tags_when_normalized_then_returns_zh_cn() {
    for tag in ["zh", "zh-CN", "ZH-cn", "zh-Hans", "zh-SG", " zh-cn "] {
        assert_eq!(
            LocaleCode::normalize(tag),
            LocaleCode::ZhCn,
            "'{tag}' should normalise to zh-CN"
        );
    }
}

/// **VALUE**: Verifies traditional Chinese and unknown tags fall back to the default.
///
/// **BUG THIS CATCHES**: Would catch the traditional-variant exclusion being removed, which
/// would render Simplified resources for Taiwan/Hong Kong/Macau users.
#[test]
fn given_traditional_or_unknown_tags_when_normalized_then_returns_default() {
    for tag in ["zh-TW", "zh-HK", "zh-MO", "zh-Hant-TW", "fr-FR", "", "garbage"] {
        assert_eq!(
            LocaleCode::normalize(tag),
            DEFAULT_LOCALE,
            "'{tag}' should fall back to en-US"
        );
    }
}

/// **VALUE**: Verifies strict parsing accepts only supported codes.
///
/// **WHY THIS MATTERS**: Persisted preferences are validated with the strict parser; an
/// unsupported code must be treated as a corrupt file, not silently stored.
#[test]
fn given_codes_when_parsed_strictly_then_only_supported_codes_accepted() {
    assert_eq!(LocaleCode::from_str("en-US").unwrap(), LocaleCode::EnUs);
    assert_eq!(LocaleCode::from_str("zh-cn").unwrap(), LocaleCode::ZhCn);

    let err = LocaleCode::from_str("de-DE").unwrap_err();
    assert!(err.to_string().contains("de-DE"), "Error should name the input");
}

/// **VALUE**: Verifies the locale CSS class format.
///
/// **BUG THIS CATCHES**: Would catch case or separator changes that leave stale classes on
/// the document root after a locale switch.
#[test]
fn given_locale_when_css_class_requested_then_lowercase_dashed() {
    assert_eq!(LocaleCode::EnUs.css_class(), "locale-en-us");
    assert_eq!(LocaleCode::ZhCn.css_class(), "locale-zh-cn");
    assert_eq!(
        all_locale_css_classes(),
        vec![String::from("locale-en-us"), String::from("locale-zh-cn")]
    );
}

/// **VALUE**: Verifies locale codes serialize as their wire strings.
#[test]
fn given_locale_code_when_serialized_then_uses_bcp47_string() {
    let json = serde_json::to_string(&LocaleCode::ZhCn).unwrap();
    assert_eq!(json, "\"zh-CN\"");

    let parsed: LocaleCode = serde_json::from_str("\"en-US\"").unwrap();
    assert_eq!(parsed, LocaleCode::EnUs);

    let info = serde_json::to_value(SUPPORTED_LOCALES[1]).unwrap();
    assert_eq!(info["nativeLabel"], "简体中文");
}
