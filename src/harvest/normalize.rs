//! Pure normalizers turning raw page text into typed field values.
//!
//! Every function here degrades to absent/`Unknown` on bad input rather than
//! erroring; extraction failures must never abort a whole record.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::Availability;

fn non_price_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^0-9.]").unwrap())
}

/// Parse a displayed price like `"$12,345.67"` into a float.
///
/// Strips every character that is not a digit or decimal point first, so
/// currency symbols and thousands separators are tolerated. Returns None for
/// absent input or text with no numeric residue (e.g. `"Free"`).
pub fn parse_price(raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    let cleaned = non_price_chars().replace_all(raw, "");
    cleaned.parse::<f64>().ok()
}

/// Classify free-form availability text.
///
/// Case-sensitive substring match, `"In Stock"` checked before `"Sold Out"`,
/// first match wins. Unmatched non-empty text maps to `Unknown` rather than
/// being rejected. Absent or empty input returns None; the record builder
/// maps that to `Unknown`.
pub fn classify_availability(raw: Option<&str>) -> Option<Availability> {
    let text = raw?;
    if text.is_empty() {
        return None;
    }
    Some(if text.contains("In Stock") {
        Availability::InStock
    } else if text.contains("Sold Out") {
        Availability::SoldOut
    } else {
        Availability::Unknown
    })
}

/// Rewrite a template image URL to a fixed-width absolute URL.
///
/// Replaces the sizing token (e.g. `{width}x`) with the target width, then
/// prefixes `https:` unless the result already carries a scheme. The source
/// serves protocol-relative URLs like `//cdn.example.com/...`.
pub fn absolutize_image_url(
    raw: Option<&str>,
    width_token: &str,
    target_width: &str,
) -> Option<String> {
    let raw = raw?;
    let sized = raw.replace(width_token, target_width);
    if sized.starts_with("http") {
        Some(sized)
    } else {
        Some(format!("https:{}", sized))
    }
}
