use std::sync::LazyLock;

use regex::Regex;

static CANONICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3}-[0-9]{3}-[0-9]{4}").unwrap());

static LEADING_HYPHEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-[0-9]{3}-[0-9]{3}-[0-9]{4}").unwrap());

static COUNTRY_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]-[0-9]{3}-[0-9]{3}-[0-9]{4}").unwrap());

static BARE_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{9}").unwrap());

static AREA_CODE_JOINED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{6}-[0-9]{4}").unwrap());

/// Best-effort rewrite of a phone number into `###-###-####`. Shapes that are
/// not recognized come back with only the `+1` and whitespace removed.
pub fn canonicalize_phone(raw: &str) -> String {
    if CANONICAL_RE.is_match(raw) {
        return raw.to_string();
    }

    let mut phone: String = raw
        .replace("+1", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if phone.contains('(') || phone.contains(')') {
        phone = phone.replace('(', "").replace(')', "-");
    }

    // All patterns below only match ASCII digits and hyphens, so the byte
    // offsets used for slicing are char boundaries.
    if LEADING_HYPHEN_RE.is_match(&phone) {
        phone = phone[1..].to_string();
    }
    if COUNTRY_CODE_RE.is_match(&phone) {
        phone = phone[2..].to_string();
    }
    if BARE_DIGITS_RE.is_match(&phone) {
        phone = format!("{}-{}-{}", &phone[..3], &phone[3..6], &phone[6..]);
    }
    if AREA_CODE_JOINED_RE.is_match(&phone) {
        phone = format!("{}-{}", &phone[..3], &phone[3..]);
    }

    phone
}
