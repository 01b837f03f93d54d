//! Cleanup rules for the `k`/`v` pairs of OSM `tag` children.
//!
//! Tags with a namespaced key (`addr:street`) are typed by their prefix and
//! their value is rewritten according to the suffix. Every rule is a pure
//! function of its input; callers that want to count problems look at the
//! returned [`NormalizedTag`].

pub mod address;
pub mod phone;
pub mod street;

use std::sync::LazyLock;

use regex::Regex;

pub use address::{canonicalize_county, canonicalize_county_with, canonicalize_postal};
pub use phone::canonicalize_phone;
pub use street::{canonicalize_street, StreetName};

use address::{DEFAULT_COUNTY_FALLBACK, DEFAULT_STATE_CODE};

pub const DEFAULT_TAG_TYPE: &str = "regular";

static LOWER_COLON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_]+:[a-z_]+").unwrap());

static PROBLEM_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[=+/&<>;'"?%#$@,. \t\r\n]"#).unwrap());

/// True for keys that must never reach the output tables.
pub fn has_problem_chars(key: &str) -> bool {
    PROBLEM_CHARS_RE.is_match(key)
}

/// Splits a namespaced key into `(prefix, suffix)` at its first colon.
/// Returns `None` for regular keys.
pub fn split_namespace(key: &str) -> Option<(&str, &str)> {
    if LOWER_COLON_RE.is_match(key) {
        key.split_once(':')
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTag {
    pub key: String,
    pub value: String,
    pub tag_type: String,
    /// Trailing street word that no rule could fix.
    pub street_issue: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TagNormalizer {
    state_code: String,
    county_fallback: String,
}

impl Default for TagNormalizer {
    fn default() -> Self {
        TagNormalizer::new(DEFAULT_STATE_CODE, DEFAULT_COUNTY_FALLBACK)
    }
}

impl TagNormalizer {
    pub fn new(state_code: &str, county_fallback: &str) -> TagNormalizer {
        TagNormalizer {
            state_code: state_code.to_string(),
            county_fallback: county_fallback.to_string(),
        }
    }

    /// Cleans one tag. Returns `None` when the key contains problem characters
    /// and the tag has to be dropped.
    pub fn normalize(&self, key: &str, value: &str) -> Option<NormalizedTag> {
        if has_problem_chars(key) {
            return None;
        }

        let mut street_issue = None;
        let (tag_type, value) = match split_namespace(key) {
            Some((prefix, suffix)) => {
                let value = match suffix {
                    "state" => self.state_code.clone(),
                    "street" => {
                        let street = canonicalize_street(value);
                        street_issue = street.unrecognized_suffix;
                        street.value
                    }
                    "postcode" => canonicalize_postal(value),
                    "county" => canonicalize_county_with(value, &self.county_fallback),
                    _ => value.to_string(),
                };
                (prefix.to_string(), value)
            }
            None if key == "phone" => (DEFAULT_TAG_TYPE.to_string(), canonicalize_phone(value)),
            None => (DEFAULT_TAG_TYPE.to_string(), value.to_string()),
        };

        Some(NormalizedTag {
            key: key.to_string(),
            value,
            tag_type,
            street_issue,
        })
    }
}
