use std::sync::LazyLock;

use regex::Regex;

static STREET_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\S+\.?$").unwrap());

static LOWERCASE_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z]+\b").unwrap());

static UPPERCASE_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]+\b").unwrap());

/// Street types that are already in canonical form.
pub const EXPECTED_STREET_TYPES: [&str; 37] = [
    "Street", "Avenue", "Boulevard", "Drive", "Court", "Place", "Lane", "Road",
    "Trail", "Parkway", "Ridge", "Way", "Pass", "Creek", "Chase", "Crossing",
    "Terrace", "Point", "Path", "Loop", "Run", "Cove", "Bend", "Circle", "Trace", "Walk",
    "Southeast", "Southwest", "Square", "Northeast", "Northwest", "View", "Landing",
    "North", "East", "South", "West",
];

/// Abbreviations and their expansion. Looked up front to back, first hit wins.
pub const STREET_ABBREVIATIONS: [(&str, &str); 38] = [
    ("St", "Street"),
    ("St.", "Street"),
    ("Blvd", "Boulevard"),
    ("Blvd.", "Boulevard"),
    ("Ave", "Avenue"),
    ("Ave.", "Avenue"),
    ("Rd", "Road"),
    ("Rd.", "Road"),
    ("Dr", "Drive"),
    ("Dr.", "Drive"),
    ("Trl", "Trail"),
    ("Ln", "Lane"),
    ("Cir", "Circle"),
    ("Ct", "Court"),
    ("Hwy", "Highway"),
    ("Trce", "Trace"),
    ("Pkwy", "Parkway"),
    ("Pl", "Place"),
    ("Xing", "Crossing"),
    ("Ter", "Terrace"),
    ("Mhp", "Mobile Home Park"),
    ("Crst", "Crest"),
    ("Lndg", "Landing"),
    ("Pt", "Point"),
    ("S", "South"),
    ("S.", "South"),
    ("W", "West"),
    ("W.", "West"),
    ("N", "North"),
    ("N.", "North"),
    ("E", "East"),
    ("E.", "East"),
    ("NE", "Northeast"),
    ("NW", "Northwest"),
    ("SE", "Southeast"),
    ("SW", "Southwest"),
    ("Hts", "Heights"),
    ("Rte", "Route"),
];

/// Result of canonicalizing a street name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetName {
    pub value: String,
    /// Set when the trailing word is neither expected nor fixable. The value is
    /// then the input, untouched.
    pub unrecognized_suffix: Option<String>,
}

impl StreetName {
    fn unchanged(name: &str) -> StreetName {
        StreetName {
            value: name.to_string(),
            unrecognized_suffix: None,
        }
    }
}

/// Trailing word of a street name, including an optional final period.
pub fn street_type(name: &str) -> Option<&str> {
    STREET_TYPE_RE.find(name).map(|m| m.as_str())
}

pub fn is_expected_street_type(street_type: &str) -> bool {
    EXPECTED_STREET_TYPES.contains(&street_type)
}

pub fn expand_abbreviation(street_type: &str) -> Option<&'static str> {
    STREET_ABBREVIATIONS
        .iter()
        .find(|(abbreviation, _)| *abbreviation == street_type)
        .map(|(_, expansion)| *expansion)
}

pub fn canonicalize_street(name: &str) -> StreetName {
    let Some(found) = STREET_TYPE_RE.find(name) else {
        return StreetName::unchanged(name);
    };
    let suffix = found.as_str();
    if is_expected_street_type(suffix) {
        return StreetName::unchanged(name);
    }

    if let Some(expansion) = expand_abbreviation(suffix) {
        return StreetName {
            value: format!("{}{}", &name[..found.start()], expansion),
            unrecognized_suffix: None,
        };
    }

    if LOWERCASE_WORD_RE.is_match(name) || UPPERCASE_WORD_RE.is_match(name) {
        return StreetName {
            value: title_case(name),
            unrecognized_suffix: None,
        };
    }

    StreetName {
        value: name.to_string(),
        unrecognized_suffix: Some(suffix.to_string()),
    }
}

/// Upper-cases the first letter of every run of letters and lower-cases the
/// rest, so "PEACHTREE st ne" becomes "Peachtree St Ne".
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
