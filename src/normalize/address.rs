pub const DEFAULT_STATE_CODE: &str = "GA";
pub const DEFAULT_COUNTY_FALLBACK: &str = "Fulton, GA";

/// Keeps the first five characters of a postcode that contains anything other
/// than digits ("30309-1234" becomes "30309"). All-digit codes are left alone.
pub fn canonicalize_postal(postcode: &str) -> String {
    if postcode.chars().any(|c| !c.is_ascii_digit()) {
        postcode.chars().take(5).collect()
    } else {
        postcode.to_string()
    }
}

pub fn canonicalize_county(county: &str) -> String {
    canonicalize_county_with(county, DEFAULT_COUNTY_FALLBACK)
}

/// Keeps only the first of several `:` or `;` separated counties. A county
/// naming Alabama is replaced by `fallback`.
pub fn canonicalize_county_with(county: &str, fallback: &str) -> String {
    let first = county
        .split_once(':')
        .or_else(|| county.split_once(';'))
        .map_or(county, |(first, _)| first);

    if first.contains("AL") {
        fallback.to_string()
    } else {
        first.to_string()
    }
}
