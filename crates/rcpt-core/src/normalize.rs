//! Cleanup of raw model responses before JSON parsing.

const FENCE_TAG: &str = "json";

/// Strip formatting artifacts from a raw model response.
///
/// Removes every backtick and every literal `json` substring, then trims
/// surrounding whitespace. The removal is unconditional and case-sensitive,
/// so a `json` inside a field value is removed as well.
pub fn normalize(raw: Option<&str>) -> Option<String> {
    let mut text = raw?.replace('`', "");

    // Removing one occurrence can join its neighbours into a new one.
    while text.contains(FENCE_TAG) {
        text = text.replace(FENCE_TAG, "");
    }

    Some(text.trim().to_string())
}
