use crate::candidates::MatchIndexSet;
use hwfmt_data::internal::*;

/// The default tiled layout, never picked by the origin fallback.
pub const FALLBACK_EXCLUDED_FORMAT: Format = Format::NC1HWC0;

/// Keeps the candidates laid out as `expected`, or as a weak format when the
/// tensor's origin format already is `expected`. May return an empty set.
pub fn find_suitable_format(
    formats: &[Format],
    expected: Format,
    origin: Format,
    set: &MatchIndexSet,
) -> MatchIndexSet {
    set.filter(|ix| match formats.get(ix) {
        Some(f) => *f == expected || (f.is_weak() && origin == expected),
        None => false,
    })
}

/// Format narrowing with the weak origin fallback.
///
/// When nothing suits and the origin format itself is weak, the original
/// set is narrowed by dropping only the default tiled layout, so that later
/// stages do not drift into it without a declared preference.
pub fn match_format(
    formats: &[Format],
    expected: Format,
    origin: Format,
    set: &MatchIndexSet,
) -> Result<MatchIndexSet, ResolutionError> {
    let suitable = find_suitable_format(formats, expected, origin, set);
    if !suitable.is_empty() {
        trace!("Format {} (origin {}) keeps {}", expected, origin, suitable);
        return Ok(suitable);
    }
    if origin.is_weak() {
        let fallback = set.filter(|ix| {
            formats.get(ix).is_some_and(|f| *f != FALLBACK_EXCLUDED_FORMAT)
        });
        debug!("No candidate in {}, weak origin falls back to {}", expected, fallback);
        return fallback.non_empty(|| {
            format!("no candidate in {expected} and only {FALLBACK_EXCLUDED_FORMAT} left")
        });
    }
    fail!(NoMatch, "no candidate in {} (origin {})", expected, origin)
}
