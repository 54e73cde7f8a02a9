/// Canonical comparison form of a header or alias: lower-cased, with every
/// character outside `[a-z0-9]` removed.
///
/// Unit symbols, punctuation and whitespace never take part in a match, so
/// `"Ø mm"`, `"ømm"` and `"MM"` all compare equal.
pub fn normalize(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit())
        .collect()
}
