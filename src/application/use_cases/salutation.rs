use super::text_normalizer::normalize_text;
use crate::domain::template::SALUTATION_UNCHANGED;

/// Replaces every occurrence of `from` with `to` after whitespace-normalising
/// the content and both phrases.
///
/// The returned content is normalised as a whole, so line breaks and
/// indentation from the source are gone. Returns the status line shown to the
/// user alongside the new content.
pub fn replace_salutation(content: &str, from: &str, to: &str) -> (String, String) {
    let normalized_from = normalize_text(from);
    if normalized_from.is_empty() {
        return (content.to_string(), SALUTATION_UNCHANGED.to_string());
    }
    let normalized_to = normalize_text(to);
    let normalized_content = normalize_text(content);

    tracing::debug!(
        from = %normalized_from,
        to = %normalized_to,
        occurrences = normalized_content.matches(normalized_from.as_str()).count(),
        "Replacing salutation"
    );

    let updated = normalized_content.replace(&normalized_from, &normalized_to);
    (updated, format!("Replaced '{}' with '{}'", from, to))
}
