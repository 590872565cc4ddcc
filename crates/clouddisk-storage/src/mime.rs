//! Content-type guessing for downloads.

/// Guess a MIME type from a file name, falling back to
/// `application/octet-stream`.
pub fn content_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .to_string()
}
