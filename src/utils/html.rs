
/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe tags (like <b>, <p>) survive, <script>/<iframe> and
/// event-handler attributes are stripped. Applied to admin-authored catalog
/// and question text before it is stored.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input.trim())
}

/// Cleans an optional field, dropping it when nothing is left.
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input.map(clean_html).filter(|s| !s.is_empty())
}
