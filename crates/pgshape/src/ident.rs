//! Identifier quoting.
//!
//! Names made only of lowercase ASCII letters, digits and underscores are
//! emitted bare, except for a few words that collide with Postgres keywords.
//! Everything else is wrapped in double quotes. Embedded double quotes are
//! not escaped.

/// Words that must be quoted even though they look like plain identifiers.
const RESERVED: &[&str] = &["user", "filter"];

/// Returns true if `name` must be double-quoted to be used as an identifier.
pub fn needs_quotes(name: &str) -> bool {
    let plain = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    !plain || RESERVED.contains(&name)
}

/// Quote `name` if needed, otherwise return it unchanged.
///
/// # Examples
///
/// ```
/// use pgshape::quote_ident;
/// assert_eq!(quote_ident("my_col"), "my_col");
/// assert_eq!(quote_ident("My-Col"), "\"My-Col\"");
/// assert_eq!(quote_ident("user"), "\"user\"");
/// ```
pub fn quote_ident(name: &str) -> String {
    if needs_quotes(name) {
        format!("\"{}\"", name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_stay_bare() {
        assert_eq!(quote_ident("my_col"), "my_col");
        assert_eq!(quote_ident("col2"), "col2");
        assert_eq!(quote_ident("_x"), "_x");
    }

    #[test]
    fn test_other_characters_are_quoted() {
        assert_eq!(quote_ident("My-Col"), "\"My-Col\"");
        assert_eq!(quote_ident("colX"), "\"colX\"");
        assert_eq!(quote_ident("has space"), "\"has space\"");
        assert_eq!(quote_ident("café"), "\"café\"");
    }

    #[test]
    fn test_reserved_words_are_quoted() {
        assert_eq!(quote_ident("user"), "\"user\"");
        assert_eq!(quote_ident("filter"), "\"filter\"");
        // only exact matches
        assert_eq!(quote_ident("users"), "users");
        assert_eq!(quote_ident("filter_id"), "filter_id");
    }

    #[test]
    fn test_embedded_quotes_are_not_escaped() {
        assert_eq!(quote_ident("a\"b"), "\"a\"b\"");
    }

    #[test]
    fn test_empty_name_is_bare() {
        assert!(!needs_quotes(""));
    }
}
