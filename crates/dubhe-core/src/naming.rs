//! Field and method name conversion between wire and Rust conventions.
//!
//! Wire schemas carry Java camelCase identifiers. Class definitions convert
//! field names to snake_case once at parse time; the client converts method
//! names the other way before sending. Both conversions are cosmetic: decoding
//! assigns object fields positionally and never looks names up on the wire.

/// Convert a camelCase identifier to snake_case.
///
/// An underscore is inserted only at a lowercase-or-digit to uppercase
/// boundary, then the whole name is lowercased. Runs of capitals collapse:
/// `getHTTPCode` becomes `get_httpcode`.
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c.is_ascii_uppercase() && prev.map_or(false, |p| p.is_ascii_lowercase() || p.is_ascii_digit()) {
            out.push('_');
        }
        out.extend(c.to_lowercase());
        prev = Some(c);
    }
    out
}

/// Convert a snake_case identifier to camelCase.
///
/// Each underscore followed by a word character is dropped and the character
/// uppercased; a trailing underscore is kept as-is.
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_' {
            match chars.peek() {
                Some(&next) if next.is_alphanumeric() || next == '_' => {
                    chars.next();
                    out.extend(next.to_uppercase());
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_to_snake_basic() {
        assert_eq!(camel_to_snake("detailMessage"), "detail_message");
        assert_eq!(camel_to_snake("stackTrace"), "stack_trace");
        assert_eq!(camel_to_snake("suppressedExceptions"), "suppressed_exceptions");
        assert_eq!(camel_to_snake("cause"), "cause");
    }

    #[test]
    fn camel_to_snake_digit_boundary() {
        // A digit counts as a lowercase boundary before a capital.
        assert_eq!(camel_to_snake("field2Name"), "field2_name");
        assert_eq!(camel_to_snake("utf8Length"), "utf8_length");
    }

    #[test]
    fn camel_to_snake_capital_runs() {
        // Only the lower-to-upper boundary splits; capital runs collapse.
        assert_eq!(camel_to_snake("getHTTPCode"), "get_httpcode");
        assert_eq!(camel_to_snake("XMLParser"), "xmlparser");
    }

    #[test]
    fn camel_to_snake_already_snake() {
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
        assert_eq!(camel_to_snake(""), "");
    }

    #[test]
    fn snake_to_camel_basic() {
        assert_eq!(snake_to_camel("say_hello"), "sayHello");
        assert_eq!(snake_to_camel("get_user_by_id"), "getUserById");
        assert_eq!(snake_to_camel("ping"), "ping");
    }

    #[test]
    fn snake_to_camel_edges() {
        // A trailing underscore has nothing to capitalize.
        assert_eq!(snake_to_camel("name_"), "name_");
        assert_eq!(snake_to_camel("_leading"), "Leading");
        assert_eq!(snake_to_camel(""), "");
    }

    #[test]
    fn round_trip_plain_names() {
        for name in ["detailMessage", "sayHello", "cause", "lineNumber"] {
            assert_eq!(snake_to_camel(&camel_to_snake(name)), name);
        }
    }
}
