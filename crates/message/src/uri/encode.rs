//! Percent-encoding of URI components.
//!
//! Each component has its own set of bytes that pass through untouched. Everything else is
//! written as `%XX` with uppercase hex digits. A `%` that already starts a valid escape is
//! kept, so encoding an encoded component is a no-op.

use std::borrow::Cow;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Component {
    Path,
    /// Query and fragment share the same rules.
    Query,
    UserInfo,
    /// The user part of a user-info pair, where `:` is the separator and must be escaped.
    User,
}

#[inline]
pub(crate) fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

#[inline]
pub(crate) fn is_sub_delim(b: u8) -> bool {
    matches!(b, b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'=')
}

#[inline]
fn passes(component: Component, b: u8) -> bool {
    if is_unreserved(b) || is_sub_delim(b) {
        return true;
    }
    match component {
        Component::Path => matches!(b, b':' | b'@' | b'/'),
        Component::Query => matches!(b, b':' | b'@' | b'/' | b'?'),
        Component::UserInfo => b == b':',
        Component::User => false,
    }
}

/// Returns `true` when `bytes[index]` is a `%` followed by two hex digits.
#[inline]
pub(crate) fn is_escape(bytes: &[u8], index: usize) -> bool {
    bytes[index] == b'%'
        && bytes.get(index + 1).is_some_and(u8::is_ascii_hexdigit)
        && bytes.get(index + 2).is_some_and(u8::is_ascii_hexdigit)
}

#[inline]
fn keeps(bytes: &[u8], index: usize, component: Component) -> bool {
    passes(component, bytes[index]) || is_escape(bytes, index)
}

/// Percent-encodes `input` for `component`, borrowing when nothing has to change.
pub(crate) fn encode(input: &str, component: Component) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    let Some(first) = (0..bytes.len()).find(|&index| !keeps(bytes, index, component)) else {
        return Cow::Borrowed(input);
    };

    // every byte before `first` is ASCII, so `first` is a char boundary
    let mut encoded = String::with_capacity(input.len() + 16);
    encoded.push_str(&input[..first]);
    for (index, &b) in bytes.iter().enumerate().skip(first) {
        if keeps(bytes, index, component) {
            encoded.push(char::from(b));
        } else {
            encoded.push('%');
            encoded.push(char::from(HEX[usize::from(b >> 4)]));
            encoded.push(char::from(HEX[usize::from(b & 0x0f)]));
        }
    }
    Cow::Owned(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_passthrough() {
        let path = "/a-b_c.d~e/!$&'()*+,;=:@";
        assert!(matches!(encode(path, Component::Path), Cow::Borrowed(_)));
    }

    #[test]
    fn path_encodes_reserved() {
        assert_eq!(encode("/a b", Component::Path), "/a%20b");
        assert_eq!(encode("/a?b#c", Component::Path), "/a%3Fb%23c");
        assert_eq!(encode("/ü", Component::Path), "/%C3%BC");
    }

    #[test]
    fn keeps_valid_escapes() {
        assert_eq!(encode("/a%20b", Component::Path), "/a%20b");
        assert_eq!(encode("/a%2fb", Component::Path), "/a%2fb");
    }

    #[test]
    fn encodes_lonely_percent() {
        assert_eq!(encode("/100%", Component::Path), "/100%25");
        assert_eq!(encode("/%zz", Component::Path), "/%25zz");
        assert_eq!(encode("/%a", Component::Path), "/%25a");
    }

    #[test]
    fn query_allows_question_mark() {
        assert_eq!(encode("a=1?b=2", Component::Query), "a=1?b=2");
        assert_eq!(encode("a=[1]", Component::Query), "a=%5B1%5D");
    }

    #[test]
    fn user_escapes_colon() {
        assert_eq!(encode("us:er", Component::User), "us%3Aer");
        assert_eq!(encode("us:er", Component::UserInfo), "us:er");
        assert_eq!(encode("us@er", Component::UserInfo), "us%40er");
    }

    #[test]
    fn encoding_is_idempotent() {
        let once = encode("/a b/%zz/ü?x", Component::Path).into_owned();
        assert_eq!(encode(&once, Component::Path), once);
    }
}
