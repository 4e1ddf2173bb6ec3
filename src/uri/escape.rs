use super::error::UriError;

const UPPER_HEX: &[u8; 16] = b"0123456789ABCDEF";

/// URI component a percent-encoding decision applies to
///
/// Each component tolerates a different set of reserved characters, so the
/// same byte may be literal in a path but escaped inside userinfo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Path,
    Host,
    Zone,
    UserPassword,
    QueryComponent,
    Fragment,
}

/// Reports whether `c` must be percent-encoded inside `component`
pub fn should_escape(c: u8, component: Component) -> bool {
    if c.is_ascii_alphanumeric() {
        return false;
    }

    if matches!(component, Component::Host | Component::Zone) {
        // sub-delims plus the characters needed for ports and IP literals
        if matches!(
            c,
            b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'=' | b':'
                | b'[' | b']' | b'<' | b'>' | b'"'
        ) {
            return false;
        }
    }

    match c {
        b'-' | b'_' | b'.' | b'~' => return false,
        b'$' | b'&' | b'+' | b',' | b'/' | b':' | b';' | b'=' | b'?' | b'@' => match component {
            Component::Path => return c == b'?',
            Component::UserPassword => return matches!(c, b'@' | b'/' | b'?' | b':'),
            Component::QueryComponent => return true,
            Component::Fragment => return false,
            Component::Host | Component::Zone => {}
        },
        _ => {}
    }

    if component == Component::Fragment && matches!(c, b'!' | b'(' | b')' | b'*') {
        return false;
    }

    true
}

/// Percent-encodes `bytes` for use inside `component`
pub fn escape(bytes: &[u8], component: Component) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &c in bytes {
        if !should_escape(c, component) {
            out.push(char::from(c));
        } else if c == b' ' && component == Component::QueryComponent {
            out.push('+');
        } else {
            out.push('%');
            out.push(char::from(UPPER_HEX[usize::from(c >> 4)]));
            out.push(char::from(UPPER_HEX[usize::from(c & 0x0f)]));
        }
    }
    out
}

/// Decodes percent-escapes in `s`, validating them against `component`
///
/// Malformed escapes are always rejected. Host and zone components are
/// stricter: ASCII bytes may not be escaped (except `%25`) and characters
/// outside the host alphabet are refused outright.
pub fn unescape(s: &str, component: Component) -> Result<Vec<u8>, UriError> {
    let bytes = s.as_bytes();

    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if i + 2 >= bytes.len()
                    || !bytes[i + 1].is_ascii_hexdigit()
                    || !bytes[i + 2].is_ascii_hexdigit()
                {
                    let end = (i + 3).min(bytes.len());
                    return Err(UriError::InvalidEscape(lossy(&bytes[i..end])));
                }
                let sequence = &bytes[i..i + 3];
                if component == Component::Host
                    && unhex(bytes[i + 1]) < 8
                    && sequence != b"%25"
                {
                    return Err(UriError::InvalidEscape(lossy(sequence)));
                }
                if component == Component::Zone {
                    let value = unhex(bytes[i + 1]) << 4 | unhex(bytes[i + 2]);
                    if sequence != b"%25"
                        && value != b' '
                        && should_escape(value, Component::Host)
                    {
                        return Err(UriError::InvalidEscape(lossy(sequence)));
                    }
                }
                i += 3;
            }
            c => {
                if matches!(component, Component::Host | Component::Zone)
                    && c < 0x80
                    && should_escape(c, component)
                {
                    return Err(UriError::InvalidHost(lossy(&bytes[i..i + 1])));
                }
                i += 1;
            }
        }
    }

    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                out.push(unhex(bytes[i + 1]) << 4 | unhex(bytes[i + 2]));
                i += 3;
            }
            b'+' if component == Component::QueryComponent => {
                out.push(b' ');
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Like [`unescape`], producing text
pub fn unescape_str(s: &str, component: Component) -> Result<String, UriError> {
    unescape(s, component).map(into_text)
}

/// Converts decoded bytes to text, replacing sequences that are not UTF-8
pub(crate) fn into_text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| lossy(e.as_bytes()))
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn unhex(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_path() {
        assert_eq!(unescape_str("/a%20b", Component::Path).unwrap(), "/a b");
        assert_eq!(unescape_str("/plain", Component::Path).unwrap(), "/plain");
        assert_eq!(unescape_str("a+b", Component::Path).unwrap(), "a+b");
    }

    #[test]
    fn test_unescape_query_component_plus() {
        assert_eq!(unescape_str("a+b%2Bc", Component::QueryComponent).unwrap(), "a b+c");
    }

    #[test]
    fn test_malformed_escapes() {
        assert_eq!(
            unescape("%zz", Component::Path),
            Err(UriError::InvalidEscape("%zz".to_string()))
        );
        assert_eq!(
            unescape("abc%4", Component::Path),
            Err(UriError::InvalidEscape("%4".to_string()))
        );
        assert_eq!(
            unescape("%", Component::QueryComponent),
            Err(UriError::InvalidEscape("%".to_string()))
        );
    }

    #[test]
    fn test_host_escapes() {
        // ASCII may not be escaped in a host name
        assert!(unescape("ex%41mple.com", Component::Host).is_err());
        // but non-ASCII bytes may
        assert_eq!(unescape_str("caf%C3%A9.fr", Component::Host).unwrap(), "café.fr");
        assert_eq!(
            unescape("exa mple.com", Component::Host),
            Err(UriError::InvalidHost(" ".to_string()))
        );
    }

    #[test]
    fn test_escape_per_component() {
        assert_eq!(escape(b"/a b?c", Component::Path), "/a%20b%3Fc");
        assert_eq!(escape(b"us@r:x", Component::UserPassword), "us%40r%3Ax");
        assert_eq!(escape(b"a b&c", Component::QueryComponent), "a+b%26c");
        assert_eq!(escape(b"frag!(x)", Component::Fragment), "frag!(x)");
        assert_eq!(escape(&[0xff], Component::Path), "%FF");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        assert_eq!(unescape_str("%FF", Component::Path).unwrap(), "\u{fffd}");
    }
}
