use tracing::trace;

use super::error::{ParseError, UriError};
use super::escape::{escape, into_text, unescape, unescape_str, Component};
use super::{ParseMode, ParsedUri, Userinfo};

/// Parses `input` as a request URI: absolute (`scheme:...`) or path-absolute
/// (`/...`). The fragment is not split off, so a `#` stays part of the path or
/// query.
pub fn parse_request_uri(input: &str) -> Result<ParsedUri, ParseError> {
    parse_with(input, ParseMode::Request).map_err(|kind| ParseError::new(input, kind))
}

/// Parses `input` as a general URI reference, relative forms and `#fragment`
/// included.
pub fn parse_reference(input: &str) -> Result<ParsedUri, ParseError> {
    let (rest, fragment) = match input.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (input, None),
    };

    let mut uri = parse_with(rest, ParseMode::Reference).map_err(|kind| ParseError::new(rest, kind))?;
    if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
        set_fragment(&mut uri, fragment).map_err(|kind| ParseError::new(input, kind))?;
    }
    Ok(uri)
}

/// Parses `input` according to `mode`
pub fn parse(input: &str, mode: ParseMode) -> Result<ParsedUri, ParseError> {
    match mode {
        ParseMode::Request => parse_request_uri(input),
        ParseMode::Reference => parse_reference(input),
    }
}

fn parse_with(input: &str, mode: ParseMode) -> Result<ParsedUri, UriError> {
    if input.bytes().any(|b| b < 0x20 || b == 0x7f) {
        return Err(UriError::ControlCharacter);
    }
    if input.is_empty() && mode == ParseMode::Request {
        return Err(UriError::Empty);
    }

    let mut uri = ParsedUri::default();
    if input == "*" {
        uri.path = "*".to_string();
        return Ok(uri);
    }

    let (scheme, rest) = split_scheme(input)?;
    uri.scheme = scheme.to_ascii_lowercase();

    // A lone trailing '?' asks for an empty query
    let rest = match rest.strip_suffix('?') {
        Some(stripped) if !stripped.contains('?') => stripped,
        _ => match rest.split_once('?') {
            Some((rest, query)) => {
                uri.raw_query = query.to_string();
                rest
            }
            None => rest,
        },
    };

    if !rest.starts_with('/') {
        if !uri.scheme.is_empty() {
            // rootless paths are opaque
            uri.opaque = rest.to_string();
            trace!("Opaque URI with scheme {}", uri.scheme);
            return Ok(uri);
        }
        if mode == ParseMode::Request {
            return Err(UriError::NotRequestUri);
        }
        let first_segment = rest.split('/').next().unwrap_or_default();
        if first_segment.contains(':') {
            return Err(UriError::ColonInFirstSegment);
        }
    }

    let has_authority = (!uri.scheme.is_empty()
        || (mode == ParseMode::Reference && !rest.starts_with("///")))
        && rest.starts_with("//");

    let path = if has_authority {
        let authority = &rest[2..];
        let (authority, path) = match authority.find('/') {
            Some(i) => authority.split_at(i),
            None => (authority, ""),
        };
        let (user, host) = parse_authority(authority)?;
        uri.user = user;
        uri.host = host;
        path
    } else {
        // `scheme:/path` has no authority at all, unlike `scheme:///path`
        uri.omit_host = !uri.scheme.is_empty();
        rest
    };

    set_path(&mut uri, path)?;
    Ok(uri)
}

/// Splits a leading `scheme:` off `input`
///
/// Returns an empty scheme when the input does not start with one.
fn split_scheme(input: &str) -> Result<(&str, &str), UriError> {
    for (i, c) in input.bytes().enumerate() {
        match c {
            b'a'..=b'z' | b'A'..=b'Z' => {}
            b'0'..=b'9' | b'+' | b'-' | b'.' => {
                if i == 0 {
                    return Ok(("", input));
                }
            }
            b':' => {
                if i == 0 {
                    return Err(UriError::MissingScheme);
                }
                return Ok((&input[..i], &input[i + 1..]));
            }
            _ => return Ok(("", input)),
        }
    }
    Ok(("", input))
}

fn parse_authority(authority: &str) -> Result<(Option<Userinfo>, String), UriError> {
    let Some(at) = authority.rfind('@') else {
        return Ok((None, parse_host(authority)?));
    };

    let host = parse_host(&authority[at + 1..])?;
    let userinfo = &authority[..at];
    if !valid_userinfo(userinfo) {
        return Err(UriError::InvalidUserinfo);
    }

    let user = match userinfo.split_once(':') {
        Some((username, password)) => Userinfo::with_password(
            unescape_str(username, Component::UserPassword)?,
            unescape_str(password, Component::UserPassword)?,
        ),
        None => Userinfo::new(unescape_str(userinfo, Component::UserPassword)?),
    };
    Ok((Some(user), host))
}

/// Validates and decodes a `host[:port]` or `[ip-literal][:port]` authority part
fn parse_host(host: &str) -> Result<String, UriError> {
    if host.starts_with('[') {
        let close = host.rfind(']').ok_or(UriError::MissingBracket)?;
        let port = &host[close + 1..];
        if !valid_optional_port(port) {
            return Err(UriError::InvalidPort(port.to_string()));
        }

        // RFC 6874 zone identifiers are introduced by an escaped '%'
        if let Some(zone) = host[..close].find("%25") {
            let mut decoded = unescape(&host[..zone], Component::Host)?;
            decoded.extend(unescape(&host[zone..close], Component::Zone)?);
            decoded.extend(unescape(&host[close..], Component::Host)?);
            return Ok(into_text(decoded));
        }
    } else if let Some(colon) = host.rfind(':') {
        let port = &host[colon..];
        if !valid_optional_port(port) {
            return Err(UriError::InvalidPort(port.to_string()));
        }
    }

    unescape_str(host, Component::Host)
}

fn valid_optional_port(port: &str) -> bool {
    match port.strip_prefix(':') {
        Some(digits) => digits.bytes().all(|b| b.is_ascii_digit()),
        None => port.is_empty(),
    }
}

fn valid_userinfo(userinfo: &str) -> bool {
    userinfo.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(
                c,
                '-' | '.' | '_' | ':' | '~' | '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+'
                    | ',' | ';' | '=' | '%' | '@'
            )
    })
}

/// Stores the decoded path, keeping the raw form only when it is not the
/// canonical encoding of the decoded one.
fn set_path(uri: &mut ParsedUri, raw: &str) -> Result<(), UriError> {
    let decoded = unescape(raw, Component::Path)?;
    if escape(&decoded, Component::Path) != raw {
        uri.raw_path = raw.to_string();
    }
    uri.path = into_text(decoded);
    Ok(())
}

fn set_fragment(uri: &mut ParsedUri, raw: &str) -> Result<(), UriError> {
    let decoded = unescape(raw, Component::Fragment)?;
    if escape(&decoded, Component::Fragment) != raw {
        uri.raw_fragment = raw.to_string();
    }
    uri.fragment = into_text(decoded);
    Ok(())
}
