//! XML Entity Decoding and Escaping
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//! - Internal entities declared in the DOCTYPE
//!
//! and the reverse direction for serialization. Uses Cow for zero-copy
//! when nothing needs to change.

use memchr::{memchr, memchr2, memchr3};
use std::borrow::Cow;

use super::dtd::EntityTable;

/// Where decoded content came from; attribute values get whitespace
/// normalization, text content only gets line-end normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Attribute,
}

/// Nesting limit for references inside entity replacement text
const MAX_ENTITY_DEPTH: usize = 16;

/// Upper bound on the decoded size of one value when entities expand
const MAX_EXPANDED_LEN: usize = 16 * 1024 * 1024;

/// Decode content, rejecting bare '&' and undefined entities. References
/// to entities declared in the DOCTYPE are expanded from `entities`.
///
/// Returns Borrowed when the input has no entity references and no
/// characters that need normalizing.
pub fn decode_strict<'a>(
    input: &'a [u8],
    kind: ValueKind,
    entities: &EntityTable,
) -> Result<Cow<'a, [u8]>, &'static str> {
    let needs_work = match kind {
        ValueKind::Text => memchr2(b'&', b'\r', input).is_some(),
        ValueKind::Attribute => memchr3(b'&', b'\r', b'\n', input).is_some() || memchr(b'\t', input).is_some(),
    };
    if !needs_work {
        return Ok(Cow::Borrowed(input));
    }

    let mut result = Vec::with_capacity(input.len());
    decode_into(input, kind, entities, 0, &mut result)?;
    Ok(Cow::Owned(result))
}

fn decode_into(
    input: &[u8],
    kind: ValueKind,
    entities: &EntityTable,
    depth: usize,
    result: &mut Vec<u8>,
) -> Result<(), &'static str> {
    let mut pos = 0;

    while pos < input.len() {
        let b = input[pos];
        match b {
            b'&' => {
                let semi = memchr(b';', &input[pos..]).ok_or("Bare '&' not allowed; use &amp;")?;
                let entity = &input[pos + 1..pos + semi];
                match decode_char_reference(entity) {
                    Some(decoded) => {
                        let mut buf = [0u8; 4];
                        result.extend_from_slice(decoded?.encode_utf8(&mut buf).as_bytes());
                    }
                    None => {
                        let replacement = entities.get(entity).ok_or("Undefined entity reference")?;
                        if depth >= MAX_ENTITY_DEPTH {
                            return Err("Entity references nested too deeply");
                        }
                        if memchr(b'<', replacement).is_some() {
                            return Err("Markup in entity replacement text is not supported");
                        }
                        decode_into(replacement, kind, entities, depth + 1, result)?;
                        if result.len() > MAX_EXPANDED_LEN {
                            return Err("Entity expansion too large");
                        }
                    }
                }
                pos += semi + 1;
            }
            b'\r' => {
                // CRLF and lone CR both become a single line feed
                if input.get(pos + 1) == Some(&b'\n') {
                    pos += 1;
                }
                result.push(if kind == ValueKind::Attribute { b' ' } else { b'\n' });
                pos += 1;
            }
            b'\n' | b'\t' if kind == ValueKind::Attribute => {
                result.push(b' ');
                pos += 1;
            }
            _ => {
                result.push(b);
                pos += 1;
            }
        }
    }

    Ok(())
}

/// Decode a predefined entity or character reference (the part between
/// '&' and ';'). `None` means the name has to come from the DOCTYPE.
fn decode_char_reference(entity: &[u8]) -> Option<Result<char, &'static str>> {
    match entity {
        b"lt" => Some(Ok('<')),
        b"gt" => Some(Ok('>')),
        b"amp" => Some(Ok('&')),
        b"quot" => Some(Ok('"')),
        b"apos" => Some(Ok('\'')),
        [b'#', rest @ ..] => Some(decode_numeric_entity(rest).ok_or("Invalid character reference")),
        [] => Some(Err("Empty entity reference")),
        _ => None,
    }
}

/// Decode the digits of a numeric character reference (after '#')
fn decode_numeric_entity(digits: &[u8]) -> Option<char> {
    let text = std::str::from_utf8(digits).ok()?;
    let code = match text.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => text.parse::<u32>().ok()?,
    };
    let c = char::from_u32(code)?;
    is_xml_char(c).then_some(c)
}

/// XML 1.0 Char production
#[inline]
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Escape character data for element content.
///
/// `\r` is written as a character reference so it survives line-end
/// normalization on re-parse.
pub fn escape_text(input: &str) -> Cow<'_, str> {
    escape_with(input, |c| match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '\r' => Some("&#13;"),
        _ => None,
    })
}

/// Escape an attribute value for a double-quoted attribute.
///
/// Whitespace other than space is written as character references so the
/// value is not normalized when read back.
pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    escape_with(input, |c| match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        '\t' => Some("&#9;"),
        '\n' => Some("&#10;"),
        '\r' => Some("&#13;"),
        _ => None,
    })
}

fn escape_with(input: &str, replacement: impl Fn(char) -> Option<&'static str>) -> Cow<'_, str> {
    let Some(first) = input.char_indices().find(|&(_, c)| replacement(c).is_some()) else {
        return Cow::Borrowed(input);
    };

    let mut out = String::with_capacity(input.len() + 16);
    out.push_str(&input[..first.0]);
    for c in input[first.0..].chars() {
        match replacement(c) {
            Some(rep) => out.push_str(rep),
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}
