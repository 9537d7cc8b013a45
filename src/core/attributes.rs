//! XML Attribute Parsing
//!
//! Parses XML attributes from tag content, keeping source order.

use super::dtd::EntityTable;
use super::entities::{decode_strict, ValueKind};
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: &'a [u8],
    /// Attribute value (entities decoded, whitespace normalized)
    pub value: Cow<'a, [u8]>,
}

/// Parse attributes from raw tag content (after the element name).
///
/// Input is the content between the element name and '>' or '/>'.
/// Every attribute needs a quoted value and whitespace before its name;
/// a repeated name is an error. Entity references in values resolve
/// against `entities`.
pub fn parse_attributes<'a>(input: &'a [u8], entities: &EntityTable) -> Result<Vec<Attribute<'a>>, &'static str> {
    let mut attrs: Vec<Attribute<'a>> = Vec::new();
    let mut pos = 0;

    loop {
        let ws_start = pos;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() {
            break;
        }
        if pos == ws_start {
            return Err("Whitespace required between attributes");
        }

        let name_start = pos;
        if !is_name_start_char(input[pos]) {
            return Err("Attribute name must start with letter, underscore, or colon");
        }
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if input.get(pos) != Some(&b'=') {
            return Err("Attribute value required");
        }
        pos += 1;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        let quote = match input.get(pos) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => return Err("Attribute value must be quoted"),
        };
        pos += 1;
        let value_start = pos;
        let close = memchr::memchr(quote, &input[pos..]).ok_or("Attribute value has mismatched quotes")?;
        let raw = &input[value_start..value_start + close];
        if memchr::memchr(b'<', raw).is_some() {
            return Err("Attribute value cannot contain '<'");
        }
        pos = value_start + close + 1;

        if attrs.iter().any(|a| a.name == name) {
            return Err("Duplicate attribute");
        }
        let value = decode_strict(raw, ValueKind::Attribute, entities)?;
        attrs.push(Attribute { name, value });
    }

    Ok(attrs)
}
