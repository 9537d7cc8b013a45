//! XML Encoding Detection and Conversion
//!
//! Detects UTF-16 input by byte order mark or byte pattern and converts it
//! to UTF-8. Other input is read as UTF-8 unless its XML declaration names
//! a single-byte encoding this module can decode (ISO-8859-1, windows-1252).
//! A UTF-8 BOM takes precedence over the declaration.

use super::attributes::parse_attributes;
use super::dtd::EntityTable;
use super::tokenizer::ParseError;
use memchr::memmem;
use std::borrow::Cow;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
    Windows1252,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        match input {
            [0xFF, 0xFE, ..] | [b'<', 0x00, ..] => XmlEncoding::Utf16Le,
            [0xFE, 0xFF, ..] | [0x00, b'<', ..] => XmlEncoding::Utf16Be,
            _ => XmlEncoding::Utf8,
        }
    }

    /// Map an encoding name from an XML declaration (case-insensitive).
    /// ASCII is read as UTF-8, which contains it.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" | "us-ascii" | "ascii" => Some(XmlEncoding::Utf8),
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "latin-1" | "l1" => Some(XmlEncoding::Latin1),
            "windows-1252" | "cp1252" => Some(XmlEncoding::Windows1252),
            _ => None,
        }
    }
}

/// Return the input as UTF-8 bytes, converting if needed.
pub fn convert_to_utf8(input: &[u8]) -> Result<Cow<'_, [u8]>, ParseError> {
    match XmlEncoding::detect(input) {
        XmlEncoding::Utf16Le => decode_utf16(input, &[0xFF, 0xFE], u16::from_le_bytes).map(Cow::Owned),
        XmlEncoding::Utf16Be => decode_utf16(input, &[0xFE, 0xFF], u16::from_be_bytes).map(Cow::Owned),
        _ => {
            if let Some(body) = input.strip_prefix(UTF8_BOM) {
                return validate_utf8(body);
            }
            let Some(label) = declared_encoding(input) else {
                return validate_utf8(input);
            };
            match XmlEncoding::from_label(&label) {
                Some(XmlEncoding::Utf8) => validate_utf8(input),
                Some(XmlEncoding::Latin1) => Ok(decode_latin1(input)),
                Some(XmlEncoding::Windows1252) => decode_windows1252(input).map(Cow::Owned),
                _ => Err(ParseError::new(format!("Unsupported encoding '{}'", label), 0)),
            }
        }
    }
}

/// The `encoding` pseudo-attribute of a leading `<?xml ...?>`, if any
fn declared_encoding(input: &[u8]) -> Option<String> {
    let rest = input.strip_prefix(b"<?xml")?;
    if !rest.first().is_some_and(u8::is_ascii_whitespace) {
        return None;
    }
    let end = memmem::find(rest, b"?>")?;
    let attrs = parse_attributes(&rest[..end], &EntityTable::new()).ok()?;
    let value = attrs.into_iter().find(|a| a.name == b"encoding")?.value;
    String::from_utf8(value.into_owned()).ok()
}

fn validate_utf8(input: &[u8]) -> Result<Cow<'_, [u8]>, ParseError> {
    std::str::from_utf8(input).map_err(|e| ParseError::new("Input is not valid UTF-8", e.valid_up_to()))?;
    Ok(Cow::Borrowed(input))
}

/// Every byte is the code point of the same value
fn decode_latin1(input: &[u8]) -> Cow<'_, [u8]> {
    if input.is_ascii() {
        return Cow::Borrowed(input);
    }
    let text: String = input.iter().map(|&b| char::from(b)).collect();
    Cow::Owned(text.into_bytes())
}

/// windows-1252 differs from ISO-8859-1 only in 0x80..=0x9F; 0 marks
/// the five unassigned bytes.
const WINDOWS_1252_HIGH: [u16; 32] = [
    0x20AC, 0, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, //
    0x02C6, 0x2030, 0x0160, 0x2039, 0x0152, 0, 0x017D, 0, //
    0, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, //
    0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0, 0x017E, 0x0178,
];

fn decode_windows1252(input: &[u8]) -> Result<Vec<u8>, ParseError> {
    let mut text = String::with_capacity(input.len() + input.len() / 8);
    for (i, &b) in input.iter().enumerate() {
        let c = match b {
            0x80..=0x9F => char::from_u32(u32::from(WINDOWS_1252_HIGH[usize::from(b - 0x80)]))
                .filter(|&c| c != '\0')
                .ok_or_else(|| ParseError::new(format!("Byte 0x{:02X} is not defined in windows-1252", b), i))?,
            _ => char::from(b),
        };
        text.push(c);
    }
    Ok(text.into_bytes())
}

fn decode_utf16(input: &[u8], bom: &[u8], unit: fn([u8; 2]) -> u16) -> Result<Vec<u8>, ParseError> {
    let bytes = input.strip_prefix(bom).unwrap_or(input);
    if bytes.len() % 2 != 0 {
        return Err(ParseError::new("Invalid UTF-16: odd number of bytes", input.len()));
    }

    let code_units: Vec<u16> = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]])).collect();
    String::from_utf16(&code_units)
        .map(String::into_bytes)
        .map_err(|e| ParseError::new(format!("Invalid UTF-16: {}", e), 0))
}
