//! Internal DTD subset: general entity declarations
//!
//! Collects `<!ENTITY name "value">` declarations from the internal subset
//! of a DOCTYPE so references to them can be expanded in text and
//! attribute values. Parameter entities, external entities and all other
//! declarations (ELEMENT, ATTLIST, NOTATION) are skipped without
//! validation. External subsets are never fetched.

use std::collections::HashMap;

use memchr::memmem;

use super::scanner::{is_name_char, is_name_start_char, is_whitespace};

/// Declared general entities: name -> literal replacement text
#[derive(Debug, Default, Clone)]
pub struct EntityTable {
    entities: HashMap<Vec<u8>, Vec<u8>>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replacement text of a declared internal entity
    pub fn get(&self, name: &[u8]) -> Option<&[u8]> {
        self.entities.get(name).map(Vec::as_slice)
    }

    /// First declaration of a name wins
    fn declare(&mut self, name: &[u8], value: &[u8]) {
        self.entities.entry(name.to_vec()).or_insert_with(|| value.to_vec());
    }

    /// Collect the internal general entities of a raw `<!DOCTYPE ...>`
    /// declaration. A DOCTYPE without an internal subset gives an empty table.
    pub fn from_doctype(doctype: &[u8]) -> Result<Self, &'static str> {
        let mut table = EntityTable::new();
        let Some(open) = internal_subset_start(doctype) else {
            return Ok(table);
        };

        let mut pos = open + 1;
        while pos < doctype.len() {
            let rest = &doctype[pos..];
            if rest.starts_with(b"]") {
                break;
            } else if rest.starts_with(b"<!--") {
                let end = memmem::find(&rest[4..], b"-->").ok_or("Unterminated comment in DOCTYPE")?;
                pos += 4 + end + 3;
            } else if rest.starts_with(b"<?") {
                let end = memmem::find(rest, b"?>").ok_or("Unterminated processing instruction in DOCTYPE")?;
                pos += end + 2;
            } else if rest.starts_with(b"<!ENTITY") {
                pos = parse_entity_decl(doctype, pos + 8, &mut table)?;
            } else if rest.starts_with(b"<!") {
                pos = skip_declaration(doctype, pos + 2)?;
            } else {
                // whitespace and parameter entity references
                pos += 1;
            }
        }

        Ok(table)
    }
}

/// Index of the '[' opening the internal subset, skipping quoted literals
fn internal_subset_start(doctype: &[u8]) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in doctype.iter().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'[') => return Some(i),
            _ => {}
        }
    }
    None
}

/// Parse one entity declaration starting after `<!ENTITY`; returns the
/// position after its closing '>'.
fn parse_entity_decl(input: &[u8], mut pos: usize, table: &mut EntityTable) -> Result<usize, &'static str> {
    if !input.get(pos).copied().is_some_and(is_whitespace) {
        return Err("Whitespace required after <!ENTITY");
    }
    pos = skip_whitespace(input, pos);

    if input.get(pos) == Some(&b'%') {
        return skip_declaration(input, pos + 1);
    }

    let name_start = pos;
    if !input.get(pos).copied().is_some_and(is_name_start_char) {
        return Err("Invalid entity name in DOCTYPE");
    }
    while pos < input.len() && is_name_char(input[pos]) {
        pos += 1;
    }
    let name = &input[name_start..pos];
    pos = skip_whitespace(input, pos);

    match input.get(pos) {
        Some(&quote @ (b'"' | b'\'')) => {
            let value_start = pos + 1;
            let close = memchr::memchr(quote, &input[value_start..]).ok_or("Unterminated entity value")?;
            table.declare(name, &input[value_start..value_start + close]);
            skip_declaration(input, value_start + close + 1)
        }
        // SYSTEM or PUBLIC: external, not expanded
        Some(_) => skip_declaration(input, pos),
        None => Err("Unterminated entity declaration"),
    }
}

/// Skip to just past the '>' closing a markup declaration, honoring quotes
fn skip_declaration(input: &[u8], mut pos: usize) -> Result<usize, &'static str> {
    let mut quote: Option<u8> = None;
    while pos < input.len() {
        let b = input[pos];
        pos += 1;
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Ok(pos),
            _ => {}
        }
    }
    Err("Unterminated declaration in DOCTYPE")
}

#[inline]
fn skip_whitespace(input: &[u8], mut pos: usize) -> usize {
    while pos < input.len() && is_whitespace(input[pos]) {
        pos += 1;
    }
    pos
}
