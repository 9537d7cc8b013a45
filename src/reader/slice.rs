//! Zero-Copy Slice Parser
//!
//! Parses XML from a byte slice. Names, comments and CDATA borrow from the
//! input; text and attribute values are only copied when entities or line
//! ends need decoding. Entities declared in the DOCTYPE's internal subset
//! are expanded from the point the DOCTYPE is read.

use super::events::{EndElement, StartElement, XmlEvent};
use crate::core::attributes::{parse_attributes, Attribute};
use crate::core::dtd::EntityTable;
use crate::core::entities::{decode_strict, ValueKind};
use crate::core::tokenizer::{ParseError, Token, TokenKind, Tokenizer};

/// XML reader over a byte slice
pub struct SliceReader<'a> {
    tokenizer: Tokenizer<'a>,
    entities: EntityTable,
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        SliceReader {
            tokenizer: Tokenizer::new(input),
            entities: EntityTable::new(),
        }
    }

    /// Byte offset the reader has advanced to
    pub fn position(&self) -> usize {
        self.tokenizer.position()
    }

    /// Get the next XML event, `Ok(None)` at end of input
    pub fn next_event(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        loop {
            let Some(token) = self.tokenizer.next_token()? else {
                return Ok(None);
            };
            let start = token.span.0;

            let event = match token.kind {
                TokenKind::Eof => return Ok(None),

                TokenKind::StartTag | TokenKind::EmptyTag => {
                    let element = StartElement {
                        name: token.name.unwrap_or_default(),
                        attributes: tag_attributes(&token, &self.entities)?,
                        position: start,
                    };
                    if token.kind == TokenKind::EmptyTag {
                        XmlEvent::EmptyElement(element)
                    } else {
                        XmlEvent::StartElement(element)
                    }
                }

                TokenKind::EndTag => XmlEvent::EndElement(EndElement {
                    name: token.name.unwrap_or_default(),
                    position: start,
                }),

                TokenKind::Text => {
                    let raw = token.content.unwrap_or_default();
                    if raw.is_empty() {
                        continue;
                    }
                    let text = decode_strict(raw, ValueKind::Text, &self.entities).map_err(|msg| ParseError::new(msg, start))?;
                    XmlEvent::Text(text)
                }

                TokenKind::CData => XmlEvent::CData(token.content.unwrap_or_default()),

                TokenKind::Comment => XmlEvent::Comment(token.content.unwrap_or_default()),

                TokenKind::ProcessingInstruction => XmlEvent::ProcessingInstruction {
                    target: token.name.unwrap_or_default(),
                    data: token.content,
                },

                TokenKind::XmlDeclaration => {
                    // pseudo-attributes must still be well-formed
                    tag_attributes(&token, &self.entities)?;
                    XmlEvent::XmlDeclaration
                }

                TokenKind::DocType => {
                    let doctype = token.content.unwrap_or_default();
                    self.entities = EntityTable::from_doctype(doctype).map_err(|msg| ParseError::new(msg, start))?;
                    XmlEvent::DocType(doctype)
                }
            };

            return Ok(Some(event));
        }
    }
}

/// Parse the attribute source carried by a tag or declaration token
fn tag_attributes<'a>(token: &Token<'a>, entities: &EntityTable) -> Result<Vec<Attribute<'a>>, ParseError> {
    parse_attributes(token.content.unwrap_or_default(), entities).map_err(|msg| {
        let name = String::from_utf8_lossy(token.name.unwrap_or_default());
        ParseError::new(format!("{} in <{}>", msg, name), token.span.0)
    })
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = Result<XmlEvent<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}
