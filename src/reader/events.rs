//! XML Event Types
//!
//! Event types for pull-parser style XML processing.

use crate::core::attributes::Attribute;
use std::borrow::Cow;

/// XML parsing event
#[derive(Debug, Clone)]
pub enum XmlEvent<'a> {
    /// Start of an element: <name attrs...>
    StartElement(StartElement<'a>),
    /// End of an element: </name>
    EndElement(EndElement<'a>),
    /// Empty element: <name attrs.../>
    EmptyElement(StartElement<'a>),
    /// Text content between tags (entities decoded)
    Text(Cow<'a, [u8]>),
    /// CDATA section content
    CData(&'a [u8]),
    /// Comment content
    Comment(&'a [u8]),
    /// Processing instruction: <?target data?>
    ProcessingInstruction {
        target: &'a [u8],
        data: Option<&'a [u8]>,
    },
    /// XML declaration: <?xml version="1.0"?>. The declared encoding is
    /// applied before parsing, so nothing is carried here.
    XmlDeclaration,
    /// DOCTYPE declaration, raw
    DocType(&'a [u8]),
}

/// Start element event data
#[derive(Debug, Clone)]
pub struct StartElement<'a> {
    /// Full element name (may include prefix)
    pub name: &'a [u8],
    /// Element attributes in source order
    pub attributes: Vec<Attribute<'a>>,
    /// Byte offset of the '<'
    pub position: usize,
}

/// End element event data
#[derive(Debug, Clone)]
pub struct EndElement<'a> {
    pub name: &'a [u8],
    pub position: usize,
}
