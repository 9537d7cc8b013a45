//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    /// Parent node (None for document root)
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// String id of the element name or PI target
    pub name_id: u32,
    /// String id of text, CDATA or comment content, or PI data
    pub value_id: u32,
    /// Start of attributes in attribute arena (for elements)
    pub attr_start: u32,
    /// Number of attributes
    pub attr_count: u32,
}

impl XmlNode {
    fn with_kind(kind: NodeKind, parent: Option<NodeId>) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            value_id: 0,
            attr_start: 0,
            attr_count: 0,
        }
    }

    pub fn document() -> Self {
        Self::with_kind(NodeKind::Document, None)
    }

    pub fn element(name_id: u32, parent: NodeId) -> Self {
        XmlNode {
            name_id,
            ..Self::with_kind(NodeKind::Element, Some(parent))
        }
    }

    /// Text, CDATA or comment node carrying `value_id`
    pub fn character_data(kind: NodeKind, value_id: u32, parent: NodeId) -> Self {
        debug_assert!(matches!(kind, NodeKind::Text | NodeKind::CData | NodeKind::Comment));
        XmlNode {
            value_id,
            ..Self::with_kind(kind, Some(parent))
        }
    }

    pub fn processing_instruction(target_id: u32, data_id: u32, parent: NodeId) -> Self {
        XmlNode {
            name_id: target_id,
            value_id: data_id,
            ..Self::with_kind(NodeKind::ProcessingInstruction, Some(parent))
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

/// Stored attribute
#[derive(Debug, Clone, Copy)]
pub struct XmlAttribute {
    pub name_id: u32,
    pub value_id: u32,
}
