//! XML Document - Arena-based DOM representation
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes
//! - NodeId indices for traversal
//! - String interning for names, values and text
//!
//! Documents are fully owned. Parsing is strict: anything that is not
//! well-formed is a [`ParseError`], never a partial tree.

use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode};
use super::strings::StringPool;
use crate::core::encoding::convert_to_utf8;
use crate::core::tokenizer::ParseError;
use crate::reader::events::{StartElement, XmlEvent};
use crate::reader::slice::SliceReader;

/// NodeId of the document node; the root element is its element child
pub const DOCUMENT_NODE: NodeId = 0;

/// Traversal rule for [`XmlDocument::find_elements`].
///
/// Both modes walk the descendants of the root element depth-first in
/// document order (pre-order). The root element itself is never a
/// candidate. Names are compared in full, prefix included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Every descendant with the tag, including ones nested inside an
    /// earlier match.
    #[default]
    All,
    /// Only matches with no matching ancestor below the root; the walk
    /// does not enter a matched element.
    Outermost,
}

impl std::str::FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(MatchMode::All),
            "outermost" => Ok(MatchMode::Outermost),
            other => Err(format!("unknown match mode '{}' (expected 'all' or 'outermost')", other)),
        }
    }
}

/// An XML document stored in arena format
#[derive(Debug)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    attributes: Vec<XmlAttribute>,
    strings: StringPool,
    /// Root element node ID (not document node)
    root_element: Option<NodeId>,
}

impl XmlDocument {
    fn empty() -> Self {
        XmlDocument {
            nodes: vec![XmlNode::document()],
            attributes: Vec::new(),
            strings: StringPool::new(),
            root_element: None,
        }
    }

    /// Parse a complete document. UTF-16 input and a UTF-8 BOM are accepted;
    /// error positions are byte offsets into the UTF-8 text.
    pub fn parse(input: &[u8]) -> Result<Self, ParseError> {
        let utf8 = convert_to_utf8(input)?;
        let mut doc = Self::empty();
        doc.build_from_events(&utf8)?;
        Ok(doc)
    }

    /// Create a document holding only a root element with the given
    /// name and attributes (in the order given).
    pub fn with_root<'s>(name: &str, attributes: impl IntoIterator<Item = (&'s str, &'s str)>) -> Self {
        let mut doc = Self::empty();
        let root = doc.push_element(name, attributes, DOCUMENT_NODE);
        doc.root_element = Some(root);
        doc
    }

    /// Build DOM from XML events
    fn build_from_events(&mut self, input: &[u8]) -> Result<(), ParseError> {
        let mut reader = SliceReader::new(input);
        let mut stack: Vec<NodeId> = vec![DOCUMENT_NODE];
        let mut tag_stack: Vec<(&[u8], usize)> = Vec::new();
        let mut seen_doctype = false;

        while let Some(event) = reader.next_event()? {
            let parent = *stack.last().unwrap_or(&DOCUMENT_NODE);
            let at_document_level = stack.len() == 1;

            match event {
                XmlEvent::StartElement(elem) | XmlEvent::EmptyElement(elem)
                    if at_document_level && self.root_element.is_some() =>
                {
                    return Err(ParseError::new("Document has multiple root elements", elem.position));
                }

                XmlEvent::StartElement(elem) => {
                    tag_stack.push((elem.name, elem.position));
                    let id = self.handle_element(&elem, parent)?;
                    stack.push(id);
                }

                XmlEvent::EmptyElement(elem) => {
                    self.handle_element(&elem, parent)?;
                }

                XmlEvent::EndElement(end) => match tag_stack.pop() {
                    Some((start_name, _)) if start_name == end.name => {
                        stack.pop();
                    }
                    Some((start_name, _)) => {
                        let message = format!(
                            "Tag mismatch: <{}> closed with </{}>",
                            String::from_utf8_lossy(start_name),
                            String::from_utf8_lossy(end.name)
                        );
                        return Err(ParseError::new(message, end.position));
                    }
                    None => {
                        let message = format!(
                            "Unexpected end tag: </{}> without matching start tag",
                            String::from_utf8_lossy(end.name)
                        );
                        return Err(ParseError::new(message, end.position));
                    }
                },

                XmlEvent::Text(content) => {
                    if at_document_level {
                        if !content.iter().all(u8::is_ascii_whitespace) {
                            return Err(ParseError::new(
                                "Text content not allowed at document level",
                                reader.position(),
                            ));
                        }
                        continue;
                    }
                    let text = utf8(&content, reader.position())?;
                    let value_id = self.strings.intern(text);
                    self.push_node(XmlNode::character_data(NodeKind::Text, value_id, parent));
                }

                XmlEvent::CData(content) => {
                    if at_document_level {
                        return Err(ParseError::new(
                            "CDATA section not allowed at document level",
                            reader.position(),
                        ));
                    }
                    let value_id = self.strings.intern(utf8(content, reader.position())?);
                    self.push_node(XmlNode::character_data(NodeKind::CData, value_id, parent));
                }

                XmlEvent::Comment(content) => {
                    let value_id = self.strings.intern(utf8(content, reader.position())?);
                    self.push_node(XmlNode::character_data(NodeKind::Comment, value_id, parent));
                }

                XmlEvent::ProcessingInstruction { target, data } => {
                    let target_id = self.strings.intern(utf8(target, reader.position())?);
                    let data_id = match data {
                        Some(data) => self.strings.intern(utf8(data, reader.position())?),
                        None => 0,
                    };
                    self.push_node(XmlNode::processing_instruction(target_id, data_id, parent));
                }

                XmlEvent::DocType(_) => {
                    if self.root_element.is_some() {
                        return Err(ParseError::new("DOCTYPE must come before root element", reader.position()));
                    }
                    if seen_doctype {
                        return Err(ParseError::new("Multiple DOCTYPE declarations not allowed", reader.position()));
                    }
                    seen_doctype = true;
                }

                XmlEvent::XmlDeclaration => {}
            }
        }

        if let Some(&(name, position)) = tag_stack.first() {
            return Err(ParseError::new(
                format!("Unclosed tag: <{}>", String::from_utf8_lossy(name)),
                position,
            ));
        }
        if self.root_element.is_none() {
            return Err(ParseError::new("Document has no root element", input.len()));
        }

        Ok(())
    }

    /// Handle start/empty element
    fn handle_element(&mut self, elem: &StartElement<'_>, parent: NodeId) -> Result<NodeId, ParseError> {
        let name = utf8(elem.name, elem.position)?;
        let mut attrs = Vec::with_capacity(elem.attributes.len());
        for attr in &elem.attributes {
            attrs.push((utf8(attr.name, elem.position)?, utf8(&attr.value, elem.position)?));
        }

        let id = self.push_element(name, attrs, parent);
        if parent == DOCUMENT_NODE {
            self.root_element = Some(id);
        }
        Ok(id)
    }

    fn push_element<'s>(
        &mut self,
        name: &str,
        attributes: impl IntoIterator<Item = (&'s str, &'s str)>,
        parent: NodeId,
    ) -> NodeId {
        let name_id = self.strings.intern(name);
        let mut node = XmlNode::element(name_id, parent);

        // Attributes of one element are contiguous in the arena
        node.attr_start = self.attributes.len() as u32;
        for (attr_name, attr_value) in attributes {
            let name_id = self.strings.intern(attr_name);
            let value_id = self.strings.intern(attr_value);
            self.attributes.push(XmlAttribute { name_id, value_id });
        }
        node.attr_count = self.attributes.len() as u32 - node.attr_start;

        self.push_node(node)
    }

    /// Append a node to the arena and link it as the last child of its parent
    fn push_node(&mut self, node: XmlNode) -> NodeId {
        let parent = node.parent.unwrap_or(DOCUMENT_NODE);
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        self.link_child(parent, id);
        id
    }

    /// Link a child node to its parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child_opt = self.nodes[parent_id as usize].last_child;

        if let Some(last_child_id) = last_child_opt {
            self.nodes[child_id as usize].prev_sibling = Some(last_child_id);
            self.nodes[last_child_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
    }

    /// Deep-copy the subtree at `node` of `source` and append it as the
    /// last child of `parent` in this document. Returns the new node's id.
    pub fn import_subtree(&mut self, source: &XmlDocument, node: NodeId, parent: NodeId) -> NodeId {
        let mut copied_root = parent;
        let mut pending: Vec<(NodeId, NodeId)> = vec![(node, parent)];

        while let Some((src_id, new_parent)) = pending.pop() {
            let Some(src) = source.get_node(src_id) else {
                continue;
            };

            let new_id = match src.kind {
                NodeKind::Document => continue,
                NodeKind::Element => {
                    let name = source.node_name(src_id).unwrap_or_default();
                    self.push_element(name, source.attribute_values(src_id), new_parent)
                }
                NodeKind::Text | NodeKind::CData | NodeKind::Comment => {
                    let value_id = self.strings.intern(source.text_content(src_id).unwrap_or_default());
                    self.push_node(XmlNode::character_data(src.kind, value_id, new_parent))
                }
                NodeKind::ProcessingInstruction => {
                    let target_id = self.strings.intern(source.node_name(src_id).unwrap_or_default());
                    let data_id = self.strings.intern(source.text_content(src_id).unwrap_or_default());
                    self.push_node(XmlNode::processing_instruction(target_id, data_id, new_parent))
                }
            };
            if src_id == node {
                copied_root = new_id;
            }

            // Reverse order so the first child is copied (and linked) first
            let children: Vec<NodeId> = source.children(src_id).collect();
            pending.extend(children.into_iter().rev().map(|child| (child, new_id)));
        }

        copied_root
    }

    /// Find elements named `tag` below the root element, in document order.
    /// See [`MatchMode`] for how nested matches are treated.
    pub fn find_elements(&self, tag: &str, mode: MatchMode) -> Vec<NodeId> {
        let (Some(root), Some(tag_id)) = (self.root_element, self.strings.lookup(tag)) else {
            return Vec::new();
        };
        let is_match = |id: NodeId| {
            self.get_node(id)
                .is_some_and(|n| n.is_element() && n.name_id == tag_id)
        };

        match mode {
            MatchMode::All => self.descendants(root).filter(|&id| is_match(id)).collect(),
            MatchMode::Outermost => {
                let mut found = Vec::new();
                let mut stack: Vec<NodeId> = self.children(root).collect();
                stack.reverse();
                while let Some(id) = stack.pop() {
                    if is_match(id) {
                        found.push(id);
                        continue;
                    }
                    let before = stack.len();
                    stack.extend(self.children(id));
                    stack[before..].reverse();
                }
                found
            }
        }
    }

    /// Get root element ID
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    /// Element name or PI target
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => self.strings.get_str(node.name_id),
            _ => None,
        }
    }

    /// Content of a text, CDATA or comment node, or PI data
    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Document | NodeKind::Element => None,
            _ => self.strings.get_str(node.value_id),
        }
    }

    /// Get attributes for an element
    pub fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        match self.get_node(id) {
            Some(node) => {
                let start = node.attr_start as usize;
                let end = start + node.attr_count as usize;
                self.attributes.get(start..end).unwrap_or(&[])
            }
            None => &[],
        }
    }

    /// Get attribute value by name
    pub fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.attributes(node_id)
            .iter()
            .find(|attr| self.strings.get_str(attr.name_id) == Some(name))
            .and_then(|attr| self.strings.get_str(attr.value_id))
    }

    /// All attribute names and values of a node, in source order
    pub fn attribute_values(&self, node_id: NodeId) -> Vec<(&str, &str)> {
        self.attributes(node_id)
            .iter()
            .filter_map(|attr| {
                let name = self.strings.get_str(attr.name_id)?;
                let value = self.strings.get_str(attr.value_id)?;
                Some((name, value))
            })
            .collect()
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_child);
        ChildIter { doc: self, next: first }
    }

    /// Iterate over all descendants of a node (depth-first, document order)
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        if let Some(node) = self.get_node(id) {
            let mut child_id = node.last_child;
            while let Some(cid) = child_id {
                stack.push(cid);
                child_id = self.get_node(cid).and_then(|n| n.prev_sibling);
            }
        }
        DescendantIter { doc: self, stack }
    }

    /// Element children of a node
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .filter(move |&child| self.get_node(child).is_some_and(XmlNode::is_element))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[inline]
fn utf8(bytes: &[u8], position: usize) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|_| ParseError::new("Invalid UTF-8 sequence", position))
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d XmlDocument,
    next: Option<NodeId>,
}

impl<'d> Iterator for ChildIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.get_node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first)
pub struct DescendantIter<'d> {
    doc: &'d XmlDocument,
    stack: Vec<NodeId>,
}

impl<'d> Iterator for DescendantIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;

        // Add children to stack in reverse order (so first child is processed first)
        if let Some(node) = self.doc.get_node(current) {
            let mut child_id = node.last_child;
            while let Some(id) = child_id {
                self.stack.push(id);
                child_id = self.doc.get_node(id).and_then(|n| n.prev_sibling);
            }
        }

        Some(current)
    }
}
