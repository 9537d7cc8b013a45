//! XML Serialization
//!
//! Writes an [`XmlDocument`] back out as UTF-8 with a leading XML
//! declaration. Each child of the root element goes on its own line,
//! indented by two spaces; whitespace-only text directly under the root is
//! replaced by that layout. Below the root, content is written as stored.

use crate::core::entities::{escape_attribute, escape_text};
use crate::dom::{NodeId, NodeKind, XmlDocument};

pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>";

const CHILD_INDENT: &str = "\n  ";

/// Serialize the whole document, declaration included.
pub fn to_bytes(doc: &XmlDocument) -> Vec<u8> {
    let mut out = String::with_capacity(doc.node_count() * 32);
    out.push_str(XML_DECLARATION);
    out.push('\n');

    if let Some(root) = doc.root_element_id() {
        let children: Vec<NodeId> = doc
            .children(root)
            .filter(|&id| !is_blank_text(doc, id))
            .collect();

        write_start_tag(doc, root, &mut out);
        if children.is_empty() {
            out.push_str(" />");
        } else {
            out.push('>');
            for child in children {
                out.push_str(CHILD_INDENT);
                write_node(doc, child, &mut out);
            }
            out.push('\n');
            write_end_tag(doc, root, &mut out);
        }
        out.push('\n');
    }

    out.into_bytes()
}

enum Step {
    Open(NodeId),
    Close(NodeId),
}

/// Serialize one node and its subtree.
pub fn write_node(doc: &XmlDocument, id: NodeId, out: &mut String) {
    let mut stack = vec![Step::Open(id)];

    while let Some(step) = stack.pop() {
        let node_id = match step {
            Step::Close(node_id) => {
                write_end_tag(doc, node_id, out);
                continue;
            }
            Step::Open(node_id) => node_id,
        };
        let Some(node) = doc.get_node(node_id) else {
            continue;
        };

        match node.kind {
            NodeKind::Element => {
                write_start_tag(doc, node_id, out);
                if node.has_children() {
                    out.push('>');
                    stack.push(Step::Close(node_id));
                    let before = stack.len();
                    stack.extend(doc.children(node_id).map(Step::Open));
                    stack[before..].reverse();
                } else {
                    out.push_str(" />");
                }
            }
            NodeKind::Text => out.push_str(&escape_text(content(doc, node_id))),
            NodeKind::CData => {
                out.push_str("<![CDATA[");
                out.push_str(content(doc, node_id));
                out.push_str("]]>");
            }
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(content(doc, node_id));
                out.push_str("-->");
            }
            NodeKind::ProcessingInstruction => {
                out.push_str("<?");
                out.push_str(doc.node_name(node_id).unwrap_or_default());
                let data = content(doc, node_id);
                if !data.is_empty() {
                    out.push(' ');
                    out.push_str(data);
                }
                out.push_str("?>");
            }
            NodeKind::Document => {}
        }
    }
}

fn write_start_tag(doc: &XmlDocument, id: NodeId, out: &mut String) {
    out.push('<');
    out.push_str(doc.node_name(id).unwrap_or_default());
    for (name, value) in doc.attribute_values(id) {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }
}

fn write_end_tag(doc: &XmlDocument, id: NodeId, out: &mut String) {
    out.push_str("</");
    out.push_str(doc.node_name(id).unwrap_or_default());
    out.push('>');
}

#[inline]
fn content(doc: &XmlDocument, id: NodeId) -> &str {
    doc.text_content(id).unwrap_or_default()
}

fn is_blank_text(doc: &XmlDocument, id: NodeId) -> bool {
    doc.get_node(id).is_some_and(|n| n.kind == NodeKind::Text)
        && content(doc, id).bytes().all(|b| b.is_ascii_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(input: &str) -> String {
        let doc = XmlDocument::parse(input.as_bytes()).unwrap();
        String::from_utf8(to_bytes(&doc)).unwrap()
    }

    #[test]
    fn test_declaration_and_layout() {
        let out = roundtrip("<root a=\"1\">\n    <x/>\n    <y>t</y>\n</root>");
        assert_eq!(
            out,
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<root a=\"1\">\n  <x />\n  <y>t</y>\n</root>\n"
        );
    }

    #[test]
    fn test_empty_root() {
        assert_eq!(
            roundtrip("<root k=\"v\"></root>"),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<root k=\"v\" />\n"
        );
    }

    #[test]
    fn test_nested_content_verbatim() {
        let out = roundtrip("<r><a>one <b>two</b> <!--c--><![CDATA[<x>]]><?p q?></a></r>");
        assert!(out.contains("<a>one <b>two</b> <!--c--><![CDATA[<x>]]><?p q?></a>"));
    }

    #[test]
    fn test_escaping() {
        let out = roundtrip("<r><a t=\"&quot;&lt;&amp;&#10;\">1 &lt; 2 &amp;&amp; 3 &gt; 2</a></r>");
        assert!(out.contains("<a t=\"&quot;&lt;&amp;&#10;\">1 &lt; 2 &amp;&amp; 3 &gt; 2</a>"));
    }

    #[test]
    fn test_output_reparses_to_same_values() {
        let input = "<r x=\"tab&#9;here\"><a v=\"it's &amp; &lt;ok&gt;\">é &amp; ü</a></r>";
        let first = XmlDocument::parse(input.as_bytes()).unwrap();
        let second = XmlDocument::parse(&to_bytes(&first)).unwrap();

        let r1 = first.root_element_id().unwrap();
        let r2 = second.root_element_id().unwrap();
        assert_eq!(first.attribute_values(r1), second.attribute_values(r2));

        let a1 = first.child_elements(r1).next().unwrap();
        let a2 = second.child_elements(r2).next().unwrap();
        assert_eq!(first.attribute_values(a1), second.attribute_values(a2));
        let t1 = first.children(a1).next().unwrap();
        let t2 = second.children(a2).next().unwrap();
        assert_eq!(first.text_content(t1), second.text_content(t2));
    }

    #[test]
    fn test_deep_nesting_does_not_recurse() {
        let depth = 20_000;
        let input = format!("<r>{}{}</r>", "<d>".repeat(depth), "</d>".repeat(depth));
        let out = roundtrip(&input);
        assert_eq!(out.matches("<d>").count(), depth - 1);
        assert!(out.contains("<d />"));
    }
}
