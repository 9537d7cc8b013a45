//! DOM Module - Arena-based XML Document
//!
//! Implements an efficient DOM representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for names, values and text

pub mod document;
pub mod node;
pub mod strings;

pub use document::{MatchMode, XmlDocument, DOCUMENT_NODE};
pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode};
pub use strings::StringPool;
