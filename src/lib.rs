//! xmlsplit - Split large XML files into fixed-size chunks
//!
//! Layers:
//! core:   memchr scanner, tokenizer, entities, attributes, encoding
//! reader: zero-copy pull parser producing XmlEvent values
//! dom:    arena document with element search and subtree copy
//! writer: serializer for chunk documents
//! split:  the ChunkSplitter itself
//!
//! ```no_run
//! let written = xmlsplit::split("action_types.xml", "out", "action", 500)?;
//! println!("{} chunk files", written.len());
//! # Ok::<(), xmlsplit::SplitError>(())
//! ```

pub mod config;
pub mod core;
pub mod dom;
pub mod error;
pub mod reader;
pub mod split;
pub mod writer;

pub use config::Preset;
pub use crate::core::ParseError;
pub use dom::{MatchMode, XmlDocument};
pub use error::SplitError;
pub use split::{split, ChunkFile, ChunkSplitter, SplitOptions, SplitReport, DEFAULT_CHUNK_SIZE};
