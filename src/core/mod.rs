//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML parsing:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: State machine for XML token extraction
//! - Entities: XML entity decoding with Cow (zero-copy when possible), and escaping
//! - Attributes: Attribute parsing and extraction
//! - Dtd: internal entity declarations from the DOCTYPE
//! - Encoding: UTF-16 detection and conversion to UTF-8

pub mod attributes;
pub mod dtd;
pub mod encoding;
pub mod entities;
pub mod scanner;
pub mod tokenizer;

pub use tokenizer::ParseError;
