//! XML Tokenizer - State machine for XML token extraction
//!
//! Implements a pull-parser style tokenizer that extracts XML tokens:
//! - Element start/end tags
//! - Text content
//! - CDATA sections
//! - Comments
//! - Processing instructions and the XML declaration
//! - DOCTYPE declarations
//!
//! Every construct must be terminated; an unterminated one is reported as
//! a [`ParseError`] at the offset where it started.

use super::scanner::Scanner;
use std::fmt;

/// Current parsing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Initial state before parsing starts
    Init,
    /// Between constructs
    InsideText,
    /// End of input reached, or an error was reported
    Done,
}

/// Type of XML token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: <element>
    StartTag,
    /// Element end tag: </element>
    EndTag,
    /// Empty element: <element/>
    EmptyTag,
    /// Text content
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?target ...?>
    ProcessingInstruction,
    /// XML declaration: <?xml ...?>
    XmlDeclaration,
    /// DOCTYPE declaration
    DocType,
    /// End of file
    Eof,
}

/// A raw XML token. Slices borrow from the input; nothing is decoded yet.
#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in input (start, end)
    pub span: (usize, usize),
    /// Element name or PI target
    pub name: Option<&'a [u8]>,
    /// Attribute source for tags, body for text/CDATA/comments/PIs
    pub content: Option<&'a [u8]>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
        }
    }

    fn with_name(mut self, name: &'a [u8]) -> Self {
        self.name = Some(name);
        self
    }

    fn with_content(mut self, content: &'a [u8]) -> Self {
        self.content = Some(content);
        self
    }
}

/// Well-formedness error with the byte offset it was detected at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

/// XML tokenizer implementing a pull-parser pattern
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    state: ParseState,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Tokenizer {
            scanner: Scanner::new(input),
            state: ParseState::Init,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Get the next token. Returns `Ok(None)` once `Eof` has been produced.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        match self.state {
            ParseState::Done => return Ok(None),
            ParseState::Init => {
                if self.scanner.peek().is_some_and(|b| b.is_ascii_whitespace()) {
                    let start = self.scanner.position();
                    self.scanner.skip_whitespace();
                    if self.scanner.starts_with(b"<?xml") {
                        return self.fail("XML declaration must be at the very start of the document", start);
                    }
                    self.scanner.set_position(start);
                }
                self.state = ParseState::InsideText;
            }
            ParseState::InsideText => {}
        }

        let result = match self.scanner.peek() {
            None => {
                self.state = ParseState::Done;
                let pos = self.scanner.position();
                Ok(Token::new(TokenKind::Eof, (pos, pos)))
            }
            Some(b'<') => self.parse_markup(),
            Some(_) => Ok(self.parse_text()),
        };

        match result {
            Ok(token) => Ok(Some(token)),
            Err(err) => {
                self.state = ParseState::Done;
                Err(err)
            }
        }
    }

    fn fail<T>(&mut self, message: &str, position: usize) -> Result<T, ParseError> {
        self.state = ParseState::Done;
        Err(ParseError::new(message, position))
    }

    /// Parse markup starting with '<'
    fn parse_markup(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(1); // Skip '<'

        match self.scanner.peek() {
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start),
            Some(_) => self.parse_start_tag(start),
            None => Err(ParseError::new("Unexpected end of input after '<'", start)),
        }
    }

    /// Parse a start tag or empty element tag
    fn parse_start_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let name = self.scanner.read_name().ok_or_else(|| {
            ParseError::new("Invalid element name: must start with letter, underscore, or colon", start)
        })?;
        let attrs_start = self.scanner.position();

        let end = self.scanner.find_tag_end_quoted().map_err(|_| {
            ParseError::new(format!("Unterminated start tag <{}>", String::from_utf8_lossy(name)), start)
        })?;

        let is_empty = end > attrs_start && self.scanner.slice(end - 1, end) == b"/";
        let attrs_end = if is_empty { end - 1 } else { end };

        self.scanner.set_position(end + 1);

        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        Ok(Token::new(kind, (start, end + 1))
            .with_name(name)
            .with_content(self.scanner.slice(attrs_start, attrs_end)))
    }

    /// Parse an end tag
    fn parse_end_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '/'

        let name = self.scanner.read_name().ok_or_else(|| {
            ParseError::new("Invalid element name in end tag", start)
        })?;

        self.scanner.skip_whitespace();
        match self.scanner.peek() {
            Some(b'>') => {}
            Some(_) => return Err(ParseError::new("End tag cannot have attributes or other content", start)),
            None => {
                return Err(ParseError::new(
                    format!("Unterminated end tag </{}>", String::from_utf8_lossy(name)),
                    start,
                ))
            }
        }
        self.scanner.advance(1);

        Ok(Token::new(TokenKind::EndTag, (start, self.scanner.position())).with_name(name))
    }

    /// Parse markup starting with '!' (comment, CDATA, DOCTYPE)
    fn parse_bang_markup(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '!'

        if self.scanner.starts_with(b"--") {
            self.parse_comment(start)
        } else if self.scanner.starts_with(b"[CDATA[") {
            self.parse_cdata(start)
        } else if self.scanner.starts_with(b"DOCTYPE") {
            self.parse_doctype(start)
        } else {
            Err(ParseError::new("Invalid declaration - expected comment, CDATA, or DOCTYPE", start))
        }
    }

    /// Parse a comment <!--...-->
    fn parse_comment(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(2); // Skip '--'
        let content_start = self.scanner.position();

        let pos = self
            .scanner
            .find_seq(b"--")
            .ok_or_else(|| ParseError::new("Unterminated comment", start))?;
        self.scanner.set_position(pos);
        if !self.scanner.starts_with(b"-->") {
            return Err(ParseError::new("'--' not allowed inside comments", pos));
        }

        let content = self.scanner.slice(content_start, pos);
        self.scanner.advance(3); // Skip '-->'
        Ok(Token::new(TokenKind::Comment, (start, self.scanner.position())).with_content(content))
    }

    /// Parse a CDATA section <![CDATA[...]]>
    fn parse_cdata(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(7); // Skip '[CDATA['
        let content_start = self.scanner.position();

        let pos = self
            .scanner
            .find_seq(b"]]>")
            .ok_or_else(|| ParseError::new("Unterminated CDATA section", start))?;

        let content = self.scanner.slice(content_start, pos);
        self.scanner.set_position(pos + 3);
        Ok(Token::new(TokenKind::CData, (start, self.scanner.position())).with_content(content))
    }

    /// Parse a DOCTYPE declaration, skipping over an internal subset and quoted literals
    fn parse_doctype(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(7); // Skip 'DOCTYPE'

        let mut in_internal_subset = false;
        let mut quote: Option<u8> = None;

        while let Some(b) = self.scanner.peek() {
            self.scanner.advance(1);
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => in_internal_subset = true,
                (None, b']') => in_internal_subset = false,
                (None, b'>') if !in_internal_subset => {
                    let end = self.scanner.position();
                    return Ok(Token::new(TokenKind::DocType, (start, end))
                        .with_content(self.scanner.slice(start, end)));
                }
                _ => {}
            }
        }

        Err(ParseError::new("Unterminated DOCTYPE declaration", start))
    }

    /// Parse a processing instruction or the XML declaration
    fn parse_pi(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '?'

        let target = self
            .scanner
            .read_name()
            .ok_or_else(|| ParseError::new("Processing instruction requires a target name", start))?;
        let body_start = self.scanner.position();

        let end = self
            .scanner
            .find_seq(b"?>")
            .ok_or_else(|| ParseError::new("Unterminated processing instruction", start))?;
        self.scanner.set_position(end + 2);

        let body = self.scanner.slice(body_start, end);
        if target == b"xml" {
            if start != 0 {
                return Err(ParseError::new("XML declaration allowed only at the start of the document", start));
            }
            return Ok(Token::new(TokenKind::XmlDeclaration, (start, end + 2))
                .with_name(target)
                .with_content(body));
        }
        if target.eq_ignore_ascii_case(b"xml") {
            return Err(ParseError::new("Processing instruction target 'xml' is reserved", start));
        }
        if !body.is_empty() && !body[0].is_ascii_whitespace() {
            return Err(ParseError::new("Whitespace required after processing instruction target", start));
        }

        let data = trim_start(body);
        let token = Token::new(TokenKind::ProcessingInstruction, (start, end + 2)).with_name(target);
        Ok(if data.is_empty() { token } else { token.with_content(data) })
    }

    /// Parse character data up to the next '<' or end of input
    fn parse_text(&mut self) -> Token<'a> {
        let start = self.scanner.position();
        let end = self.scanner.find_tag_start().unwrap_or(start + self.scanner.remaining().len());
        self.scanner.set_position(end);
        Token::new(TokenKind::Text, (start, end)).with_content(self.scanner.slice(start, end))
    }
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes.iter().take_while(|b| b.is_ascii_whitespace()).count();
    &bytes[skip..]
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(Some(token)) if token.kind == TokenKind::Eof => None,
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
