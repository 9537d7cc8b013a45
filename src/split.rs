//! Chunk Splitter
//!
//! Splits one XML document into sibling documents of at most `chunk_size`
//! matched elements each. Every chunk keeps the source root's name and
//! attributes; its children are deep copies of the matched elements in
//! document order, so concatenating the chunks in file order gives back the
//! full match list.
//!
//! Output files are named `{stem}_part_{n}.xml` (n from 1) in the output
//! directory. A failed write leaves the earlier chunks on disk.

use std::fmt::Display;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::dom::{MatchMode, NodeId, XmlDocument};
use crate::error::SplitError;
use crate::writer;

pub const DEFAULT_CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Tag name to split on (not an XPath)
    pub element: String,
    pub chunk_size: usize,
    pub mode: MatchMode,
    /// Fail instead of overwriting an existing chunk file
    pub no_clobber: bool,
    /// Report the planned files without touching the output directory
    pub dry_run: bool,
    /// Suppress progress messages
    pub quiet: bool,
}

impl SplitOptions {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, element: impl Into<String>) -> Self {
        SplitOptions {
            input: input.into(),
            output_dir: output_dir.into(),
            element: element.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            mode: MatchMode::default(),
            no_clobber: false,
            dry_run: false,
            quiet: false,
        }
    }
}

/// One output file, written or planned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFile {
    pub path: PathBuf,
    pub elements: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SplitReport {
    /// Number of matched elements in the input
    pub found: usize,
    pub chunks: Vec<ChunkFile>,
    /// False for a dry run
    pub written: bool,
}

impl SplitReport {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.chunks.iter().map(|c| c.path.clone()).collect()
    }
}

pub struct ChunkSplitter {
    options: SplitOptions,
}

impl ChunkSplitter {
    /// Validate options. Nothing is read or written yet.
    pub fn new(options: SplitOptions) -> Result<Self, SplitError> {
        if options.chunk_size == 0 {
            return Err(SplitError::InvalidArgument("chunk size must be at least 1".into()));
        }
        if options.element.is_empty() || options.element.chars().any(|c| c.is_whitespace() || c == '<' || c == '>') {
            return Err(SplitError::InvalidArgument(format!(
                "'{}' is not a valid element tag name",
                options.element
            )));
        }
        Ok(ChunkSplitter { options })
    }

    pub fn run(&self) -> Result<SplitReport, SplitError> {
        let opts = &self.options;
        let doc = self.load()?;

        let matches = doc.find_elements(&opts.element, opts.mode);
        self.progress(format_args!("Found {} '{}' elements", matches.len(), opts.element));

        let stem = file_stem(&opts.input);
        let ranges: Vec<Range<usize>> = chunk_ranges(matches.len(), opts.chunk_size).collect();
        let chunks: Vec<ChunkFile> = ranges
            .iter()
            .enumerate()
            .map(|(index, range)| ChunkFile {
                path: opts.output_dir.join(chunk_file_name(&stem, index)),
                elements: range.len(),
            })
            .collect();

        if opts.dry_run {
            for chunk in &chunks {
                self.progress(format_args!("Would create {} ({} elements)", chunk.path.display(), chunk.elements));
            }
            return Ok(SplitReport {
                found: matches.len(),
                chunks,
                written: false,
            });
        }

        fs::create_dir_all(&opts.output_dir).map_err(|source| SplitError::CreateOutputDir {
            path: opts.output_dir.clone(),
            source,
        })?;

        if opts.no_clobber {
            if let Some(existing) = chunks.iter().find(|c| c.path.exists()) {
                return Err(SplitError::OutputExists {
                    path: existing.path.clone(),
                });
            }
        }

        if let Some(root) = doc.root_element_id() {
            for (chunk, range) in chunks.iter().zip(ranges) {
                let chunk_doc = build_chunk(&doc, root, &matches[range]);
                fs::write(&chunk.path, writer::to_bytes(&chunk_doc)).map_err(|source| SplitError::OutputWrite {
                    path: chunk.path.clone(),
                    source,
                })?;
                self.progress(format_args!("Created {} ({} elements)", chunk.path.display(), chunk.elements));
            }
        }

        self.progress("Splitting complete");
        Ok(SplitReport {
            found: matches.len(),
            chunks,
            written: true,
        })
    }

    fn load(&self) -> Result<XmlDocument, SplitError> {
        let path = &self.options.input;
        let bytes = fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => SplitError::MissingInput { path: path.clone() },
            _ => SplitError::ReadInput {
                path: path.clone(),
                source,
            },
        })?;

        XmlDocument::parse(&bytes).map_err(|err| SplitError::MalformedInput {
            path: path.clone(),
            message: err.message,
            position: err.position,
        })
    }

    fn progress(&self, message: impl Display) {
        if !self.options.quiet {
            println!("{}", message);
        }
    }
}

/// Split with default mode and overwrite behavior; returns the written paths.
pub fn split(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    element: &str,
    chunk_size: usize,
) -> Result<Vec<PathBuf>, SplitError> {
    let mut options = SplitOptions::new(input.as_ref(), output_dir.as_ref(), element);
    options.chunk_size = chunk_size;
    ChunkSplitter::new(options)?.run().map(|report| report.paths())
}

/// Consecutive index ranges of at most `size` covering `0..total`.
/// Yields `ceil(total / size)` ranges; none when `total` is 0.
pub fn chunk_ranges(total: usize, size: usize) -> impl Iterator<Item = Range<usize>> {
    debug_assert!(size > 0, "chunk size must be positive");
    let size = size.max(1);
    (0..total).step_by(size).map(move |start| start..(start + size).min(total))
}

/// File name of the chunk at zero-based `index`
pub fn chunk_file_name(stem: &str, index: usize) -> String {
    format!("{}_part_{}.xml", stem, index + 1)
}

/// Build a chunk document: a copy of the source root (name and attributes)
/// holding deep copies of `elements`, in the order given.
pub fn build_chunk(source: &XmlDocument, root: NodeId, elements: &[NodeId]) -> XmlDocument {
    let name = source.node_name(root).unwrap_or_default();
    let mut chunk = XmlDocument::with_root(name, source.attribute_values(root));
    if let Some(chunk_root) = chunk.root_element_id() {
        for &element in elements {
            chunk.import_subtree(source, element, chunk_root);
        }
    }
    chunk
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chunk".to_string())
}
