//! Structural search and replace for PHP source trees.
//!
//! A pattern is an ordinary PHP snippet extended with meta-variables
//! (`${"x:var"}`) and list wildcards (`${"*"}`). The pattern compiler turns
//! it into a template tree; the matcher walks an input tree and reports every
//! subtree structurally equivalent to the template, binding meta-variables
//! along the way.

pub mod ast;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod parser;
pub mod pattern;
pub mod rewrite;
pub mod scanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// 0-indexed byte offset in the source
    pub offset: usize,
    /// 1-indexed line number
    pub line: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self { offset: 0, line: 1 }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

impl From<SourceLocation> for std::ops::Range<usize> {
    fn from(loc: SourceLocation) -> Self {
        loc.start.offset..loc.end.offset
    }
}

pub use filter::Filter;
pub use matcher::{Capture, MatchData, Matcher};
pub use pattern::{CompileOption, Compiler};
