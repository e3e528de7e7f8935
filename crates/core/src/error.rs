use super::SourceLocation;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnexpectedEof,
    UnexpectedToken,
    UnexpectedChar,
    UnterminatedString,
    UnterminatedComment,
    UnterminatedInterpolation,
    BadNumberLiteral,
    MissingSemicolon,
}

/// Scan or parse failure. The parser stops at the first diagnostic; the
/// location points into the source that was handed to it (for a pattern this
/// is the augmented source, see [`crate::pattern::pattern_source`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub additional_message: Option<String>,
    pub location: SourceLocation,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind) -> Self {
        Self {
            kind,
            additional_message: None,
            location: SourceLocation::default(),
        }
    }
    pub fn with_location(mut self, loc: SourceLocation) -> Self {
        self.location = loc;
        self
    }
    pub fn with_additional_message(mut self, msg: String) -> Self {
        self.additional_message = Some(msg);
        self
    }

    fn msg(&self) -> &'static str {
        msg(&self.kind)
    }
}

#[cold]
#[inline(never)]
fn msg(kind: &ParseErrorKind) -> &'static str {
    use ParseErrorKind::*;
    match *kind {
        UnexpectedEof => "Unexpected end of input.",
        UnexpectedToken => "Unexpected token.",
        UnexpectedChar => "Unexpected character.",
        UnterminatedString => "String literal is missing its closing quote.",
        UnterminatedComment => "Block comment is missing its closing */.",
        UnterminatedInterpolation => "Interpolation is missing its closing brace.",
        BadNumberLiteral => "Malformed number literal.",
        MissingSemicolon => "Statement is missing its terminator.",
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.location.start.line, self.msg())?;
        if let Some(additional) = &self.additional_message {
            write!(f, " {additional}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Pattern compilation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern snippet does not parse.
    Syntax(ParseError),
    /// The pattern parses to nothing (empty input, bare opener).
    Empty,
    /// A `${"..."}` form names a class outside the recognised set.
    UnknownMetaClass { class: String },
    /// A `${"..."}` form with an empty name or class part, e.g. `${":var"}`.
    MalformedMetaVar { text: String },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::Syntax(err) => write!(f, "parse pattern: {err}"),
            PatternError::Empty => write!(f, "pattern contains no statement"),
            PatternError::UnknownMetaClass { class } => {
                write!(f, "unknown meta-variable class {class:?}")
            }
            PatternError::MalformedMetaVar { text } => {
                write!(f, "malformed meta-variable {text:?}")
            }
        }
    }
}

impl std::error::Error for PatternError {}

impl From<ParseError> for PatternError {
    fn from(err: ParseError) -> Self {
        PatternError::Syntax(err)
    }
}

/// Filter compilation failure, see [`crate::filter`].
#[derive(Debug)]
pub enum FilterError {
    Empty,
    MissingName { found: char },
    MissingOperator,
    LoneBang,
    BadOperator { found: String },
    BadRegex(regex::Error),
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::Empty => {
                write!(f, "filter must include matcher name, operator and its argument")
            }
            FilterError::MissingName { found } => {
                write!(f, "expected matcher name, found {found:?}")
            }
            FilterError::MissingOperator => write!(f, "missing operator"),
            FilterError::LoneBang => {
                write!(f, r#"operator: expected "!=" or "!~", found only "!""#)
            }
            FilterError::BadOperator { found } => {
                write!(f, "unexpected operator {found:?}")
            }
            FilterError::BadRegex(err) => write!(f, "argument: {err}"),
        }
    }
}

impl std::error::Error for FilterError {}

impl From<regex::Error> for FilterError {
    fn from(err: regex::Error) -> Self {
        FilterError::BadRegex(err)
    }
}

/// Two replacement edits claim overlapping byte ranges of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditConflict {
    pub first: (usize, usize),
    pub second: (usize, usize),
}

impl fmt::Display for EditConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "conflicting edits: [{}..{}) overlaps [{}..{})",
            self.first.0, self.first.1, self.second.0, self.second.1
        )
    }
}

impl std::error::Error for EditConflict {}
