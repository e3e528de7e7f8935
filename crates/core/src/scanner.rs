//! PHP token scanner.
//!
//! Operates on UTF-8 source text, byte-indexed. Outside `<?php` regions the
//! scanner emits inline-HTML tokens; `?>` closes a PHP region and implies a
//! statement terminator. Comments, whitespace and `#[...]` attributes are
//! trivia and never reach the parser.

use crate::error::{ParseError, ParseErrorKind as ErrorKind};
use crate::{Position, SourceLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pow,
    Dot,
    Question,
    Colon,
    Coalesce,
    Semi,
    Comma,
    Arrow,
    DoubleArrow,
    DoubleColon,
    Backslash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Assign,
    PlusAssign,
    MinusAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    PowAssign,
    ConcatAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    CoalesceAssign,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Smaller,
    SmallerOrEqual,
    Greater,
    GreaterOrEqual,
    Spaceship,
    BoolAnd,
    BoolOr,
    Not,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    Inc,
    Dec,
    At,
    Ellipsis,
}

/// One decoded segment of an interpolated double-quoted string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrPart {
    Lit(String),
    Var(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Variable(String),
    /// A `$` that does not start a plain variable (`$$x`, `${expr}`).
    Dollar,
    Int(String),
    Float(String),
    Str {
        value: String,
        double: bool,
    },
    InterpStr {
        parts: Vec<StrPart>,
        raw: String,
    },
    InlineHtml(String),
    Op(Op),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: SourceLocation,
}

impl Token {
    pub fn is_op(&self, op: Op) -> bool {
        matches!(self.kind, TokenKind::Op(o) if o == op)
    }
    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }
    /// PHP keywords are case-insensitive; the parser matches them through
    /// this helper instead of a dedicated keyword token.
    pub fn is_kw(&self, kw: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(name) if name.eq_ignore_ascii_case(kw))
    }
}

pub fn scan(source: &str) -> Result<Vec<Token>, ParseError> {
    Scanner::new(source).scan_all()
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    tokens: Vec<Token>,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            tokens: Vec::new(),
        }
    }

    fn scan_all(mut self) -> Result<Vec<Token>, ParseError> {
        self.scan_html()?;
        while self.pos < self.src.len() {
            self.skip_trivia()?;
            if self.pos >= self.src.len() {
                break;
            }
            if self.rest().starts_with("?>") {
                let start = self.position();
                self.bump(2);
                self.push(TokenKind::Op(Op::Semi), start);
                // a newline directly after the close tag belongs to it
                if self.rest().starts_with('\n') {
                    self.bump(1);
                }
                self.scan_html()?;
                continue;
            }
            self.scan_token()?;
        }
        Ok(self.tokens)
    }

    /// Consumes everything up to the next opening tag. `<?=` is sugar for
    /// `<?php echo`.
    fn scan_html(&mut self) -> Result<(), ParseError> {
        let start = self.position();
        let rest = self.rest();
        let open = rest.find("<?");
        let text_end = open.unwrap_or(rest.len());
        if text_end > 0 {
            let text = self.bump(text_end).to_string();
            self.push(TokenKind::InlineHtml(text), start);
        }
        if open.is_some() {
            let tag_start = self.position();
            if self.rest()[2..].to_ascii_lowercase().starts_with("php") {
                self.bump(5);
            } else if self.rest()[2..].starts_with('=') {
                self.bump(3);
                self.push(TokenKind::Ident("echo".into()), tag_start);
            } else {
                self.bump(2);
            }
        }
        Ok(())
    }

    fn scan_token(&mut self) -> Result<(), ParseError> {
        let start = self.position();
        let bytes = self.rest().as_bytes();
        let b = bytes[0];

        if b == b'$' {
            if bytes.len() > 1 && is_ident_start(bytes[1]) {
                self.bump(1);
                let name = self.take_ident();
                self.push(TokenKind::Variable(name), start);
            } else {
                self.bump(1);
                self.push(TokenKind::Dollar, start);
            }
            return Ok(());
        }
        if is_ident_start(b) {
            let name = self.take_ident();
            self.push(TokenKind::Ident(name), start);
            return Ok(());
        }
        if b.is_ascii_digit() || (b == b'.' && bytes.len() > 1 && bytes[1].is_ascii_digit()) {
            return self.scan_number(start);
        }
        if b == b'\'' {
            return self.scan_single_quoted(start);
        }
        if b == b'"' {
            return self.scan_double_quoted(start);
        }
        self.scan_op(start)
    }

    fn scan_number(&mut self, start: Position) -> Result<(), ParseError> {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        let mut i = 0;
        let mut float = false;

        if rest.starts_with("0x") || rest.starts_with("0X") {
            i = 2;
            while i < bytes.len() && (bytes[i].is_ascii_hexdigit() || bytes[i] == b'_') {
                i += 1;
            }
            if i == 2 {
                return Err(self.error_at(ErrorKind::BadNumberLiteral, start));
            }
        } else if rest.starts_with("0b") || rest.starts_with("0B") {
            i = 2;
            while i < bytes.len() && (bytes[i] == b'0' || bytes[i] == b'1' || bytes[i] == b'_') {
                i += 1;
            }
            if i == 2 {
                return Err(self.error_at(ErrorKind::BadNumberLiteral, start));
            }
        } else {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
                i += 1;
            }
            if i < bytes.len() && bytes[i] == b'.' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit())
            {
                float = true;
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
                    i += 1;
                }
            }
            if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                let mut j = i + 1;
                if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                    j += 1;
                }
                if j < bytes.len() && bytes[j].is_ascii_digit() {
                    float = true;
                    i = j;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
        }

        let lexeme = self.bump(i).to_string();
        let kind = if float {
            TokenKind::Float(lexeme)
        } else {
            TokenKind::Int(lexeme)
        };
        self.push(kind, start);
        Ok(())
    }

    fn scan_single_quoted(&mut self, start: Position) -> Result<(), ParseError> {
        let bytes = self.rest().as_bytes();
        let mut i = 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' if i + 1 < bytes.len() => i += 2,
                b'\'' => {
                    let lexeme = self.bump(i + 1);
                    let value = lexeme[1..lexeme.len() - 1].to_string();
                    self.push(TokenKind::Str { value, double: false }, start);
                    return Ok(());
                }
                _ => i += 1,
            }
        }
        Err(self.error_at(ErrorKind::UnterminatedString, start))
    }

    /// Double-quoted strings are segmented into literal runs and simple
    /// variable parts (`$x`, `${x}`, `{$x}`). Anything fancier inside a
    /// brace group stays a literal run; segmentation only has to be
    /// deterministic, since string equivalence is syntactic.
    fn scan_double_quoted(&mut self, start: Position) -> Result<(), ParseError> {
        let bytes = self.rest().as_bytes();
        let rest = self.rest();
        let mut parts: Vec<StrPart> = Vec::new();
        let mut lit = String::new();
        let mut i = 1;

        fn push_lit(parts: &mut Vec<StrPart>, lit: &mut String) {
            if !lit.is_empty() {
                parts.push(StrPart::Lit(std::mem::take(lit)));
            }
        }

        while i < bytes.len() {
            match bytes[i] {
                b'\\' if i + 1 < bytes.len() => {
                    let w = 1 + utf8_width(bytes[i + 1]);
                    lit.push_str(&rest[i..i + w]);
                    i += w;
                }
                b'"' => {
                    let raw = self.bump(i + 1).to_string();
                    push_lit(&mut parts, &mut lit);
                    let kind = match parts.as_slice() {
                        [] => TokenKind::Str {
                            value: String::new(),
                            double: true,
                        },
                        [StrPart::Lit(value)] => TokenKind::Str {
                            value: value.clone(),
                            double: true,
                        },
                        _ => TokenKind::InterpStr { parts, raw },
                    };
                    self.push(kind, start);
                    return Ok(());
                }
                b'$' if i + 1 < bytes.len() && is_ident_start(bytes[i + 1]) => {
                    push_lit(&mut parts, &mut lit);
                    let mut j = i + 1;
                    while j < bytes.len() && is_ident_byte(bytes[j]) {
                        j += 1;
                    }
                    parts.push(StrPart::Var(rest[i + 1..j].to_string()));
                    i = j;
                }
                b'$' if i + 1 < bytes.len() && bytes[i + 1] == b'{' => {
                    let Some(close) = find_close_brace(bytes, i + 1) else {
                        return Err(self.error_at(ErrorKind::UnterminatedInterpolation, start));
                    };
                    let inner = &rest[i + 2..close];
                    push_lit(&mut parts, &mut lit);
                    if is_plain_ident(inner) {
                        parts.push(StrPart::Var(inner.to_string()));
                    } else {
                        parts.push(StrPart::Lit(rest[i..close + 1].to_string()));
                    }
                    i = close + 1;
                }
                b'{' if i + 1 < bytes.len() && bytes[i + 1] == b'$' => {
                    let Some(close) = find_close_brace(bytes, i) else {
                        return Err(self.error_at(ErrorKind::UnterminatedInterpolation, start));
                    };
                    let inner = &rest[i + 1..close];
                    push_lit(&mut parts, &mut lit);
                    if inner.starts_with('$') && is_plain_ident(&inner[1..]) {
                        parts.push(StrPart::Var(inner[1..].to_string()));
                    } else {
                        parts.push(StrPart::Lit(rest[i..close + 1].to_string()));
                    }
                    i = close + 1;
                }
                _ => {
                    let w = utf8_width(bytes[i]);
                    lit.push_str(&rest[i..i + w]);
                    i += w;
                }
            }
        }
        Err(self.error_at(ErrorKind::UnterminatedString, start))
    }

    fn scan_op(&mut self, start: Position) -> Result<(), ParseError> {
        use Op::*;
        static OPS: &[(&str, Op)] = &[
            ("<=>", Spaceship),
            ("<<=", ShlAssign),
            (">>=", ShrAssign),
            ("===", Identical),
            ("!==", NotIdentical),
            ("**=", PowAssign),
            ("...", Ellipsis),
            ("??=", CoalesceAssign),
            ("<<", Shl),
            (">>", Shr),
            ("<=", SmallerOrEqual),
            (">=", GreaterOrEqual),
            ("==", Equal),
            ("!=", NotEqual),
            ("<>", NotEqual),
            ("**", Pow),
            ("++", Inc),
            ("--", Dec),
            ("->", Arrow),
            ("=>", DoubleArrow),
            ("::", DoubleColon),
            ("&&", BoolAnd),
            ("||", BoolOr),
            ("??", Coalesce),
            ("+=", PlusAssign),
            ("-=", MinusAssign),
            ("*=", MulAssign),
            ("/=", DivAssign),
            (".=", ConcatAssign),
            ("%=", ModAssign),
            ("&=", AndAssign),
            ("|=", OrAssign),
            ("^=", XorAssign),
            ("+", Plus),
            ("-", Minus),
            ("*", Star),
            ("/", Slash),
            ("%", Percent),
            (".", Dot),
            ("?", Question),
            (":", Colon),
            (";", Semi),
            (",", Comma),
            ("\\", Backslash),
            ("(", LParen),
            (")", RParen),
            ("[", LBracket),
            ("]", RBracket),
            ("{", LBrace),
            ("}", RBrace),
            ("=", Assign),
            ("<", Smaller),
            (">", Greater),
            ("!", Not),
            ("&", Amp),
            ("|", Pipe),
            ("^", Caret),
            ("~", Tilde),
            ("@", At),
        ];
        let rest = self.rest();
        for (text, op) in OPS {
            if rest.starts_with(text) {
                self.bump(text.len());
                self.push(TokenKind::Op(*op), start);
                return Ok(());
            }
        }
        Err(self.error_at(ErrorKind::UnexpectedChar, start))
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            let rest = self.rest();
            let bytes = rest.as_bytes();
            if bytes.is_empty() {
                return Ok(());
            }
            match bytes[0] {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    let mut i = 0;
                    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    self.bump(i);
                }
                b'/' if rest.starts_with("//") => self.skip_line_comment(),
                b'/' if rest.starts_with("/*") => {
                    let start = self.position();
                    match rest.find("*/") {
                        Some(end) => {
                            self.bump(end + 2);
                        }
                        None => return Err(self.error_at(ErrorKind::UnterminatedComment, start)),
                    }
                }
                b'#' if rest.starts_with("#[") => {
                    // PHP 8 attribute, skipped with bracket balancing
                    let bytes = rest.as_bytes();
                    let mut depth = 0usize;
                    let mut i = 1;
                    while i < bytes.len() {
                        match bytes[i] {
                            b'[' => depth += 1,
                            b']' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                        i += 1;
                    }
                    self.bump((i + 1).min(rest.len()));
                }
                b'#' => self.skip_line_comment(),
                _ => return Ok(()),
            }
        }
    }

    fn skip_line_comment(&mut self) {
        let rest = self.rest();
        // a close tag ends a line comment too
        let end = rest
            .find('\n')
            .into_iter()
            .chain(rest.find("?>"))
            .min()
            .unwrap_or(rest.len());
        self.bump(end);
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn position(&self) -> Position {
        Position {
            offset: self.pos,
            line: self.line,
        }
    }

    fn bump(&mut self, len: usize) -> &'a str {
        let consumed = &self.src[self.pos..self.pos + len];
        self.line += consumed.bytes().filter(|&b| b == b'\n').count() as u32;
        self.pos += len;
        consumed
    }

    fn push(&mut self, kind: TokenKind, start: Position) {
        let loc = SourceLocation {
            start,
            end: self.position(),
        };
        self.tokens.push(Token { kind, loc });
    }

    fn error_at(&self, kind: ErrorKind, start: Position) -> ParseError {
        ParseError::new(kind).with_location(SourceLocation {
            start,
            end: self.position(),
        })
    }
}

fn utf8_width(b: u8) -> usize {
    if b < 0x80 {
        1
    } else if b >= 0xF0 {
        4
    } else if b >= 0xE0 {
        3
    } else {
        2
    }
}

fn find_close_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            // skip nested quoted text, e.g. {$arr["key"]}
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if i >= bytes.len() {
                    return None;
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn is_plain_ident(s: &str) -> bool {
    let bytes = s.as_bytes();
    !bytes.is_empty() && is_ident_start(bytes[0]) && bytes.iter().all(|&b| is_ident_byte(b))
}

impl<'a> Scanner<'a> {
    fn take_ident(&mut self) -> String {
        let bytes = self.rest().as_bytes();
        let mut i = 0;
        while i < bytes.len() && is_ident_byte(bytes[i]) {
            i += 1;
        }
        self.bump(i).to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        scan(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_scan_basic() {
        let toks = kinds("<?php $x = 10;");
        assert_eq!(
            toks,
            vec![
                TokenKind::Variable("x".into()),
                TokenKind::Op(Op::Assign),
                TokenKind::Int("10".into()),
                TokenKind::Op(Op::Semi),
            ]
        );
    }

    #[test]
    fn test_scan_variable_variants() {
        let toks = kinds("<?php $$x; ${\"a\"};");
        assert_eq!(toks[0], TokenKind::Dollar);
        assert_eq!(toks[1], TokenKind::Variable("x".into()));
        assert_eq!(toks[3], TokenKind::Dollar);
        assert_eq!(toks[4], TokenKind::Op(Op::LBrace));
        assert_eq!(
            toks[5],
            TokenKind::Str {
                value: "a".into(),
                double: true
            }
        );
    }

    #[test]
    fn test_scan_interp_string() {
        let toks = kinds(r#"<?php "a $x b";"#);
        match &toks[0] {
            TokenKind::InterpStr { parts, raw } => {
                assert_eq!(raw, r#""a $x b""#);
                assert_eq!(
                    parts,
                    &vec![
                        StrPart::Lit("a ".into()),
                        StrPart::Var("x".into()),
                        StrPart::Lit(" b".into()),
                    ]
                );
            }
            other => panic!("expected interpolated string, got {other:?}"),
        }
    }

    #[test]
    fn test_scan_trivia_and_html() {
        let toks = kinds("before <?php /* c */ 1; // x\n2; ?> after");
        assert_eq!(toks[0], TokenKind::InlineHtml("before ".into()));
        assert_eq!(toks[1], TokenKind::Int("1".into()));
        assert_eq!(toks[3], TokenKind::Int("2".into()));
        // ?> implies a terminator
        assert_eq!(toks[5], TokenKind::Op(Op::Semi));
        assert_eq!(toks[6], TokenKind::InlineHtml(" after".into()));
    }

    #[test]
    fn test_scan_line_numbers() {
        let toks = scan("<?php\n\n$x;").unwrap();
        assert_eq!(toks[0].loc.start.line, 3);
    }

    #[test]
    fn test_unterminated_string() {
        assert!(scan("<?php 'abc").is_err());
    }
}
