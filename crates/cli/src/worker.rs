//! Per-thread grep state.
//!
//! Each worker owns a matcher clone and a private match buffer; nothing is
//! shared mutably between threads. Parse failures are recorded, not fatal:
//! the file is skipped and the run goes on.

use phpgrep_core::{parser, Matcher};
use rustc_hash::FxHashMap;
use std::fs;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;

pub struct Worker {
    pub id: usize,
    pub matcher: Matcher,
    pub need_match_data: bool,
    pub need_match_line: bool,
    pub exclude_results: Arc<FxHashMap<String, Vec<u32>>>,
    pub matches: Vec<FileMatch>,
    pub errors: Vec<String>,
}

/// One match, detached from the source buffer so it can outlive the file.
#[derive(Debug, Clone)]
pub struct FileMatch {
    pub filename: String,
    pub line: u32,
    pub start: usize,
    pub end: usize,
    /// The matched text, widened to whole lines when the output format
    /// renders `MatchLine`.
    pub text: String,
    pub match_start: usize,
    pub match_len: usize,
    pub captures: Vec<(String, String)>,
}

impl FileMatch {
    pub fn match_text(&self) -> &str {
        &self.text[self.match_start..self.match_start + self.match_len]
    }
}

impl Worker {
    pub fn grep_file(&mut self, path: &Path) -> Result<usize, String> {
        let data = fs::read(path).map_err(|err| format!("read file: {err}"))?;
        let source = String::from_utf8(data).map_err(|_| "not valid utf-8".to_string())?;
        let root = parser::parse_source(&source).map_err(|err| err.to_string())?;

        let filename = path.display().to_string();
        let excluded_lines = self.exclude_results.get(&filename).cloned();
        let need_match_data = self.need_match_data;
        let need_match_line = self.need_match_line;

        let matcher = self.matcher.clone();
        let matches = &mut self.matches;
        let mut count = 0usize;
        matcher.find_ast(&root, &source, need_match_data, |m| {
            let line = m.loc.start.line;
            if excluded_lines
                .as_ref()
                .is_some_and(|lines| lines.contains(&line))
            {
                return ControlFlow::Continue(());
            }
            count += 1;

            let start = m.loc.start.offset;
            let end = m.loc.end.offset;
            let (text, match_start) = match_text(&source, start, end, need_match_line);
            let captures = if need_match_data {
                m.captures
                    .iter()
                    .map(|c| {
                        let text = c
                            .node
                            .map(|n| source[n.loc.start.offset..n.loc.end.offset].to_string())
                            .unwrap_or_default();
                        (c.name.to_string(), text)
                    })
                    .collect()
            } else {
                Vec::new()
            };
            matches.push(FileMatch {
                filename: filename.clone(),
                line,
                start,
                end,
                text,
                match_start,
                match_len: end - start,
                captures,
            });
            ControlFlow::Continue(())
        });
        Ok(count)
    }
}

/// The match text, optionally widened to the surrounding line(s). Returns
/// the text and the match offset inside it.
fn match_text(source: &str, start: usize, end: usize, widen: bool) -> (String, usize) {
    if !widen {
        return (source[start..end].to_string(), 0);
    }
    let bytes = source.as_bytes();
    let is_newline = |b: u8| b == b'\n' || b == b'\r';

    let mut line_start = start;
    while line_start > 0 {
        if is_newline(bytes[line_start]) {
            if line_start != start {
                line_start += 1;
            }
            break;
        }
        line_start -= 1;
    }
    let mut line_end = end;
    while line_end < bytes.len() && !is_newline(bytes[line_end]) {
        line_end += 1;
    }
    (
        source[line_start..line_end].to_string(),
        start - line_start,
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_match_text_exact() {
        let (text, offset) = match_text("abc def ghi", 4, 7, false);
        assert_eq!(text, "def");
        assert_eq!(offset, 0);
    }

    #[test]
    fn test_match_text_widened() {
        let src = "one\ntwo def two\nthree";
        let start = src.find("def").unwrap();
        let (text, offset) = match_text(src, start, start + 3, true);
        assert_eq!(text, "two def two");
        assert_eq!(offset, 4);
    }
}
