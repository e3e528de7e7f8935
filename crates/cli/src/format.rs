//! Output templates and colors.
//!
//! The template language is `{{.Field}}` substitution: `Filename`, `Line`,
//! `Match`, `MatchLine`, or any capture name. Which fields a template uses
//! decides how much per-match data the workers have to materialise.

use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatDeps {
    /// The template references a capture name.
    pub capture: bool,
    /// The template references `MatchLine`.
    pub match_line: bool,
}

#[derive(Debug, Clone)]
pub struct OutputFormat {
    segments: Vec<Segment>,
}

impl OutputFormat {
    pub fn parse(template: &str) -> Result<OutputFormat> {
        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let Some(close) = rest[open..].find("}}") else {
                bail!("missing closing }} in output format");
            };
            let inner = &rest[open + 2..open + close];
            let Some(field) = inner.trim().strip_prefix('.') else {
                bail!("unsupported template action {inner:?}, expected {{{{.Field}}}}");
            };
            if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                bail!("bad field name {field:?} in output format");
            }
            segments.push(Segment::Field(field.to_string()));
            rest = &rest[open + close + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }
        Ok(OutputFormat { segments })
    }

    pub fn deps(&self) -> FormatDeps {
        let mut deps = FormatDeps::default();
        for segment in &self.segments {
            if let Segment::Field(name) = segment {
                match name.as_str() {
                    "Filename" | "Line" | "Match" => {}
                    "MatchLine" => deps.match_line = true,
                    _ => deps.capture = true,
                }
            }
        }
        deps
    }

    pub fn render(&self, resolve: impl Fn(&str) -> String) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(name) => out.push_str(&resolve(name)),
            }
        }
        out
    }
}

const ANSI_COLORS: &[(&str, &str)] = &[
    ("dark-red", "31m"),
    ("red", "31;1m"),
    ("dark-green", "32m"),
    ("green", "32;1m"),
    ("dark-blue", "34m"),
    ("blue", "34;1m"),
    ("dark-magenta", "35m"),
    ("magenta", "35;1m"),
];

const ANSI_RESET: &str = "\x1b[0m";

pub fn colorize(s: &str, color: &str) -> Result<String> {
    match color {
        "" | "white" => Ok(s.to_string()),
        _ => match ANSI_COLORS.iter().find(|(name, _)| *name == color) {
            Some((_, escape)) => Ok(format!("\x1b[{escape}{s}{ANSI_RESET}")),
            None => bail!("unsupported color: {color}"),
        },
    }
}

/// Strips every escape sequence of the fixed palette. Used when reading
/// back `--exclude-results` files that were produced with colors on.
pub fn uncolorize(s: &str) -> String {
    let mut out = s.to_string();
    for (_, escape) in ANSI_COLORS {
        out = out.replace(&format!("\x1b[{escape}"), "");
    }
    out.replace(ANSI_RESET, "")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_and_render() {
        let fmt = OutputFormat::parse("{{.Filename}}:{{.Line}}: {{.MatchLine}}").unwrap();
        let out = fmt.render(|name| match name {
            "Filename" => "file.php".into(),
            "Line" => "3".into(),
            "MatchLine" => "f(1)".into(),
            _ => String::new(),
        });
        assert_eq!(out, "file.php:3: f(1)");
    }

    #[test]
    fn test_deps() {
        let deps = |tmpl: &str| OutputFormat::parse(tmpl).unwrap().deps();
        assert_eq!(deps(""), FormatDeps::default());
        assert_eq!(
            deps("{{.Filename}}:{{.Line}}: {{.MatchLine}}"),
            FormatDeps {
                capture: false,
                match_line: true
            }
        );
        assert_eq!(deps("{{.Filename}}: blah"), FormatDeps::default());
        assert_eq!(
            deps("{{.x}}"),
            FormatDeps {
                capture: true,
                match_line: false
            }
        );
        assert_eq!(
            deps("{{.Filename}}:{{.Line}}: {{.foo}}"),
            FormatDeps {
                capture: true,
                match_line: false
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(OutputFormat::parse("{{.Unclosed").is_err());
        assert!(OutputFormat::parse("{{bogus}}").is_err());
    }

    #[test]
    fn test_colorize_roundtrip() {
        let colored = colorize("file.php", "dark-magenta").unwrap();
        assert_eq!(colored, "\x1b[35mfile.php\x1b[0m");
        assert_eq!(uncolorize(&colored), "file.php");
        assert_eq!(colorize("x", "white").unwrap(), "x");
        assert!(colorize("x", "purple").is_err());
    }
}
