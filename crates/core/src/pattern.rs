//! Pattern compilation.
//!
//! A pattern is parsed like any PHP snippet (an opener is prepended when
//! missing), unwrapped to its single statement or expression, and rewritten
//! so that `${"name:class"}` variables become meta entries in the variable's
//! name slot and interpolated strings become raw string literals.

use crate::ast::{MetaClass, Node, NodeKind, StrKind, VarName};
use crate::error::PatternError;
use crate::filter::Filter;
use crate::matcher::Matcher;
use crate::parser;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy)]
pub struct CompileOption {
    /// `F()` and `f()` are distinct identifiers.
    pub case_sensitive: bool,
    /// Syntax normalisations: `array()` vs `[]`, parenthesis stripping,
    /// single- vs double-quoted strings.
    pub fuzzy_matching: bool,
}

impl Default for CompileOption {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            fuzzy_matching: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct Compiler {
    pub option: CompileOption,
}

impl Compiler {
    pub fn new(option: CompileOption) -> Self {
        Self { option }
    }

    pub fn compile(&self, pattern: &str, filters: Vec<Filter>) -> Result<Matcher, PatternError> {
        let source = pattern_source(pattern);
        let root = parser::parse_source(&source)?;
        let mut root = unwrap_root(root)?;
        rewrite_meta(&mut root)?;

        let mut filter_map: FxHashMap<String, Vec<Filter>> = FxHashMap::default();
        for filter in filters {
            filter_map.entry(filter.name.clone()).or_default().push(filter);
        }
        Ok(Matcher::new(root, filter_map, self.option))
    }
}

/// The source actually handed to the parser: patterns usually come without
/// an opener, and the appended terminator forgives `f($x)` style snippets.
pub fn pattern_source(pattern: &str) -> String {
    if pattern.trim_start().starts_with("<?") {
        pattern.to_string()
    } else {
        format!("<?php {pattern};")
    }
}

/// Extracts the template node from the parsed pattern: the appended
/// terminator may have produced trailing no-ops, a single expression
/// statement unwraps to its expression, and a multi-statement pattern
/// becomes a statement-list template.
fn unwrap_root(root: Node) -> Result<Node, PatternError> {
    let loc = root.loc;
    let NodeKind::Root(mut stmts) = root.kind else {
        return Err(PatternError::Empty);
    };
    while matches!(stmts.last().map(|n| &n.kind), Some(NodeKind::Nop)) {
        stmts.pop();
    }
    match stmts.len() {
        0 => Err(PatternError::Empty),
        1 => {
            let stmt = stmts.pop().expect("checked length");
            match stmt.kind {
                NodeKind::ExprStmt(expr) => Ok(*expr),
                _ => Ok(stmt),
            }
        }
        _ => Ok(Node::new(NodeKind::Block(stmts), loc)),
    }
}

/// Post-order rewrite of meta syntax.
fn rewrite_meta(node: &mut Node) -> Result<(), PatternError> {
    for child in node.children_mut() {
        rewrite_meta(child)?;
    }
    match &mut node.kind {
        NodeKind::Variable(vn @ VarName::Expr(_)) => {
            let VarName::Expr(inner) = &*vn else {
                unreachable!()
            };
            if let NodeKind::Str { value, .. } = &inner.kind {
                let (name, class) = parse_meta(value)?;
                *vn = VarName::Meta {
                    name,
                    class,
                };
            }
        }
        NodeKind::Encapsed { raw, .. } => {
            let value = std::mem::take(raw);
            node.kind = NodeKind::Str {
                value,
                kind: StrKind::Raw,
            };
        }
        _ => {}
    }
    Ok(())
}

/// Decodes `"class"` and `"name:class"` meta strings. An anonymous meta
/// binds nothing, which the matcher expresses with the `_` name.
fn parse_meta(text: &str) -> Result<(String, MetaClass), PatternError> {
    let (name, class_token) = match text.split_once(':') {
        Some((name, class)) => (name, class),
        None => ("_", text),
    };
    if name.is_empty() || class_token.is_empty() {
        return Err(PatternError::MalformedMetaVar {
            text: text.to_string(),
        });
    }
    let Some(class) = MetaClass::from_token(class_token) else {
        return Err(PatternError::UnknownMetaClass {
            class: class_token.to_string(),
        });
    };
    Ok((name.to_string(), class))
}

#[cfg(test)]
mod test {
    use super::*;

    fn compile(pattern: &str) -> Result<Matcher, PatternError> {
        Compiler::default().compile(pattern, Vec::new())
    }

    fn template_kind(pattern: &str) -> NodeKind {
        compile(pattern).unwrap().template_root().kind.clone()
    }

    #[test]
    fn test_unwraps_expression_statement() {
        assert!(matches!(
            template_kind("$x + 1"),
            NodeKind::Binary { .. }
        ));
    }

    #[test]
    fn test_statement_pattern_stays_statement() {
        assert!(matches!(
            template_kind("return $x"),
            NodeKind::Return(Some(_))
        ));
    }

    #[test]
    fn test_meta_recognition() {
        let NodeKind::Variable(VarName::Meta { name, class }) = template_kind(r#"${"x:var"}"#)
        else {
            panic!("expected meta variable");
        };
        assert_eq!(name, "x");
        assert_eq!(class, MetaClass::Var);

        let NodeKind::Variable(VarName::Meta { name, class }) = template_kind(r#"${"int"}"#)
        else {
            panic!("expected meta variable");
        };
        assert_eq!(name, "_");
        assert_eq!(class, MetaClass::Int);

        let NodeKind::Variable(VarName::Meta { class, .. }) = template_kind("${'*'}") else {
            panic!("expected meta variable");
        };
        assert_eq!(class, MetaClass::Seq);
    }

    #[test]
    fn test_unknown_class_is_an_error() {
        assert!(matches!(
            compile(r#"${"nonsense"}"#),
            Err(PatternError::UnknownMetaClass { .. })
        ));
        assert!(matches!(
            compile(r#"${":var"}"#),
            Err(PatternError::MalformedMetaVar { .. })
        ));
    }

    #[test]
    fn test_interpolated_string_becomes_raw() {
        let NodeKind::Str { value, kind } = template_kind(r#""hello $name""#) else {
            panic!("expected raw string template");
        };
        assert_eq!(kind, StrKind::Raw);
        assert_eq!(value, r#""hello $name""#);
    }

    #[test]
    fn test_syntax_error_carries_diagnostic() {
        assert!(matches!(
            compile("f("),
            Err(PatternError::Syntax(_))
        ));
    }

    #[test]
    fn test_empty_pattern() {
        assert!(matches!(compile(";"), Err(PatternError::Empty)));
    }
}
