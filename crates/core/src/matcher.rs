//! The structural matcher.
//!
//! `eq` decides whether an input subtree is equivalent to the template.
//! Meta-variables bind on first sight and must compare literally equal on
//! reoccurrence; the `${"*"}` wildcard consumes list elements non-greedily
//! with a one-element lookahead. Bindings live for one attempt: the walker
//! clears them before trying each input node.

use crate::ast::{ClassLit, FuncLit, MetaClass, Node, NodeKind, StrKind, VarName};
use crate::filter::Filter;
use crate::parser;
use crate::pattern::CompileOption;
use crate::SourceLocation;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::ops::ControlFlow;
use std::sync::Arc;

/// A compiled pattern. Cloning is cheap: the template tree and filters are
/// shared, per-attempt scratch lives on the stack of each `find_ast` call.
#[derive(Debug, Clone)]
pub struct Matcher {
    template: Arc<Template>,
}

#[derive(Debug)]
struct Template {
    root: Node,
    filters: FxHashMap<String, Vec<Filter>>,
    option: CompileOption,
}

#[derive(Debug, Clone)]
pub struct Capture<'a> {
    pub name: &'a str,
    /// `None` when the meta-variable bound an absent element, e.g. the hole
    /// in `list($a, , $b)`.
    pub node: Option<&'a Node>,
}

#[derive(Debug, Clone)]
pub struct MatchData<'a> {
    pub node: &'a Node,
    pub loc: SourceLocation,
    pub captures: SmallVec<[Capture<'a>; 4]>,
}

impl Matcher {
    pub(crate) fn new(
        root: Node,
        filters: FxHashMap<String, Vec<Filter>>,
        option: CompileOption,
    ) -> Self {
        Self {
            template: Arc::new(Template {
                root,
                filters,
                option,
            }),
        }
    }

    pub fn template_root(&self) -> &Node {
        &self.template.root
    }

    /// Reports whether the given snippet contains a match. A missing
    /// opening tag is tolerated; malformed input never matches.
    pub fn is_match(&self, code: &str) -> bool {
        let source = crate::pattern::pattern_source(code);
        let Ok(root) = parser::parse_source(&source) else {
            return false;
        };
        let mut found = false;
        self.find_ast(&root, &source, false, |_| {
            found = true;
            ControlFlow::Break(())
        });
        found
    }

    /// Parses the snippet and reports every match, captures included.
    /// Malformed input reports nothing. Note: when the snippet has no
    /// opening tag, reported offsets index the augmented source.
    pub fn find<F>(&self, code: &str, mut f: F)
    where
        F: FnMut(&MatchData) -> ControlFlow<()>,
    {
        let source = crate::pattern::pattern_source(code);
        let Ok(root) = parser::parse_source(&source) else {
            return;
        };
        self.find_ast(&root, &source, true, |m| f(m));
    }

    /// Drives the matcher over every node of a parsed input in pre-order.
    /// The callback's `Break` stops the traversal.
    pub fn find_ast<'a, F>(&'a self, root: &'a Node, source: &'a str, need_captures: bool, mut f: F)
    where
        F: FnMut(&MatchData<'a>) -> ControlFlow<()>,
    {
        let template = &*self.template;
        let mut ctx = MatchCtx {
            src: source,
            filters: &template.filters,
            option: template.option,
            bindings: FxHashMap::default(),
            literal_match: false,
        };
        let _ = root.walk(&mut |node| {
            ctx.bindings.clear();
            ctx.literal_match = false;
            if ctx.eq(&template.root, node) {
                let data = ctx.take_match(node, need_captures);
                f(&data)
            } else {
                ControlFlow::Continue(())
            }
        });
    }
}

struct MatchCtx<'a> {
    src: &'a str,
    filters: &'a FxHashMap<String, Vec<Filter>>,
    option: CompileOption,
    bindings: FxHashMap<&'a str, Option<&'a Node>>,
    literal_match: bool,
}

impl<'a> MatchCtx<'a> {
    fn fuzzy(&self) -> bool {
        self.option.fuzzy_matching
    }

    fn node_text(&self, node: &Node) -> &'a str {
        &self.src[node.loc.start.offset..node.loc.end.offset]
    }

    fn take_match(&mut self, node: &'a Node, need_captures: bool) -> MatchData<'a> {
        let mut captures: SmallVec<[Capture<'a>; 4]> = SmallVec::new();
        if need_captures {
            for (&name, &bound) in &self.bindings {
                captures.push(Capture { name, node: bound });
            }
            captures.sort_by(|a, b| a.name.cmp(b.name));
        }
        MatchData {
            node,
            loc: node.loc,
            captures,
        }
    }

    fn eq_ident(&self, a: &str, b: &str) -> bool {
        if self.option.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }

    fn eq(&mut self, x: &'a Node, y: &'a Node) -> bool {
        use NodeKind::*;

        let (mut x, mut y) = (x, y);
        if self.fuzzy() {
            while let Paren(inner) = &x.kind {
                x = inner.as_ref();
            }
            while let Paren(inner) = &y.kind {
                y = inner.as_ref();
            }
        }

        match (&x.kind, &y.kind) {
            // A statement-position variable binds whole statements; for an
            // expression statement it binds the top expression instead.
            (ExprStmt(xe), _) if !self.literal_match && matches!(xe.kind, Variable(_)) => {
                let Variable(vn) = &xe.kind else { unreachable!() };
                let target = match &y.kind {
                    ExprStmt(ye) => &**ye,
                    _ => y,
                };
                self.eq_variable(vn, Some(target), true)
            }
            (Variable(vn), _) => self.eq_variable(vn, Some(y), false),

            // `$_::$m` also matches class constant fetches, recovering the
            // `Class::$x` vs `Class::CONST` ambiguity.
            (
                StaticProp {
                    class: c1,
                    prop: p1,
                },
                ClassConst {
                    class: c2,
                    name: n2,
                },
            ) if !self.literal_match && matches!(p1.kind, Variable(_)) => {
                if !self.eq(c1, c2) {
                    return false;
                }
                let Variable(vn) = &p1.kind else { unreachable!() };
                self.eq_variable(vn, Some(n2.as_ref()), true)
            }

            (Root(a), Root(b)) => self.eq_slice(a, b),
            (InlineHtml(a), InlineHtml(b)) => a == b,
            (ExprStmt(a), ExprStmt(b)) => self.eq(a, b),
            (Block(a), Block(b)) => self.eq_slice(a, b),
            (Nop, Nop) => true,
            (
                If {
                    cond: c1,
                    then: t1,
                    elseifs: ei1,
                    else_: e1,
                },
                If {
                    cond: c2,
                    then: t2,
                    elseifs: ei2,
                    else_: e2,
                },
            ) => {
                // else-if branches are positional: no wildcard support
                self.eq_slice_no_meta(ei1, ei2)
                    && self.eq(c1, c2)
                    && self.eq(t1, t2)
                    && self.eq_opt(e1.as_deref(), e2.as_deref())
            }
            (
                ElseIf { cond: c1, body: b1 },
                ElseIf { cond: c2, body: b2 },
            ) => self.eq(c1, c2) && self.eq(b1, b2),
            (Else(a), Else(b)) => self.eq(a, b),
            (
                While { cond: c1, body: b1 },
                While { cond: c2, body: b2 },
            ) => self.eq(c1, c2) && self.eq(b1, b2),
            (
                DoWhile { body: b1, cond: c1 },
                DoWhile { body: b2, cond: c2 },
            ) => self.eq(b1, b2) && self.eq(c1, c2),
            (
                For {
                    init: i1,
                    cond: c1,
                    step: s1,
                    body: b1,
                },
                For {
                    init: i2,
                    cond: c2,
                    step: s2,
                    body: b2,
                },
            ) => {
                self.eq_slice(i1, i2)
                    && self.eq_slice(c1, c2)
                    && self.eq_slice(s1, s2)
                    && self.eq(b1, b2)
            }
            (
                Foreach {
                    expr: e1,
                    key: k1,
                    by_ref: r1,
                    value: v1,
                    body: b1,
                },
                Foreach {
                    expr: e2,
                    key: k2,
                    by_ref: r2,
                    value: v2,
                    body: b2,
                },
            ) => {
                r1 == r2
                    && self.eq(e1, e2)
                    && self.eq_opt(k1.as_deref(), k2.as_deref())
                    && self.eq(v1, v2)
                    && self.eq(b1, b2)
            }
            (
                Switch { cond: c1, cases: s1 },
                Switch { cond: c2, cases: s2 },
            ) => self.eq(c1, c2) && self.eq_slice(s1, s2),
            (
                Case { cond: c1, body: b1 },
                Case { cond: c2, body: b2 },
            ) => self.eq(c1, c2) && self.eq_slice(b1, b2),
            (DefaultCase(a), DefaultCase(b)) => self.eq_slice(a, b),
            (Return(a), Return(b)) => self.eq_opt(a.as_deref(), b.as_deref()),
            (Break(a), Break(b)) => self.eq_opt(a.as_deref(), b.as_deref()),
            (Continue(a), Continue(b)) => self.eq_opt(a.as_deref(), b.as_deref()),
            (Echo(a), Echo(b)) => self.eq_slice(a, b),
            (Throw(a), Throw(b)) => self.eq(a, b),
            (
                Try {
                    body: b1,
                    catches: c1,
                    finally: f1,
                },
                Try {
                    body: b2,
                    catches: c2,
                    finally: f2,
                },
            ) => {
                self.eq_slice(b1, b2)
                    && self.eq_slice_no_meta(c1, c2)
                    && match (f1, f2) {
                        (None, None) => true,
                        (Some(a), Some(b)) => self.eq_slice(a, b),
                        _ => false,
                    }
            }
            (
                Catch {
                    types: t1,
                    var: v1,
                    body: b1,
                },
                Catch {
                    types: t2,
                    var: v2,
                    body: b2,
                },
            ) => {
                self.eq_slice_no_meta(t1, t2)
                    && self.eq_opt(v1.as_deref(), v2.as_deref())
                    && self.eq_slice(b1, b2)
            }
            (Unset(a), Unset(b)) => self.eq_slice(a, b),
            (Global(a), Global(b)) => self.eq_slice(a, b),
            (
                NamespaceDecl { name: n1, body: b1 },
                NamespaceDecl { name: n2, body: b2 },
            ) => {
                self.eq_opt(n1.as_deref(), n2.as_deref())
                    && match (b1, b2) {
                        (None, None) => true,
                        (Some(a), Some(b)) => self.eq_slice(a, b),
                        _ => false,
                    }
            }
            (
                UseDecl { kind: k1, items: i1 },
                UseDecl { kind: k2, items: i2 },
            ) => k1 == k2 && self.eq_slice_no_meta(i1, i2),
            (
                UseItem { name: n1, alias: a1 },
                UseItem { name: n2, alias: a2 },
            ) => a1 == a2 && self.eq(n1, n2),
            (
                Declare {
                    directives: d1,
                    body: b1,
                },
                Declare {
                    directives: d2,
                    body: b2,
                },
            ) => self.eq_slice_no_meta(d1, d2) && self.eq_opt(b1.as_deref(), b2.as_deref()),
            (
                DeclareDirective { name: n1, value: v1 },
                DeclareDirective { name: n2, value: v2 },
            ) => self.eq_ident(n1, n2) && self.eq(v1, v2),
            (Func(a), Func(b)) => self.eq_func(a, b),
            (
                ArrowFunc {
                    is_static: s1,
                    by_ref: r1,
                    params: p1,
                    ret: t1,
                    expr: e1,
                },
                ArrowFunc {
                    is_static: s2,
                    by_ref: r2,
                    params: p2,
                    ret: t2,
                    expr: e2,
                },
            ) => {
                s1 == s2
                    && r1 == r2
                    && self.eq_slice(p1, p2)
                    && self.eq_opt(t1.as_deref(), t2.as_deref())
                    && self.eq(e1, e2)
            }
            (
                Param {
                    var: v1,
                    by_ref: r1,
                    variadic: va1,
                    ty: t1,
                    default: d1,
                    modifiers: m1,
                },
                Param {
                    var: v2,
                    by_ref: r2,
                    variadic: va2,
                    ty: t2,
                    default: d2,
                    modifiers: m2,
                },
            ) => {
                r1 == r2
                    && va1 == va2
                    && m1 == m2
                    && self.eq_opt(t1.as_deref(), t2.as_deref())
                    && self.eq(v1, v2)
                    && self.eq_opt(d1.as_deref(), d2.as_deref())
            }
            (
                ClosureUse { by_ref: r1, var: v1 },
                ClosureUse { by_ref: r2, var: v2 },
            ) => r1 == r2 && self.eq(v1, v2),
            (ClassDecl(a), ClassDecl(b)) => self.eq_class(a, b),
            (
                Property {
                    modifiers: m1,
                    ty: t1,
                    elems: e1,
                },
                Property {
                    modifiers: m2,
                    ty: t2,
                    elems: e2,
                },
            ) => m1 == m2 && self.eq_opt(t1.as_deref(), t2.as_deref()) && self.eq_slice_no_meta(e1, e2),
            (
                PropertyElem { name: n1, default: d1 },
                PropertyElem { name: n2, default: d2 },
            ) => n1 == n2 && self.eq_opt(d1.as_deref(), d2.as_deref()),
            (
                ClassConstDecl {
                    modifiers: m1,
                    elems: e1,
                },
                ClassConstDecl {
                    modifiers: m2,
                    elems: e2,
                },
            ) => m1 == m2 && self.eq_slice_no_meta(e1, e2),
            (
                ConstElem { name: n1, value: v1 },
                ConstElem { name: n2, value: v2 },
            ) => n1 == n2 && self.eq(v1, v2),
            (TraitUse(a), TraitUse(b)) => self.eq_slice_no_meta(a, b),
            (
                TypeHint {
                    nullable: u1,
                    names: n1,
                },
                TypeHint {
                    nullable: u2,
                    names: n2,
                },
            ) => u1 == u2 && self.eq_slice_no_meta(n1, n2),
            (
                Assign {
                    op: o1,
                    var: v1,
                    expr: e1,
                },
                Assign {
                    op: o2,
                    var: v2,
                    expr: e2,
                },
            ) => o1 == o2 && self.eq(v1, v2) && self.eq(e1, e2),
            (
                Binary {
                    op: o1,
                    left: l1,
                    right: r1,
                },
                Binary {
                    op: o2,
                    left: l2,
                    right: r2,
                },
            ) => o1 == o2 && self.eq(l1, l2) && self.eq(r1, r2),
            (
                Unary { op: o1, expr: e1 },
                Unary { op: o2, expr: e2 },
            ) => o1 == o2 && self.eq(e1, e2),
            (
                IncDec {
                    inc: i1,
                    prefix: p1,
                    var: v1,
                },
                IncDec {
                    inc: i2,
                    prefix: p2,
                    var: v2,
                },
            ) => i1 == i2 && p1 == p2 && self.eq(v1, v2),
            (
                Cast { kind: k1, expr: e1 },
                Cast { kind: k2, expr: e2 },
            ) => k1 == k2 && self.eq(e1, e2),
            (
                Ternary {
                    cond: c1,
                    then: t1,
                    else_: e1,
                },
                Ternary {
                    cond: c2,
                    then: t2,
                    else_: e2,
                },
            ) => {
                self.eq(c1, c2)
                    && self.eq_opt(t1.as_deref(), t2.as_deref())
                    && self.eq(e1, e2)
            }
            (
                ArrayLit {
                    items: i1,
                    short: s1,
                },
                ArrayLit {
                    items: i2,
                    short: s2,
                },
            ) => (s1 == s2 || self.fuzzy()) && self.eq_slice(i1, i2),
            (
                ArrayItem {
                    key: k1,
                    by_ref: r1,
                    spread: sp1,
                    value: v1,
                },
                ArrayItem {
                    key: k2,
                    by_ref: r2,
                    spread: sp2,
                    value: v2,
                },
            ) => {
                if r1 != r2 || sp1 != sp2 {
                    return false;
                }
                if k1.is_none() != k2.is_none() {
                    return false;
                }
                self.eq_opt(k1.as_deref(), k2.as_deref())
                    && self.eq_opt(v1.as_deref(), v2.as_deref())
            }
            (ListPat(a), ListPat(b)) => self.eq_slice(a, b),
            (
                Index { var: v1, dim: d1 },
                Index { var: v2, dim: d2 },
            ) => self.eq(v1, v2) && self.eq_opt(d1.as_deref(), d2.as_deref()),
            (
                Call {
                    callee: c1,
                    args: a1,
                },
                Call {
                    callee: c2,
                    args: a2,
                },
            ) => self.eq(c1, c2) && self.eq_slice(a1, a2),
            (
                MethodCall {
                    target: t1,
                    method: m1,
                    args: a1,
                },
                MethodCall {
                    target: t2,
                    method: m2,
                    args: a2,
                },
            ) => self.eq(t1, t2) && self.eq(m1, m2) && self.eq_slice(a1, a2),
            (
                StaticCall {
                    class: c1,
                    method: m1,
                    args: a1,
                },
                StaticCall {
                    class: c2,
                    method: m2,
                    args: a2,
                },
            ) => self.eq(c1, c2) && self.eq(m1, m2) && self.eq_slice(a1, a2),
            (
                New { class: c1, args: a1 },
                New { class: c2, args: a2 },
            ) => {
                self.eq(c1, c2)
                    && match (a1, a2) {
                        (None, None) => true,
                        (Some(a), Some(b)) => self.eq_slice(a, b),
                        _ => false,
                    }
            }
            (
                Arg {
                    by_ref: r1,
                    variadic: v1,
                    value: e1,
                },
                Arg {
                    by_ref: r2,
                    variadic: v2,
                    value: e2,
                },
            ) => r1 == r2 && v1 == v2 && self.eq(e1, e2),
            (
                Prop { target: t1, name: n1 },
                Prop { target: t2, name: n2 },
            ) => self.eq(t1, t2) && self.eq(n1, n2),
            (
                StaticProp { class: c1, prop: p1 },
                StaticProp { class: c2, prop: p2 },
            ) => self.eq(c1, c2) && self.eq(p1, p2),
            (
                ClassConst { class: c1, name: n1 },
                ClassConst { class: c2, name: n2 },
            ) => self.eq(c1, c2) && self.eq(n1, n2),
            (ConstFetch(a), ConstFetch(b)) => self.eq(a, b),
            (Ident(a), Ident(b)) => self.eq_ident(a, b),
            (
                Name {
                    parts: p1,
                    fully_qualified: f1,
                },
                Name {
                    parts: p2,
                    fully_qualified: f2,
                },
            ) => {
                // qualified names compare piece by piece
                f1 == f2
                    && p1.len() == p2.len()
                    && p1.iter().zip(p2).all(|(a, b)| self.eq_ident(a, b))
            }
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (
                Str {
                    value,
                    kind: StrKind::Raw,
                },
                Str { .. } | Encapsed { .. },
            ) => value == self.node_text(y),
            (
                Str {
                    value: v1,
                    kind: k1,
                },
                Str {
                    value: v2,
                    kind: k2,
                },
            ) => (k1 == k2 || self.fuzzy()) && v1 == v2,
            (Encapsed { parts: p1, .. }, Encapsed { parts: p2, .. }) => {
                p1.len() == p2.len()
                    && p1
                        .iter()
                        .zip(p2)
                        .all(|(a, b)| self.eq_encapsed_part(a, b))
            }
            (EncapsedPart(a), EncapsedPart(b)) => a == b,
            (MagicConst(a), MagicConst(b)) => a == b,
            (
                Include { kind: k1, expr: e1 },
                Include { kind: k2, expr: e2 },
            ) => k1 == k2 && self.eq(e1, e2),
            (Eval(a), Eval(b)) => self.eq(a, b),
            (Empty(a), Empty(b)) => self.eq(a, b),
            (Isset(a), Isset(b)) => self.eq_slice(a, b),
            (
                Exit { die: d1, expr: e1 },
                Exit { die: d2, expr: e2 },
            ) => d1 == d2 && self.eq_opt(e1.as_deref(), e2.as_deref()),
            (Clone(a), Clone(b)) => self.eq(a, b),
            (Print(a), Print(b)) => self.eq(a, b),
            (Paren(a), Paren(b)) => self.eq(a, b),
            _ => false,
        }
    }

    fn eq_opt(&mut self, x: Option<&'a Node>, y: Option<&'a Node>) -> bool {
        match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => self.eq(x, y),
            // a pattern variable can stand for an absent element
            (Some(x), None) => match &x.kind {
                NodeKind::Variable(vn) => self.eq_variable(vn, None, false),
                _ => false,
            },
            (None, Some(_)) => false,
        }
    }

    /// The list equivalence with `${"*"}` support: the wildcard consumes
    /// input elements until the next template element matches (one-element
    /// lookahead, non-greedy).
    fn eq_slice(&mut self, xs: &'a [Node], ys: &'a [Node]) -> bool {
        if xs.is_empty() && !ys.is_empty() {
            return false;
        }

        let mut match_any = false;
        let mut i = 0;
        let mut ys = ys;
        while i < xs.len() {
            let x = &xs[i];
            if x.is_list_wildcard() {
                match_any = true;
            }
            if match_any {
                if ys.is_empty() {
                    // nothing left to match
                    match_any = false;
                    i += 1;
                } else if i + 1 < xs.len() && self.eq(&xs[i + 1], &ys[0]) {
                    match_any = false;
                    i += 2;
                    ys = &ys[1..];
                } else {
                    ys = &ys[1..];
                }
                continue;
            }
            if ys.is_empty() || !self.eq(x, &ys[0]) {
                return false;
            }
            i += 1;
            ys = &ys[1..];
        }
        ys.is_empty()
    }

    fn eq_slice_no_meta(&mut self, xs: &'a [Node], ys: &'a [Node]) -> bool {
        xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.eq(x, y))
    }

    /// Parts of interpolated strings compare literally: a variable part is
    /// never a binder.
    fn eq_encapsed_part(&mut self, x: &'a Node, y: &'a Node) -> bool {
        match (&x.kind, &y.kind) {
            (NodeKind::EncapsedPart(a), NodeKind::EncapsedPart(b)) => a == b,
            (NodeKind::Variable(a), NodeKind::Variable(b)) => self.eq_var_name(a, b),
            _ => self.eq(x, y),
        }
    }

    fn eq_var_name(&mut self, a: &'a VarName, b: &'a VarName) -> bool {
        match (a, b) {
            // variable names are case-sensitive in PHP
            (VarName::Ident(x), VarName::Ident(y)) => x == y,
            (VarName::Expr(x), VarName::Expr(y)) => self.eq(x, y),
            (
                VarName::Meta { name: n1, class: c1 },
                VarName::Meta { name: n2, class: c2 },
            ) => n1 == n2 && c1 == c2,
            _ => false,
        }
    }

    /// The meta-variable contract. `stmt_context` relaxes the
    /// expression-only restriction for the statement-position escape hatch.
    fn eq_variable(&mut self, vn: &'a VarName, y: Option<&'a Node>, stmt_context: bool) -> bool {
        if self.literal_match {
            let Some(y) = y else { return false };
            let NodeKind::Variable(vny) = &y.kind else {
                return false;
            };
            return self.eq_var_name(vn, vny);
        }

        match vn {
            VarName::Ident(name) => {
                // An untyped pattern variable stands for any expression
                // subtree, or for the name/identifier slot it occupies
                // (class refs, property names). It never binds a statement
                // unless it is one (the statement-position escape hatch).
                if !stmt_context {
                    if let Some(n) = y {
                        let bindable = n.is_expr()
                            || matches!(n.kind, NodeKind::Ident(_) | NodeKind::Name { .. });
                        if !bindable {
                            return false;
                        }
                    }
                }
                self.match_named(name, y)
            }
            VarName::Meta { name, class } => {
                let class_ok = match class {
                    MetaClass::Var => {
                        matches!(y.map(|n| &n.kind), Some(NodeKind::Variable(_)))
                    }
                    MetaClass::Int => matches!(y.map(|n| &n.kind), Some(NodeKind::Int(_))),
                    MetaClass::Float => {
                        matches!(y.map(|n| &n.kind), Some(NodeKind::Float(_)))
                    }
                    MetaClass::Str => {
                        matches!(y.map(|n| &n.kind), Some(NodeKind::Str { .. }))
                    }
                    MetaClass::Num => matches!(
                        y.map(|n| &n.kind),
                        Some(NodeKind::Int(_) | NodeKind::Float(_))
                    ),
                    MetaClass::Const => matches!(
                        y.map(|n| &n.kind),
                        Some(NodeKind::ClassConst { .. } | NodeKind::ConstFetch(_))
                    ),
                    MetaClass::Func => matches!(
                        y.map(|n| &n.kind),
                        Some(
                            NodeKind::Call { .. }
                                | NodeKind::MethodCall { .. }
                                | NodeKind::StaticCall { .. }
                        )
                    ),
                    MetaClass::Expr => y.is_some_and(|n| n.is_expr()),
                    // the wildcard is consumed by list matching, a lone one
                    // in a scalar position matches nothing
                    MetaClass::Seq => false,
                };
                class_ok && self.match_named(name, y)
            }
            VarName::Expr(_) => {
                let Some(y) = y else { return false };
                let NodeKind::Variable(vny) = &y.kind else {
                    return false;
                };
                self.eq_var_name(vn, vny)
            }
        }
    }

    /// Bind-on-first-sight with filter consultation; reoccurrence compares
    /// literally. The file root is never bindable.
    fn match_named(&mut self, name: &'a str, y: Option<&'a Node>) -> bool {
        if let Some(n) = y {
            if matches!(n.kind, NodeKind::Root(_)) {
                return false;
            }
        }
        if name == "_" {
            return true;
        }
        if let Some(&bound) = self.bindings.get(name) {
            let saved = self.literal_match;
            self.literal_match = true;
            let ok = self.eq_opt(bound, y);
            self.literal_match = saved;
            return ok;
        }
        let filters: Option<&'a Vec<Filter>> = self.filters.get(name);
        if let Some(filters) = filters {
            let Some(n) = y else {
                // an absent element has no text for a filter to accept
                return false;
            };
            let text = self.node_text(n);
            if !filters.iter().all(|f| f.accepts(text)) {
                return false;
            }
        }
        self.bindings.insert(name, y);
        true
    }

    fn eq_func(&mut self, a: &'a FuncLit, b: &'a FuncLit) -> bool {
        let names_match = match (&a.name, &b.name) {
            (None, None) => true,
            (Some(x), Some(y)) => self.eq_ident(x, y),
            _ => false,
        };
        names_match
            && a.modifiers == b.modifiers
            && a.is_static == b.is_static
            && a.by_ref == b.by_ref
            && self.eq_slice(&a.params, &b.params)
            && self.eq_slice_no_meta(&a.uses, &b.uses)
            && self.eq_opt(a.ret.as_deref(), b.ret.as_deref())
            && match (&a.body, &b.body) {
                (None, None) => true,
                (Some(x), Some(y)) => self.eq_slice(x, y),
                _ => false,
            }
    }

    fn eq_class(&mut self, a: &'a ClassLit, b: &'a ClassLit) -> bool {
        a.kind == b.kind
            && self.eq_ident(&a.name, &b.name)
            && a.is_abstract == b.is_abstract
            && a.is_final == b.is_final
            && self.eq_slice_no_meta(&a.extends, &b.extends)
            && self.eq_slice_no_meta(&a.implements, &b.implements)
            && self.eq_slice_no_meta(&a.members, &b.members)
    }
}
