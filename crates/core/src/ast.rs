//! PHP syntax tree definition.
//!
//! One tagged sum covers statements and expressions so the matcher can run a
//! symmetric comparison over any pair of nodes. Positions ride along for
//! reporting and are never part of equivalence.

use super::SourceLocation;
use std::ops::ControlFlow;

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub loc: SourceLocation,
}

impl Node {
    pub fn new(kind: NodeKind, loc: SourceLocation) -> Self {
        Self { kind, loc }
    }
}

/// Name slot of a variable node. `$x` stores an identifier, `$$x` and
/// `${expr}` store an expression, and the pattern compiler replaces
/// recognised `${"name:class"}` forms with a meta entry.
#[derive(Debug, Clone)]
pub enum VarName {
    Ident(String),
    Expr(Box<Node>),
    Meta { name: String, class: MetaClass },
}

/// What a meta-variable accepts. `Seq` is the list wildcard and only ever
/// appears as a direct element of an ordered child list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaClass {
    Var,
    Int,
    Float,
    Str,
    Num,
    Const,
    Func,
    Expr,
    Seq,
}

impl MetaClass {
    pub fn from_token(s: &str) -> Option<MetaClass> {
        Some(match s {
            "var" => MetaClass::Var,
            "int" => MetaClass::Int,
            "float" => MetaClass::Float,
            "str" => MetaClass::Str,
            "num" => MetaClass::Num,
            "const" => MetaClass::Const,
            "func" => MetaClass::Func,
            "expr" => MetaClass::Expr,
            "*" => MetaClass::Seq,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Plain,
    Ref,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    BoolAnd,
    BoolOr,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    Coalesce,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Smaller,
    SmallerOrEqual,
    Greater,
    GreaterOrEqual,
    Spaceship,
    Instanceof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    BitNot,
    Plus,
    Minus,
    Suppress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Int,
    Float,
    String,
    Bool,
    Array,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrKind {
    Single,
    Double,
    /// Raw text of an interpolated pattern string, quotes included. Produced
    /// only by the pattern compiler, never by the parser.
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    Include,
    IncludeOnce,
    Require,
    RequireOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseKind {
    Normal,
    Function,
    Const,
}

/// Function declaration, method, or closure literal. Declarations carry a
/// name, closures carry a capture list instead; methods may omit the body.
#[derive(Debug, Clone)]
pub struct FuncLit {
    pub name: Option<String>,
    pub modifiers: Vec<String>,
    pub is_static: bool,
    pub by_ref: bool,
    pub params: Vec<Node>,
    pub uses: Vec<Node>,
    pub ret: Option<Box<Node>>,
    pub body: Option<Vec<Node>>,
}

#[derive(Debug, Clone)]
pub struct ClassLit {
    pub kind: ClassKind,
    pub name: String,
    pub is_abstract: bool,
    pub is_final: bool,
    pub extends: Vec<Node>,
    pub implements: Vec<Node>,
    pub members: Vec<Node>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Root(Vec<Node>),
    InlineHtml(String),

    // statements
    ExprStmt(Box<Node>),
    Block(Vec<Node>),
    Nop,
    If {
        cond: Box<Node>,
        then: Box<Node>,
        elseifs: Vec<Node>,
        else_: Option<Box<Node>>,
    },
    ElseIf {
        cond: Box<Node>,
        body: Box<Node>,
    },
    Else(Box<Node>),
    While {
        cond: Box<Node>,
        body: Box<Node>,
    },
    DoWhile {
        body: Box<Node>,
        cond: Box<Node>,
    },
    For {
        init: Vec<Node>,
        cond: Vec<Node>,
        step: Vec<Node>,
        body: Box<Node>,
    },
    Foreach {
        expr: Box<Node>,
        key: Option<Box<Node>>,
        by_ref: bool,
        value: Box<Node>,
        body: Box<Node>,
    },
    Switch {
        cond: Box<Node>,
        cases: Vec<Node>,
    },
    Case {
        cond: Box<Node>,
        body: Vec<Node>,
    },
    DefaultCase(Vec<Node>),
    Return(Option<Box<Node>>),
    Break(Option<Box<Node>>),
    Continue(Option<Box<Node>>),
    Echo(Vec<Node>),
    Throw(Box<Node>),
    Try {
        body: Vec<Node>,
        catches: Vec<Node>,
        finally: Option<Vec<Node>>,
    },
    Catch {
        types: Vec<Node>,
        var: Option<Box<Node>>,
        body: Vec<Node>,
    },
    Unset(Vec<Node>),
    Global(Vec<Node>),
    NamespaceDecl {
        name: Option<Box<Node>>,
        body: Option<Vec<Node>>,
    },
    UseDecl {
        kind: UseKind,
        items: Vec<Node>,
    },
    UseItem {
        name: Box<Node>,
        alias: Option<String>,
    },
    Declare {
        directives: Vec<Node>,
        body: Option<Box<Node>>,
    },
    DeclareDirective {
        name: String,
        value: Box<Node>,
    },

    // declarations
    Func(Box<FuncLit>),
    ArrowFunc {
        is_static: bool,
        by_ref: bool,
        params: Vec<Node>,
        ret: Option<Box<Node>>,
        expr: Box<Node>,
    },
    Param {
        var: Box<Node>,
        by_ref: bool,
        variadic: bool,
        ty: Option<Box<Node>>,
        default: Option<Box<Node>>,
        modifiers: Vec<String>,
    },
    ClosureUse {
        by_ref: bool,
        var: Box<Node>,
    },
    ClassDecl(Box<ClassLit>),
    Property {
        modifiers: Vec<String>,
        ty: Option<Box<Node>>,
        elems: Vec<Node>,
    },
    PropertyElem {
        name: String,
        default: Option<Box<Node>>,
    },
    ClassConstDecl {
        modifiers: Vec<String>,
        elems: Vec<Node>,
    },
    ConstElem {
        name: String,
        value: Box<Node>,
    },
    TraitUse(Vec<Node>),
    TypeHint {
        nullable: bool,
        names: Vec<Node>,
    },

    // expressions
    Assign {
        op: AssignOp,
        var: Box<Node>,
        expr: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Node>,
    },
    IncDec {
        inc: bool,
        prefix: bool,
        var: Box<Node>,
    },
    Cast {
        kind: CastKind,
        expr: Box<Node>,
    },
    Ternary {
        cond: Box<Node>,
        then: Option<Box<Node>>,
        else_: Box<Node>,
    },
    ArrayLit {
        items: Vec<Node>,
        short: bool,
    },
    ArrayItem {
        key: Option<Box<Node>>,
        by_ref: bool,
        spread: bool,
        value: Option<Box<Node>>,
    },
    ListPat(Vec<Node>),
    Index {
        var: Box<Node>,
        dim: Option<Box<Node>>,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    MethodCall {
        target: Box<Node>,
        method: Box<Node>,
        args: Vec<Node>,
    },
    StaticCall {
        class: Box<Node>,
        method: Box<Node>,
        args: Vec<Node>,
    },
    New {
        class: Box<Node>,
        args: Option<Vec<Node>>,
    },
    Arg {
        by_ref: bool,
        variadic: bool,
        value: Box<Node>,
    },
    Prop {
        target: Box<Node>,
        name: Box<Node>,
    },
    StaticProp {
        class: Box<Node>,
        prop: Box<Node>,
    },
    ClassConst {
        class: Box<Node>,
        name: Box<Node>,
    },
    ConstFetch(Box<Node>),
    Ident(String),
    Name {
        parts: Vec<String>,
        fully_qualified: bool,
    },
    Variable(VarName),
    Int(String),
    Float(String),
    Str {
        value: String,
        kind: StrKind,
    },
    Encapsed {
        parts: Vec<Node>,
        raw: String,
    },
    EncapsedPart(String),
    MagicConst(String),
    Include {
        kind: IncludeKind,
        expr: Box<Node>,
    },
    Eval(Box<Node>),
    Empty(Box<Node>),
    Isset(Vec<Node>),
    Exit {
        die: bool,
        expr: Option<Box<Node>>,
    },
    Clone(Box<Node>),
    Print(Box<Node>),
    Paren(Box<Node>),
}

impl Node {
    /// Whether this node can appear as a sub-expression. Statements,
    /// declarations and helper nodes (arguments, array items, name parts)
    /// are excluded.
    pub fn is_expr(&self) -> bool {
        use NodeKind::*;
        match &self.kind {
            Assign { .. } | Binary { .. } | Unary { .. } | IncDec { .. } | Cast { .. }
            | Ternary { .. } | ArrayLit { .. } | ListPat(..) | Index { .. } | Call { .. }
            | MethodCall { .. } | StaticCall { .. } | New { .. } | Prop { .. }
            | StaticProp { .. } | ClassConst { .. } | ConstFetch(..) | Variable(..)
            | Int(..) | Float(..) | Str { .. } | Encapsed { .. } | MagicConst(..)
            | Include { .. } | Eval(..) | Empty(..) | Isset(..) | Exit { .. } | Clone(..)
            | Print(..) | Paren(..) | ArrowFunc { .. } => true,
            Func(f) => f.name.is_none(),
            _ => false,
        }
    }

    /// Whether this list element is the `${"*"}` wildcard, looking through
    /// the statement/argument/array-item wrappers a list position implies.
    pub fn is_list_wildcard(&self) -> bool {
        match &self.kind {
            NodeKind::ExprStmt(inner) => inner.is_list_wildcard(),
            NodeKind::Arg {
                by_ref: false,
                variadic: false,
                value,
            } => value.is_list_wildcard(),
            NodeKind::ArrayItem {
                key: None,
                by_ref: false,
                spread: false,
                value: Some(value),
            } => value.is_list_wildcard(),
            NodeKind::Variable(VarName::Meta { class, .. }) => *class == MetaClass::Seq,
            _ => false,
        }
    }

    /// Pre-order traversal. The callback's `Break` stops the walk entirely.
    pub fn walk<'a>(
        &'a self,
        f: &mut dyn FnMut(&'a Node) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        f(self)?;
        self.for_each_child(&mut |child| child.walk(f))
    }

    /// Invokes `f` for every direct child, in source order.
    pub fn for_each_child<'a>(
        &'a self,
        f: &mut dyn FnMut(&'a Node) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        use NodeKind::*;

        fn each<'a>(
            nodes: &'a [Node],
            f: &mut dyn FnMut(&'a Node) -> ControlFlow<()>,
        ) -> ControlFlow<()> {
            for n in nodes {
                f(n)?;
            }
            ControlFlow::Continue(())
        }
        fn opt<'a>(
            node: &'a Option<Box<Node>>,
            f: &mut dyn FnMut(&'a Node) -> ControlFlow<()>,
        ) -> ControlFlow<()> {
            match node {
                Some(n) => f(n),
                None => ControlFlow::Continue(()),
            }
        }

        match &self.kind {
            Root(stmts) | Block(stmts) | DefaultCase(stmts) | ListPat(stmts)
            | Echo(stmts) | Unset(stmts) | Global(stmts) | Isset(stmts) | TraitUse(stmts) => {
                each(stmts, f)
            }
            InlineHtml(..) | Nop | Ident(..) | Name { .. } | Int(..) | Float(..)
            | Str { .. } | EncapsedPart(..) | MagicConst(..) => ControlFlow::Continue(()),
            ExprStmt(n) | Else(n) | Throw(n) | ConstFetch(n) | Eval(n) | Empty(n)
            | Clone(n) | Print(n) | Paren(n) => f(n),
            If {
                cond,
                then,
                elseifs,
                else_,
            } => {
                f(cond)?;
                f(then)?;
                each(elseifs, f)?;
                opt(else_, f)
            }
            ElseIf { cond, body } => {
                f(cond)?;
                f(body)
            }
            While { cond, body } => {
                f(cond)?;
                f(body)
            }
            DoWhile { body, cond } => {
                f(body)?;
                f(cond)
            }
            For {
                init,
                cond,
                step,
                body,
            } => {
                each(init, f)?;
                each(cond, f)?;
                each(step, f)?;
                f(body)
            }
            Foreach {
                expr,
                key,
                value,
                body,
                ..
            } => {
                f(expr)?;
                opt(key, f)?;
                f(value)?;
                f(body)
            }
            Switch { cond, cases } => {
                f(cond)?;
                each(cases, f)
            }
            Case { cond, body } => {
                f(cond)?;
                each(body, f)
            }
            Return(expr) | Break(expr) | Continue(expr) | Exit { expr, .. } => opt(expr, f),
            Try {
                body,
                catches,
                finally,
            } => {
                each(body, f)?;
                each(catches, f)?;
                match finally {
                    Some(stmts) => each(stmts, f),
                    None => ControlFlow::Continue(()),
                }
            }
            Catch { types, var, body } => {
                each(types, f)?;
                opt(var, f)?;
                each(body, f)
            }
            NamespaceDecl { name, body } => {
                opt(name, f)?;
                match body {
                    Some(stmts) => each(stmts, f),
                    None => ControlFlow::Continue(()),
                }
            }
            UseDecl { items, .. } => each(items, f),
            UseItem { name, .. } => f(name),
            Declare { directives, body } => {
                each(directives, f)?;
                opt(body, f)
            }
            DeclareDirective { value, .. } => f(value),
            Func(func) => {
                each(&func.params, f)?;
                each(&func.uses, f)?;
                opt(&func.ret, f)?;
                match &func.body {
                    Some(body) => each(body, f),
                    None => ControlFlow::Continue(()),
                }
            }
            ArrowFunc {
                params, ret, expr, ..
            } => {
                each(params, f)?;
                opt(ret, f)?;
                f(expr)
            }
            Param {
                var, ty, default, ..
            } => {
                opt(ty, f)?;
                f(var)?;
                opt(default, f)
            }
            ClosureUse { var, .. } => f(var),
            ClassDecl(class) => {
                each(&class.extends, f)?;
                each(&class.implements, f)?;
                each(&class.members, f)
            }
            Property { ty, elems, .. } => {
                opt(ty, f)?;
                each(elems, f)
            }
            PropertyElem { default, .. } => opt(default, f),
            ClassConstDecl { elems, .. } => each(elems, f),
            ConstElem { value, .. } => f(value),
            TypeHint { names, .. } => each(names, f),
            Assign { var, expr, .. } => {
                f(var)?;
                f(expr)
            }
            Binary { left, right, .. } => {
                f(left)?;
                f(right)
            }
            Unary { expr, .. } | Cast { expr, .. } | Include { expr, .. } => f(expr),
            IncDec { var, .. } => f(var),
            Ternary { cond, then, else_ } => {
                f(cond)?;
                opt(then, f)?;
                f(else_)
            }
            ArrayLit { items, .. } => each(items, f),
            ArrayItem { key, value, .. } => {
                opt(key, f)?;
                opt(value, f)
            }
            Index { var, dim } => {
                f(var)?;
                opt(dim, f)
            }
            Call { callee, args } => {
                f(callee)?;
                each(args, f)
            }
            MethodCall {
                target,
                method,
                args,
            } => {
                f(target)?;
                f(method)?;
                each(args, f)
            }
            StaticCall {
                class,
                method,
                args,
            } => {
                f(class)?;
                f(method)?;
                each(args, f)
            }
            New { class, args } => {
                f(class)?;
                match args {
                    Some(args) => each(args, f),
                    None => ControlFlow::Continue(()),
                }
            }
            Arg { value, .. } => f(value),
            Prop { target, name } => {
                f(target)?;
                f(name)
            }
            StaticProp { class, prop } => {
                f(class)?;
                f(prop)
            }
            ClassConst { class, name } => {
                f(class)?;
                f(name)
            }
            Variable(VarName::Expr(inner)) => f(inner),
            Variable(..) => ControlFlow::Continue(()),
            Encapsed { parts, .. } => each(parts, f),
        }
    }

    /// Mutable access to every direct child. Only used by the pattern
    /// compiler, so a fresh `Vec` per call is fine.
    pub fn children_mut(&mut self) -> Vec<&mut Node> {
        use NodeKind::*;
        let mut out = Vec::new();
        macro_rules! all {
            ($vec:expr) => {
                for n in $vec.iter_mut() {
                    out.push(n);
                }
            };
        }
        macro_rules! one {
            ($n:expr) => {
                out.push(&mut **$n)
            };
        }
        macro_rules! maybe {
            ($o:expr) => {
                if let Some(n) = $o.as_deref_mut() {
                    out.push(n);
                }
            };
        }
        match &mut self.kind {
            Root(stmts) | Block(stmts) | DefaultCase(stmts) | ListPat(stmts)
            | Echo(stmts) | Unset(stmts) | Global(stmts) | Isset(stmts) | TraitUse(stmts) => {
                all!(stmts)
            }
            InlineHtml(..) | Nop | Ident(..) | Name { .. } | Int(..) | Float(..)
            | Str { .. } | EncapsedPart(..) | MagicConst(..) => {}
            ExprStmt(n) | Else(n) | Throw(n) | ConstFetch(n) | Eval(n) | Empty(n)
            | Clone(n) | Print(n) | Paren(n) => one!(n),
            If {
                cond,
                then,
                elseifs,
                else_,
            } => {
                one!(cond);
                one!(then);
                all!(elseifs);
                maybe!(else_);
            }
            ElseIf { cond, body } => {
                one!(cond);
                one!(body);
            }
            While { cond, body } => {
                one!(cond);
                one!(body);
            }
            DoWhile { body, cond } => {
                one!(body);
                one!(cond);
            }
            For {
                init,
                cond,
                step,
                body,
            } => {
                all!(init);
                all!(cond);
                all!(step);
                one!(body);
            }
            Foreach {
                expr,
                key,
                value,
                body,
                ..
            } => {
                one!(expr);
                maybe!(key);
                one!(value);
                one!(body);
            }
            Switch { cond, cases } => {
                one!(cond);
                all!(cases);
            }
            Case { cond, body } => {
                one!(cond);
                all!(body);
            }
            Return(expr) | Break(expr) | Continue(expr) | Exit { expr, .. } => maybe!(expr),
            Try {
                body,
                catches,
                finally,
            } => {
                all!(body);
                all!(catches);
                if let Some(stmts) = finally {
                    all!(stmts);
                }
            }
            Catch { types, var, body } => {
                all!(types);
                maybe!(var);
                all!(body);
            }
            NamespaceDecl { name, body } => {
                maybe!(name);
                if let Some(stmts) = body {
                    all!(stmts);
                }
            }
            UseDecl { items, .. } => all!(items),
            UseItem { name, .. } => one!(name),
            Declare { directives, body } => {
                all!(directives);
                maybe!(body);
            }
            DeclareDirective { value, .. } => one!(value),
            Func(func) => {
                all!(&mut func.params);
                all!(&mut func.uses);
                maybe!(func.ret);
                if let Some(body) = &mut func.body {
                    all!(body);
                }
            }
            ArrowFunc {
                params, ret, expr, ..
            } => {
                all!(params);
                maybe!(ret);
                one!(expr);
            }
            Param {
                var, ty, default, ..
            } => {
                maybe!(ty);
                one!(var);
                maybe!(default);
            }
            ClosureUse { var, .. } => one!(var),
            ClassDecl(class) => {
                all!(&mut class.extends);
                all!(&mut class.implements);
                all!(&mut class.members);
            }
            Property { ty, elems, .. } => {
                maybe!(ty);
                all!(elems);
            }
            PropertyElem { default, .. } => maybe!(default),
            ClassConstDecl { elems, .. } => all!(elems),
            ConstElem { value, .. } => one!(value),
            TypeHint { names, .. } => all!(names),
            Assign { var, expr, .. } => {
                one!(var);
                one!(expr);
            }
            Binary { left, right, .. } => {
                one!(left);
                one!(right);
            }
            Unary { expr, .. } | Cast { expr, .. } | Include { expr, .. } => one!(expr),
            IncDec { var, .. } => one!(var),
            Ternary { cond, then, else_ } => {
                one!(cond);
                maybe!(then);
                one!(else_);
            }
            ArrayLit { items, .. } => all!(items),
            ArrayItem { key, value, .. } => {
                maybe!(key);
                maybe!(value);
            }
            Index { var, dim } => {
                one!(var);
                maybe!(dim);
            }
            Call { callee, args } => {
                one!(callee);
                all!(args);
            }
            MethodCall {
                target,
                method,
                args,
            } => {
                one!(target);
                one!(method);
                all!(args);
            }
            StaticCall {
                class,
                method,
                args,
            } => {
                one!(class);
                one!(method);
                all!(args);
            }
            New { class, args } => {
                one!(class);
                if let Some(args) = args {
                    all!(args);
                }
            }
            Arg { value, .. } => one!(value),
            Prop { target, name } => {
                one!(target);
                one!(name);
            }
            StaticProp { class, prop } => {
                one!(class);
                one!(prop);
            }
            ClassConst { class, name } => {
                one!(class);
                one!(name);
            }
            Variable(VarName::Expr(inner)) => one!(inner),
            Variable(..) => {}
            Encapsed { parts, .. } => all!(parts),
        }
        out
    }
}
