//! The tree that comes out of the parser. It contains purely syntactic information: the main types
//! of this file are [Expr], [Pattern], [Dec], [SigExpr], [ModExpr] and [Program].

use std::fmt::{self, Display};

use itertools::Itertools;
use kestrel_location::Located;

/// A possibly qualified name like `x` or `List.map`. The qualifier is a chain of structure names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub qualifier: Vec<String>,
    pub name: String,
}

impl Path {
    pub fn new(qualifier: Vec<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier,
            name: name.into(),
        }
    }

    pub fn simple(name: impl Into<String>) -> Self {
        Self::new(Vec::new(), name)
    }

    /// Parses a dotted name like `A.B.x`.
    pub fn dotted(text: &str) -> Self {
        let mut parts = text.split('.').map(str::to_owned).collect::<Vec<_>>();
        let name = parts.pop().unwrap_or_default();
        Self::new(parts, name)
    }

    pub fn is_simple(&self) -> bool {
        self.qualifier.is_empty()
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.qualifier {
            write!(f, "{part}.")?;
        }
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseType {
    Unit,
    Bool,
    Int,
    Float,
    Char,
    Text,
}

impl Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "unit"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Char => write!(f, "char"),
            Self::Text => write!(f, "string"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Text(String),
}

impl Literal {
    pub fn base(&self) -> BaseType {
        match self {
            Self::Unit => BaseType::Unit,
            Self::Bool(_) => BaseType::Bool,
            Self::Int(_) => BaseType::Int,
            Self::Float(_) => BaseType::Float,
            Self::Char(_) => BaseType::Char,
            Self::Text(_) => BaseType::Text,
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "()"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n:?}"),
            Self::Char(c) => write!(f, "{c:?}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Debug)]
pub enum PatternKind {
    Wildcard,
    Variable(String),
    Literal(Literal),
    Constructor(Path, Vec<Pattern>),
    Ref(Box<Pattern>),
    Tuple(Vec<Pattern>),
    Annotation(Box<Pattern>, Box<TypeNode>),
}

impl Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => write!(f, "_"),
            Self::Variable(x) => write!(f, "{x}"),
            Self::Literal(l) => write!(f, "{l}"),
            Self::Constructor(c, args) if args.is_empty() => write!(f, "{c}"),
            Self::Constructor(c, args) => write!(f, "({c} {})", args.iter().join(" ")),
            Self::Ref(p) => write!(f, "(ref {p})"),
            Self::Tuple(t) => write!(f, "({})", t.iter().join(", ")),
            Self::Annotation(p, t) => write!(f, "({p} : {t})"),
        }
    }
}

/// A pattern is a syntactic element that goes inside function parameters, value bindings and
/// match clauses. It is used to match on values and destruct them.
pub type Pattern = Located<PatternKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negate => write!(f, "~"),
            Self::Not => write!(f, "not"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Concat => "^",
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        };
        write!(f, "{op}")
    }
}

/// Expressions are language constructions that intrinsically contain a value.
#[derive(Debug)]
pub enum ExprKind {
    Literal(Literal),
    Variable(Path),
    Constructor(Path),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ref(Box<Expr>),
    Deref(Box<Expr>),
    Assign(Box<Expr>, Box<Expr>),
    Tuple(Vec<Expr>),
    Function(Box<Pattern>, Box<Expr>),
    Application(Box<Expr>, Box<Expr>),
    Annotation(Box<Expr>, Box<TypeNode>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    Match(Box<Expr>, Vec<Clause>),
    Let(Vec<Dec>, Box<Expr>),
}

impl Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(l) => write!(f, "{l}"),
            Self::Variable(p) | Self::Constructor(p) => write!(f, "{p}"),
            Self::Unary(op, e) => write!(f, "({op} {e})"),
            Self::Binary(op, l, r) => write!(f, "({l} {op} {r})"),
            Self::Ref(e) => write!(f, "(ref {e})"),
            Self::Deref(e) => write!(f, "!{e}"),
            Self::Assign(l, r) => write!(f, "({l} := {r})"),
            Self::Tuple(t) => write!(f, "({})", t.iter().join(", ")),
            Self::Function(p, e) => write!(f, "(fun {p} -> {e})"),
            Self::Application(fu, a) => write!(f, "({fu} {a})"),
            Self::Annotation(e, t) => write!(f, "({e} : {t})"),
            Self::If(c, t, e) => write!(f, "(if {c} then {t} else {e})"),
            Self::Match(e, c) => write!(f, "(match {e} with {})", c.iter().join(" | ")),
            Self::Let(decs, e) => write!(f, "(let {} in {e} end)", decs.iter().join(" ")),
        }
    }
}

pub type Expr = Located<ExprKind>;

/// A clause of a match expression. It contains a pattern and the expression that is the result of
/// the match when the pattern succeeds.
#[derive(Debug)]
pub struct Clause {
    pub pat: Pattern,
    pub expr: Expr,
}

impl Clause {
    pub fn new(pat: Pattern, expr: Expr) -> Self {
        Self { pat, expr }
    }
}

impl Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.pat, self.expr)
    }
}

#[derive(Debug)]
pub enum TypeKind {
    Base(BaseType),
    Variable(String),
    Constructor(Path, Vec<TypeNode>),
    Ref(Box<TypeNode>),
    Tuple(Vec<TypeNode>),
    Arrow(Box<TypeNode>, Box<TypeNode>),
}

impl Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base(b) => write!(f, "{b}"),
            Self::Variable(v) => write!(f, "{v}"),
            Self::Constructor(p, args) => match args.as_slice() {
                [] => write!(f, "{p}"),
                [arg] => write!(f, "{arg} {p}"),
                args => write!(f, "({}) {p}", args.iter().join(", ")),
            },
            Self::Ref(t) => write!(f, "{t} ref"),
            Self::Tuple(t) => write!(f, "({})", t.iter().join(" * ")),
            Self::Arrow(l, r) => write!(f, "({l} -> {r})"),
        }
    }
}

pub type TypeNode = Located<TypeKind>;

fn params(params: &[String]) -> String {
    match params {
        [] => String::new(),
        [param] => format!("{param} "),
        params => format!("({}) ", params.iter().join(", ")),
    }
}

/// `type 'a t = τ`
#[derive(Debug)]
pub struct TypeBind {
    pub name: String,
    pub params: Vec<String>,
    pub body: TypeNode,
}

impl Display for TypeBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {}{} = {}", params(&self.params), self.name, self.body)
    }
}

#[derive(Debug)]
pub struct Constructor {
    pub name: String,
    pub types: Vec<TypeNode>,
}

impl Display for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.types.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} of {}", self.name, self.types.iter().join(" * "))
        }
    }
}

/// `datatype 'a t = A | B of τ`
#[derive(Debug)]
pub struct DataBind {
    pub name: String,
    pub params: Vec<String>,
    pub constructors: Vec<Constructor>,
}

impl Display for DataBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "datatype {}{} = {}",
            params(&self.params),
            self.name,
            self.constructors.iter().join(" | ")
        )
    }
}

#[derive(Debug)]
pub enum DecKind {
    Value(Pattern, Expr),
    Type(TypeBind),
    Datatype(DataBind),
    Module(String, ModExpr),
    Signature(String, SigExpr),
    Include(ModExpr),
    Recursive(Vec<Dec>),
}

impl Display for DecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(p, e) => write!(f, "val {p} = {e}"),
            Self::Type(t) => write!(f, "{t}"),
            Self::Datatype(d) => write!(f, "{d}"),
            Self::Module(n, m) => write!(f, "module {n} = {m}"),
            Self::Signature(n, s) => write!(f, "signature {n} = {s}"),
            Self::Include(m) => write!(f, "include {m}"),
            Self::Recursive(decs) => write!(f, "rec {}", decs.iter().join(" and ")),
        }
    }
}

/// A declaration binds values, types, modules or signatures in the scope that follows it.
pub type Dec = Located<DecKind>;

#[derive(Debug)]
pub enum SpecKind {
    Value(String, TypeNode),
    /// An abstract type when the definition is missing, a manifest one otherwise.
    Type(String, Vec<String>, Option<TypeNode>),
    Datatype(DataBind),
    Module(String, SigExpr),
    Include(SigExpr),
}

impl Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(x, t) => write!(f, "val {x} : {t}"),
            Self::Type(t, ps, None) => write!(f, "type {}{t}", params(ps)),
            Self::Type(t, ps, Some(def)) => write!(f, "type {}{t} = {def}", params(ps)),
            Self::Datatype(d) => write!(f, "{d}"),
            Self::Module(n, s) => write!(f, "module {n} : {s}"),
            Self::Include(s) => write!(f, "include {s}"),
        }
    }
}

pub type Spec = Located<SpecKind>;

#[derive(Debug)]
pub enum SigKind {
    Path(Path),
    Structure(Vec<Spec>),
    Functor(String, Box<SigExpr>, Box<SigExpr>),
    /// `S where type 'a p = τ`
    Refine(Box<SigExpr>, Path, Vec<String>, TypeNode),
}

impl Display for SigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{p}"),
            Self::Structure(specs) => write!(f, "sig {} end", specs.iter().join(" ")),
            Self::Functor(x, p, r) => write!(f, "functor ({x} : {p}) -> {r}"),
            Self::Refine(s, p, ps, t) => write!(f, "{s} where type {}{p} = {t}", params(ps)),
        }
    }
}

pub type SigExpr = Located<SigKind>;

#[derive(Debug)]
pub enum ModKind {
    Path(Path),
    Structure(Vec<Dec>),
    Functor(String, SigExpr, Box<ModExpr>),
    Application(Box<ModExpr>, Box<ModExpr>),
    Annotation(Box<ModExpr>, SigExpr),
    Let(Vec<Dec>, Box<ModExpr>),
}

impl Display for ModKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{p}"),
            Self::Structure(decs) => write!(f, "struct {} end", decs.iter().join(" ")),
            Self::Functor(x, s, m) => write!(f, "functor ({x} : {s}) -> {m}"),
            Self::Application(fu, a) => write!(f, "{fu}({a})"),
            Self::Annotation(m, s) => write!(f, "({m} : {s})"),
            Self::Let(decs, m) => write!(f, "let {} in {m} end", decs.iter().join(" ")),
        }
    }
}

pub type ModExpr = Located<ModKind>;

/// `import Name = "url"`
#[derive(Debug)]
pub struct ImportKind {
    pub name: String,
    pub url: String,
}

impl Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "import {} = {:?}", self.name, self.url)
    }
}

pub type Import = Located<ImportKind>;

#[derive(Debug)]
pub struct ProgramKind {
    pub imports: Vec<Import>,
    pub decs: Vec<Dec>,
}

impl Display for ProgramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for import in &self.imports {
            writeln!(f, "{import}")?;
        }
        write!(f, "{}", self.decs.iter().join("\n"))
    }
}

/// A compilation unit: the imports it depends on and its top level declarations.
pub type Program = Located<ProgramKind>;
