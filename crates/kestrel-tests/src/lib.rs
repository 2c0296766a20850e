//! Helpers shared by the integration tests: a [Builder] that assembles syntax trees with fresh
//! node ids, resolvers for imports and shortcuts to run the checker and read its results.

use std::{cell::Cell, collections::HashMap};

use kestrel_checker::{check_program, CheckOptions, Checked, Fragment, NoImports, Resolve};
use kestrel_error::Error;
use kestrel_location::{ByteRange, Located, NodeIds};
use kestrel_tree::r#abstract::*;

/// Builds syntax nodes. Every node gets a fresh id and a one byte location after the previous one,
/// so errors can be told apart by where they point.
#[derive(Default)]
pub struct Builder {
    ids: NodeIds,
    offset: Cell<usize>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node<T>(&self, data: T) -> Located<T> {
        let start = self.offset.get();
        self.offset.set(start + 1);
        self.ids.located(ByteRange::new(start, start + 1), data)
    }

    // Types

    pub fn t_base(&self, base: BaseType) -> TypeNode {
        self.node(TypeKind::Base(base))
    }

    pub fn t_int(&self) -> TypeNode {
        self.t_base(BaseType::Int)
    }

    pub fn t_bool(&self) -> TypeNode {
        self.t_base(BaseType::Bool)
    }

    pub fn t_string(&self) -> TypeNode {
        self.t_base(BaseType::Text)
    }

    pub fn t_var(&self, name: &str) -> TypeNode {
        self.node(TypeKind::Variable(name.into()))
    }

    pub fn t_con(&self, path: &str, args: Vec<TypeNode>) -> TypeNode {
        self.node(TypeKind::Constructor(Path::dotted(path), args))
    }

    pub fn t_arrow(&self, from: TypeNode, to: TypeNode) -> TypeNode {
        self.node(TypeKind::Arrow(Box::new(from), Box::new(to)))
    }

    pub fn t_tuple(&self, types: Vec<TypeNode>) -> TypeNode {
        self.node(TypeKind::Tuple(types))
    }

    pub fn t_ref(&self, typ: TypeNode) -> TypeNode {
        self.node(TypeKind::Ref(Box::new(typ)))
    }

    // Patterns

    pub fn p_var(&self, name: &str) -> Pattern {
        self.node(PatternKind::Variable(name.into()))
    }

    pub fn p_wild(&self) -> Pattern {
        self.node(PatternKind::Wildcard)
    }

    pub fn p_int(&self, n: i64) -> Pattern {
        self.node(PatternKind::Literal(Literal::Int(n)))
    }

    pub fn p_con(&self, path: &str, args: Vec<Pattern>) -> Pattern {
        self.node(PatternKind::Constructor(Path::dotted(path), args))
    }

    pub fn p_tuple(&self, pats: Vec<Pattern>) -> Pattern {
        self.node(PatternKind::Tuple(pats))
    }

    pub fn p_ref(&self, pat: Pattern) -> Pattern {
        self.node(PatternKind::Ref(Box::new(pat)))
    }

    pub fn p_ann(&self, pat: Pattern, typ: TypeNode) -> Pattern {
        self.node(PatternKind::Annotation(Box::new(pat), Box::new(typ)))
    }

    // Expressions

    pub fn lit(&self, literal: Literal) -> Expr {
        self.node(ExprKind::Literal(literal))
    }

    pub fn int(&self, n: i64) -> Expr {
        self.lit(Literal::Int(n))
    }

    pub fn float(&self, n: f64) -> Expr {
        self.lit(Literal::Float(n))
    }

    pub fn string(&self, s: &str) -> Expr {
        self.lit(Literal::Text(s.into()))
    }

    pub fn bool(&self, b: bool) -> Expr {
        self.lit(Literal::Bool(b))
    }

    pub fn unit(&self) -> Expr {
        self.lit(Literal::Unit)
    }

    pub fn var(&self, path: &str) -> Expr {
        self.node(ExprKind::Variable(Path::dotted(path)))
    }

    pub fn con(&self, path: &str) -> Expr {
        self.node(ExprKind::Constructor(Path::dotted(path)))
    }

    pub fn app(&self, fun: Expr, arg: Expr) -> Expr {
        self.node(ExprKind::Application(Box::new(fun), Box::new(arg)))
    }

    /// `fun a1 a2 ...`
    pub fn apps(&self, fun: Expr, args: Vec<Expr>) -> Expr {
        args.into_iter().fold(fun, |fun, arg| self.app(fun, arg))
    }

    pub fn fun(&self, pat: Pattern, body: Expr) -> Expr {
        self.node(ExprKind::Function(Box::new(pat), Box::new(body)))
    }

    /// `fun x -> body`
    pub fn lam(&self, name: &str, body: Expr) -> Expr {
        let pat = self.p_var(name);
        self.fun(pat, body)
    }

    pub fn unary(&self, op: UnaryOp, expr: Expr) -> Expr {
        self.node(ExprKind::Unary(op, Box::new(expr)))
    }

    pub fn binary(&self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        self.node(ExprKind::Binary(op, Box::new(left), Box::new(right)))
    }

    pub fn reference(&self, expr: Expr) -> Expr {
        self.node(ExprKind::Ref(Box::new(expr)))
    }

    pub fn deref(&self, expr: Expr) -> Expr {
        self.node(ExprKind::Deref(Box::new(expr)))
    }

    pub fn assign(&self, target: Expr, value: Expr) -> Expr {
        self.node(ExprKind::Assign(Box::new(target), Box::new(value)))
    }

    pub fn tuple(&self, exprs: Vec<Expr>) -> Expr {
        self.node(ExprKind::Tuple(exprs))
    }

    pub fn ann(&self, expr: Expr, typ: TypeNode) -> Expr {
        self.node(ExprKind::Annotation(Box::new(expr), Box::new(typ)))
    }

    pub fn if_(&self, cond: Expr, then: Expr, otherwise: Expr) -> Expr {
        self.node(ExprKind::If(
            Box::new(cond),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    pub fn match_(&self, scrutinee: Expr, clauses: Vec<(Pattern, Expr)>) -> Expr {
        let clauses = clauses
            .into_iter()
            .map(|(pat, expr)| Clause::new(pat, expr))
            .collect();
        self.node(ExprKind::Match(Box::new(scrutinee), clauses))
    }

    pub fn let_(&self, decs: Vec<Dec>, body: Expr) -> Expr {
        self.node(ExprKind::Let(decs, Box::new(body)))
    }

    // Declarations

    pub fn val(&self, pat: Pattern, expr: Expr) -> Dec {
        self.node(DecKind::Value(pat, expr))
    }

    /// `val x = expr`
    pub fn bind(&self, name: &str, expr: Expr) -> Dec {
        let pat = self.p_var(name);
        self.val(pat, expr)
    }

    pub fn type_(&self, name: &str, params: &[&str], body: TypeNode) -> Dec {
        self.node(DecKind::Type(TypeBind {
            name: name.into(),
            params: strings(params),
            body,
        }))
    }

    pub fn data_bind(
        &self,
        name: &str,
        params: &[&str],
        constructors: Vec<(&str, Vec<TypeNode>)>,
    ) -> DataBind {
        DataBind {
            name: name.into(),
            params: strings(params),
            constructors: constructors
                .into_iter()
                .map(|(name, types)| Constructor {
                    name: name.into(),
                    types,
                })
                .collect(),
        }
    }

    pub fn datatype(
        &self,
        name: &str,
        params: &[&str],
        constructors: Vec<(&str, Vec<TypeNode>)>,
    ) -> Dec {
        let bind = self.data_bind(name, params, constructors);
        self.node(DecKind::Datatype(bind))
    }

    pub fn module(&self, name: &str, module: ModExpr) -> Dec {
        self.node(DecKind::Module(name.into(), module))
    }

    pub fn signature(&self, name: &str, sig: SigExpr) -> Dec {
        self.node(DecKind::Signature(name.into(), sig))
    }

    pub fn include(&self, module: ModExpr) -> Dec {
        self.node(DecKind::Include(module))
    }

    pub fn rec(&self, decs: Vec<Dec>) -> Dec {
        self.node(DecKind::Recursive(decs))
    }

    // Specifications and signatures

    pub fn s_val(&self, name: &str, typ: TypeNode) -> Spec {
        self.node(SpecKind::Value(name.into(), typ))
    }

    pub fn s_type(&self, name: &str, params: &[&str]) -> Spec {
        self.node(SpecKind::Type(name.into(), strings(params), None))
    }

    pub fn s_manifest(&self, name: &str, params: &[&str], typ: TypeNode) -> Spec {
        self.node(SpecKind::Type(name.into(), strings(params), Some(typ)))
    }

    pub fn s_datatype(
        &self,
        name: &str,
        params: &[&str],
        constructors: Vec<(&str, Vec<TypeNode>)>,
    ) -> Spec {
        let bind = self.data_bind(name, params, constructors);
        self.node(SpecKind::Datatype(bind))
    }

    pub fn s_module(&self, name: &str, sig: SigExpr) -> Spec {
        self.node(SpecKind::Module(name.into(), sig))
    }

    pub fn s_include(&self, sig: SigExpr) -> Spec {
        self.node(SpecKind::Include(sig))
    }

    pub fn sig(&self, specs: Vec<Spec>) -> SigExpr {
        self.node(SigKind::Structure(specs))
    }

    pub fn sig_path(&self, path: &str) -> SigExpr {
        self.node(SigKind::Path(Path::dotted(path)))
    }

    pub fn sig_functor(&self, name: &str, param: SigExpr, result: SigExpr) -> SigExpr {
        self.node(SigKind::Functor(
            name.into(),
            Box::new(param),
            Box::new(result),
        ))
    }

    /// `sig where type params path = typ`
    pub fn where_type(&self, sig: SigExpr, path: &str, params: &[&str], typ: TypeNode) -> SigExpr {
        self.node(SigKind::Refine(
            Box::new(sig),
            Path::dotted(path),
            strings(params),
            typ,
        ))
    }

    // Modules

    pub fn structure(&self, decs: Vec<Dec>) -> ModExpr {
        self.node(ModKind::Structure(decs))
    }

    pub fn m_path(&self, path: &str) -> ModExpr {
        self.node(ModKind::Path(Path::dotted(path)))
    }

    pub fn functor(&self, name: &str, param: SigExpr, body: ModExpr) -> ModExpr {
        self.node(ModKind::Functor(name.into(), param, Box::new(body)))
    }

    pub fn m_app(&self, fun: ModExpr, arg: ModExpr) -> ModExpr {
        self.node(ModKind::Application(Box::new(fun), Box::new(arg)))
    }

    pub fn seal(&self, module: ModExpr, sig: SigExpr) -> ModExpr {
        self.node(ModKind::Annotation(Box::new(module), sig))
    }

    pub fn m_let(&self, decs: Vec<Dec>, body: ModExpr) -> ModExpr {
        self.node(ModKind::Let(decs, Box::new(body)))
    }

    // Programs

    pub fn import(&self, name: &str, url: &str) -> Import {
        self.node(ImportKind {
            name: name.into(),
            url: url.into(),
        })
    }

    pub fn program(&self, imports: Vec<Import>, decs: Vec<Dec>) -> Program {
        self.node(ProgramKind { imports, decs })
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Resolves imports by checking other programs, the way a build driver would. Each unit is
/// checked once and its export is cached.
#[derive(Default)]
pub struct Sources {
    programs: HashMap<String, Program>,
    cache: HashMap<String, Fragment>,
    pub loads: usize,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, url: &str, program: Program) {
        self.programs.insert(url.into(), program);
    }
}

impl Resolve for Sources {
    fn resolve(&mut self, location: ByteRange, url: &str) -> Result<Fragment, Error> {
        if let Some(fragment) = self.cache.get(url) {
            return Ok(fragment.clone());
        }

        let Some(program) = self.programs.remove(url) else {
            return Err(Error::new(format!("no unit at {url}"), location));
        };

        self.loads += 1;
        let checked = check_program(&program, self, CheckOptions::default());
        self.programs.insert(url.into(), program);

        let export = checked?.export();
        self.cache.insert(url.into(), export.clone());
        Ok(export)
    }
}

pub fn check(program: &Program) -> Result<Checked, Error> {
    check_program(program, &mut NoImports, CheckOptions::default())
}

/// Checks a program that must be accepted, panicking with the error otherwise.
pub fn check_ok(program: &Program) -> Checked {
    match check(program) {
        Ok(checked) => checked,
        Err(err) => panic!("unexpected error: {err}"),
    }
}

/// Checks a program that must be rejected and returns the message of the error.
pub fn check_err(program: &Program) -> String {
    match check(program) {
        Ok(checked) => panic!("expected an error, got {}", checked.fragment),
        Err(err) => err.to_string(),
    }
}

/// The scheme of a top level value, as printed by the checker.
pub fn value_type(checked: &Checked, name: &str) -> String {
    match checked.fragment.env.values.get(name) {
        Some(decl) => decl.scheme.to_string(),
        None => panic!("no value '{name}' in {}", checked.fragment),
    }
}

/// The number of quantified variables of a top level value.
pub fn quantifiers(checked: &Checked, name: &str) -> Vec<String> {
    match checked.fragment.env.values.get(name) {
        Some(decl) => decl.scheme.names.clone(),
        None => panic!("no value '{name}' in {}", checked.fragment),
    }
}
