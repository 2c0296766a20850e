//! The type algebra: monomorphic types with mutable holes, polymorphic schemes, type level
//! functions and the nominal names of user defined types.

use std::{
    cell::{RefCell, RefMut},
    collections::HashMap,
    fmt::{self, Display},
    hash::{Hash, Hasher},
    rc::Rc,
};

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use kestrel_tree::r#abstract::BaseType;

use crate::context::Ctx;

/// The name of a nominal type constructor. The stamp tells apart two constructors that share a
/// source name: every elaboration of a datatype or of an abstract type mints a new one. Stamp `0`
/// belongs to the prelude.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyName {
    pub name: String,
    pub stamp: usize,
}

impl TyName {
    pub fn new(name: impl Into<String>, stamp: usize) -> Self {
        Self {
            name: name.into(),
            stamp,
        }
    }

    pub fn prelude(name: impl Into<String>) -> Self {
        Self::new(name, 0)
    }
}

impl Display for TyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The class of an operator placeholder. A hole tagged with a class only unifies with the base
/// types the class admits, and is resolved to its default when nothing else constrains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Numeric,
    Equality,
    Ordered,
    Boolean,
    Textual,
}

impl Class {
    pub fn members(self) -> &'static [BaseType] {
        use BaseType::*;
        match self {
            Self::Numeric => &[Int, Float],
            Self::Equality => &[Unit, Bool, Int, Float, Char, Text],
            Self::Ordered => &[Int, Float, Char, Text],
            Self::Boolean => &[Bool],
            Self::Textual => &[Char, Text],
        }
    }

    pub fn admits(self, base: BaseType) -> bool {
        self.members().contains(&base)
    }

    /// The class admitting exactly the types both classes admit. The intersection of any two
    /// classes is either empty or one of them.
    pub fn meet(self, other: Self) -> Option<Self> {
        let within = |a: Self, b: Self| a.members().iter().all(|m| b.admits(*m));

        if within(self, other) {
            Some(self)
        } else if within(other, self) {
            Some(other)
        } else {
            None
        }
    }

    pub fn default_type(self) -> BaseType {
        match self {
            Self::Numeric | Self::Equality | Self::Ordered => BaseType::Int,
            Self::Boolean => BaseType::Bool,
            Self::Textual => BaseType::Text,
        }
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Equality => write!(f, "equality"),
            Self::Ordered => write!(f, "ordered"),
            Self::Boolean => write!(f, "boolean"),
            Self::Textual => write!(f, "textual"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Hole {
    Empty { level: usize, class: Option<Class> },
    Filled(Type),
}

impl Display for Hole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { level, .. } => write!(f, "Hole<{level}>"),
            Self::Filled(a) => write!(f, "Filled[{}]", a),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefItem {
    pub name: String,
    pub data: Hole,
}

/// A unification variable. Two refs are the same variable when they point to the same cell.
#[derive(Debug, Clone)]
pub struct Ref(Rc<RefCell<RefItem>>);

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Ref {}

impl Hash for Ref {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier().hash(state);
    }
}

impl Ref {
    pub fn new(name: String, level: usize, class: Option<Class>) -> Self {
        Self(Rc::new(RefCell::new(RefItem {
            name,
            data: Hole::Empty { level, class },
        })))
    }

    pub fn identifier(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub fn fill(&self, typ: Type) {
        self.0.borrow_mut().data = Hole::Filled(typ);
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.0.borrow().data, Hole::Empty { .. })
    }

    pub fn get(&self) -> Hole {
        self.0.borrow().data.clone()
    }

    pub fn get_item_mut(&self) -> RefMut<RefItem> {
        self.0.borrow_mut()
    }
}

pub type Type = Rc<MonoType>;

#[derive(Debug, Clone)]
pub enum MonoType {
    Base(BaseType),
    /// A rigid variable: a quantified name of a scheme or a parameter of a type definition.
    Var(String),
    Hole(Ref),
    Ref(Type),
    Tuple(Vec<Type>),
    Arrow(Type, Type),
    Application(TyName, Vec<Type>),
}

fn atomic(typ: &Type) -> String {
    match &*typ.flatten() {
        MonoType::Arrow(..) => format!("({typ})"),
        MonoType::Tuple(_) => format!("({typ})"),
        _ => typ.to_string(),
    }
}

impl Display for MonoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base(base) => write!(f, "{base}"),
            Self::Var(name) => write!(f, "{name}"),
            Self::Hole(item) => match item.get() {
                Hole::Filled(typ) => write!(f, "{typ}"),
                Hole::Empty { .. } => write!(f, "^{}", item.name()),
            },
            Self::Ref(typ) => write!(f, "{} ref", atomic(typ)),
            Self::Tuple(t) => write!(f, "{}", t.iter().map(atomic).join(" * ")),
            Self::Arrow(from, to) => write!(f, "{} -> {}", atomic(from), to),
            Self::Application(name, args) => match args.as_slice() {
                [] => write!(f, "{name}"),
                [arg] => write!(f, "{} {name}", atomic(arg)),
                args => write!(f, "({}) {name}", args.iter().join(", ")),
            },
        }
    }
}

impl MonoType {
    pub fn base(base: BaseType) -> Type {
        Rc::new(Self::Base(base))
    }

    pub fn var(name: impl Into<String>) -> Type {
        Rc::new(Self::Var(name.into()))
    }

    pub fn arrow(from: Type, to: Type) -> Type {
        Rc::new(Self::Arrow(from, to))
    }

    /// The empty tuple is `unit`.
    pub fn tuple(types: Vec<Type>) -> Type {
        if types.is_empty() {
            Self::base(BaseType::Unit)
        } else {
            Rc::new(Self::Tuple(types))
        }
    }

    pub fn reference(typ: Type) -> Type {
        Rc::new(Self::Ref(typ))
    }

    pub fn application(name: TyName, args: Vec<Type>) -> Type {
        Rc::new(Self::Application(name, args))
    }

    pub fn new_hole(name: String, level: usize, class: Option<Class>) -> Type {
        Rc::new(Self::Hole(Ref::new(name, level, class)))
    }

    /// Folds `args` from the right into a curried arrow ending in `ret`.
    pub fn rfold_arrow(args: impl DoubleEndedIterator<Item = Type>, ret: Type) -> Type {
        args.rev().fold(ret, |acc, arg| Self::arrow(arg, acc))
    }

    /// Follows filled holes until reaching a type that is not a filled hole.
    pub fn flatten(self: &Rc<Self>) -> Type {
        match &**self {
            Self::Hole(item) => match item.get() {
                Hole::Filled(typ) => typ.flatten(),
                Hole::Empty { .. } => self.clone(),
            },
            _ => self.clone(),
        }
    }

    /// Replaces rigid variables by the types in `substs`.
    pub fn substitute(self: &Rc<Self>, substs: &HashMap<String, Type>) -> Type {
        match &**self {
            Self::Var(name) => substs.get(name).cloned().unwrap_or_else(|| self.clone()),
            Self::Base(_) => self.clone(),
            Self::Ref(typ) => Self::reference(typ.substitute(substs)),
            Self::Tuple(vec) => Self::tuple(vec.iter().map(|t| t.substitute(substs)).collect()),
            Self::Arrow(from, to) => Self::arrow(from.substitute(substs), to.substitute(substs)),
            Self::Application(name, args) => Self::application(
                name.clone(),
                args.iter().map(|t| t.substitute(substs)).collect(),
            ),
            Self::Hole(item) => match item.get() {
                Hole::Filled(typ) => typ.substitute(substs),
                Hole::Empty { .. } => self.clone(),
            },
        }
    }

    pub fn to_poly(self: &Rc<Self>) -> Rc<TypeScheme> {
        Rc::new(TypeScheme {
            names: vec![],
            mono: self.clone(),
        })
    }

    /// Lowers the level of every empty hole to at most `level`, so no later generalization at an
    /// outer level can quantify over them.
    pub fn restrict(&self, level: usize) {
        match self {
            Self::Base(_) | Self::Var(_) => {}
            Self::Hole(item) => match item.get() {
                Hole::Filled(typ) => typ.restrict(level),
                Hole::Empty { level: lvl, class } if lvl > level => {
                    item.get_item_mut().data = Hole::Empty { level, class };
                }
                Hole::Empty { .. } => {}
            },
            Self::Ref(typ) => typ.restrict(level),
            Self::Tuple(vec) => vec.iter().for_each(|t| t.restrict(level)),
            Self::Arrow(from, to) => {
                from.restrict(level);
                to.restrict(level);
            }
            Self::Application(_, args) => args.iter().for_each(|t| t.restrict(level)),
        }
    }

    /// Collects the holes of `self` that are still empty.
    pub fn empty_holes(&self, holes: &mut IndexSet<Ref>) {
        match self {
            Self::Base(_) | Self::Var(_) => {}
            Self::Hole(item) => match item.get() {
                Hole::Filled(typ) => typ.empty_holes(holes),
                Hole::Empty { .. } => {
                    holes.insert(item.clone());
                }
            },
            Self::Ref(typ) => typ.empty_holes(holes),
            Self::Tuple(vec) => vec.iter().for_each(|t| t.empty_holes(holes)),
            Self::Arrow(from, to) => {
                from.empty_holes(holes);
                to.empty_holes(holes);
            }
            Self::Application(_, args) => args.iter().for_each(|t| t.empty_holes(holes)),
        }
    }

    pub fn has_rigid_vars(&self) -> bool {
        match self {
            Self::Base(_) => false,
            Self::Var(_) => true,
            Self::Hole(item) => match item.get() {
                Hole::Filled(typ) => typ.has_rigid_vars(),
                Hole::Empty { .. } => false,
            },
            Self::Ref(typ) => typ.has_rigid_vars(),
            Self::Tuple(vec) => vec.iter().any(|t| t.has_rigid_vars()),
            Self::Arrow(from, to) => from.has_rigid_vars() || to.has_rigid_vars(),
            Self::Application(_, args) => args.iter().any(|t| t.has_rigid_vars()),
        }
    }

    /// Replaces every empty hole created deeper than the context's level by a rigid variable.
    /// Class holes are never quantified: they wait for the top level defaulting.
    pub fn generalize_type(self: &Rc<Self>, ctx: &Ctx, holes: &mut IndexMap<Ref, String>) -> Type {
        match &**self {
            Self::Base(_) | Self::Var(_) => self.clone(),

            Self::Ref(typ) => Self::reference(typ.generalize_type(ctx, holes)),

            Self::Tuple(vec) => Self::tuple(
                vec.iter()
                    .map(|mono| mono.generalize_type(ctx, holes))
                    .collect(),
            ),

            Self::Arrow(from, to) => Self::arrow(
                from.generalize_type(ctx, holes),
                to.generalize_type(ctx, holes),
            ),

            Self::Application(name, args) => Self::application(
                name.clone(),
                args.iter()
                    .map(|mono| mono.generalize_type(ctx, holes))
                    .collect(),
            ),

            Self::Hole(item) => match item.get() {
                Hole::Filled(typ) => typ.generalize_type(ctx, holes),
                Hole::Empty { level, class: None } if level > ctx.level => {
                    let name = holes.entry(item.clone()).or_insert_with(|| ctx.new_name());
                    Self::var(name.clone())
                }
                Hole::Empty { .. } => self.clone(),
            },
        }
    }

    pub fn generalize(self: &Rc<Self>, ctx: &Ctx) -> Rc<TypeScheme> {
        let mut holes = IndexMap::new();
        let mono = self.generalize_type(ctx, &mut holes);

        Rc::new(TypeScheme {
            names: holes.into_values().collect(),
            mono,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TypeScheme {
    pub names: Vec<String>,
    pub mono: Type,
}

impl TypeScheme {
    pub fn new(names: Vec<String>, mono: Type) -> Self {
        Self { names, mono }
    }

    pub fn instantiate(&self, ctx: &Ctx) -> Type {
        let substitutions = self
            .names
            .iter()
            .cloned()
            .map(|x| (x, ctx.new_hole()))
            .collect::<HashMap<String, Type>>();

        self.mono.substitute(&substitutions)
    }

    /// Replaces the quantified names by fresh rigid variables, so the result only unifies with
    /// types that are at least as general.
    pub fn skolemize(&self, ctx: &Ctx) -> Type {
        let substitutions = self
            .names
            .iter()
            .cloned()
            .map(|x| (x, MonoType::var(ctx.new_name())))
            .collect::<HashMap<String, Type>>();

        self.mono.substitute(&substitutions)
    }
}

impl Display for TypeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.names.is_empty() {
            write!(f, "{}", self.mono)
        } else {
            write!(f, "forall {}. {}", self.names.iter().join(" "), self.mono)
        }
    }
}

/// A type level function: the meaning of a type constructor name in scope. Type aliases, datatypes
/// and abstract types are all represented by one of these.
#[derive(Debug, Clone)]
pub struct TypeFun {
    pub params: Vec<String>,
    pub body: Type,
}

impl TypeFun {
    pub fn new(params: Vec<String>, body: Type) -> Self {
        Self { params, body }
    }

    /// The definition of a nominal type: `name` applied to its own parameters.
    pub fn nominal(name: TyName, params: Vec<String>) -> Self {
        let args = params.iter().map(MonoType::var).collect();
        Self::new(params, MonoType::application(name, args))
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn apply(&self, args: Vec<Type>) -> Type {
        let substs: HashMap<_, _> = self.params.iter().cloned().zip(args).collect();
        self.body.substitute(&substs)
    }

    /// The nominal name this function stands for, when it is exactly `name` applied to the
    /// parameters in order.
    pub fn nominal_name(&self) -> Option<&TyName> {
        match &*self.body {
            MonoType::Application(name, args)
                if args.len() == self.params.len()
                    && args
                        .iter()
                        .zip(&self.params)
                        .all(|(arg, param)| matches!(&**arg, MonoType::Var(v) if v == param)) =>
            {
                Some(name)
            }
            _ => None,
        }
    }
}

/// Things that mention nominal type names.
pub trait TypeNames {
    /// Collects the nominal names occurring free in `self`, in order of appearance.
    fn type_names(&self, names: &mut IndexSet<TyName>);

    fn free_type_names(&self) -> IndexSet<TyName> {
        let mut names = IndexSet::new();
        self.type_names(&mut names);
        names
    }
}

impl TypeNames for MonoType {
    fn type_names(&self, names: &mut IndexSet<TyName>) {
        match self {
            Self::Base(_) | Self::Var(_) => {}
            Self::Hole(item) => {
                if let Hole::Filled(typ) = item.get() {
                    typ.type_names(names);
                }
            }
            Self::Ref(typ) => typ.type_names(names),
            Self::Tuple(vec) => vec.iter().for_each(|t| t.type_names(names)),
            Self::Arrow(from, to) => {
                from.type_names(names);
                to.type_names(names);
            }
            Self::Application(name, args) => {
                names.insert(name.clone());
                args.iter().for_each(|t| t.type_names(names));
            }
        }
    }
}

impl TypeNames for TypeScheme {
    fn type_names(&self, names: &mut IndexSet<TyName>) {
        self.mono.type_names(names);
    }
}

impl TypeNames for TypeFun {
    fn type_names(&self, names: &mut IndexSet<TyName>) {
        self.body.type_names(names);
    }
}

impl Display for TypeFun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}", self.body)
        } else {
            write!(f, "fun {} => {}", self.params.iter().join(" "), self.body)
        }
    }
}
