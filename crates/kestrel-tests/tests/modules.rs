use kestrel_checker::{check_program, Annotation, CheckOptions, FreshNames, NoImports};
use kestrel_tests::{check_err, check_ok, value_type, Builder};
use kestrel_tree::r#abstract::{BinaryOp, Dec, Program, SigExpr, TypeNode};
use std::rc::Rc;

fn program(b: &Builder, decs: Vec<Dec>) -> Program {
    b.program(vec![], decs)
}

/// `sig type t; val zero : t; val incr : t -> t; val get : t -> int end`
fn counter_sig(b: &Builder) -> SigExpr {
    let t = || b.t_con("t", vec![]);
    b.sig(vec![
        b.s_type("t", &[]),
        b.s_val("zero", t()),
        b.s_val("incr", b.t_arrow(t(), t())),
        b.s_val("get", b.t_arrow(t(), b.t_int())),
    ])
}

/// `struct type t = int; val zero = 0; val incr = fun n -> n + 1; val get = fun n -> n end`
fn counter_struct(b: &Builder) -> kestrel_tree::r#abstract::ModExpr {
    b.structure(vec![
        b.type_("t", &[], b.t_int()),
        b.bind("zero", b.int(0)),
        b.bind(
            "incr",
            b.lam("n", b.binary(BinaryOp::Add, b.var("n"), b.int(1))),
        ),
        b.bind("get", b.lam("n", b.var("n"))),
    ])
}

/// `sig type t; val compare : t -> t -> bool end`
fn ord_sig(b: &Builder) -> SigExpr {
    let t = || b.t_con("t", vec![]);
    b.sig(vec![
        b.s_type("t", &[]),
        b.s_val("compare", b.t_arrow(t(), b.t_arrow(t(), b.t_bool()))),
    ])
}

/// A set functor over an ordered type.
fn make_set(b: &Builder) -> Dec {
    let elem = || b.t_con("O.t", vec![]);
    b.module(
        "MakeSet",
        b.functor(
            "O",
            b.sig_path("ORD"),
            b.structure(vec![
                b.type_("elem", &[], elem()),
                b.bind(
                    "member",
                    b.fun(
                        b.p_ann(b.p_var("x"), elem()),
                        b.fun(
                            b.p_ann(b.p_var("xs"), b.t_con("list", vec![elem()])),
                            b.app(b.app(b.var("O.compare"), b.var("x")), b.var("x")),
                        ),
                    ),
                ),
            ]),
        ),
    )
}

fn int_ord(b: &Builder, name: &str, extra: bool) -> Dec {
    let mut decs = vec![
        b.type_("t", &[], b.t_int()),
        b.bind(
            "compare",
            b.lam(
                "a",
                b.lam("c", b.binary(BinaryOp::Lt, b.var("a"), b.var("c"))),
            ),
        ),
    ];
    if extra {
        decs.push(b.bind("extra", b.int(1)));
    }
    b.module(name, b.structure(decs))
}

#[test]
fn sealing_hides_the_representation() {
    let b = Builder::new();
    let prog = program(
        &b,
        vec![
            b.signature("COUNTER", counter_sig(&b)),
            b.module("C", b.seal(counter_struct(&b), b.sig_path("COUNTER"))),
            b.bind(
                "a",
                b.app(b.var("C.get"), b.app(b.var("C.incr"), b.var("C.zero"))),
            ),
        ],
    );

    let checked = check_ok(&prog);
    assert_eq!(value_type(&checked, "a"), "int");

    let prog = program(
        &b,
        vec![
            b.signature("COUNTER", counter_sig(&b)),
            b.module("C", b.seal(counter_struct(&b), b.sig_path("COUNTER"))),
            b.bind("bad", b.app(b.var("C.incr"), b.int(1))),
        ],
    );

    let err = check_err(&prog);
    assert!(err.contains("'t' and 'int' are incompatible"), "{err}");
}

#[test]
fn sealing_reports_what_is_missing() {
    let b = Builder::new();
    let prog = program(
        &b,
        vec![b.module(
            "C",
            b.seal(
                b.structure(vec![b.type_("t", &[], b.t_int())]),
                counter_sig(&b),
            ),
        )],
    );

    assert_eq!(
        check_err(&prog),
        "signature mismatch in ascription: missing value 'get'"
    );
}

#[test]
fn sealed_values_must_be_general_enough() {
    let b = Builder::new();
    let prog = program(
        &b,
        vec![b.module(
            "M",
            b.seal(
                b.structure(vec![b.bind(
                    "id",
                    b.fun(b.p_ann(b.p_var("x"), b.t_int()), b.var("x")),
                )]),
                b.sig(vec![b.s_val(
                    "id",
                    b.t_arrow(b.t_var("'a"), b.t_var("'a")),
                )]),
            ),
        )],
    );

    let err = check_err(&prog);
    assert!(
        err.starts_with("signature mismatch in ascription: value 'id' has type 'int -> int'"),
        "{err}"
    );
}

/// `module M = (struct val r = ref (fun x -> x) end : sig val r : (elem -> elem) ref end)`
fn cell(b: &Builder, elem: impl Fn(&Builder) -> TypeNode) -> Dec {
    b.module(
        "M",
        b.seal(
            b.structure(vec![b.bind("r", b.reference(b.lam("x", b.var("x"))))]),
            b.sig(vec![b.s_val("r", b.t_ref(b.t_arrow(elem(b), elem(b))))]),
        ),
    )
}

#[test]
fn sealing_keeps_weak_values_monomorphic() {
    let b = Builder::new();
    let prog = program(
        &b,
        vec![
            cell(&b, |b| b.t_var("'a")),
            b.bind(
                "set",
                b.assign(
                    b.var("M.r"),
                    b.lam("n", b.binary(BinaryOp::Add, b.var("n"), b.int(1))),
                ),
            ),
            b.bind("boom", b.app(b.deref(b.var("M.r")), b.bool(true))),
        ],
    );

    let err = check_err(&prog);
    assert!(
        err.starts_with("signature mismatch in ascription: value 'r' has type '("),
        "{err}"
    );
    assert!(
        err.ends_with("but the signature requires 'forall 'a. ('a -> 'a) ref'"),
        "{err}"
    );

    let prog = program(
        &b,
        vec![
            cell(&b, |b| b.t_int()),
            b.bind("n", b.app(b.deref(b.var("M.r")), b.int(1))),
        ],
    );

    let checked = check_ok(&prog);
    assert_eq!(value_type(&checked, "n"), "int");
}

#[test]
fn every_sealing_is_a_new_type() {
    let b = Builder::new();
    let prog = program(
        &b,
        vec![
            b.signature("COUNTER", counter_sig(&b)),
            b.module("Impl", counter_struct(&b)),
            b.module("A", b.seal(b.m_path("Impl"), b.sig_path("COUNTER"))),
            b.module("B", b.seal(b.m_path("Impl"), b.sig_path("COUNTER"))),
            b.module("Alias", b.m_path("A")),
            b.bind("same", b.app(b.var("A.get"), b.var("Alias.zero"))),
            b.bind("mixed", b.app(b.var("A.get"), b.var("B.zero"))),
        ],
    );

    let err = check_err(&prog);
    assert!(err.starts_with("type mismatch between 't -> int' and 't -> "), "{err}");
}

#[test]
fn functors_accept_wider_arguments() {
    let b = Builder::new();
    let prog = program(
        &b,
        vec![
            b.signature("ORD", ord_sig(&b)),
            make_set(&b),
            int_ord(&b, "IntOrd", true),
            b.module("S", b.m_app(b.m_path("MakeSet"), b.m_path("IntOrd"))),
            b.bind(
                "found",
                b.apps(
                    b.var("S.member"),
                    vec![b.int(1), b.apps(b.con("Cons"), vec![b.int(2), b.con("Nil")])],
                ),
            ),
        ],
    );

    let checked = check_ok(&prog);
    assert_eq!(value_type(&checked, "found"), "bool");

    let s = &checked.fragment.env.modules["S"];
    let env = s.as_structure().unwrap();
    assert_eq!(env.types["elem"].body.to_string(), "int");
}

#[test]
fn functors_reject_narrower_arguments() {
    let b = Builder::new();
    let prog = program(
        &b,
        vec![
            b.signature("ORD", ord_sig(&b)),
            make_set(&b),
            b.module("Bad", b.structure(vec![b.type_("t", &[], b.t_int())])),
            b.module("S", b.m_app(b.m_path("MakeSet"), b.m_path("Bad"))),
        ],
    );

    assert_eq!(
        check_err(&prog),
        "signature mismatch in functor argument: missing value 'compare'"
    );
}

#[test]
fn functor_arguments_must_agree_on_types() {
    let b = Builder::new();
    let prog = program(
        &b,
        vec![
            b.signature(
                "POINT",
                b.sig(vec![b.s_manifest("t", &[], b.t_int())]),
            ),
            b.module(
                "F",
                b.functor("P", b.sig_path("POINT"), b.structure(vec![])),
            ),
            b.module("Q", b.structure(vec![b.type_("t", &[], b.t_bool())])),
            b.module("R", b.m_app(b.m_path("F"), b.m_path("Q"))),
        ],
    );

    assert_eq!(
        check_err(&prog),
        "signature mismatch in functor argument: type 't' is 'bool' but the signature requires 'int'"
    );
}

#[test]
fn module_shapes_are_checked() {
    let b = Builder::new();
    let base = |b: &Builder| {
        vec![
            b.signature("ORD", ord_sig(b)),
            make_set(b),
            int_ord(b, "IntOrd", false),
        ]
    };

    let mut decs = base(&b);
    decs.push(b.module("X", b.m_app(b.m_path("IntOrd"), b.m_path("IntOrd"))));
    assert_eq!(
        check_err(&program(&b, decs)),
        "expected a functor but got a structure"
    );

    let mut decs = base(&b);
    decs.push(b.include(b.m_path("MakeSet")));
    assert_eq!(
        check_err(&program(&b, decs)),
        "include expects a structure signature"
    );

    let mut decs = base(&b);
    decs.push(b.bind("m", b.var("MakeSet.member")));
    assert_eq!(
        check_err(&program(&b, decs)),
        "expected a structure but got a functor"
    );

    let mut decs = base(&b);
    decs.push(b.module(
        "S",
        b.m_app(b.m_path("MakeSet"), b.m_path("MakeSet")),
    ));
    assert_eq!(
        check_err(&program(&b, decs)),
        "signature mismatch in functor argument: expected a structure but got a functor"
    );
}

#[test]
fn functor_applications_are_generative() {
    let b = Builder::new();
    let abstract_counter = |b: &Builder| {
        b.seal(
            b.structure(vec![b.type_("t", &[], b.t_int()), b.bind("zero", b.int(0))]),
            b.sig(vec![b.s_type("t", &[]), b.s_val("zero", b.t_con("t", vec![]))]),
        )
    };

    let decs = |b: &Builder| {
        vec![
            b.module(
                "Counter",
                b.functor("X", b.sig(vec![]), abstract_counter(b)),
            ),
            b.module("E", b.structure(vec![])),
            b.module("C1", b.m_app(b.m_path("Counter"), b.m_path("E"))),
            b.module("C2", b.m_app(b.m_path("Counter"), b.m_path("E"))),
            b.bind(
                "same",
                b.if_(b.bool(true), b.var("C1.zero"), b.var("C2.zero")),
            ),
        ]
    };

    let err = check_err(&program(&b, decs(&b)));
    assert_eq!(err, "type mismatch between 't' and 't'");

    let options = CheckOptions {
        renaming: Rc::new(FreshNames),
        ..Default::default()
    };
    let prog = program(&b, decs(&b));
    let err = check_program(&prog, &mut NoImports, options).unwrap_err();
    assert_eq!(err.to_string(), "type mismatch between 't' and 't'");
}

#[test]
fn refinement_makes_abstract_types_manifest() {
    let b = Builder::new();
    let prog = program(
        &b,
        vec![
            b.signature("ORD", ord_sig(&b)),
            b.module(
                "IntOrd",
                b.seal(
                    b.structure(vec![
                        b.type_("t", &[], b.t_int()),
                        b.bind(
                            "compare",
                            b.lam(
                                "a",
                                b.lam("c", b.binary(BinaryOp::Lt, b.var("a"), b.var("c"))),
                            ),
                        ),
                    ]),
                    b.where_type(b.sig_path("ORD"), "t", &[], b.t_int()),
                ),
            ),
            b.bind(
                "less",
                b.apps(b.var("IntOrd.compare"), vec![b.int(1), b.int(2)]),
            ),
        ],
    );

    let checked = check_ok(&prog);
    assert_eq!(value_type(&checked, "less"), "bool");
}

#[test]
fn refinement_reaches_nested_structures() {
    let b = Builder::new();
    let nested = b.sig(vec![
        b.s_module("M", b.sig(vec![b.s_type("c", &["'a"])])),
        b.s_val(
            "wrap",
            b.t_arrow(b.t_var("'a"), b.t_con("M.c", vec![b.t_var("'a")])),
        ),
    ]);
    let refined = b.where_type(
        nested,
        "M.c",
        &["'b"],
        b.t_con("list", vec![b.t_var("'b")]),
    );

    let prog = program(
        &b,
        vec![
            b.signature("WRAP", refined),
            b.module(
                "W",
                b.seal(
                    b.structure(vec![
                        b.module(
                            "M",
                            b.structure(vec![b.type_(
                                "c",
                                &["'a"],
                                b.t_con("list", vec![b.t_var("'a")]),
                            )]),
                        ),
                        b.bind(
                            "wrap",
                            b.lam("x", b.apps(b.con("Cons"), vec![b.var("x"), b.con("Nil")])),
                        ),
                    ]),
                    b.sig_path("WRAP"),
                ),
            ),
            b.bind("xs", b.app(b.var("W.wrap"), b.int(1))),
        ],
    );

    let checked = check_ok(&prog);
    assert_eq!(value_type(&checked, "xs"), "int list");
}

#[test]
fn refinement_errors() {
    let b = Builder::new();

    let missing = b.where_type(ord_sig(&b), "u", &[], b.t_int());
    assert_eq!(
        check_err(&program(&b, vec![b.signature("S", missing)])),
        "cannot refine 'u': unknown type 'u'"
    );

    let manifest = b.where_type(
        b.sig(vec![b.s_manifest("t", &[], b.t_int())]),
        "t",
        &[],
        b.t_bool(),
    );
    assert_eq!(
        check_err(&program(&b, vec![b.signature("S", manifest)])),
        "cannot refine 't': the type is not abstract"
    );

    let arity = b.where_type(
        b.sig(vec![b.s_type("t", &["'a"])]),
        "t",
        &[],
        b.t_int(),
    );
    assert_eq!(
        check_err(&program(&b, vec![b.signature("S", arity)])),
        "cannot refine 't': wrong number of type arguments: expected 1, found 0"
    );

    let functor = b.where_type(
        b.sig_functor("X", b.sig(vec![]), b.sig(vec![b.s_type("t", &[])])),
        "t",
        &[],
        b.t_int(),
    );
    assert_eq!(
        check_err(&program(&b, vec![b.signature("S", functor)])),
        "cannot refine 't': expected a structure but got a functor"
    );
}

#[test]
fn functor_signatures_are_matched_contravariantly() {
    let b = Builder::new();
    let param = |b: &Builder| {
        b.sig(vec![
            b.s_type("t", &[]),
            b.s_val("x", b.t_con("t", vec![])),
        ])
    };

    let functor = |b: &Builder| {
        b.functor(
            "X",
            param(b),
            b.structure(vec![b.bind("y", b.var("X.x")), b.bind("z", b.int(1))]),
        )
    };

    let expected = |b: &Builder, extra: bool| {
        let mut specs = vec![b.s_val("y", b.t_con("X.t", vec![]))];
        if extra {
            specs.push(b.s_val("w", b.t_int()));
        }
        b.sig_functor("X", param(b), b.sig(specs))
    };

    let prog = program(
        &b,
        vec![b.module("M", b.seal(functor(&b), expected(&b, false)))],
    );
    check_ok(&prog);

    let prog = program(
        &b,
        vec![b.module("M", b.seal(functor(&b), expected(&b, true)))],
    );
    assert_eq!(
        check_err(&prog),
        "signature mismatch in ascription: functor results do not match: missing value 'w'"
    );
}

#[test]
fn datatype_specifications_require_constructors() {
    let b = Builder::new();
    let spec = |b: &Builder| {
        b.sig(vec![b.s_datatype(
            "opt",
            &["'a"],
            vec![("No", vec![]), ("Yes", vec![b.t_var("'a")])],
        )])
    };

    let prog = program(
        &b,
        vec![
            b.module(
                "O",
                b.seal(
                    b.structure(vec![b.datatype(
                        "opt",
                        &["'a"],
                        vec![("No", vec![]), ("Yes", vec![b.t_var("'a")])],
                    )]),
                    spec(&b),
                ),
            ),
            b.bind("y", b.app(b.con("O.Yes"), b.int(1))),
        ],
    );
    let checked = check_ok(&prog);
    assert_eq!(value_type(&checked, "y"), "int opt");

    let prog = program(
        &b,
        vec![b.module(
            "O",
            b.seal(
                b.structure(vec![
                    b.datatype("opt", &["'a"], vec![("No", vec![])]),
                    b.bind("Yes", b.lam("x", b.con("No"))),
                ]),
                spec(&b),
            ),
        )],
    );
    assert_eq!(
        check_err(&prog),
        "signature mismatch in ascription: 'Yes' is not a constructor"
    );
}

#[test]
fn module_let_keeps_local_types_inside() {
    let b = Builder::new();
    let leaking = b.m_let(
        vec![b.datatype("t", &[], vec![("T", vec![])])],
        b.structure(vec![b.bind("x", b.con("T"))]),
    );
    assert_eq!(
        check_err(&program(&b, vec![b.module("M", leaking)])),
        "type 't' escapes its scope"
    );

    let sealed = b.m_let(
        vec![b.datatype("t", &[], vec![("T", vec![])])],
        b.seal(
            b.structure(vec![b.type_("u", &[], b.t_con("t", vec![])), b.bind("x", b.con("T"))]),
            b.sig(vec![b.s_type("u", &[]), b.s_val("x", b.t_con("u", vec![]))]),
        ),
    );
    check_ok(&program(&b, vec![b.module("M", sealed)]));
}

#[test]
fn includes_extend_the_scope() {
    let b = Builder::new();
    let a = |b: &Builder| {
        b.module(
            "A",
            b.structure(vec![b.bind("x", b.int(1)), b.type_("t", &[], b.t_int())]),
        )
    };

    let prog = program(
        &b,
        vec![
            a(&b),
            b.include(b.m_path("A")),
            b.bind("y", b.ann(b.var("x"), b.t_con("t", vec![]))),
        ],
    );
    let checked = check_ok(&prog);
    assert_eq!(value_type(&checked, "y"), "int");

    let prog = program(
        &b,
        vec![
            a(&b),
            b.type_("t", &[], b.t_bool()),
            b.include(b.m_path("A")),
        ],
    );
    assert_eq!(check_err(&prog), "type 't' shadows previous binding");
}

#[test]
fn signatures_reject_duplicate_specifications() {
    let b = Builder::new();
    let sig = b.sig(vec![b.s_type("t", &[]), b.s_type("t", &[])]);
    assert_eq!(
        check_err(&program(&b, vec![b.signature("S", sig)])),
        "duplicate definition of type 't'"
    );

    let sig = b.sig(vec![
        b.s_include(b.sig(vec![b.s_val("x", b.t_int())])),
        b.s_val("x", b.t_bool()),
    ]);
    assert_eq!(
        check_err(&program(&b, vec![b.signature("S", sig)])),
        "duplicate definition of value 'x'"
    );
}

#[test]
fn module_nodes_record_their_signatures() {
    let b = Builder::new();
    let sealed = b.seal(counter_struct(&b), counter_sig(&b));
    let sealed_id = sealed.id;
    let spec = b.s_val("x", b.t_int());
    let spec_id = spec.id;

    let prog = program(
        &b,
        vec![
            b.module("C", sealed),
            b.signature("S", b.sig(vec![spec])),
        ],
    );
    let checked = check_ok(&prog);

    let existential = checked
        .annotation(sealed_id)
        .and_then(Annotation::existential)
        .unwrap();
    assert_eq!(existential.bound.len(), 1);
    assert_eq!(
        existential.to_string(),
        "exists t. sig type t = t; val get : t -> int; val incr : t -> t; val zero : t end"
    );

    let fragment = checked
        .annotation(spec_id)
        .and_then(Annotation::fragment)
        .unwrap();
    assert_eq!(fragment.env.values["x"].scheme.to_string(), "int");
}
