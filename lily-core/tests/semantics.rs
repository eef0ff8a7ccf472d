use lily_core::ast::SourceUnit;
use lily_core::case_table::{CaseStatus, CaseTable};
use lily_core::checked::{CheckedBlock, CheckedExpr, CheckedExprKind};
use lily_core::data_type::DataType;
use lily_core::pattern::{Pattern, PatternLiteral};
use lily_core::resolver::DataTypeResolver;
use lily_core::scope::{ScopeArena, ScopeId, ScopeKind};
use lily_core::span::Span;
use lily_core::symbol::{LocalId, SymbolKind, SymbolRef, Visibility};
use lily_core::{AnalysisConfig, CheckedPackage, SemaError, analyze};

fn unit(json: &str) -> SourceUnit {
    SourceUnit::from_json(json).expect("unit")
}

fn run(json: &str) -> CheckedPackage {
    analyze(&[unit(json)], &AnalysisConfig::default())
}

fn errors(package: &CheckedPackage, pred: impl Fn(&SemaError) -> bool) -> usize {
    package
        .diagnostics
        .iter()
        .filter(|d| d.kind.as_ref().is_some_and(&pred))
        .count()
}

const PAIR: &str = r#"{ "name": "Pair", "generic_params": [{ "Normal": { "name": "T" } }],
    "kind": { "Record": { "fields": [
        { "name": "a", "data_type": { "Custom": { "name": "T" } } },
        { "name": "b", "data_type": { "Custom": { "name": "T" } } } ] } } }"#;

fn pair_init(var: &str, literal: &str) -> String {
    format!(
        r#"{{ "kind": {{ "Variable": {{ "name": "{var}", "value": {{ "kind": {{ "RecordInit": {{
            "name": "Pair", "fields": [
                {{ "name": "a", "value": {{ "kind": {{ "Literal": {literal} }} }} }},
                {{ "name": "b", "value": {{ "kind": {{ "Literal": {literal} }} }} }} ] }} }} }} }} }} }}"#
    )
}

fn main_with(stmts: &[String]) -> String {
    format!(
        r#"{{ "name": "main", "decls": [ {PAIR},
            {{ "name": "main", "kind": {{ "Fun": {{ "body": [ {} ] }} }} }} ] }}"#,
        stmts.join(", ")
    )
}

const INT: &str = r#"{ "Int": { "value": 1 } }"#;
const FLOAT: &str = r#"{ "Float": { "value": 1.5 } }"#;

#[test]
fn same_tuple_twice_yields_one_signature() {
    let package = run(&main_with(&[pair_init("p", INT), pair_init("q", INT)]));
    assert!(!package.diagnostics.has_errors(), "{:?}", package.diagnostics);
    let pair = package.decl("main.Pair").expect("pair");
    assert_eq!(pair.signatures.len(), 1);
    assert_eq!(package.stats.reused(), 1);
}

#[test]
fn distinct_tuples_yield_distinct_mangled_names() {
    let package = run(&main_with(&[pair_init("p", INT), pair_init("q", FLOAT)]));
    assert!(!package.diagnostics.has_errors(), "{:?}", package.diagnostics);
    let pair = package.decl("main.Pair").expect("pair");
    let names: Vec<&str> = pair
        .signatures
        .iter()
        .map(|s| s.ser_global_name.as_str())
        .collect();
    assert_eq!(names.len(), 2);
    assert_ne!(names[0], names[1]);
    assert_eq!(
        pair.signatures.iter().map(|s| s.generic_params["T"].clone()).collect::<Vec<_>>(),
        vec![DataType::Int32, DataType::Float64]
    );
}

#[test]
fn generic_body_requests_are_replayed_per_instance() {
    let package = run(r#"{ "name": "main", "decls": [
        { "name": "Pair", "generic_params": [{ "Normal": { "name": "T" } }],
          "kind": { "Record": { "fields": [
            { "name": "a", "data_type": { "Custom": { "name": "T" } } },
            { "name": "b", "data_type": { "Custom": { "name": "T" } } } ] } } },
        { "name": "main", "kind": { "Fun": { "body": [
            { "kind": { "Expr": { "kind": { "Call": {
                "callee": { "kind": { "Identifier": "twin" } },
                "args": [ { "kind": { "Literal": { "Int": { "value": 7 } } } } ] } } } } },
            { "kind": { "Expr": { "kind": { "Call": {
                "callee": { "kind": { "Identifier": "twin" } },
                "args": [ { "kind": { "Literal": { "Float": { "value": 0.5 } } } } ] } } } } }
        ] } } },
        { "name": "twin", "generic_params": [{ "Normal": { "name": "T" } }],
          "kind": { "Fun": {
            "params": [ { "name": "v", "data_type": { "Custom": { "name": "T" } } } ],
            "return_type": { "Custom": { "name": "Pair", "generic_args": [ { "Custom": { "name": "T" } } ] } },
            "body": [ { "kind": { "Return": { "kind": { "RecordInit": { "name": "Pair", "fields": [
                { "name": "a", "value": { "kind": { "Identifier": "v" } } },
                { "name": "b", "value": { "kind": { "Identifier": "v" } } } ] } } } } } ] } } }
    ] }"#);
    assert!(!package.diagnostics.has_errors(), "{:?}", package.diagnostics);
    assert_eq!(package.decl("main.twin").map(|d| d.signatures.len()), Some(2));
    let pair = package.decl("main.Pair").expect("pair");
    assert_eq!(pair.signatures.len(), 2);
    assert!(pair.signatures.iter().all(|s| s.has_only_known_types()));
}

#[test]
fn polymorphic_recursion_stops_at_the_depth_limit() {
    let units = [unit(
        r#"{ "name": "main", "decls": [
        { "name": "Pair", "generic_params": [{ "Normal": { "name": "T" } }],
          "kind": { "Record": { "fields": [
            { "name": "a", "data_type": { "Custom": { "name": "T" } } },
            { "name": "b", "data_type": { "Custom": { "name": "T" } } } ] } } },
        { "name": "grow", "generic_params": [{ "Normal": { "name": "T" } }],
          "kind": { "Fun": {
            "params": [ { "name": "x", "data_type": { "Custom": { "name": "T" } } } ],
            "body": [ { "kind": { "Expr": { "kind": { "Call": {
                "callee": { "kind": { "Identifier": "grow" } },
                "args": [ { "kind": { "RecordInit": { "name": "Pair", "fields": [
                    { "name": "a", "value": { "kind": { "Identifier": "x" } } },
                    { "name": "b", "value": { "kind": { "Identifier": "x" } } } ] } } } ] } } } } } ] } } },
        { "name": "main", "kind": { "Fun": { "body": [
            { "kind": { "Expr": { "kind": { "Call": {
                "callee": { "kind": { "Identifier": "grow" } },
                "args": [ { "kind": { "Literal": { "Int": { "value": 1 } } } } ] } } } } } ] } } }
    ] }"#,
    )];
    let config = AnalysisConfig {
        max_instantiation_depth: 6,
        ..AnalysisConfig::default()
    };
    let package = analyze(&units, &config);
    assert!(
        errors(&package, |e| matches!(
            e,
            SemaError::InstantiationDepthExceeded { limit: 6, .. }
        )) >= 1
    );
    let grow = package.decl("main.grow").expect("grow");
    assert!(grow.signatures.len() <= 8);
}

#[test]
fn repeated_and_shadowed_bool_arms() {
    let arms = |second: &str| {
        format!(
            r#"{{ "name": "main", "decls": [
            {{ "name": "pick", "kind": {{ "Fun": {{
                "params": [ {{ "name": "x", "data_type": "Bool" }}, {{ "name": "g", "data_type": "Bool" }} ],
                "body": [ {{ "kind": {{ "Match": {{
                    "scrutinee": {{ "kind": {{ "Identifier": "x" }} }},
                    "arms": [
                        {{ "pattern": {{ "Literal": {{ "Bool": true }} }}, "body": [] }},
                        {second},
                        {{ "pattern": "Wildcard", "body": [] }} ] }} }} }} ] }} }} }} ] }}"#
        )
    };
    let duplicate = run(&arms(r#"{ "pattern": { "Literal": { "Bool": true } }, "body": [] }"#));
    assert_eq!(errors(&duplicate, |e| matches!(e, SemaError::DuplicateCase)), 1);
    assert_eq!(errors(&duplicate, |e| matches!(e, SemaError::UnusedCase)), 0);

    let unused = run(&arms(
        r#"{ "pattern": { "Literal": { "Bool": true } },
             "guard": { "kind": { "Identifier": "g" } }, "body": [] }"#,
    ));
    assert_eq!(errors(&unused, |e| matches!(e, SemaError::UnusedCase)), 1);
    assert_eq!(errors(&unused, |e| matches!(e, SemaError::DuplicateCase)), 0);
}

#[test]
fn differently_guarded_cases_are_accepted() {
    let guard = |local: u32| {
        CheckedExpr::new(
            CheckedExprKind::Local {
                local: LocalId(local),
                captured: false,
            },
            DataType::Bool,
            Span::dummy(),
        )
    };
    let key = Pattern::Literal(PatternLiteral::Int(3));
    let mut table: CaseTable<Pattern, CheckedExpr, Option<CheckedBlock>> = CaseTable::new();
    assert_eq!(table.add(key.clone(), Some(guard(0)), None), CaseStatus::Ok);
    assert_eq!(table.classify(&key, Some(&guard(1))), CaseStatus::Ok);
    assert_eq!(table.classify(&key, Some(&guard(0))), CaseStatus::DuplicateCase);
}

#[test]
fn sibling_block_variables_stay_hidden() {
    let mut scopes = ScopeArena::new();
    let package = scopes.create(ScopeKind::Package, None, Visibility::Public, None);
    let fun = scopes.create(ScopeKind::Function, Some(package), Visibility::Private, None);
    let first = scopes.create(ScopeKind::Block, Some(fun), Visibility::Private, None);
    let second = scopes.create(ScopeKind::Block, Some(fun), Visibility::Private, None);
    let declare = |scopes: &mut ScopeArena, scope: ScopeId, name: &str, id: u32| {
        scopes
            .register(
                scope,
                name,
                SymbolKind::Variable,
                SymbolRef::Local(LocalId(id)),
                Visibility::Private,
            )
            .expect("register");
    };
    declare(&mut scopes, fun, "outer", 0);
    declare(&mut scopes, first, "inner", 1);

    let found = scopes.lookup(second, "outer").expect("outer");
    assert_eq!(found.scope, fun);
    assert!(matches!(
        scopes.lookup(second, "inner"),
        Err(SemaError::UnknownSymbol { .. })
    ));
    assert!(scopes.lookup(first, "inner").is_ok());
}

#[test]
fn sibling_block_variable_is_unknown_in_bodies() {
    let package = run(r#"{ "name": "main", "decls": [
        { "name": "main", "kind": { "Fun": { "body": [
            { "kind": { "Block": [
                { "kind": { "Variable": { "name": "hidden",
                    "value": { "kind": { "Literal": { "Int": { "value": 1 } } } } } } } ] } },
            { "kind": { "Block": [
                { "kind": { "Expr": { "kind": { "Identifier": "hidden" } } } } ] } }
        ] } } }
    ] }"#);
    assert_eq!(
        errors(&package, |e| matches!(e, SemaError::UnknownSymbol { name } if name == "hidden")),
        1
    );
}

#[test]
fn integer_and_float_classes_are_disjoint_and_ranked() {
    let decls = lily_core::decl::DeclTable::new();
    let resolver = DataTypeResolver::new(&decls, true);
    let all = [
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Isize,
        DataType::Uint8,
        DataType::Uint16,
        DataType::Uint32,
        DataType::Uint64,
        DataType::Usize,
        DataType::Float32,
        DataType::Float64,
        DataType::Bool,
        DataType::Char,
        DataType::Byte,
        DataType::Str,
        DataType::Unit,
        DataType::ptr(DataType::Int32),
        DataType::list(DataType::Float64),
    ];
    for dt in &all {
        assert!(!(resolver.is_integer(dt) && resolver.is_float(dt)), "{dt}");
    }
    let rank = |dt: DataType| dt.integer_rank().expect("integer");
    assert!(rank(DataType::Int8) < rank(DataType::Int16));
    assert!(rank(DataType::Int16) < rank(DataType::Int32));
    assert!(rank(DataType::Int32) < rank(DataType::Int64));
    assert!(rank(DataType::Uint8) < rank(DataType::Uint16));
    assert!(rank(DataType::Uint16) < rank(DataType::Uint32));
    assert!(rank(DataType::Uint32) < rank(DataType::Uint64));
}

#[test]
fn private_module_member_is_rejected_across_modules() {
    let geo = unit(
        r#"{ "name": "geo", "decls": [
        { "name": "origin", "kind": { "Constant": { "data_type": "Int32",
            "value": { "kind": { "Literal": { "Int": { "value": 0 } } } } } } },
        { "name": "unit", "visibility": "public", "kind": { "Constant": { "data_type": "Int32",
            "value": { "kind": { "Literal": { "Int": { "value": 1 } } } } } } }
    ] }"#,
    );
    let main = unit(
        r#"{ "name": "main", "decls": [
        { "name": "main", "kind": { "Fun": { "body": [
            { "kind": { "Expr": { "kind": { "Path": ["geo", "unit"] } } } },
            { "kind": { "Expr": { "kind": { "Path": ["geo", "origin"] } } } }
        ] } } }
    ] }"#,
    );
    let package = analyze(&[geo, main], &AnalysisConfig::default());
    assert_eq!(errors(&package, |e| matches!(e, SemaError::PrivateSymbol { .. })), 1);
    assert_eq!(package.diagnostics.error_count(), 1);
}

fn speak_call(class: &str) -> String {
    format!(
        r#"{{ "kind": {{ "Expr": {{ "kind": {{ "Call": {{
            "callee": {{ "kind": {{ "Identifier": "speak" }} }},
            "args": [ {{ "kind": {{ "RecordInit": {{ "name": "{class}", "fields": [] }} }} }} ] }} }} }} }} }}"#
    )
}

#[test]
fn unmet_trait_constraint_is_reported_once_and_analysis_continues() {
    let body = [speak_call("Cat"), speak_call("Dog")].join(", ");
    let package = run(&format!(
        r#"{{ "name": "main", "decls": [
        {{ "name": "Speaker", "kind": {{ "Trait": {{ "prototypes": [] }} }} }},
        {{ "name": "Dog", "kind": {{ "Class": {{ "implements": [ {{ "Custom": {{ "name": "Speaker" }} }} ] }} }} }},
        {{ "name": "Cat", "kind": {{ "Class": {{}} }} }},
        {{ "name": "speak",
          "generic_params": [{{ "Constraint": {{ "name": "T",
              "constraints": [ {{ "Custom": {{ "name": "Speaker" }} }} ] }} }}],
          "kind": {{ "Fun": {{
            "params": [ {{ "name": "v", "data_type": {{ "Custom": {{ "name": "T" }} }} }} ] }} }} }},
        {{ "name": "main", "kind": {{ "Fun": {{ "body": [ {body} ] }} }} }}
    ] }}"#
    ));
    assert_eq!(
        errors(&package, |e| matches!(
            e,
            SemaError::ConstraintViolation { param, .. } if param == "T"
        )),
        1,
        "{:?}",
        package.diagnostics
    );
    assert_eq!(package.diagnostics.error_count(), 1, "{:?}", package.diagnostics);
    let speak = package.decl("main.speak").expect("speak");
    assert_eq!(speak.signatures.len(), 1);
    assert_eq!(
        speak.signatures.iter().next().map(|s| s.generic_params["T"].clone()),
        Some(DataType::custom("main.Dog", vec![]))
    );
}

#[test]
fn pointer_backed_container_makes_recursive_type_valid() {
    let package = run(r#"{ "name": "main", "decls": [
        { "name": "Vec", "generic_params": [{ "Normal": { "name": "T" } }],
          "kind": { "Record": { "fields": [
            { "name": "data", "data_type": { "Ptr": { "Custom": { "name": "T" } } } },
            { "name": "len", "data_type": "Usize" } ] } } },
        { "name": "Tree", "kind": { "Record": { "fields": [
            { "name": "children", "data_type": { "Custom": { "name": "Vec",
                "generic_args": [ { "Custom": { "name": "Tree" } } ] } } } ] } } }
    ] }"#);
    assert_eq!(
        errors(&package, |e| matches!(
            e,
            SemaError::RecursiveTypeWithoutIndirection { .. }
        )),
        0,
        "{:?}",
        package.diagnostics
    );
    let tree = package.decl("main.Tree").expect("tree");
    assert!(tree.is_recursive && !tree.recursion_error);
    assert_eq!(package.decl("main.Vec").map(|d| d.signatures.len()), Some(1));
}
