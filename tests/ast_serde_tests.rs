//! AST serialization: programs built by an external front end arrive as
//! JSON, so the serde representation is part of the public contract.

mod common;

use common::*;
use lira::ast::{BinaryOp, ParamMode, Program, RelOp};

fn sample_program() -> Program {
    let helper = procedure(
        "double",
        vec![param(ParamMode::In, "a"), param(ParamMode::Out, "b")],
        vec![scalar("t")],
        vec![
            assign("t", binop(BinaryOp::Mul, ident("a"), num(2))),
            assign("b", ident("t")),
        ],
    );
    program(
        vec![helper],
        vec![scalar("x"), scalar("y"), array("buf", 0, 7)],
        vec![
            read("x"),
            call("double", &["x", "y"]),
            if_else(
                cond(RelOp::GtEq, ident("y"), num(10)),
                vec![assign_elem("buf", num(0), ident("y"))],
                vec![assign_elem("buf", num(0), num(0))],
            ),
            for_up("i", num(1), num(3), vec![write(ident("i"))]),
            write(elem("buf", num(0))),
        ],
    )
}

#[test]
fn test_program_round_trips_through_json() {
    let original = sample_program();
    let json = serde_json::to_string(&original).unwrap();
    let restored: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(original, restored);
}

#[test]
fn test_deserialized_program_compiles_identically() {
    let original = sample_program();
    let json = serde_json::to_string(&original).unwrap();
    let restored: Program = serde_json::from_str(&json).unwrap();
    let a = lira::codegen::compile(&original).unwrap();
    let b = lira::codegen::compile(&restored).unwrap();
    assert_eq!(a.to_text(), b.to_text());
}

#[test]
fn test_statement_json_uses_variant_tags() {
    let json = serde_json::to_value(sample_program()).unwrap();
    let body = &json["main"]["body"];
    assert!(body[0].get("Read").is_some());
    assert!(body[1].get("Call").is_some());
    assert!(body[2].get("If").is_some());
    assert!(body[3].get("For").is_some());
    assert!(body[4].get("Write").is_some());
}

#[test]
fn test_program_parses_from_handwritten_json() {
    // the shape a front end would emit for: x := 5; write x
    let json = r#"{
        "procedures": [],
        "main": {
            "declarations": [ { "Scalar": { "name": "x", "line": 1 } } ],
            "body": [
                {
                    "Assign": {
                        "target": { "name": "x", "index": null, "line": 2 },
                        "value": { "Number": { "value": 5, "line": 2 } },
                        "line": 2
                    }
                },
                {
                    "Write": {
                        "value": { "Identifier": { "name": "x", "line": 3 } },
                        "line": 3
                    }
                }
            ],
            "line": 1
        }
    }"#;
    let program: Program = serde_json::from_str(json).unwrap();
    assert_eq!(compile_and_run(&program, &[]), vec![5]);
}
