//! Schema synthesis tests.

use fnserve_core::{
    Error, FunctionDescriptor, InputSchema, OutputSchema, TypeAnnotation, ValueType, result_type,
};
use serde_json::json;

fn greet() -> FunctionDescriptor {
    FunctionDescriptor::builder("greet_user")
        .description("Greet someone.")
        .param("name", "String")
        .param("times", "Option < u32 >")
        .context("ctx")
        .returns("String")
        .build()
}

fn resolve(ty: &str) -> ValueType {
    result_type(Some(&TypeAnnotation::parse(ty)))
}

#[test]
fn input_fields_follow_parameters() {
    let input = InputSchema::synthesize(&greet());
    assert_eq!(input.title(), "InputGreetUser");

    let fields = input.fields();
    assert_eq!(fields.len(), 2, "context parameters are not fields");
    assert_eq!(fields[0].name, "name");
    assert_eq!(fields[0].ty, ValueType::String);
    assert!(fields[0].required);
    assert_eq!(fields[1].name, "times");
    assert_eq!(fields[1].ty, ValueType::Optional(Box::new(ValueType::Integer)));
    assert!(!fields[1].required);
}

#[test]
fn unknown_parameter_type_accepts_anything() {
    let descriptor = FunctionDescriptor::builder("store")
        .param("item", "MyStruct")
        .build();
    let input = InputSchema::synthesize(&descriptor);
    assert_eq!(input.fields()[0].ty, ValueType::Any);
    assert!(input.validate(&json!({ "item": [1, "two"] })).is_ok());
}

#[test]
fn validate_accepts_and_splits_envs() {
    let input = InputSchema::synthesize(&greet());
    let invocation = input
        .validate(&json!({ "name": "ada", "envs": { "LANG": "en" }, "extra": true }))
        .unwrap();

    assert_eq!(invocation.args.len(), 1);
    assert_eq!(invocation.args.get("name"), Some(&json!("ada")));
    assert!(invocation.args.get("extra").is_none());
    assert_eq!(invocation.envs.get("LANG"), Some("en"));
}

#[test]
fn validate_reports_every_field() {
    let input = InputSchema::synthesize(&greet());
    let Err(Error::Validation(detail)) = input.validate(&json!({ "times": "3", "envs": { "A": 1 } }))
    else {
        panic!("expected a validation error");
    };

    assert_eq!(
        detail,
        "name: field required; times: expected an integer, got a string; \
         envs.A: expected a string, got an integer"
    );
}

#[test]
fn validate_is_strict_about_types() {
    let input = InputSchema::synthesize(&greet());
    assert!(input.validate(&json!({ "name": 5 })).is_err());
    assert!(input.validate(&json!({ "name": "x", "times": 1.5 })).is_err());
    assert!(input.validate(&json!({ "name": "x", "times": null })).is_ok());
    assert!(input.validate(&json!(["name"])).is_err());
    assert!(input.validate(&json!({ "name": "x", "envs": "A=1" })).is_err());
}

#[test]
fn nested_containers_report_paths() {
    let descriptor = FunctionDescriptor::builder("sum")
        .param("rows", "HashMap<String, Vec<i64>>")
        .build();
    let input = InputSchema::synthesize(&descriptor);
    let err = input
        .validate(&json!({ "rows": { "a": [1, 2], "b": [3, "x"] } }))
        .unwrap_err();
    assert_eq!(err.to_string(), "rows.b[1]: expected an integer, got a string");
}

#[test]
fn args_decode_by_name() {
    let input = InputSchema::synthesize(&greet());
    let mut args = input
        .validate(&json!({ "name": "ada" }))
        .unwrap()
        .args;

    let name: String = args.take("name").unwrap();
    let times: Option<u32> = args.take("times").unwrap();
    assert_eq!(name, "ada");
    assert_eq!(times, None);
    assert!(args.is_empty());
}

#[test]
fn input_json_schema_lists_envs() {
    let schema = InputSchema::synthesize(&greet()).json_schema();
    let schema = serde_json::to_value(&schema).unwrap();

    assert_eq!(schema["title"], "InputGreetUser");
    assert_eq!(schema["required"], json!(["name"]));
    assert_eq!(schema["properties"]["name"], json!({ "type": "string" }));
    assert_eq!(schema["properties"]["envs"]["default"], json!({}));
    assert!(schema["properties"].get("ctx").is_none());
}

#[test]
fn result_type_resolution() {
    assert_eq!(result_type(None), ValueType::String);
    assert_eq!(resolve("()"), ValueType::String);
    assert_eq!(resolve("i64"), ValueType::Integer);
    assert_eq!(resolve("Vec<f64>"), ValueType::Array(Box::new(ValueType::Number)));
    assert_eq!(
        resolve("Result<Vec<String>, std::io::Error>"),
        ValueType::Array(Box::new(ValueType::String))
    );
    assert_eq!(resolve("impl Iterator<Item = u8>"), ValueType::Integer);
    assert_eq!(resolve("anyhow::Result<impl Iterator<Item = bool>>"), ValueType::Boolean);
    assert_eq!(resolve("StreamingResponse"), ValueType::String);
    assert_eq!(resolve("MyStruct"), ValueType::String);
    assert_eq!(resolve("serde_json::Value"), ValueType::Any);
}

#[test]
fn output_success_coerces_leniently() {
    let descriptor = FunctionDescriptor::builder("count")
        .returns("Vec<String>")
        .build();
    let output = OutputSchema::synthesize(&descriptor);
    assert_eq!(output.title(), "OutputCount");

    let out = output.success(json!([1, true, "x"]), "log".into());
    assert_eq!(out.result, json!(["1", "true", "x"]));
    assert!(!out.is_error());
    assert_eq!(out.stdout, "log");

    let out = output.success(json!({ "not": "a list" }), String::new());
    assert!(out.is_error());
    assert!(out.error.starts_with("result: "));
    assert_eq!(out.result, json!([]));
}

#[test]
fn output_failure_carries_default_result() {
    let descriptor = FunctionDescriptor::builder("add")
        .returns("i32")
        .build();
    let output = OutputSchema::synthesize(&descriptor);
    let out = output.failure("boom", String::new());
    assert_eq!(out.result, json!(0));
    assert_eq!(out.error, "boom");

    assert_eq!(output.coerce(json!(2.0)).unwrap(), json!(2));
    assert_eq!(output.coerce(json!("7")).unwrap(), json!(7));
    assert!(output.coerce(json!(2.5)).is_err());
}

#[test]
fn output_json_schema_shape() {
    let descriptor = FunctionDescriptor::builder("maybe")
        .returns("Option<bool>")
        .build();
    let schema = serde_json::to_value(OutputSchema::synthesize(&descriptor).json_schema()).unwrap();
    assert_eq!(schema["title"], "OutputMaybe");
    assert_eq!(schema["required"], json!(["result", "error"]));
    assert_eq!(
        schema["properties"]["result"],
        json!({ "anyOf": [{ "type": "boolean" }, { "type": "null" }] })
    );
}
