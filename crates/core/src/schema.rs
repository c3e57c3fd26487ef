//! Input and output schema synthesis.
//!
//! Both schemas are derived from a [`FunctionDescriptor`] once, at
//! registration, and cached on the route. The input schema mirrors the
//! function's parameters plus the reserved `envs` map; the output schema is
//! always `{result, error, stdout}` with `result` typed after the return
//! annotation.

use crate::{
    Error, Result,
    annotation::TypeAnnotation,
    descriptor::FunctionDescriptor,
    env::Envs,
    message::Output,
    ty::{ValueType, json_kind},
};
use schemars::Schema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

/// Reserved request field carrying environment overrides.
pub const ENVS: &str = "envs";

/// Resolve the `result` type from a return annotation.
///
/// Lazy sequences resolve to their element type. Types with a structural
/// shape (`Vec<T>`, `Option<T>`, maps, primitives) are used directly; other
/// generic wrappers such as `Result<T, E>` unwrap one level. Missing or
/// unresolvable annotations fall back to string.
pub fn result_type(returns: Option<&TypeAnnotation>) -> ValueType {
    let Some(returns) = returns else {
        return ValueType::String;
    };

    if let Some(item) = returns.sequence_item() {
        return ValueType::resolve(item).unwrap_or(ValueType::String);
    }

    ValueType::resolve(returns)
        .or_else(|| {
            let inner = returns.peel();
            inner
                .is_generic()
                .then(|| inner.first_arg())
                .flatten()
                .and_then(|arg| arg.sequence_item().or(Some(arg)))
                .and_then(ValueType::resolve)
        })
        .unwrap_or(ValueType::String)
}

/// One request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Structural type.
    pub ty: ValueType,
    /// Whether the field must be present.
    pub required: bool,
}

/// Decoded arguments of one call.
#[derive(Debug, Clone, Default)]
pub struct Args(Map<String, Value>);

impl Args {
    /// Remove and decode the argument `name`.
    ///
    /// A missing argument decodes from `null`, so optional parameters come
    /// out as `None`.
    pub fn take<T: DeserializeOwned>(&mut self, name: &str) -> Result<T> {
        let value = self.0.remove(name).unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| Error::Validation(format!("{name}: {e}")))
    }

    /// Borrow the raw argument `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw argument map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Args {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A validated request: the function arguments and the env overrides.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Arguments keyed by parameter name.
    pub args: Args,
    /// Environment overrides from `envs`.
    pub envs: Envs,
}

/// Schema of a function's requests.
#[derive(Debug, Clone)]
pub struct InputSchema {
    title: String,
    fields: Vec<Field>,
}

impl InputSchema {
    /// Derive the input schema of `descriptor`.
    pub fn synthesize(descriptor: &FunctionDescriptor) -> Self {
        let fields = descriptor
            .fields()
            .map(|param| {
                let ty = ValueType::resolve(&param.annotation).unwrap_or(ValueType::Any);
                Field {
                    name: param.name.clone(),
                    required: ty.is_required(),
                    ty,
                }
            })
            .collect();

        Self {
            title: format!("Input{}", descriptor.route_name()),
            fields,
        }
    }

    /// Schema title, `Input<RouteName>`.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Request fields, `envs` excluded.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Validate a request body.
    ///
    /// Every failing field is reported, as `<field>: <reason>` joined by `; `.
    /// Fields the schema does not know are ignored.
    pub fn validate(&self, body: &Value) -> Result<Invocation> {
        let Value::Object(body) = body else {
            return Err(Error::Validation(format!(
                "request: expected an object, got {}",
                json_kind(body)
            )));
        };

        let mut errors = Vec::new();
        let mut args = Map::new();
        for field in &self.fields {
            match body.get(&field.name) {
                Some(value) => {
                    field.ty.check(value, &field.name, &mut errors);
                    args.insert(field.name.clone(), value.clone());
                }
                None if field.required => errors.push(format!("{}: field required", field.name)),
                None => {}
            }
        }

        let mut envs = Envs::new();
        match body.get(ENVS) {
            None => {}
            Some(Value::Object(map)) => {
                for (key, value) in map {
                    match value {
                        Value::String(value) => envs.insert(key, value),
                        other => errors.push(format!(
                            "{ENVS}.{key}: expected a string, got {}",
                            json_kind(other)
                        )),
                    }
                }
            }
            Some(other) => errors.push(format!(
                "{ENVS}: expected an object of strings, got {}",
                json_kind(other)
            )),
        }

        if !errors.is_empty() {
            return Err(Error::Validation(errors.join("; ")));
        }

        Ok(Invocation {
            args: Args(args),
            envs,
        })
    }

    /// JSON Schema document of the request body.
    pub fn json_schema(&self) -> Schema {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(field.name.clone(), field.ty.json_schema());
        }
        properties.insert(
            ENVS.into(),
            json!({
                "type": "object",
                "additionalProperties": { "type": "string" },
                "default": {},
            }),
        );

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        into_schema(json!({
            "title": self.title,
            "type": "object",
            "properties": properties,
            "required": required,
        }))
    }
}

/// Schema of a function's outputs.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    title: String,
    result: ValueType,
}

impl OutputSchema {
    /// Derive the output schema of `descriptor`.
    pub fn synthesize(descriptor: &FunctionDescriptor) -> Self {
        Self {
            title: format!("Output{}", descriptor.route_name()),
            result: result_type(descriptor.returns()),
        }
    }

    /// Schema title, `Output<RouteName>`.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Type of the `result` field.
    pub fn result_type(&self) -> &ValueType {
        &self.result
    }

    /// Value of `result` when the call produced nothing.
    pub fn default_result(&self) -> Value {
        self.result.default_value()
    }

    /// Coerce a returned value to the result type.
    pub fn coerce(&self, value: Value) -> std::result::Result<Value, String> {
        self.result.coerce(value)
    }

    /// A successful output; a value that cannot be coerced turns into a
    /// failure.
    pub fn success(&self, value: Value, stdout: String) -> Output {
        match self.coerce(value) {
            Ok(result) => Output {
                result,
                error: String::new(),
                stdout,
            },
            Err(e) => self.failure(format!("result: {e}"), stdout),
        }
    }

    /// A failed output carrying `error` and the default result.
    pub fn failure(&self, error: impl Into<String>, stdout: String) -> Output {
        Output {
            result: self.default_result(),
            error: error.into(),
            stdout,
        }
    }

    /// JSON Schema document of the output.
    pub fn json_schema(&self) -> Schema {
        into_schema(json!({
            "title": self.title,
            "type": "object",
            "properties": {
                "result": self.result.json_schema(),
                "error": { "type": "string" },
                "stdout": { "type": "string", "default": "" },
            },
            "required": ["result", "error"],
        }))
    }
}

fn into_schema(value: Value) -> Schema {
    match value {
        Value::Object(map) => Schema::from(map),
        _ => Schema::from(true),
    }
}
