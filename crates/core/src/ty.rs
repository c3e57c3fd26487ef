//! Structural value types carried by schema fields.

use crate::annotation::{AnnotationKind, TypeAnnotation};
use serde_json::{Map, Number, Value, json};

/// The structural type of a schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    /// A JSON string.
    String,
    /// A JSON number without a fractional part.
    Integer,
    /// Any JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
    /// A JSON array with elements of the given type.
    Array(Box<ValueType>),
    /// A JSON object with string keys and values of the given type.
    Map(Box<ValueType>),
    /// The given type, or `null`.
    Optional(Box<ValueType>),
    /// Any JSON value.
    Any,
}

impl ValueType {
    /// Resolve an annotation, returning `None` for types without a known
    /// structural shape (user structs, trait objects, opaque text).
    pub fn resolve(annotation: &TypeAnnotation) -> Option<Self> {
        let ty = annotation.peel();
        match ty.kind() {
            AnnotationKind::Slice => Some(Self::Array(Box::new(Self::element(ty.first_arg())))),
            AnnotationKind::Tuple if ty.is_unit() => None,
            AnnotationKind::Tuple => Some(Self::Array(Box::new(Self::Any))),
            AnnotationKind::Path => Self::resolve_path(ty),
            _ => None,
        }
    }

    fn resolve_path(ty: &TypeAnnotation) -> Option<Self> {
        let resolved = match ty.name() {
            "String" | "str" | "char" | "PathBuf" | "CompactString" | "SmolStr" => Self::String,
            "Cow" => return ty.first_arg().and_then(Self::resolve),
            "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
            | "u128" | "usize" => Self::Integer,
            "f32" | "f64" => Self::Number,
            "bool" => Self::Boolean,
            "Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet"
            | "SmallVec" => Self::Array(Box::new(Self::element(ty.first_arg()))),
            "HashMap" | "BTreeMap" | "IndexMap" => {
                Self::Map(Box::new(Self::element(ty.args().get(1))))
            }
            "Map" => Self::Map(Box::new(Self::Any)),
            "Option" => Self::Optional(Box::new(Self::element(ty.first_arg()))),
            "Value" => Self::Any,
            _ => return None,
        };
        Some(resolved)
    }

    fn element(annotation: Option<&TypeAnnotation>) -> Self {
        annotation.and_then(Self::resolve).unwrap_or(Self::Any)
    }

    /// Whether a field of this type must be present in a request.
    pub fn is_required(&self) -> bool {
        !matches!(self, Self::Optional(_))
    }

    /// The empty value used for `result` when a call produced nothing.
    pub fn default_value(&self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Integer => json!(0),
            Self::Number => json!(0.0),
            Self::Boolean => Value::Bool(false),
            Self::Array(_) => Value::Array(Vec::new()),
            Self::Map(_) => Value::Object(Map::new()),
            Self::Optional(_) | Self::Any => Value::Null,
        }
    }

    /// Strictly check a client-supplied value, pushing one message per
    /// mismatch. `path` names the value in the messages.
    pub fn check(&self, value: &Value, path: &str, errors: &mut Vec<String>) {
        let ok = match (self, value) {
            (Self::Any, _) => true,
            (Self::Optional(_), Value::Null) => true,
            (Self::Optional(inner), _) => return inner.check(value, path, errors),
            (Self::String, Value::String(_)) => true,
            (Self::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Self::Number, Value::Number(_)) => true,
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Array(item), Value::Array(values)) => {
                for (idx, value) in values.iter().enumerate() {
                    item.check(value, &format!("{path}[{idx}]"), errors);
                }
                true
            }
            (Self::Map(item), Value::Object(values)) => {
                for (key, value) in values {
                    item.check(value, &format!("{path}.{key}"), errors);
                }
                true
            }
            _ => false,
        };

        if !ok {
            errors.push(format!(
                "{path}: expected {}, got {}",
                self.describe(),
                json_kind(value)
            ));
        }
    }

    /// Leniently convert a returned value to this type.
    ///
    /// Scalars become strings for string results, integral floats become
    /// integers, numeric strings parse, and containers convert element-wise.
    pub fn coerce(&self, value: Value) -> Result<Value, String> {
        match (self, value) {
            (Self::Any, value) => Ok(value),
            (Self::Optional(_), Value::Null) => Ok(Value::Null),
            (Self::Optional(inner), value) => inner.coerce(value),
            (Self::String, Value::Null) => Ok(Value::String(String::new())),
            (Self::String, value @ Value::String(_)) => Ok(value),
            (Self::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (Self::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),
            (Self::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
            (Self::Integer, Value::Number(n)) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(json!(f as i64)),
                _ => Err(format!("{n} is not an integer")),
            },
            (Self::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(|i| json!(i))
                .map_err(|_| format!("{s:?} is not an integer")),
            (Self::Number, Value::Number(n)) => Ok(Value::Number(n)),
            (Self::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("{s:?} is not a number")),
            (Self::Boolean, value @ Value::Bool(_)) => Ok(value),
            (Self::Array(item), Value::Array(values)) => values
                .into_iter()
                .map(|v| item.coerce(v))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (Self::Map(item), Value::Object(values)) => values
                .into_iter()
                .map(|(k, v)| item.coerce(v).map(|v| (k, v)))
                .collect::<Result<Map<_, _>, _>>()
                .map(Value::Object),
            (ty, value) => Err(format!(
                "expected {}, got {}",
                ty.describe(),
                json_kind(&value)
            )),
        }
    }

    /// JSON Schema fragment describing this type.
    pub fn json_schema(&self) -> Value {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::Integer => json!({ "type": "integer" }),
            Self::Number => json!({ "type": "number" }),
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Array(item) => json!({ "type": "array", "items": item.json_schema() }),
            Self::Map(item) => json!({
                "type": "object",
                "additionalProperties": item.json_schema(),
            }),
            Self::Optional(inner) => json!({
                "anyOf": [inner.json_schema(), { "type": "null" }],
            }),
            Self::Any => json!({}),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::String => "a string".into(),
            Self::Integer => "an integer".into(),
            Self::Number => "a number".into(),
            Self::Boolean => "a boolean".into(),
            Self::Array(item) => format!("an array of {}", item.plural()),
            Self::Map(item) => format!("an object of {}", item.plural()),
            Self::Optional(inner) => format!("{} or null", inner.describe()),
            Self::Any => "any value".into(),
        }
    }

    fn plural(&self) -> String {
        match self {
            Self::String => "strings".into(),
            Self::Integer => "integers".into(),
            Self::Number => "numbers".into(),
            Self::Boolean => "booleans".into(),
            Self::Any => "values".into(),
            other => format!("({})", other.describe()),
        }
    }
}

/// Short name of a JSON value's kind, used in validation messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_f64() => "a number",
        Value::Number(_) => "an integer",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
