//! Tool specification builder.
//!
//! Toolkits describe their methods with explicit per-parameter descriptors
//! built at registration time; this module turns those declarations into the
//! wire-facing [`ToolSpec`] advertised to the model. The mapping from a
//! declared Rust type to a schema kind is deterministic and closed: a type
//! outside the supported set fails at load, never silently at dispatch.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use crate::error::SchemaError;

/// Closed set of parameter kinds the wire schema understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    /// Map a declared Rust type, as written in the method signature, to a
    /// schema kind. Returns `None` for types outside the supported set.
    pub fn from_declared(declared: &str) -> Option<Self> {
        match declared {
            "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
            | "u128" | "usize" => Some(Self::Integer),
            "f32" | "f64" => Some(Self::Number),
            "bool" => Some(Self::Boolean),
            "String" | "&str" | "str" => Some(Self::String),
            "Value" | "serde_json::Value" => Some(Self::Object),
            d if d.starts_with("Vec<") && d.ends_with('>') => Some(Self::Array),
            d if d.starts_with("Map<") && d.ends_with('>') => Some(Self::Object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Method declarations (registration-time input)
// ---------------------------------------------------------------------------

/// One declared parameter of a toolkit method.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: &'static str,
    /// The parameter's Rust type as written, e.g. `"String"` or `"i64"`.
    pub declared: &'static str,
    /// False when the method supplies a default for this parameter.
    pub required: bool,
    pub doc: &'static str,
}

impl ParamDecl {
    pub fn required(name: &'static str, declared: &'static str, doc: &'static str) -> Self {
        Self {
            name,
            declared,
            required: true,
            doc,
        }
    }

    pub fn optional(name: &'static str, declared: &'static str, doc: &'static str) -> Self {
        Self {
            name,
            declared,
            required: false,
            doc,
        }
    }
}

/// A method a toolkit exposes as a tool. Names prefixed with `_` are
/// treated as internal and skipped by the loader.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: &'static str,
    pub doc: &'static str,
    pub params: Vec<ParamDecl>,
}

impl MethodDecl {
    pub fn new(name: &'static str, doc: &'static str, params: Vec<ParamDecl>) -> Self {
        Self { name, doc, params }
    }
}

// ---------------------------------------------------------------------------
// Tool specification (wire-facing output)
// ---------------------------------------------------------------------------

/// Parameter descriptor inside a [`ToolSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

/// Machine-readable description of a single tool, advertised to the model.
/// Pure data: it carries no reference to the toolkit that implements it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Render the parameter set as a JSON-Schema object for the wire.
    pub fn json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for p in &self.parameters {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), json!(p.kind.as_str()));
            if !p.description.is_empty() {
                prop.insert("description".into(), json!(p.description));
            }
            properties.insert(p.name.clone(), Value::Object(prop));
            if p.required {
                required.push(json!(p.name));
            }
        }

        let mut schema = serde_json::Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        Value::Object(schema)
    }
}

/// Build the specification for one declared method of a toolkit.
///
/// Descriptions are taken verbatim from the declaration docs; a missing doc
/// degrades to an empty string. An unmappable declared type is a load-time
/// failure identifying the offending toolkit, method and parameter.
pub fn build_spec(toolkit: &str, method: &MethodDecl) -> Result<ToolSpec, SchemaError> {
    let mut parameters = Vec::with_capacity(method.params.len());

    for p in &method.params {
        let kind = ParamKind::from_declared(p.declared).ok_or_else(|| {
            SchemaError::UnsupportedType {
                toolkit: toolkit.to_string(),
                method: method.name.to_string(),
                parameter: p.name.to_string(),
                declared: p.declared.to_string(),
            }
        })?;
        parameters.push(ParamSpec {
            name: p.name.to_string(),
            kind,
            required: p.required,
            description: p.doc.to_string(),
        });
    }

    Ok(ToolSpec {
        name: method.name.to_string(),
        description: method.doc.to_string(),
        parameters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_method() -> MethodDecl {
        MethodDecl::new(
            "get_current_weather",
            "Get the current weather for a given city.",
            vec![
                ParamDecl::required("city", "String", "The name of the city."),
                ParamDecl::optional("units", "String", "Unit system, metric by default."),
            ],
        )
    }

    #[test]
    fn kind_mapping_covers_supported_types() {
        assert_eq!(ParamKind::from_declared("i64"), Some(ParamKind::Integer));
        assert_eq!(ParamKind::from_declared("usize"), Some(ParamKind::Integer));
        assert_eq!(ParamKind::from_declared("f64"), Some(ParamKind::Number));
        assert_eq!(ParamKind::from_declared("bool"), Some(ParamKind::Boolean));
        assert_eq!(ParamKind::from_declared("String"), Some(ParamKind::String));
        assert_eq!(ParamKind::from_declared("&str"), Some(ParamKind::String));
        assert_eq!(
            ParamKind::from_declared("Vec<String>"),
            Some(ParamKind::Array)
        );
        assert_eq!(
            ParamKind::from_declared("Map<String, Value>"),
            Some(ParamKind::Object)
        );
        assert_eq!(ParamKind::from_declared("Value"), Some(ParamKind::Object));
    }

    #[test]
    fn unsupported_type_is_a_load_time_failure() {
        let method = MethodDecl::new(
            "read_file",
            "Read a file.",
            vec![ParamDecl::required("path", "PathBuf", "File path.")],
        );
        let err = build_spec("files", &method).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnsupportedType {
                toolkit: "files".into(),
                method: "read_file".into(),
                parameter: "path".into(),
                declared: "PathBuf".into(),
            }
        );
    }

    #[test]
    fn spec_reflects_declared_parameters() {
        let spec = build_spec("weather", &sample_method()).unwrap();
        assert_eq!(spec.name, "get_current_weather");
        assert_eq!(spec.parameters.len(), 2);
        assert!(spec.param("city").unwrap().required);
        assert!(!spec.param("units").unwrap().required);
        assert_eq!(spec.param("city").unwrap().kind, ParamKind::String);
    }

    #[test]
    fn missing_doc_degrades_to_empty_description() {
        let method = MethodDecl::new("ping", "", vec![]);
        let spec = build_spec("net", &method).unwrap();
        assert_eq!(spec.description, "");
        assert!(spec.parameters.is_empty());
    }

    #[test]
    fn json_schema_shape() {
        let spec = build_spec("weather", &sample_method()).unwrap();
        let schema = spec.json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["city"]["type"], "string");
        assert_eq!(
            schema["properties"]["city"]["description"],
            "The name of the city."
        );
        assert_eq!(schema["required"], serde_json::json!(["city"]));
    }

    #[test]
    fn spec_round_trips_through_the_wire_format() {
        let spec = build_spec("weather", &sample_method()).unwrap();
        let encoded = serde_json::to_string(&spec).unwrap();
        let decoded: ToolSpec = serde_json::from_str(&encoded).unwrap();
        assert_eq!(spec, decoded);
    }
}
