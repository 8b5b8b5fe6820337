//! Tool input schemas: one definition drives both the JSON Schema advertised
//! in `tools/list` and the validation applied in `tools/call`.

use serde_json::{json, Map, Value};

use crate::error::{Error, FieldViolation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
}

impl FieldType {
    fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
        }
    }

    fn accepts(self, v: &Value) -> bool {
        match self {
            FieldType::String => v.is_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub struct InputSchema {
    pub fields: Vec<FieldSpec>,
}

/// Input shared by both release tools: `owner` and optional `repository`.
pub fn action_release_schema() -> InputSchema {
    InputSchema {
        fields: vec![
            FieldSpec {
                name: "owner",
                ty: FieldType::String,
                description: "Repository owner (username or organization)",
                required: true,
            },
            FieldSpec {
                name: "repository",
                ty: FieldType::String,
                description: "The name of the repository",
                required: false,
            },
        ],
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl InputSchema {
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| {
                (
                    f.name.to_string(),
                    json!({ "type": f.ty.as_str(), "description": f.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
            "$schema": "http://json-schema.org/draft-07/schema#",
        })
    }

    /// Check `args` and return only the declared fields; unknown keys are dropped.
    /// Every violation is reported, not just the first.
    pub fn validate(&self, args: &Value) -> Result<Map<String, Value>, Vec<FieldViolation>> {
        let Some(obj) = args.as_object() else {
            return Err(vec![FieldViolation {
                code: "invalid_type".into(),
                expected: "object".into(),
                received: json_type_name(args).into(),
                path: vec![],
                message: format!("Expected object, received {}", json_type_name(args)),
            }]);
        };

        let mut violations = Vec::new();
        let mut out = Map::new();
        for field in &self.fields {
            match obj.get(field.name) {
                None if field.required => violations.push(FieldViolation {
                    code: "invalid_type".into(),
                    expected: field.ty.as_str().into(),
                    received: "undefined".into(),
                    path: vec![field.name.to_string()],
                    message: "Required".into(),
                }),
                None => {}
                Some(v) if field.ty.accepts(v) => {
                    out.insert(field.name.to_string(), v.clone());
                }
                Some(v) => violations.push(FieldViolation {
                    code: "invalid_type".into(),
                    expected: field.ty.as_str().into(),
                    received: json_type_name(v).into(),
                    path: vec![field.name.to_string()],
                    message: format!(
                        "Expected {}, received {}",
                        field.ty.as_str(),
                        json_type_name(v)
                    ),
                }),
            }
        }
        if violations.is_empty() {
            Ok(out)
        } else {
            Err(violations)
        }
    }

    /// Validate and deserialize into `T`.
    pub fn parse<T: serde::de::DeserializeOwned>(&self, args: &Value) -> Result<T, Error> {
        let cleaned = self.validate(args).map_err(Error::InvalidInput)?;
        Ok(serde_json::from_value(Value::Object(cleaned))?)
    }
}
