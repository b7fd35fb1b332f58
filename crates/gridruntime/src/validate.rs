use gridcore::{EngineError, InputSchema, ParamKind, Value};
use std::collections::HashMap;

/// Validate raw inputs against a schema and fill in defaults
///
/// Emptiness means absent, null, or a zero-length string; grids, lists and
/// maps are never emptiness-checked. An empty required parameter takes the
/// schema default, then the first entry of a `Choice` kind; if it is still
/// empty and declared as a string, the run fails naming the parameter.
/// Every declared parameter appears in the output.
pub fn validate_inputs(
    schema: &InputSchema,
    raw: &HashMap<String, Value>,
    node_id: &str,
) -> Result<HashMap<String, Value>, EngineError> {
    let mut prepared = HashMap::new();

    for spec in &schema.required {
        let mut value = raw.get(&spec.name).cloned();

        if is_empty(&value) {
            if let Some(default) = &spec.default {
                value = Some(Value::from_json(default.clone()));
            } else if let ParamKind::Choice(options) = &spec.kind {
                value = options.first().map(|first| Value::Str(first.clone()));
            }
        }

        if is_empty(&value) && spec.kind == ParamKind::Str {
            return Err(EngineError::MissingRequired {
                node_id: node_id.to_string(),
                param: spec.name.clone(),
            });
        }

        prepared.insert(spec.name.clone(), value.unwrap_or(Value::Null));
    }

    for spec in &schema.optional {
        let supplied = raw.get(&spec.name).cloned().filter(|v| !v.is_null());
        let value = match (supplied, &spec.default) {
            (Some(v), _) => v,
            (None, Some(default)) => Value::from_json(default.clone()),
            (None, None) => Value::Null,
        };
        prepared.insert(spec.name.clone(), value);
    }

    // Best-effort numeric coercion; failures keep the original value.
    for spec in schema.params() {
        if let Some(value) = prepared.get(&spec.name) {
            if let Some(coerced) = coerce(value, &spec.kind) {
                prepared.insert(spec.name.clone(), coerced);
            }
        }
    }

    Ok(prepared)
}

fn is_empty(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Str(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn coerce(value: &Value, kind: &ParamKind) -> Option<Value> {
    match (kind, value) {
        (ParamKind::Int, Value::Str(s)) => s.trim().parse::<i64>().ok().map(Value::Int),
        (ParamKind::Int, Value::Float(f)) => Some(Value::Int(*f as i64)),
        (ParamKind::Float, Value::Str(s)) => s.trim().parse::<f64>().ok().map(Value::Float),
        (ParamKind::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
        _ => None,
    }
}
