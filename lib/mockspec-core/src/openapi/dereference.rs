use jsonptr::Pointer;
use jsonptr::resolve::Resolve;
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

use crate::MockError;

const REF_KEY: &str = "$ref";

/// Replaces every local `$ref` of the document by the value it points to.
///
/// References are followed transitively, so a reference to a reference ends up
/// as the final value. Keys next to a `$ref` are merged over the resolved
/// object. A reference back to one of its own ancestors (a recursive schema
/// like `Node.children: [Node]`) is kept as is: value generation follows it
/// later, bounded by the maximum depth. An acyclic document comes out without
/// any reference, which makes this a fixed point.
///
/// # Errors
///
/// Fails on a remote reference, on a pointer targeting a missing path, and on
/// a cycle made of references only (`A -> B -> A`).
///
/// # Example
///
/// ```rust
/// use mockspec_core::openapi::dereference;
/// use serde_json::json;
///
/// let document = json!({
///     "definitions": { "Id": { "type": "string" } },
///     "schema": { "$ref": "#/definitions/Id" }
/// });
///
/// let resolved = dereference(document)?;
/// assert_eq!(resolved["schema"], json!({ "type": "string" }));
/// # Ok::<(), mockspec_core::MockError>(())
/// ```
pub fn dereference(document: Value) -> Result<Value, MockError> {
    let mut stack = Vec::new();
    resolve_node(&document, &document, &mut stack, 0)
}

/// Resolves a node.
///
/// `stack` holds the references being resolved, the ones from `chain_start`
/// were followed without entering any object or array.
fn resolve_node(
    root: &Value,
    node: &Value,
    stack: &mut Vec<String>,
    chain_start: usize,
) -> Result<Value, MockError> {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get(REF_KEY) {
                return resolve_reference(root, reference, map, stack, chain_start);
            }
            let mut resolved = Map::with_capacity(map.len());
            for (key, value) in map {
                let chain_start = stack.len();
                resolved.insert(key.clone(), resolve_node(root, value, stack, chain_start)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(values) => values
            .iter()
            .map(|value| {
                let chain_start = stack.len();
                resolve_node(root, value, stack, chain_start)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => Ok(node.clone()),
    }
}

fn resolve_reference(
    root: &Value,
    reference: &str,
    node: &Map<String, Value>,
    stack: &mut Vec<String>,
    chain_start: usize,
) -> Result<Value, MockError> {
    if let Some(position) = stack.iter().position(|seen| seen == reference) {
        if position >= chain_start {
            return Err(MockError::CircularReference {
                reference: reference.to_string(),
            });
        }
        return Ok(Value::Object(node.clone()));
    }

    let target = lookup(root, reference)?;
    stack.push(reference.to_string());
    let resolved = resolve_node(root, target, stack, chain_start);
    stack.pop();
    let mut resolved = resolved?;

    let siblings = node.iter().filter(|(key, _)| *key != REF_KEY);
    if let Value::Object(target) = &mut resolved {
        for (key, value) in siblings {
            let chain_start = stack.len();
            target.insert(key.clone(), resolve_node(root, value, stack, chain_start)?);
        }
    }
    Ok(resolved)
}

/// Finds the value targeted by a local reference.
pub(crate) fn lookup<'a>(root: &'a Value, reference: &str) -> Result<&'a Value, MockError> {
    let Some(fragment) = reference.strip_prefix('#') else {
        return Err(MockError::RemoteReference {
            reference: reference.to_string(),
        });
    };

    let not_found = |message: String| MockError::ReferenceNotFound {
        reference: reference.to_string(),
        message,
    };

    let fragment = percent_decode_str(fragment)
        .decode_utf8()
        .map_err(|err| not_found(err.to_string()))?;
    let pointer = Pointer::parse(&fragment).map_err(|err| not_found(err.to_string()))?;
    root.resolve(pointer).map_err(|err| not_found(err.to_string()))
}
