//! Applying a decoded document tree onto a configuration struct.
//!
//! Keys match fields by their `name` tag, Rust identifier or UpperCamelCase
//! name, compared without regard to case, `_` or `-`: `pool_size`,
//! `PoolSize` and `pool-size` all reach the same field. Tables descend into
//! nested structs; flattened structs are searched as part of their parent.

use std::path::Path;

use heck::ToUpperCamelCase;
use serde_json::{Map, Value as Tree};
use tracing::trace;

use crate::error::PlugfigError;
use crate::reflect::{FieldMut, FieldRef, Reflect, locate_mut};
use crate::types::{FieldInfo, Shape};

/// How to treat keys that match no field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownKeys {
    #[default]
    Ignore,
    Reject,
}

/// Convert a TOML document into the common tree representation.
pub fn toml_to_tree(value: toml::Value) -> Tree {
    match value {
        toml::Value::String(s) => Tree::String(s),
        toml::Value::Integer(i) => Tree::from(i),
        // `inf` and `nan` have no JSON number form; their text still parses.
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Tree::Number)
            .unwrap_or_else(|| Tree::String(f.to_string())),
        toml::Value::Boolean(b) => Tree::Bool(b),
        toml::Value::Datetime(dt) => Tree::String(dt.to_string()),
        toml::Value::Array(items) => Tree::Array(items.into_iter().map(toml_to_tree).collect()),
        toml::Value::Table(table) => Tree::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_tree(value)))
                .collect(),
        ),
    }
}

/// Apply `table` onto `node`. `source` names the document in errors.
pub fn apply(
    node: &mut dyn Reflect,
    table: &Map<String, Tree>,
    source: &Path,
    unknown: UnknownKeys,
) -> Result<(), PlugfigError> {
    apply_at(node, table, "", source, unknown)
}

fn apply_at(
    node: &mut dyn Reflect,
    table: &Map<String, Tree>,
    trail: &str,
    source: &Path,
    unknown: UnknownKeys,
) -> Result<(), PlugfigError> {
    for (key, value) in table {
        let dotted = if trail.is_empty() {
            key.clone()
        } else {
            format!("{trail}.{key}")
        };

        let Some(path) = find_key(node, key) else {
            if unknown == UnknownKeys::Reject {
                return Err(PlugfigError::UnknownKey {
                    key: dotted,
                    path: source.to_path_buf(),
                });
            }
            trace!(key = dotted.as_str(), "ignoring unknown key");
            continue;
        };

        if value.is_null() {
            continue;
        }

        let Some(field) = locate_mut(node, &path) else {
            continue;
        };
        let invalid = |e| PlugfigError::invalid_field(&dotted, source.display().to_string(), e);

        match (field, value) {
            (FieldMut::Nested(child), Tree::Object(inner)) => {
                // An empty optional struct has nothing to fill.
                if let Some(child) = child.target_mut() {
                    apply_at(child, inner, &dotted, source, unknown)?;
                }
            }
            (FieldMut::Nested(_), _) => {
                return Err(PlugfigError::Parse {
                    path: source.to_path_buf(),
                    reason: format!("expected a table for '{dotted}'"),
                });
            }
            (_, Tree::Object(_)) => {
                return Err(PlugfigError::Parse {
                    path: source.to_path_buf(),
                    reason: format!("expected a value for '{dotted}', found a table"),
                });
            }
            (FieldMut::Leaf(setting), Tree::Array(items)) => {
                let items = scalars(items, &dotted, source)?;
                let items: Vec<&str> = items.iter().map(String::as_str).collect();
                setting.set_items(&items).map_err(invalid)?;
            }
            (FieldMut::Text(decode), Tree::Array(items)) => {
                let items = scalars(items, &dotted, source)?;
                decode.decode_text(&items.join(",")).map_err(invalid)?;
            }
            (FieldMut::Leaf(setting), scalar) => {
                setting.set_text(&scalar_text(scalar)).map_err(invalid)?;
            }
            (FieldMut::Text(decode), scalar) => {
                decode.decode_text(&scalar_text(scalar)).map_err(invalid)?;
            }
        }
    }
    Ok(())
}

/// The index path of the field `key` refers to, searching flattened structs
/// after the node's own fields.
fn find_key(node: &dyn Reflect, key: &str) -> Option<Vec<usize>> {
    let wanted = normalize(key);
    let fields = node.fields();

    if let Some(index) = fields
        .iter()
        .position(|info| info.shape != Shape::Flatten && matches_key(info, &wanted))
    {
        return Some(vec![index]);
    }

    for (index, info) in fields.iter().enumerate() {
        if info.shape != Shape::Flatten {
            continue;
        }
        let Some(FieldRef::Nested(child)) = node.field_ref(index) else {
            continue;
        };
        if let Some(mut rest) = child.target_ref().and_then(|child| find_key(child, key)) {
            rest.insert(0, index);
            return Some(rest);
        }
    }
    None
}

fn matches_key(info: &FieldInfo, wanted: &str) -> bool {
    let named = info
        .tags
        .get("name")
        .map(|name| name.trim_start_matches('.'))
        .filter(|name| !name.is_empty());
    normalize(info.ident) == wanted
        || normalize(&info.ident.to_upper_camel_case()) == wanted
        || named.is_some_and(|name| normalize(name) == wanted)
}

fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn scalar_text(value: &Tree) -> String {
    match value {
        Tree::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn scalars(items: &[Tree], key: &str, source: &Path) -> Result<Vec<String>, PlugfigError> {
    items
        .iter()
        .map(|item| match item {
            Tree::Array(_) | Tree::Object(_) => Err(PlugfigError::Parse {
                path: source.to_path_buf(),
                reason: format!("nested collections are not supported for '{key}'"),
            }),
            scalar => Ok(scalar_text(scalar)),
        })
        .collect()
}
