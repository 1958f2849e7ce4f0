//! The structural walk turning a nested struct into a flat list of leaves.

use std::rc::Rc;

use heck::ToUpperCamelCase;
use tracing::debug;

use crate::error::PlugfigError;
use crate::field::{Field, Fields, Root};
use crate::reflect::{FieldRef, Reflect};
use crate::registry::register_tag;
use crate::types::{FieldInfo, Shape};

const NAME_TAG: &str = "name";

/// Claim the `name` tag, which renames a field's segment.
pub(crate) fn register_tags() {
    register_tag::<Field>(NAME_TAG);
}

/// Build the flat view of `root`.
///
/// Leaves are listed in declaration order with nested structs expanded in
/// place. A nested struct adds one name segment; a flattened one adds none.
/// An empty nested `Option` contributes no fields.
pub fn view(root: &Root) -> Result<Fields, PlugfigError> {
    let guard = root.borrow();
    let target = guard.target_ref().ok_or(PlugfigError::UnexpectedType)?;

    let mut fields = Vec::new();
    walk(target, "", &mut Vec::new(), root, &mut fields);
    debug!(count = fields.len(), "built field view");
    Ok(fields)
}

fn walk(node: &dyn Reflect, prefix: &str, path: &mut Vec<usize>, root: &Root, out: &mut Fields) {
    for (index, info) in node.fields().iter().enumerate() {
        path.push(index);
        match info.shape {
            Shape::Leaf | Shape::Text => {
                out.push(Field::new(
                    join(prefix, &segment_name(info)),
                    prefix.to_string(),
                    *info,
                    path.clone(),
                    Rc::clone(root),
                ));
            }
            Shape::Nested | Shape::Flatten => {
                let child = match node.field_ref(index) {
                    Some(FieldRef::Nested(child)) => child.target_ref(),
                    _ => None,
                };
                if let Some(child) = child {
                    let child_prefix = match info.shape {
                        Shape::Flatten => prefix.to_string(),
                        _ => join(prefix, &title(&segment_name(info))),
                    };
                    walk(child, &child_prefix, path, root, out);
                }
            }
        }
        path.pop();
    }
}

/// The `name` tag (leading `.` stripped) or the identifier in UpperCamelCase.
fn segment_name(info: &FieldInfo) -> String {
    match info.tags.get(NAME_TAG).map(|n| n.trim_start_matches('.')) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => info.ident.to_upper_camel_case(),
    }
}

/// Upper-case the first character; prefix segments are always titled.
fn title(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
