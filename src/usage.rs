//! Usage table rendering.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::field::Fields;
use crate::registry::register_tag;

const USAGE_TAG: &str = "usage";
const PADDING: usize = 4;

/// Owner of the `usage` tag.
struct UsageTable;

pub(crate) fn register_tags() {
    register_tag::<UsageTable>(USAGE_TAG);
}

fn weight(column: &str) -> u8 {
    match column {
        "field" => 1,
        "flag" => 3,
        "env" => 4,
        USAGE_TAG => 99,
        _ => 98,
    }
}

/// Render every field with the metadata plugins recorded for it.
///
/// The `usage` tag of each field is copied into its metadata first. Columns
/// are the field name, then `flag`, `env`, any other metadata key in
/// alphabetical order, and finally `usage`.
pub fn usage_table(fields: &Fields, files: &[PathBuf]) -> String {
    for field in fields {
        if let Some(usage) = field.tag(USAGE_TAG) {
            field.meta().insert(USAGE_TAG, usage);
        }
    }

    let mut keys: BTreeSet<String> = fields.iter().flat_map(|f| f.meta().keys()).collect();
    keys.insert("field".to_string());
    let mut headers: Vec<String> = keys.into_iter().collect();
    headers.sort_by_key(|h| weight(h));

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(fields.len() + 2);
    rows.push(headers.iter().map(|h| h.to_uppercase()).collect());
    rows.push(
        headers
            .iter()
            .map(|h| "-".repeat(h.chars().count().max(5)))
            .collect(),
    );
    for field in fields {
        let meta = field.meta().snapshot();
        let mut row = vec![field.name().to_string()];
        row.extend(
            headers[1..]
                .iter()
                .map(|h| meta.get(h).cloned().unwrap_or_default()),
        );
        rows.push(row);
    }

    let widths: Vec<usize> = (0..headers.len())
        .map(|column| {
            rows.iter()
                .map(|row| row[column].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::from("\nSupported Fields:\n");
    for row in &rows {
        let mut line = String::new();
        for (column, cell) in row.iter().enumerate() {
            if column + 1 == row.len() {
                line.push_str(cell);
            } else {
                let _ = write!(line, "{cell:<width$}", width = widths[column] + PADDING);
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    if !files.is_empty() {
        out.push_str("\nConfiguration Files:\n");
        for path in files {
            let _ = writeln!(out, "    {}", path.display());
        }
    }

    out
}
