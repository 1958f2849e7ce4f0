//! Kubernetes downward-API files, for fields tagged `dapi = "file:key"`.
//!
//! The downward API projects pod labels and annotations as files of
//! `key="value"` lines under a mount point. `file` names such a file under the
//! plugin's base directory and `key` the entry inside it. Keys are matched
//! ignoring case; a key absent from its file leaves the field untouched.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::PlugfigError;
use crate::field::{Field, Fields};
use crate::plugin::{Plugin, Source, Visitor};
use crate::registry::register_tag;

const TAG: &str = "dapi";

#[derive(Debug)]
pub struct Dapi {
    base: PathBuf,
    bindings: Vec<Binding>,
}

#[derive(Debug)]
struct Binding {
    field: Field,
    file: String,
    key: String,
}

impl Dapi {
    /// Read files under `base`, typically the downward-API volume mount.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        register_tag::<Self>(TAG);
        Self {
            base: base.into(),
            bindings: Vec::new(),
        }
    }

    fn load(&self, file: &str) -> Result<HashMap<String, String>, PlugfigError> {
        let path = self.base.join(file);
        let content = std::fs::read_to_string(&path).map_err(|source| PlugfigError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "loaded downward-API file");
        Ok(parse_entries(&content))
    }
}

/// Split a `file:key` tag.
fn split_tag(tag: &str) -> Option<(&str, &str)> {
    let (file, key) = tag.split_once(':')?;
    if file.is_empty() || key.is_empty() || key.contains(':') {
        return None;
    }
    Some((file, key))
}

/// Parse `key=value` / `key="value"` lines. Keys are lower-cased; blank
/// lines and comments are skipped. Only the leading, unnamed section is
/// read: entries after the first `[section]` header are ignored.
fn parse_entries(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .take_while(|line| !line.starts_with('['))
        .filter(|line| !line.is_empty() && !line.starts_with(['#', ';']))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_lowercase(), unquote(value.trim())))
        .collect()
}

fn unquote(value: &str) -> String {
    match value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}

impl Visitor for Dapi {
    fn visit(&mut self, fields: &Fields) -> Result<(), PlugfigError> {
        self.bindings.clear();
        for field in fields {
            let Some(tag) = field.tag(TAG) else {
                continue;
            };
            let (file, key) = split_tag(tag).ok_or_else(|| PlugfigError::InvalidTag {
                tag: TAG,
                field: field.name().to_string(),
                reason: format!("expecting `file:key`, got {tag:?}"),
            })?;
            field.meta().insert(TAG, tag);
            self.bindings.push(Binding {
                field: field.clone(),
                file: file.to_string(),
                key: key.to_lowercase(),
            });
        }
        Ok(())
    }
}

impl Source for Dapi {
    fn parse(&mut self) -> Result<(), PlugfigError> {
        let mut files: BTreeMap<&str, HashMap<String, String>> = BTreeMap::new();
        for binding in &self.bindings {
            if !files.contains_key(binding.file.as_str()) {
                files.insert(&binding.file, self.load(&binding.file)?);
            }
        }

        for binding in &self.bindings {
            let Some(value) = files
                .get(binding.file.as_str())
                .and_then(|entries| entries.get(&binding.key))
            else {
                trace!(
                    field = binding.field.name(),
                    key = binding.key.as_str(),
                    "downward-API key absent"
                );
                continue;
            };
            binding.field.set(value).map_err(|e| {
                PlugfigError::invalid_field(
                    binding.field.name(),
                    format!("dapi {}:{}", binding.file, binding.key),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

impl From<Dapi> for Plugin {
    fn from(dapi: Dapi) -> Self {
        Plugin::visitor(dapi)
    }
}
