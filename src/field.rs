//! Addressable handles onto the leaves of a configuration struct.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::reflect::{FieldMut, FieldRef, Reflect, locate_mut, locate_ref};
use crate::types::{FieldInfo, Shape, Tags};
use crate::value::{Value, ValueError};

/// Shared handle to the configuration struct being populated.
pub type Root = Rc<RefCell<dyn Reflect>>;

/// Per-field metadata shared between plugins and the usage table.
///
/// Cloning a `Meta` clones the handle, not the map: every clone observes the
/// same entries.
#[derive(Clone, Default)]
pub struct Meta(Rc<RefCell<BTreeMap<String, String>>>);

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.0.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.0.borrow_mut().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.0.borrow_mut().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// A copy of the current entries.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.0.borrow().clone()
    }

    /// Whether two handles refer to the same map.
    pub fn same(a: &Meta, b: &Meta) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.borrow().iter()).finish()
    }
}

/// One leaf of the configuration struct.
#[derive(Clone)]
pub struct Field {
    name: String,
    prefix: String,
    info: FieldInfo,
    path: Vec<usize>,
    meta: Meta,
    root: Root,
}

impl Field {
    pub(crate) fn new(
        name: String,
        prefix: String,
        info: FieldInfo,
        path: Vec<usize>,
        root: Root,
    ) -> Self {
        Self {
            name,
            prefix,
            info,
            path,
            meta: Meta::new(),
            root,
        }
    }

    /// The dotted name, e.g. `Redis.Port`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dotted name of the enclosing struct, empty at top level.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The Rust identifier of the field.
    pub fn ident(&self) -> &'static str {
        self.info.ident
    }

    pub fn shape(&self) -> Shape {
        self.info.shape
    }

    pub fn tag(&self, key: &str) -> Option<&'static str> {
        self.info.tags.get(key)
    }

    pub fn tags(&self) -> Tags {
        self.info.tags
    }

    /// The metadata map. Every call returns a handle to the same map.
    pub fn meta(&self) -> Meta {
        self.meta.clone()
    }

    /// Resolve the name a plugin should use for this field.
    ///
    /// The tag value up to the first `,` is the requested name; whatever
    /// follows belongs to the plugin. Returns the name and whether it was
    /// given explicitly:
    ///
    /// * no tag, an empty name or `.`: the field name, not explicit.
    /// * `.rest`: `rest` placed under the field's prefix, not explicit.
    /// * anything else: used verbatim, explicit.
    pub fn name_for(&self, tag: &str) -> (String, bool) {
        let raw = self
            .tag(tag)
            .map(|value| value.split(',').next().unwrap_or_default())
            .unwrap_or_default();

        if raw.is_empty() || raw == "." {
            return (self.name.clone(), false);
        }

        match raw.strip_prefix('.') {
            Some(rest) if self.prefix.is_empty() => (rest.to_string(), false),
            Some(rest) => (format!("{}.{rest}", self.prefix), false),
            None => (raw.to_string(), true),
        }
    }

    /// The options following the name in a tag value, e.g. `required` in
    /// `flag = "port,required"`.
    pub fn tag_options(&self, tag: &str) -> Vec<&'static str> {
        match self.tag(tag).and_then(|value| value.split_once(',')) {
            Some((_, options)) => options
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }

    /// The current value of the field.
    ///
    /// # Panics
    ///
    /// Panics if the configuration struct is mutably borrowed elsewhere.
    pub fn get(&self) -> Value {
        let root = self.root.borrow();
        let Some(target) = root.target_ref() else {
            return Value::None;
        };
        match locate_ref(target, &self.path) {
            Some(FieldRef::Leaf(setting)) => setting.value(),
            Some(FieldRef::Text(text)) => Value::Text(text.encode_text()),
            Some(FieldRef::Nested(_)) | None => Value::None,
        }
    }

    /// Decode `text` into the field.
    ///
    /// Types with their own textual form are decoded through it; everything
    /// else follows the kind rules. Errors are returned as the decoder
    /// produced them.
    pub fn set(&self, text: &str) -> Result<(), ValueError> {
        self.with_mut(|field| match field {
            FieldMut::Leaf(setting) => setting.set_text(text),
            FieldMut::Text(decode) => decode.decode_text(text),
            FieldMut::Nested(_) => Ok(()),
        })?
    }

    /// Store an already-split list of items, as produced by structured
    /// sources such as config file arrays.
    pub fn set_items(&self, items: &[&str]) -> Result<(), ValueError> {
        self.with_mut(|field| match field {
            FieldMut::Leaf(setting) => setting.set_items(items),
            FieldMut::Text(decode) => decode.decode_text(&items.join(",")),
            FieldMut::Nested(_) => Ok(()),
        })?
    }

    /// Run `f` with direct mutable access to the field.
    pub fn with_mut<R>(&self, f: impl FnOnce(FieldMut<'_>) -> R) -> Result<R, ValueError> {
        let mut root = self.root.borrow_mut();
        let field = root
            .target_mut()
            .and_then(|target| locate_mut(target, &self.path))
            .ok_or_else(|| ValueError::Unreachable(self.name.clone()))?;
        Ok(f(field))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("shape", &self.info.shape)
            .field("tags", &self.info.tags)
            .field("meta", &self.meta)
            .finish()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.get())
    }
}

/// The flat, ordered view of every leaf.
pub type Fields = Vec<Field>;
