/// How the field view treats a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A value decoded through the [`Setting`](crate::Setting) kind rules.
    Leaf,
    /// A value decoded through its [`TextDecode`](crate::TextDecode) impl.
    Text,
    /// A nested struct contributing one name segment.
    Nested,
    /// An embedded struct whose fields are lifted into the parent.
    Flatten,
}

impl Shape {
    pub fn is_struct(self) -> bool {
        matches!(self, Shape::Nested | Shape::Flatten)
    }
}

/// Read-only key/value annotations declared on a field.
///
/// The key set is open: every plugin family owns its own keys (see
/// [`registry`](crate::registry)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tags(&'static [(&'static str, &'static str)]);

impl Tags {
    pub const EMPTY: Tags = Tags(&[]);

    pub const fn new(pairs: &'static [(&'static str, &'static str)]) -> Self {
        Tags(pairs)
    }

    /// Look up a tag. An empty key never matches.
    pub fn get(&self, key: &str) -> Option<&'static str> {
        if key.is_empty() {
            return None;
        }
        self.0.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Static description of one declared field, produced by `#[derive(Reflect)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// The Rust identifier, without any `r#` prefix.
    pub ident: &'static str,
    pub shape: Shape,
    pub tags: Tags,
}

impl FieldInfo {
    pub const fn new(ident: &'static str, shape: Shape, tags: Tags) -> Self {
        Self { ident, shape, tags }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAGS: Tags = Tags::new(&[("default", "6379"), ("env", "REDIS_PORT")]);

    #[test]
    fn get_finds_declared_tag() {
        assert_eq!(TAGS.get("default"), Some("6379"));
        assert_eq!(TAGS.get("env"), Some("REDIS_PORT"));
        assert_eq!(TAGS.get("flag"), None);
    }

    #[test]
    fn empty_key_never_matches() {
        const ODD: Tags = Tags::new(&[("", "value")]);
        assert_eq!(ODD.get(""), None);
    }

    #[test]
    fn empty_tag_value_is_still_present() {
        const SECRET: Tags = Tags::new(&[("secret", "")]);
        assert!(SECRET.contains("secret"));
        assert_eq!(SECRET.get("secret"), Some(""));
    }

    #[test]
    fn shape_struct_kinds() {
        assert!(Shape::Nested.is_struct());
        assert!(Shape::Flatten.is_struct());
        assert!(!Shape::Leaf.is_struct());
        assert!(!Shape::Text.is_struct());
    }
}
