//! The reflection surface the field view is built on.
//!
//! A configuration struct describes itself through [`Reflect`]: a static table
//! of [`FieldInfo`] plus indexed accessors handing out each field either as a
//! leaf ([`Setting`] or [`TextDecode`]) or as another `Reflect` node. The
//! `#[derive(Reflect)]` macro writes these impls; hand-written impls are fine
//! as long as the indices line up with the table.

use crate::types::FieldInfo;
use crate::value::{Setting, TextDecode};

/// Mutable access to one declared field.
pub enum FieldMut<'a> {
    Leaf(&'a mut dyn Setting),
    Text(&'a mut dyn TextDecode),
    Nested(&'a mut dyn Reflect),
}

/// Shared access to one declared field.
pub enum FieldRef<'a> {
    Leaf(&'a dyn Setting),
    Text(&'a dyn TextDecode),
    Nested(&'a dyn Reflect),
}

/// A struct that can be walked field by field.
pub trait Reflect {
    /// The declared (non-skipped) fields, in declaration order.
    fn fields(&self) -> &'static [FieldInfo];

    /// The field at `index` in [`fields`](Reflect::fields).
    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>>;

    fn field_ref(&self, index: usize) -> Option<FieldRef<'_>>;

    /// Resolve indirection down to the struct that owns the fields.
    ///
    /// Structs return themselves; `Box` forwards; an empty `Option` has no
    /// target, which the field view reports as an unexpected type.
    fn target_mut(&mut self) -> Option<&mut dyn Reflect>;

    fn target_ref(&self) -> Option<&dyn Reflect>;
}

impl<T: Reflect> Reflect for Box<T> {
    fn fields(&self) -> &'static [FieldInfo] {
        (**self).fields()
    }

    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
        (**self).field_mut(index)
    }

    fn field_ref(&self, index: usize) -> Option<FieldRef<'_>> {
        (**self).field_ref(index)
    }

    fn target_mut(&mut self) -> Option<&mut dyn Reflect> {
        (**self).target_mut()
    }

    fn target_ref(&self) -> Option<&dyn Reflect> {
        (**self).target_ref()
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn fields(&self) -> &'static [FieldInfo] {
        match self {
            Some(inner) => inner.fields(),
            None => &[],
        }
    }

    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
        self.as_mut()?.field_mut(index)
    }

    fn field_ref(&self, index: usize) -> Option<FieldRef<'_>> {
        self.as_ref()?.field_ref(index)
    }

    fn target_mut(&mut self) -> Option<&mut dyn Reflect> {
        self.as_mut()?.target_mut()
    }

    fn target_ref(&self) -> Option<&dyn Reflect> {
        self.as_ref()?.target_ref()
    }
}

/// Follow an index path from a resolved struct down to a field.
pub(crate) fn locate_mut<'a>(node: &'a mut dyn Reflect, path: &[usize]) -> Option<FieldMut<'a>> {
    let (&index, rest) = path.split_first()?;
    let field = node.field_mut(index)?;
    if rest.is_empty() {
        return Some(field);
    }
    match field {
        FieldMut::Nested(child) => locate_mut(child.target_mut()?, rest),
        _ => None,
    }
}

pub(crate) fn locate_ref<'a>(node: &'a dyn Reflect, path: &[usize]) -> Option<FieldRef<'a>> {
    let (&index, rest) = path.split_first()?;
    let field = node.field_ref(index)?;
    if rest.is_empty() {
        return Some(field);
    }
    match field {
        FieldRef::Nested(child) => locate_ref(child.target_ref()?, rest),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{Host, Rethink};

    #[test]
    fn derived_table_matches_declaration_order() {
        let rethink = Rethink::default();
        let idents: Vec<_> = rethink.fields().iter().map(|f| f.ident).collect();
        assert_eq!(idents, ["host", "db", "password"]);
    }

    #[test]
    fn locate_reaches_nested_leaf() {
        let mut rethink = Rethink::default();
        match locate_mut(&mut rethink, &[0, 1]) {
            Some(FieldMut::Leaf(port)) => port.set_text("28015").unwrap(),
            _ => panic!("expected a leaf"),
        }
        assert_eq!(rethink.host.port, "28015");
    }

    #[test]
    fn locate_rejects_path_through_leaf() {
        let mut host = Host::default();
        assert!(locate_mut(&mut host, &[0, 0]).is_none());
        assert!(locate_ref(&host, &[7]).is_none());
    }

    #[test]
    fn empty_option_has_no_target() {
        let mut missing: Option<Host> = None;
        assert!(missing.target_mut().is_none());
        assert!(missing.fields().is_empty());

        let boxed = Box::new(Host::default());
        assert!(boxed.target_ref().is_some());
    }
}
