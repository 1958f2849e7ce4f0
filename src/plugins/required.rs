//! Presence checks from the `required` tag.

use crate::error::PlugfigError;
use crate::field::Fields;
use crate::plugin::{Plugin, Source, Visitor};
use crate::registry::register_tag;

const TAG: &str = "required";

/// Fails the session when a field tagged `required = "true"` still holds its
/// zero value at parse time. Add it after the plugins that supply values.
#[derive(Debug)]
pub struct Required {
    fields: Fields,
}

impl Required {
    pub fn new() -> Self {
        register_tag::<Self>(TAG);
        Self { fields: Fields::new() }
    }
}

impl Default for Required {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for Required {
    fn visit(&mut self, fields: &Fields) -> Result<(), PlugfigError> {
        self.fields = fields.clone();
        for field in fields {
            if let Some(value) = field.tag(TAG) {
                field.meta().insert(TAG, value);
            }
        }
        Ok(())
    }
}

impl Source for Required {
    fn parse(&mut self) -> Result<(), PlugfigError> {
        for field in &self.fields {
            if field.tag(TAG) == Some("true") && field.get().is_zero() {
                return Err(PlugfigError::Required {
                    field: field.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl From<Required> for Plugin {
    fn from(required: Required) -> Self {
        Plugin::visitor(required)
    }
}
