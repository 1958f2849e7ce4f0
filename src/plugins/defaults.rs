//! Compiled-in defaults from the `default` tag.

use tracing::trace;

use crate::error::PlugfigError;
use crate::field::Fields;
use crate::plugin::{Plugin, Source, Visitor};
use crate::registry::register_tag;

const TAG: &str = "default";

/// Sets every field carrying a `default` tag to the tag value.
#[derive(Debug)]
pub struct Defaults {
    fields: Fields,
}

impl Defaults {
    pub fn new() -> Self {
        register_tag::<Self>(TAG);
        Self { fields: Fields::new() }
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for Defaults {
    fn parse(&mut self) -> Result<(), PlugfigError> {
        for field in &self.fields {
            let Some(value) = field.tag(TAG) else {
                continue;
            };
            trace!(field = field.name(), value, "applying default");
            field
                .set(value)
                .map_err(|e| PlugfigError::invalid_field(field.name(), "default tag", e))?;
        }
        Ok(())
    }
}

impl Visitor for Defaults {
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

impl From<Defaults> for Plugin {
    fn from(defaults: Defaults) -> Self {
        Plugin::visitor(defaults)
    }
}
