//! The two-phase plugin protocol.
//!
//! A session first *inspects* every plugin in order: visitors receive the flat
//! field view, walkers receive the whole struct. Only when every inspection
//! succeeded is each plugin *parsed*, again in order, which is where values
//! are actually written. Later plugins therefore override earlier ones.

use std::fmt;
use std::path::Path;

use crate::error::PlugfigError;
use crate::field::{Fields, Root};

/// Anything that can be parsed as part of a session.
pub trait Source {
    /// Apply the source's values to the fields it captured during inspection.
    fn parse(&mut self) -> Result<(), PlugfigError>;
}

/// A plugin working on the flat field view (env vars, flags, defaults).
pub trait Visitor: Source {
    /// Inspect the fields. `Field` handles are cheap to clone and may be kept
    /// for the parse phase.
    fn visit(&mut self, fields: &Fields) -> Result<(), PlugfigError>;
}

/// A plugin working on the whole struct (config files).
pub trait Walker: Source {
    fn walk(&mut self, root: &Root) -> Result<(), PlugfigError>;

    /// The file this walker reads, listed in the usage output.
    fn file_path(&self) -> Option<&Path> {
        None
    }
}

/// A plugin together with the shape it participates in the session with.
pub enum Plugin {
    Visitor(Box<dyn Visitor>),
    Walker(Box<dyn Walker>),
    /// A bare source that cannot be inspected. Adding one makes the session
    /// fail with [`PlugfigError::UnsupportedPlugin`].
    Unsupported(Box<dyn Source>),
}

impl Plugin {
    pub fn visitor(visitor: impl Visitor + 'static) -> Self {
        Plugin::Visitor(Box::new(visitor))
    }

    pub fn walker(walker: impl Walker + 'static) -> Self {
        Plugin::Walker(Box::new(walker))
    }

    pub(crate) fn parse(&mut self) -> Result<(), PlugfigError> {
        match self {
            Plugin::Visitor(v) => v.parse(),
            Plugin::Walker(w) => w.parse(),
            Plugin::Unsupported(s) => s.parse(),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Plugin::Visitor(_) => "visitor",
            Plugin::Walker(_) => "walker",
            Plugin::Unsupported(_) => "unsupported",
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Plugin").field(&self.kind()).finish()
    }
}
