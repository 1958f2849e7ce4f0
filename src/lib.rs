//! Bind configuration onto plain Rust structs from any number of sources.
//!
//! Derive [`Reflect`] on a struct, annotate fields with tags, and hand an
//! ordered list of plugins to a [`Plugfig`] session:
//!
//! ```ignore
//! use plugfig::{Defaults, Env, Plugfig, Reflect};
//!
//! #[derive(Reflect, Default, Clone)]
//! struct Redis {
//!     #[plugfig(default = "localhost", env = "REDIS_HOST")]
//!     host: String,
//!     #[plugfig(default = "6379", usage = "redis port")]
//!     port: u16,
//! }
//!
//! let redis: Redis = Plugfig::new([Defaults::new().into(), Env::new().into()]).parse()?;
//! ```
//!
//! Most applications want the standard chain, which the builder assembles:
//!
//! ```ignore
//! let config: AppConfig = Plugfig::builder()
//!     .optional_file("/etc/myapp.toml", Format::Toml)
//!     .env_prefix("MYAPP")
//!     .process_args()
//!     .load()?;
//! ```
//!
//! # Fields
//!
//! The session walks the struct once and produces a flat list of leaf
//! [`Field`]s in declaration order. Each has a dotted name (`Redis.Port`),
//! its tags, and a shared [`Meta`] map where plugins record how the field
//! is bound (its env var, its flag). Nested structs contribute a name
//! segment; `#[plugfig(flatten)]` structs contribute their fields under the
//! parent's prefix. A `name` tag overrides a field's segment.
//!
//! # Plugins
//!
//! A plugin is either a [`Visitor`], which is handed the field list, or a
//! [`Walker`], which is handed the root struct. Both implement [`Source`],
//! whose `parse` applies values. Inspection runs every plugin's visit or
//! walk once, in order; parsing then runs every `parse` in the same order,
//! so later plugins override earlier ones. Both phases stop at the first
//! error.
//!
//! Each plugin owns one tag. Registering the same tag from a second plugin
//! type panics, since two plugins interpreting one tag differently is a
//! programming error.
//!
//! # Usage
//!
//! [`Plugfig::usage`] renders the collected metadata as a table:
//!
//! ```text
//! Supported Fields:
//! FIELD        FLAG           ENV           DEFAULT    USAGE
//! -----        -----          -----         -------    -----
//! Redis.Port   --redis-port   REDIS_PORT    6379       redis port
//! ```
//!
//! # Cargo features
//!
//! * `derive` (default): re-exports the [`Reflect`] derive macro.
//! * `clap` (default): the [`Flag`] plugin and command-line chains.

extern crate self as plugfig;

pub mod error;
pub mod plugins;
pub mod types;
pub mod value;

mod builder;
mod config;
mod field;
mod plugin;
mod reflect;
mod registry;
mod usage;
mod view;

#[cfg(test)]
mod fixtures;

pub use builder::PlugfigBuilder;
pub use config::{Plugfig, defaults};
pub use error::PlugfigError;
pub use field::{Field, Fields, Meta, Root};
pub use plugin::{Plugin, Source, Visitor, Walker};
pub use reflect::{FieldMut, FieldRef, Reflect};
pub use registry::{TagRegistry, register_tag, tag_owner};
pub use types::{FieldInfo, Shape, Tags};
pub use usage::usage_table;
pub use value::{Setting, TextDecode, Value, ValueError};
pub use view::view;

pub use plugins::dapi::Dapi;
pub use plugins::defaults::Defaults;
pub use plugins::env::Env;
pub use plugins::file::{File, FileSpec, Files, Format};
#[cfg(feature = "clap")]
pub use plugins::flag::Flag;
pub use plugins::required::Required;
pub use plugins::secret::Secret;

#[cfg(feature = "derive")]
pub use plugfig_derive::Reflect;
