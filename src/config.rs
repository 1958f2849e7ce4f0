//! The session orchestrator.

use std::cell::{Ref, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::PlugfigError;
use crate::field::{Fields, Root};
use crate::plugin::Plugin;
use crate::plugins::defaults::Defaults;
use crate::reflect::Reflect;
use crate::usage::usage_table;
use crate::view::view;

struct Entry {
    plugin: Plugin,
    inspected: bool,
}

/// Populates a `T` from an ordered list of plugins.
///
/// ```ignore
/// let mut config = Plugfig::<AppConfig>::new([Defaults::new().into(), Env::new().into()]);
/// let app = config.parse()?;
/// ```
///
/// Plugins run in the order they were added, so later plugins override
/// values set by earlier ones. The struct is walked on first use; a type the
/// field view cannot handle surfaces as [`PlugfigError::UnexpectedType`] from
/// that first call.
pub struct Plugfig<T> {
    value: Rc<RefCell<T>>,
    root: Root,
    fields: Option<Fields>,
    plugins: Vec<Entry>,
}

impl<T: Reflect + 'static> Plugfig<T> {
    /// Start from `T::default()`.
    pub fn new(plugins: impl IntoIterator<Item = Plugin>) -> Self
    where
        T: Default,
    {
        Self::with_value(T::default(), plugins)
    }

    /// Start from an existing value; fields no plugin touches keep it.
    pub fn with_value(value: T, plugins: impl IntoIterator<Item = Plugin>) -> Self {
        crate::view::register_tags();
        crate::usage::register_tags();
        let value = Rc::new(RefCell::new(value));
        let root: Root = value.clone();
        let mut config = Self {
            value,
            root,
            fields: None,
            plugins: Vec::new(),
        };
        for plugin in plugins {
            config.add(plugin);
        }
        config
    }

    /// Append a plugin. It is inspected on the next [`parse`](Self::parse).
    pub fn add(&mut self, plugin: Plugin) -> &mut Self {
        trace!(kind = plugin.kind(), "added plugin");
        self.plugins.push(Entry {
            plugin,
            inspected: false,
        });
        self
    }

    /// The flat field view, built on first use.
    pub fn fields(&mut self) -> Result<&Fields, PlugfigError> {
        if self.fields.is_none() {
            self.fields = Some(view(&self.root)?);
        }
        self.fields.as_ref().ok_or(PlugfigError::UnexpectedType)
    }

    /// Inspect every plugin not inspected yet, in addition order.
    ///
    /// Visitors receive the field view, walkers the whole struct. The first
    /// error aborts; plugins after it stay pending.
    pub fn inspect(&mut self) -> Result<(), PlugfigError> {
        if self.fields.is_none() {
            self.fields = Some(view(&self.root)?);
        }
        let fields = self.fields.as_ref().ok_or(PlugfigError::UnexpectedType)?;

        // A bare source fails the session before any plugin runs.
        if let Some(index) = self
            .plugins
            .iter()
            .position(|entry| matches!(entry.plugin, Plugin::Unsupported(_)))
        {
            return Err(PlugfigError::UnsupportedPlugin(format!("plugin #{index}")));
        }

        for (index, entry) in self.plugins.iter_mut().enumerate() {
            if entry.inspected {
                continue;
            }
            trace!(index, kind = entry.plugin.kind(), "inspecting plugin");
            match &mut entry.plugin {
                Plugin::Visitor(visitor) => visitor.visit(fields)?,
                Plugin::Walker(walker) => walker.walk(&self.root)?,
                Plugin::Unsupported(_) => {
                    return Err(PlugfigError::UnsupportedPlugin(format!("plugin #{index}")));
                }
            }
            entry.inspected = true;
        }
        Ok(())
    }

    /// Inspect pending plugins, then parse every plugin in order and return a
    /// copy of the populated struct.
    ///
    /// Errors are returned unchanged from the plugin that raised them. The
    /// struct keeps whatever earlier plugins wrote; see [`value`](Self::value).
    pub fn parse(&mut self) -> Result<T, PlugfigError>
    where
        T: Clone,
    {
        self.inspect()?;
        debug!(plugins = self.plugins.len(), "parsing plugins");
        for (index, entry) in self.plugins.iter_mut().enumerate() {
            trace!(index, kind = entry.plugin.kind(), "parsing plugin");
            entry.plugin.parse()?;
        }
        Ok(self.value.borrow().clone())
    }

    /// The current, possibly partially populated, struct.
    pub fn value(&self) -> Ref<'_, T> {
        self.value.borrow()
    }

    /// Files read by the walker plugins, in plugin order.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.plugins
            .iter()
            .filter_map(|entry| match &entry.plugin {
                Plugin::Walker(walker) => walker.file_path().map(Path::to_path_buf),
                _ => None,
            })
            .collect()
    }

    /// Render the usage table: every field with the metadata plugins
    /// recorded for it, followed by the configuration files.
    ///
    /// Pending plugins are inspected first so their metadata shows up.
    pub fn usage(&mut self) -> Result<String, PlugfigError> {
        self.inspect()?;
        let files = self.file_paths();
        let fields = self.fields.as_ref().ok_or(PlugfigError::UnexpectedType)?;
        Ok(usage_table(fields, &files))
    }

    pub fn print_usage(&mut self) -> Result<(), PlugfigError> {
        print!("{}", self.usage()?);
        Ok(())
    }

    /// Parse, printing the usage table and panicking on any error.
    ///
    /// Meant for tests and small tools where a configuration error is fatal.
    pub fn must(plugins: impl IntoIterator<Item = Plugin>) -> T
    where
        T: Default + Clone,
    {
        let mut config = Self::new(plugins);
        match config.parse() {
            Ok(value) => value,
            Err(err) => {
                if let Ok(usage) = config.usage() {
                    print!("{usage}");
                }
                panic!("plugfig: {err}");
            }
        }
    }
}

/// A `T` with only its `default` tags applied.
pub fn defaults<T>() -> Result<T, PlugfigError>
where
    T: Reflect + Default + Clone + 'static,
{
    Plugfig::<T>::new([Defaults::new().into()]).parse()
}
