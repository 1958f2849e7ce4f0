//! Environment variables from the `env` tag.
//!
//! A field's variable name is its dotted name in `SHOUTY_SNAKE_CASE` with
//! segments joined by `_` (`Redis.Port` -> `REDIS_PORT`), optionally behind a
//! prefix (`MYAPP_REDIS_PORT`). An explicit tag (`env = "DB_URL"`) is used
//! verbatim and never prefixed; `env = "-"` opts the field out.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::PlugfigError;
use crate::field::{Field, Fields};
use crate::plugin::{Plugin, Source, Visitor};
use crate::plugins::shouty_name;
use crate::registry::register_tag;

const TAG: &str = "env";

#[derive(Debug)]
pub struct Env {
    prefix: Option<String>,
    vars: Option<HashMap<String, String>>,
    bindings: Vec<(Field, String)>,
}

impl Env {
    /// Read from the process environment.
    pub fn new() -> Self {
        register_tag::<Self>(TAG);
        Self {
            prefix: None,
            vars: None,
            bindings: Vec::new(),
        }
    }

    /// Prefix derived names with `PREFIX_`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Read from a fixed set of variables instead of the process environment.
    ///
    /// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
    pub fn with_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// The variable name for `field`, or `None` when the field opted out.
    pub fn var_name(&self, field: &Field) -> Option<String> {
        let (name, explicit) = field.name_for(TAG);
        if name == "-" {
            return None;
        }
        if explicit {
            return Some(name);
        }
        let name = shouty_name(&name);
        Some(match &self.prefix {
            Some(prefix) => format!("{prefix}_{name}"),
            None => name,
        })
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for Env {
    fn visit(&mut self, fields: &Fields) -> Result<(), PlugfigError> {
        self.bindings.clear();
        for field in fields {
            let Some(name) = self.var_name(field) else {
                continue;
            };
            field.meta().insert(TAG, name.clone());
            self.bindings.push((field.clone(), name));
        }
        debug!(count = self.bindings.len(), "bound environment variables");
        Ok(())
    }
}

impl Source for Env {
    fn parse(&mut self) -> Result<(), PlugfigError> {
        for (field, name) in &self.bindings {
            let Some(value) = self.lookup(name) else {
                continue;
            };
            trace!(field = field.name(), var = name.as_str(), "applying env var");
            field
                .set(&value)
                .map_err(|e| PlugfigError::invalid_field(field.name(), format!("env {name}"), e))?;
        }
        Ok(())
    }
}

impl From<Env> for Plugin {
    fn from(env: Env) -> Self {
        Plugin::visitor(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Plugfig;
    use crate::fixtures::test::{Config, Types};
    use crate::plugins::defaults::Defaults;
    use std::time::Duration;

    fn meta_of(config: &mut Plugfig<Config>, name: &str) -> Option<String> {
        let fields = config.fields().unwrap();
        let field = fields.iter().find(|f| f.name() == name).unwrap();
        field.meta().get(TAG)
    }

    #[test]
    fn derives_names_from_field_names() {
        let env = Env::new().with_vars(Vec::<(String, String)>::new());
        let mut config = Plugfig::<Config>::new([env.into()]);
        config.inspect().unwrap();
        assert_eq!(meta_of(&mut config, "GoHard").as_deref(), Some("GO_HARD"));
        assert_eq!(meta_of(&mut config, "Redis.Port").as_deref(), Some("REDIS_PORT"));
        assert_eq!(meta_of(&mut config, "Redis.Address").as_deref(), Some("REDIS_HOST"));
        assert_eq!(
            meta_of(&mut config, "Rethink.Db").as_deref(),
            Some("RETHINK_DATABASE")
        );
    }

    #[test]
    fn prefix_applies_to_derived_names_only() {
        let mut config = Plugfig::<Config>::new([Env::new()
            .with_prefix("APP")
            .with_vars(Vec::<(String, String)>::new())
            .into()]);
        config.inspect().unwrap();
        assert_eq!(meta_of(&mut config, "Redis.Port").as_deref(), Some("APP_REDIS_PORT"));
        assert_eq!(
            meta_of(&mut config, "Rethink.Db").as_deref(),
            Some("RETHINK_DATABASE")
        );
    }

    #[test]
    fn env_overrides_defaults() {
        let env = Env::new().with_vars([
            ("REDIS_HOST", "redis-server"),
            ("REDIS_PORT", "6380"),
            ("GO_HARD", "true"),
        ]);
        let config = Plugfig::<Config>::new([Defaults::new().into(), env.into()])
            .parse()
            .unwrap();
        assert_eq!(config.redis.host, "redis-server");
        assert_eq!(config.redis.port, 6380);
        assert!(config.go_hard);
        assert_eq!(config.rethink.db, "primary");
    }

    #[test]
    fn decodes_sequences_and_durations() {
        let env = Env::new().with_vars([
            ("SLICE_INT", "1, 2,3"),
            ("DURATION", "1h30m"),
            ("MAYBE_PORT", "8080"),
        ]);
        let types = Plugfig::<Types>::new([env.into()]).parse().unwrap();
        assert_eq!(types.slice_int, vec![1, 2, 3]);
        assert_eq!(types.duration, Duration::from_secs(5400));
        assert_eq!(types.maybe_port, Some(8080));
    }

    #[test]
    fn bad_value_is_attributed_to_field() {
        let env = Env::new().with_vars([("REDIS_PORT", "lots")]);
        let err = Plugfig::<Config>::new([env.into()]).parse().unwrap_err();
        match err {
            PlugfigError::InvalidField { field, origin, .. } => {
                assert_eq!(field, "Redis.Port");
                assert_eq!(origin, "env REDIS_PORT");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
