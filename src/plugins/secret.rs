//! Secrets from a caller-supplied lookup, for fields tagged `secret`.
//!
//! Only tagged fields take part. `secret = ""` derives the secret name from
//! the field name (`Rethink.Password` -> `RETHINK_PASSWORD`); any other value
//! names the secret explicitly.

use std::fmt;

use tracing::{debug, trace};

use crate::error::PlugfigError;
use crate::field::{Field, Fields};
use crate::plugin::{Plugin, Source, Visitor};
use crate::plugins::shouty_name;
use crate::registry::register_tag;

const TAG: &str = "secret";

type Lookup = Box<dyn FnMut(&str) -> Result<String, PlugfigError>>;

pub struct Secret {
    lookup: Lookup,
    bindings: Vec<(Field, String)>,
}

impl Secret {
    /// `lookup` exchanges a secret name for its value. Its errors abort the
    /// session; an empty value leaves the field untouched.
    pub fn new<F, E>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Result<String, E> + 'static,
        E: fmt::Display,
    {
        register_tag::<Self>(TAG);
        Self {
            lookup: Box::new(move |name| {
                lookup(name).map_err(|e| PlugfigError::Secret {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            }),
            bindings: Vec::new(),
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

impl Visitor for Secret {
    fn visit(&mut self, fields: &Fields) -> Result<(), PlugfigError> {
        self.bindings.clear();
        for field in fields.iter().filter(|f| f.tag(TAG).is_some()) {
            let (name, explicit) = field.name_for(TAG);
            if name == "-" {
                continue;
            }
            let name = if explicit { name } else { shouty_name(&name) };
            field.meta().insert(TAG, name.clone());
            self.bindings.push((field.clone(), name));
        }
        debug!(count = self.bindings.len(), "bound secrets");
        Ok(())
    }
}

impl Source for Secret {
    fn parse(&mut self) -> Result<(), PlugfigError> {
        for (field, name) in &self.bindings {
            let value = (self.lookup)(name)?;
            if value.is_empty() {
                continue;
            }
            trace!(field = field.name(), secret = name.as_str(), "applying secret");
            field.set(&value).map_err(|e| {
                PlugfigError::invalid_field(field.name(), format!("secret {name}"), e)
            })?;
        }
        Ok(())
    }
}

impl From<Secret> for Plugin {
    fn from(secret: Secret) -> Self {
        Plugin::visitor(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Plugfig;
    use crate::fixtures::test::Config;
    use plugfig_derive::Reflect;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn looks_up_tagged_fields_only() {
        let asked = Rc::new(RefCell::new(Vec::new()));
        let seen = asked.clone();
        let secret = Secret::new(move |name: &str| {
            seen.borrow_mut().push(name.to_string());
            Ok::<_, String>("hunter2".to_string())
        });
        let config = Plugfig::<Config>::new([secret.into()]).parse().unwrap();
        assert_eq!(config.rethink.password, "hunter2");
        assert_eq!(*asked.borrow(), ["RETHINK_PASSWORD"]);
    }

    #[test]
    fn empty_value_keeps_previous() {
        let secret = Secret::new(|_: &str| Ok::<_, String>(String::new()));
        let start = Config {
            rethink: crate::fixtures::test::Rethink {
                password: "kept".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = Plugfig::with_value(start, [secret.into()]).parse().unwrap();
        assert_eq!(config.rethink.password, "kept");
    }

    #[test]
    fn lookup_errors_abort() {
        let secret = Secret::new(|_: &str| Err::<String, _>("vault sealed"));
        let err = Plugfig::<Config>::new([secret.into()]).parse().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to fetch secret 'RETHINK_PASSWORD': vault sealed"
        );
    }

    #[test]
    fn explicit_and_disabled_names() {
        #[derive(Reflect, Default, Clone, Debug)]
        struct Vaulted {
            #[plugfig(secret = "db/password")]
            password: String,
            #[plugfig(secret = "-")]
            ignored: String,
        }

        let asked = Rc::new(RefCell::new(Vec::new()));
        let seen = asked.clone();
        let secret = Secret::new(move |name: &str| {
            seen.borrow_mut().push(name.to_string());
            Ok::<_, String>("s3cret".to_string())
        });
        let vaulted = Plugfig::<Vaulted>::new([secret.into()]).parse().unwrap();
        assert_eq!(vaulted.password, "s3cret");
        assert!(vaulted.ignored.is_empty());
        assert_eq!(*asked.borrow(), ["db/password"]);
    }
}
