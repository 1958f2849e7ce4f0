use std::marker::PhantomData;
use std::path::PathBuf;

use tracing::debug;

use crate::config::Plugfig;
use crate::error::PlugfigError;
use crate::plugin::Plugin;
use crate::plugins::defaults::Defaults;
use crate::plugins::env::Env;
use crate::plugins::file::{File, Files, Format};
#[cfg(feature = "clap")]
use crate::plugins::flag::Flag;
use crate::reflect::Reflect;

impl<T: Reflect + 'static> Plugfig<T> {
    pub fn builder() -> PlugfigBuilder<T> {
        PlugfigBuilder::new()
    }
}

/// Builder assembling the usual plugin chain.
///
/// Without command-line arguments the chain is
///
/// ```text
/// defaults -> files -> user plugins -> env
/// ```
///
/// so the environment has the last word. Once [`args()`](Self::args) or
/// [`process_args()`](Self::process_args) enables flags, the chain becomes
///
/// ```text
/// defaults -> files -> env -> flags -> user plugins
/// ```
///
/// with user plugins (typically secrets) running last.
pub struct PlugfigBuilder<T> {
    files: Files,
    strict: bool,
    plugins: Vec<Plugin>,
    env_enabled: bool,
    env_prefix: Option<String>,
    env_vars: Option<Vec<(String, String)>>,
    args: Option<Vec<String>>,
    program: Option<String>,
    _phantom: PhantomData<T>,
}

impl<T: Reflect + 'static> PlugfigBuilder<T> {
    fn new() -> Self {
        Self {
            files: Files::new(),
            strict: false,
            plugins: Vec::new(),
            env_enabled: true,
            env_prefix: None,
            env_vars: None,
            args: None,
            program: None,
            _phantom: PhantomData,
        }
    }

    /// Add a config file that must exist.
    pub fn file(mut self, path: impl Into<PathBuf>, format: Format) -> Self {
        self.files.push(path.into(), format, false);
        self
    }

    /// Add a config file that is skipped when missing.
    pub fn optional_file(mut self, path: impl Into<PathBuf>, format: Format) -> Self {
        self.files.push(path.into(), format, true);
        self
    }

    /// Append a list of files. Later files override earlier ones.
    pub fn files(mut self, files: Files) -> Self {
        for spec in files.iter() {
            self.files.push(spec.path.clone(), spec.format, spec.optional);
        }
        self
    }

    /// Enable or disable strict mode (default: `false`).
    /// In strict mode, unknown keys in config files produce errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Add a user plugin, e.g. a [`Secret`](crate::Secret) source.
    pub fn plugin(mut self, plugin: impl Into<Plugin>) -> Self {
        self.plugins.push(plugin.into());
        self
    }

    /// Prefix derived environment variable names with `PREFIX_`.
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Disable environment variable loading entirely.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    /// Read variables from `vars` instead of the process environment.
    pub fn env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Parse flags from `args` (without the program name).
    #[cfg(feature = "clap")]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Parse flags from the arguments of the current process.
    #[cfg(feature = "clap")]
    pub fn process_args(mut self) -> Self {
        let mut args = std::env::args();
        self.program = args.next();
        self.args = Some(args.collect());
        self
    }

    fn env(&self) -> Option<Env> {
        if !self.env_enabled {
            return None;
        }
        let mut env = Env::new();
        if let Some(prefix) = &self.env_prefix {
            env = env.with_prefix(prefix.clone());
        }
        if let Some(vars) = &self.env_vars {
            env = env.with_vars(vars.iter().cloned());
        }
        Some(env)
    }

    #[cfg(feature = "clap")]
    fn flag(&mut self) -> Option<Flag> {
        let args = self.args.take()?;
        let flag = Flag::new(args);
        Some(match self.program.take() {
            Some(program) => flag.with_program(program),
            None => flag,
        })
    }

    #[cfg(not(feature = "clap"))]
    fn flag(&mut self) -> Option<Plugin> {
        None
    }

    /// Assemble the plugin chain in precedence order.
    fn chain(mut self) -> Vec<Plugin> {
        let mut chain: Vec<Plugin> = vec![Defaults::new().into()];
        chain.extend(self.files.iter().map(|spec| {
            File::new(spec.path.clone(), spec.format, spec.optional)
                .strict(self.strict)
                .into()
        }));

        let env = self.env().map(Plugin::from);
        let user = std::mem::take(&mut self.plugins);
        match self.flag() {
            Some(flag) => {
                debug!("assembling chain with flags");
                chain.extend(env);
                chain.push(flag.into());
                chain.extend(user);
            }
            None => {
                debug!("assembling chain without flags");
                chain.extend(user);
                chain.extend(env);
            }
        }
        chain
    }

    /// Build the session without parsing it.
    pub fn build(self) -> Plugfig<T>
    where
        T: Default,
    {
        Plugfig::new(self.chain())
    }

    /// Load the configuration through all layers.
    pub fn try_load(self) -> Result<T, PlugfigError>
    where
        T: Default + Clone,
    {
        self.build().parse()
    }

    /// Like [`try_load`](Self::try_load), but when help was requested the
    /// usage table is printed and the process exits successfully.
    pub fn load(self) -> Result<T, PlugfigError>
    where
        T: Default + Clone,
    {
        let mut config = self.build();
        match config.parse() {
            Err(PlugfigError::Usage) => {
                config.print_usage()?;
                std::process::exit(0);
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{Config, Recorder};
    use std::fs;
    use tempfile::TempDir;

    fn write_toml(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("app.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn defaults_only() {
        let config = Plugfig::<Config>::builder()
            .env_vars(Vec::<(String, String)>::new())
            .try_load()
            .unwrap();
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.anon.version, "0.2");
    }

    #[test]
    fn file_overrides_defaults_and_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write_toml(&dir, "[redis]\nport = 7000\naddress = 'from-file'\n");
        let config = Plugfig::<Config>::builder()
            .file(&path, Format::Toml)
            .env_vars([("REDIS_PORT", "7001")])
            .try_load()
            .unwrap();
        assert_eq!(config.redis.port, 7001);
        assert_eq!(config.redis.host, "from-file");
    }

    #[test]
    fn env_runs_after_user_plugins_without_flags() {
        let config = Plugfig::<Config>::builder()
            .plugin(Recorder::setting("Redis.Port", "1"))
            .env_vars([("REDIS_PORT", "2")])
            .try_load()
            .unwrap();
        assert_eq!(config.redis.port, 2);
    }

    #[test]
    fn user_plugins_run_last_with_flags() {
        let config = Plugfig::<Config>::builder()
            .plugin(Recorder::setting("Redis.Port", "1"))
            .env_vars([("REDIS_PORT", "2")])
            .args(["--redis-port=3"])
            .try_load()
            .unwrap();
        assert_eq!(config.redis.port, 1);
    }

    #[test]
    fn flags_override_env() {
        let config = Plugfig::<Config>::builder()
            .env_vars([("REDIS_PORT", "2"), ("GO_HARD", "false")])
            .args(["--redis-port=3", "--go-hard", "serve"])
            .try_load()
            .unwrap();
        assert_eq!(config.redis.port, 3);
        assert!(config.go_hard);
        assert_eq!(config.command, "serve");
    }

    #[test]
    fn env_prefix_and_no_env() {
        let config = Plugfig::<Config>::builder()
            .env_prefix("APP")
            .env_vars([("APP_REDIS_PORT", "9"), ("REDIS_PORT", "8")])
            .try_load()
            .unwrap();
        assert_eq!(config.redis.port, 9);

        let config = Plugfig::<Config>::builder()
            .no_env()
            .env_vars([("REDIS_PORT", "8")])
            .try_load()
            .unwrap();
        assert_eq!(config.redis.port, 6379);
    }

    #[test]
    fn strict_applies_to_files() {
        let dir = TempDir::new().unwrap();
        let path = write_toml(&dir, "unknown = 1\n");
        let lenient = Plugfig::<Config>::builder()
            .no_env()
            .file(&path, Format::Toml)
            .try_load();
        assert!(lenient.is_ok());

        let strict = Plugfig::<Config>::builder()
            .no_env()
            .strict(true)
            .file(&path, Format::Toml)
            .try_load();
        assert!(matches!(strict, Err(PlugfigError::UnknownKey { .. })));
    }

    #[test]
    fn missing_optional_files_are_listed_in_usage() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        let mut config = Plugfig::<Config>::builder()
            .no_env()
            .files(Files::new().optional_file(&missing, Format::Toml))
            .build();
        let usage = config.usage().unwrap();
        assert!(usage.contains("Configuration Files:"));
        assert!(usage.contains("missing.toml"));
    }

    #[test]
    fn help_surfaces_as_usage_from_try_load() {
        let err = Plugfig::<Config>::builder()
            .no_env()
            .args(["--help"])
            .try_load()
            .unwrap_err();
        assert!(err.is_usage());
    }
}
