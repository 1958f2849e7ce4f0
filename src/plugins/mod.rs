//! The bundled source plugins.
//!
//! | Plugin | Shape | Tag | Source |
//! |--------|-------|-----|--------|
//! | [`Defaults`](defaults::Defaults) | visitor | `default` | tag values |
//! | [`File`](file::File) | walker | | TOML / JSON files |
//! | [`Env`](env::Env) | visitor | `env` | environment variables |
//! | [`Flag`](flag::Flag) | visitor | `flag` | command line (feature `clap`) |
//! | [`Secret`](secret::Secret) | visitor | `secret` | a caller-supplied lookup |
//! | [`Dapi`](dapi::Dapi) | visitor | `dapi` | Kubernetes downward-API files |
//! | [`Required`](required::Required) | visitor | `required` | checks only |

use heck::{ToKebabCase, ToShoutySnakeCase};

pub mod dapi;
pub mod decode;
pub mod defaults;
pub mod env;
pub mod file;
#[cfg(feature = "clap")]
pub mod flag;
pub mod required;
pub mod secret;

/// `Redis.PoolSize` -> `REDIS_POOL_SIZE`.
pub(crate) fn shouty_name(name: &str) -> String {
    name.split('.')
        .map(|segment| segment.to_shouty_snake_case())
        .collect::<Vec<_>>()
        .join("_")
}

/// `Redis.PoolSize` -> `redis-pool-size`.
pub(crate) fn kebab_name(name: &str) -> String {
    name.split('.')
        .map(|segment| segment.to_kebab_case())
        .collect::<Vec<_>>()
        .join("-")
}
