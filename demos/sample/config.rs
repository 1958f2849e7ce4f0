//! Configuration structs for the sample application.
//!
//! With the prefix `SAMPLE`, fields map to sources like this:
//!
//! | Field                   | Flag                        | Env var                        |
//! |-------------------------|-----------------------------|--------------------------------|
//! | `Command`               | trailing argument           |                                |
//! | `Name`                  | `--name`                    | `SAMPLE_NAME`                  |
//! | `Verbose`               | `--verbose`                 | `SAMPLE_VERBOSE`               |
//! | `Server.Host`           | `--server-host`             | `SAMPLE_SERVER_HOST`           |
//! | `Server.Port`           | `--server-port`             | `SAMPLE_SERVER_PORT`           |
//! | `Server.MaxConnections` | `--server-max-connections`  | `SAMPLE_SERVER_MAX_CONNECTIONS`|
//! | `Server.Timeout`        | `--server-timeout`          | `SAMPLE_SERVER_TIMEOUT`        |
//! | `Display.Color`         | `--color`                   | `SAMPLE_DISPLAY_COLOR`         |
//! | `Display.Format`        | `--display-format`          | `SAMPLE_DISPLAY_FORMAT`        |
//! | `Token`                 | `--token`                   | `API_TOKEN`                    |

use std::time::Duration;

use plugfig::Reflect;

#[derive(Reflect, Default, Clone, Debug)]
pub struct DemoConfig {
    #[plugfig(flag = ",command", default = "echo", usage = "what to do: echo, json or usage")]
    pub command: String,

    #[plugfig(default = "plugfig-sample", usage = "name shown in the echo banner")]
    pub name: String,

    #[plugfig(usage = "enable verbose output")]
    pub verbose: bool,

    #[plugfig(nested)]
    pub server: ServerConfig,

    #[plugfig(nested)]
    pub display: DisplayConfig,

    /// Read from the secrets directory when present; the env var is a fallback.
    #[plugfig(env = "API_TOKEN", secret = "api-token", usage = "token for the upstream API")]
    pub token: String,
}

#[derive(Reflect, Default, Clone, Debug)]
pub struct ServerConfig {
    #[plugfig(default = "127.0.0.1", usage = "hostname to bind to")]
    pub host: String,

    #[plugfig(default = "8080", usage = "port to listen on")]
    pub port: u16,

    #[plugfig(default = "100")]
    pub max_connections: u32,

    #[plugfig(default = "30s", usage = "request timeout, e.g. 500ms or 1m30s")]
    pub timeout: Duration,
}

#[derive(Reflect, Default, Clone, Debug)]
pub struct DisplayConfig {
    #[plugfig(flag = "color", default = "yellow", usage = "one of red, green, yellow, blue")]
    pub color: String,

    #[plugfig(default = "table", usage = "table or plain")]
    pub format: String,
}
