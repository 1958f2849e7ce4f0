//! # plugfig sample application
//!
//! A small CLI that shows how the pieces of plugfig fit together. It is not
//! a real app; it exists to demonstrate and manually verify the sources.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example sample
//! cargo run --example sample -- --help
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature            | How to exercise it                                              |
//! |--------------------|-----------------------------------------------------------------|
//! | Default tags       | `cargo run --example sample`                                    |
//! | Config file (cwd)  | Create `sample.toml` with `[server]\nport = 9000`, then run     |
//! | Env var override   | `SAMPLE_SERVER_PORT=9999 cargo run --example sample`            |
//! | Explicit env name  | `API_TOKEN=abc cargo run --example sample`                      |
//! | Flags              | `cargo run --example sample -- --color blue --verbose`          |
//! | Trailing command   | `cargo run --example sample -- --server-port 1 json`            |
//! | Secrets            | Put a token in `.secrets/api-token`, then run                   |
//! | Usage table        | `cargo run --example sample -- --help` or `... usage`           |

mod config;

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::process::ExitCode;

use plugfig::{Format, Plugfig, PlugfigError, Secret, Value};

use config::DemoConfig;

/// Secrets are files named after the secret under `.secrets/`. A missing
/// file is an empty secret, which leaves the field untouched.
fn read_secret(name: &str) -> io::Result<String> {
    match std::fs::read_to_string(Path::new(".secrets").join(name)) {
        Ok(value) => Ok(value.trim().to_string()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

fn ansi_color_code(name: &str) -> &str {
    match name {
        "red" => "\x1b[31m",
        "green" => "\x1b[32m",
        "yellow" => "\x1b[33m",
        "blue" => "\x1b[34m",
        _ => "\x1b[0m",
    }
}

const RESET: &str = "\x1b[0m";

fn echo(config: &DemoConfig) {
    let color = ansi_color_code(&config.display.color);
    if config.verbose {
        println!("{color}[verbose] resolved configuration for {:?}{RESET}", config.name);
        println!();
    }

    let timeout = format!("{:?}", config.server.timeout);
    let token = if config.token.is_empty() { "<unset>" } else { "<set>" };
    let entries = [
        ("name", config.name.clone()),
        ("server.host", config.server.host.clone()),
        ("server.port", config.server.port.to_string()),
        ("server.max_connections", config.server.max_connections.to_string()),
        ("server.timeout", timeout),
        ("token", token.to_string()),
    ];

    if config.display.format == "plain" {
        for (key, value) in &entries {
            println!("{key}={value}");
        }
    } else {
        let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in &entries {
            println!("{color}{key:<width$}{RESET}  {value}");
        }
    }
}

fn run() -> Result<(), PlugfigError> {
    let mut session = Plugfig::<DemoConfig>::builder()
        .optional_file("sample.toml", Format::Toml)
        .env_prefix("SAMPLE")
        .plugin(Secret::new(read_secret))
        .process_args()
        .build();

    let config = match session.parse() {
        Err(PlugfigError::Usage) => return session.print_usage(),
        result => result?,
    };

    match config.command.as_str() {
        "usage" => session.print_usage()?,
        "json" => {
            let values: BTreeMap<String, Value> = session
                .fields()?
                .iter()
                .map(|field| (field.name().to_string(), field.get()))
                .collect();
            let json = serde_json::to_string_pretty(&values)
                .map_err(|e| PlugfigError::Custom(Box::new(e)))?;
            println!("{json}");
        }
        _ => echo(&config),
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
