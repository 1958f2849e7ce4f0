//! Command-line flags from the `flag` tag, parsed with clap.
//!
//! Every field becomes a long flag named after its dotted name in kebab case
//! (`Redis.Port` -> `--redis-port`) unless the tag names it explicitly or opts
//! out with `flag = "-"`. Options follow the name after a comma:
//!
//! * `required`: the flag must be given.
//! * `command`: the field receives the trailing positional argument instead
//!   of a flag, as in `app --verbose serve`.
//!
//! Boolean flags may be given bare (`--go-hard`) or with a value
//! (`--go-hard=false`). A flag given more than once keeps its last value.

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, Command};
use tracing::{debug, trace};

use crate::error::PlugfigError;
use crate::field::{Field, Fields};
use crate::plugin::{Plugin, Source, Visitor};
use crate::plugins::kebab_name;
use crate::registry::register_tag;

const TAG: &str = "flag";
const COMMAND: &str = "[command]";
const HELP_ID: &str = "[help]";

#[derive(Debug)]
struct Binding {
    field: Field,
    name: String,
    required: bool,
    is_bool: bool,
}

#[derive(Debug)]
struct CommandBinding {
    field: Field,
    required: bool,
}

#[derive(Debug)]
pub struct Flag {
    program: String,
    args: Vec<String>,
    bindings: Vec<Binding>,
    command: Option<CommandBinding>,
}

impl Flag {
    /// Parse `args`, which must not include the program name.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        register_tag::<Self>(TAG);
        Self {
            program: String::new(),
            args: args.into_iter().map(Into::into).collect(),
            bindings: Vec::new(),
            command: None,
        }
    }

    /// Parse the arguments of the current process.
    pub fn standard() -> Self {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_default();
        Self::new(args).with_program(program)
    }

    /// The program name shown in clap's messages.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(self.program.clone())
            .no_binary_name(true)
            .disable_version_flag(true)
            .disable_help_flag(true);

        // A field may claim `--help`; `-h` always asks for usage.
        let mut help = Arg::new(HELP_ID).short('h').action(ArgAction::Help);
        if !self.bindings.iter().any(|b| b.name == "help") {
            help = help.long("help");
        }
        command = command.arg(help);

        for binding in &self.bindings {
            let mut arg = Arg::new(binding.name.clone())
                .long(binding.name.clone())
                .action(ArgAction::Append)
                .allow_negative_numbers(true);
            if let Some(usage) = binding.field.tag("usage") {
                arg = arg.help(usage);
            }
            if binding.is_bool {
                arg = arg
                    .num_args(0..=1)
                    .require_equals(true)
                    .default_missing_value("true");
            }
            command = command.arg(arg);
        }
        command
    }

    /// Split off the trailing command, if the last argument is one.
    ///
    /// The last argument is not a command when it looks like a flag, or when
    /// it is the value of a preceding non-boolean flag.
    fn split_command<'a>(&self, args: &'a [String]) -> (Option<&'a str>, &'a [String]) {
        let Some((last, rest)) = args.split_last() else {
            return (None, args);
        };
        if last.is_empty() || last.starts_with('-') {
            return (None, args);
        }
        if let Some(previous) = rest.last()
            && previous.starts_with('-')
            && !previous.contains('=')
        {
            let previous_is_bool = self
                .bindings
                .iter()
                .any(|b| b.is_bool && format!("--{}", b.name) == *previous);
            if !previous_is_bool {
                return (None, args);
            }
        }
        (Some(last.as_str()), rest)
    }
}

impl Visitor for Flag {
    fn visit(&mut self, fields: &Fields) -> Result<(), PlugfigError> {
        self.bindings.clear();
        self.command = None;

        for field in fields {
            let (name, explicit) = field.name_for(TAG);
            if name == "-" {
                continue;
            }
            let options = field.tag_options(TAG);
            let required = options.contains(&"required");

            if options.contains(&"command") {
                field.meta().insert(TAG, COMMAND);
                self.command = Some(CommandBinding {
                    field: field.clone(),
                    required,
                });
                continue;
            }

            let name = if explicit { name } else { kebab_name(&name) };
            field.meta().insert(TAG, format!("--{name}"));
            self.bindings.push(Binding {
                field: field.clone(),
                is_bool: field.get().is_bool(),
                name,
                required,
            });
        }
        debug!(count = self.bindings.len(), "bound flags");
        Ok(())
    }
}

impl Source for Flag {
    fn parse(&mut self) -> Result<(), PlugfigError> {
        let mut missing = Vec::new();

        let args = if let Some(command) = &self.command {
            let (value, rest) = self.split_command(&self.args);
            match value {
                Some(value) => {
                    trace!(command = value, "applying command");
                    command.field.set(value).map_err(|e| {
                        PlugfigError::invalid_field(command.field.name(), COMMAND, e)
                    })?;
                }
                None if command.required => missing.push(COMMAND.to_string()),
                None => {}
            }
            rest
        } else {
            &self.args[..]
        };

        if let Some(first) = args.first()
            && !first.starts_with('-')
        {
            return Err(PlugfigError::BadArgument(first.clone()));
        }

        let matches = match self.command().try_get_matches_from(args) {
            Ok(matches) => matches,
            Err(err) if err.kind() == ErrorKind::DisplayHelp => return Err(PlugfigError::Usage),
            Err(err) => return Err(err.into()),
        };

        for binding in &self.bindings {
            let Some(value) = matches
                .get_many::<String>(&binding.name)
                .and_then(|values| values.last())
            else {
                if binding.required {
                    missing.push(format!("--{}", binding.name));
                }
                continue;
            };
            trace!(field = binding.field.name(), flag = binding.name.as_str(), "applying flag");
            binding.field.set(value).map_err(|e| {
                PlugfigError::invalid_field(binding.field.name(), format!("--{}", binding.name), e)
            })?;
        }

        if !missing.is_empty() {
            missing.sort();
            return Err(PlugfigError::MissingFlags(missing));
        }
        Ok(())
    }
}

impl From<Flag> for Plugin {
    fn from(flag: Flag) -> Self {
        Plugin::visitor(flag)
    }
}
