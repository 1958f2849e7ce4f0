#[cfg(test)]
pub mod test {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::time::Duration;

    use plugfig_derive::Reflect;

    use crate::error::PlugfigError;
    use crate::field::{Fields, Root};
    use crate::plugin::{Plugin, Source, Visitor, Walker};
    use crate::value::{TextDecode, ValueError};

    #[derive(Reflect, Default, Clone, Debug, PartialEq)]
    pub struct Anon {
        #[plugfig(default = "0.2", usage = "version of the config format")]
        pub version: String,
    }

    #[derive(Reflect, Default, Clone, Debug, PartialEq)]
    pub struct Redis {
        #[plugfig(name = "Address", default = "localhost", env = ".HOST")]
        pub host: String,

        #[plugfig(default = "6379", usage = "redis port")]
        pub port: u16,
    }

    #[derive(Reflect, Default, Clone, Debug, PartialEq)]
    pub struct Host {
        pub address: String,
        pub port: String,
    }

    #[derive(Reflect, Default, Clone, Debug, PartialEq)]
    pub struct Rethink {
        #[plugfig(nested)]
        pub host: Host,

        #[plugfig(
            default = "primary",
            env = "RETHINK_DATABASE",
            usage = "main database used by our application"
        )]
        pub db: String,

        #[plugfig(secret = "")]
        pub password: String,
    }

    #[derive(Reflect, Default, Clone, Debug, PartialEq)]
    pub struct Config {
        #[plugfig(flag = ",command", usage = "command to run")]
        pub command: String,

        #[plugfig(flatten)]
        pub anon: Anon,

        pub go_hard: bool,

        #[plugfig(nested)]
        pub redis: Redis,

        #[plugfig(nested)]
        pub rethink: Rethink,

        #[plugfig(skip)]
        pub scratch: String,
    }

    #[derive(Reflect, Default, Clone, Debug, PartialEq)]
    pub struct Listener {
        #[plugfig(env = ".")]
        pub port: u16,
    }

    /// Dotted tag values at the top level and under a prefix.
    #[derive(Reflect, Default, Clone, Debug, PartialEq)]
    pub struct Dotted {
        #[plugfig(env = ".")]
        pub bare: String,

        #[plugfig(env = ".LISTEN_ADDR")]
        pub address: String,

        #[plugfig(nested)]
        pub listener: Listener,
    }

    #[derive(Reflect, Default, Clone, Debug, PartialEq)]
    pub struct Optional {
        pub name: String,

        #[plugfig(nested)]
        pub host: Option<Host>,
    }

    // -- Fixtures for custom text decoding ---------------------------------------

    /// A compass heading in degrees, decoded from its name.
    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    pub struct Direction(pub u16);

    impl TextDecode for Direction {
        fn decode_text(&mut self, text: &str) -> Result<(), ValueError> {
            self.0 = match text {
                "north" => 0,
                "east" => 90,
                "south" => 180,
                "west" => 270,
                _ => return Err(ValueError::invalid("direction", text, "unknown heading")),
            };
            Ok(())
        }

        fn encode_text(&self) -> String {
            match self.0 {
                0 => "north",
                90 => "east",
                180 => "south",
                _ => "west",
            }
            .to_string()
        }
    }

    /// A list written with dots instead of commas.
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct DottedList(pub Vec<String>);

    impl TextDecode for DottedList {
        fn decode_text(&mut self, text: &str) -> Result<(), ValueError> {
            self.0 = text.split('.').map(str::to_string).collect();
            Ok(())
        }

        fn encode_text(&self) -> String {
            self.0.join(".")
        }
    }

    #[derive(Reflect, Default, Clone, Debug, PartialEq)]
    pub struct Types {
        pub string: String,
        pub bool: bool,
        pub int: i64,
        pub int8: i8,
        pub uint8: u8,
        pub float64: f64,
        pub duration: Duration,
        pub slice_string: Vec<String>,
        pub slice_int: Vec<i64>,
        pub slice_duration: Vec<Duration>,
        pub maybe_port: Option<u16>,

        #[plugfig(text)]
        pub text_slice: DottedList,

        #[plugfig(text)]
        pub directions: Vec<Direction>,

        #[plugfig(text)]
        pub maybe_direction: Option<Direction>,

        pub map: HashMap<String, String>,
    }

    // -- Recording plugin for orchestration tests -------------------------------

    /// Shared log of plugin calls, in call order.
    #[derive(Clone, Default)]
    pub struct RecorderLog(Rc<RefCell<Vec<String>>>);

    impl RecorderLog {
        pub fn entries(&self) -> Vec<String> {
            self.0.borrow().clone()
        }

        fn push(&self, entry: String) {
            self.0.borrow_mut().push(entry);
        }
    }

    enum Action {
        None,
        Set(&'static str, &'static str),
        Meta(&'static str, &'static str, &'static str),
    }

    /// A plugin recording its calls, optionally failing or touching a field.
    pub struct Recorder {
        name: &'static str,
        log: RecorderLog,
        walker: bool,
        fail_inspect: bool,
        fail_parse: bool,
        action: Action,
        fields: Fields,
    }

    impl Recorder {
        fn build(name: &'static str, log: &RecorderLog, walker: bool, action: Action) -> Self {
            Self {
                name,
                log: log.clone(),
                walker,
                fail_inspect: false,
                fail_parse: false,
                action,
                fields: Fields::new(),
            }
        }

        pub fn visitor(name: &'static str, log: &RecorderLog) -> Self {
            Self::build(name, log, false, Action::None)
        }

        pub fn walker(name: &'static str, log: &RecorderLog) -> Self {
            Self::build(name, log, true, Action::None)
        }

        /// Sets `field` to `value` when parsed.
        pub fn setting(field: &'static str, value: &'static str) -> Self {
            Self::build("set", &RecorderLog::default(), false, Action::Set(field, value))
        }

        /// Records `key = value` in the meta of `field` when visited.
        pub fn meta(field: &'static str, key: &'static str, value: &'static str) -> Self {
            Self::build("meta", &RecorderLog::default(), false, Action::Meta(field, key, value))
        }

        pub fn fail_inspect(mut self) -> Self {
            self.fail_inspect = true;
            self
        }

        pub fn fail_parse(mut self) -> Self {
            self.fail_parse = true;
            self
        }

        fn failure(&self) -> PlugfigError {
            PlugfigError::Custom(format!("{} failed", self.name).into())
        }

        fn inspected(&mut self, verb: &str) -> Result<(), PlugfigError> {
            self.log.push(format!("{verb} {}", self.name));
            if self.fail_inspect {
                return Err(self.failure());
            }
            Ok(())
        }
    }

    impl Source for Recorder {
        fn parse(&mut self) -> Result<(), PlugfigError> {
            self.log.push(format!("parse {}", self.name));
            if self.fail_parse {
                return Err(self.failure());
            }
            if let Action::Set(name, value) = self.action
                && let Some(field) = self.fields.iter().find(|f| f.name() == name)
            {
                field.set(value)?;
            }
            Ok(())
        }
    }

    impl Visitor for Recorder {
        fn visit(&mut self, fields: &Fields) -> Result<(), PlugfigError> {
            self.inspected("visit")?;
            self.fields = fields.clone();
            if let Action::Meta(name, key, value) = self.action
                && let Some(field) = fields.iter().find(|f| f.name() == name)
            {
                field.meta().insert(key, value);
            }
            Ok(())
        }
    }

    impl Walker for Recorder {
        fn walk(&mut self, _root: &Root) -> Result<(), PlugfigError> {
            self.inspected("walk")
        }
    }

    impl From<Recorder> for Plugin {
        fn from(recorder: Recorder) -> Self {
            if recorder.walker {
                Plugin::walker(recorder)
            } else {
                Plugin::visitor(recorder)
            }
        }
    }

    #[test]
    fn config_walks_expected_leaves() {
        use crate::field::Field;
        use crate::view::view;

        let root: Root = Rc::new(RefCell::new(Config::default()));
        let fields = view(&root).unwrap();
        assert_eq!(fields.len(), 9);
        assert!(fields.iter().map(Field::ident).all(|ident| ident != "scratch"));
    }
}
