use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use std::time::Duration;

use plugfig::{
    Defaults, Env, Fields, Format, Meta, Plugfig, PlugfigError, Plugin, Reflect, Required, Root,
    Secret, Source, Visitor, Walker, register_tag,
};
use tempfile::TempDir;

#[derive(Reflect, Default, Clone, Debug, PartialEq)]
struct Redis {
    #[plugfig(default = "localhost", usage = "redis host")]
    host: String,

    #[plugfig(default = "6379", usage = "redis port")]
    port: u16,
}

#[derive(Reflect, Default, Clone, Debug, PartialEq)]
struct Service {
    #[plugfig(flag = ",command")]
    command: String,

    #[plugfig(default = "30s")]
    timeout: Duration,

    retries: Vec<u32>,

    #[plugfig(secret = "db/password", required = "true")]
    password: String,

    #[plugfig(nested)]
    redis: Redis,
}

type Log = Rc<RefCell<Vec<String>>>;

struct Tracer {
    name: &'static str,
    log: Log,
    fail: bool,
}

impl Tracer {
    fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
            fail: false,
        }
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Source for Tracer {
    fn parse(&mut self) -> Result<(), PlugfigError> {
        self.log.borrow_mut().push(format!("parse {}", self.name));
        Ok(())
    }
}

impl Visitor for Tracer {
    fn visit(&mut self, _fields: &Fields) -> Result<(), PlugfigError> {
        self.log.borrow_mut().push(format!("visit {}", self.name));
        if self.fail {
            return Err(PlugfigError::Custom(format!("{} failed", self.name).into()));
        }
        Ok(())
    }
}

impl Walker for Tracer {
    fn walk(&mut self, _root: &Root) -> Result<(), PlugfigError> {
        self.log.borrow_mut().push(format!("walk {}", self.name));
        Ok(())
    }
}

#[test]
fn defaults_then_env() {
    let redis: Redis = Plugfig::new([
        Defaults::new().into(),
        Env::new().with_vars([("PORT", "6380")]).into(),
    ])
    .parse()
    .unwrap();
    assert_eq!(
        redis,
        Redis {
            host: "localhost".into(),
            port: 6380,
        }
    );
}

#[test]
fn plugins_are_inspected_then_parsed_in_order() {
    let log = Log::default();
    let mut config = Plugfig::<Redis>::new([
        Plugin::visitor(Tracer::new("a", &log)),
        Plugin::walker(Tracer::new("b", &log)),
        Plugin::visitor(Tracer::new("c", &log)),
    ]);
    config.parse().unwrap();
    assert_eq!(
        *log.borrow(),
        ["visit a", "walk b", "visit c", "parse a", "parse b", "parse c"]
    );
}

#[test]
fn inspection_stops_at_first_failure() {
    let log = Log::default();
    let err = Plugfig::<Redis>::new([
        Plugin::visitor(Tracer::new("a", &log).failing()),
        Plugin::visitor(Tracer::new("b", &log)),
    ])
    .parse()
    .unwrap_err();
    assert_eq!(err.to_string(), "a failed");
    assert_eq!(*log.borrow(), ["visit a"]);
}

#[test]
fn bare_sources_are_rejected() {
    let log = Log::default();
    let err = Plugfig::<Redis>::new([
        Plugin::visitor(Tracer::new("a", &log)),
        Plugin::Unsupported(Box::new(Tracer::new("x", &log))),
    ])
    .parse()
    .unwrap_err();
    assert!(matches!(err, PlugfigError::UnsupportedPlugin(ref which) if which == "plugin #1"));
    assert!(log.borrow().is_empty());
}

#[test]
#[should_panic(expected = "already owned")]
fn a_tag_has_one_owner() {
    let _ = Env::new();
    register_tag::<Tracer>("env");
}

#[test]
fn meta_is_shared_between_views() {
    let mut config = Plugfig::<Redis>::new([Env::new().into()]);
    config.inspect().unwrap();
    let first: Vec<Meta> = config.fields().unwrap().iter().map(|f| f.meta()).collect();
    let second: Vec<Meta> = config.fields().unwrap().iter().map(|f| f.meta()).collect();
    assert!(first.iter().zip(&second).all(|(a, b)| Meta::same(a, b)));
    assert_eq!(first[1].get("env").as_deref(), Some("PORT"));
}

#[test]
fn lists_split_on_commas() {
    let service: Service = Plugfig::new([
        Env::new().with_vars([("RETRIES", "1, 2,3")]).into(),
    ])
    .parse()
    .unwrap();
    assert_eq!(service.retries, [1, 2, 3]);
}

#[test]
fn secrets_and_required() {
    let err = Plugfig::<Service>::new([Required::new().into()])
        .parse()
        .unwrap_err();
    assert!(matches!(err, PlugfigError::Required { ref field } if field == "Password"));

    let service: Service = Plugfig::new([
        Secret::new(|name: &str| -> Result<String, std::io::Error> { Ok(format!("{name}!")) })
            .into(),
        Required::new().into(),
    ])
    .parse()
    .unwrap();
    assert_eq!(service.password, "db/password!");
}

#[test]
fn builder_layers_file_env_and_flags() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("service.toml");
    let body = "timeout = '5s'\nretries = [4, 5]\n\n[redis]\nhost = 'cache'\nport = 1\n";
    fs::write(&path, body).unwrap();

    let service = Plugfig::<Service>::builder()
        .file(&path, Format::Toml)
        .env_vars([("REDIS_PORT", "2")])
        .args(["--redis-port=3", "serve"])
        .try_load()
        .unwrap();

    assert_eq!(service.command, "serve");
    assert_eq!(service.timeout, Duration::from_secs(5));
    assert_eq!(service.retries, [4, 5]);
    assert_eq!(service.redis.host, "cache");
    assert_eq!(service.redis.port, 3);
}

#[test]
fn usage_lists_bindings() {
    let mut config = Plugfig::<Redis>::new([Defaults::new().into(), Env::new().into()]);
    let usage = config.usage().unwrap();
    assert!(usage.starts_with("\nSupported Fields:\n"));
    assert!(usage.contains("Port"));
    assert!(usage.contains("HOST"));
    assert!(usage.contains("redis port"));
}
