use std::sync::{atomic::{AtomicUsize, Ordering},
                Arc, Mutex};

use cloudfn::{audit::Audit,
              config::DEFAULT_CRASH_MESSAGE,
              error::{CloudError, Error, Failure, Fault, Kind},
              function::{self, Call, VALIDATION_FAILED},
              hooks::{self, Hooks},
              job::store::StoreData,
              params::Params,
              registry::{self, MemRegistry},
              request::Caller,
              respond::{Reply, Responder},
              value::Value,
              Config,
              State};
use serde_json::json;

const APP: &str = "app";

#[derive(Debug, Default)]
struct Recorder {
  faults: Mutex<Vec<(String, Option<String>)>>,
  failed: Mutex<Vec<(String, Error, Option<String>)>>,
}

impl Hooks for Recorder {
  fn internal_fault(&self, trace: &str, caller: Option<&str>) -> hooks::Result {
    self.faults.lock().unwrap().push((trace.to_string(), caller.map(String::from)));
    Ok(())
  }

  fn function_failed(&self, name: &str, _: &Params, error: &Error, caller: Option<&str>) -> hooks::Result {
    self.failed
        .lock()
        .unwrap()
        .push((name.to_string(), error.clone(), caller.map(String::from)));
    Ok(())
  }
}

/// Hooks that blow up every time they're called
#[derive(Debug)]
struct Broken;

impl Hooks for Broken {
  fn internal_fault(&self, _: &str, _: Option<&str>) -> hooks::Result {
    Err("crash reporter offline".into())
  }

  fn function_failed(&self, _: &str, _: &Params, _: &Error, _: Option<&str>) -> hooks::Result {
    panic!("hook panicked")
  }
}

#[derive(Debug, Default)]
struct Entries {
  info: Mutex<Vec<String>>,
  error: Mutex<Vec<String>>,
}

impl Audit for Entries {
  fn info(&self, message: &str, _: serde_json::Value) {
    self.info.lock().unwrap().push(message.to_string());
  }

  fn error(&self, message: &str, _: serde_json::Value) {
    self.error.lock().unwrap().push(message.to_string());
  }

  fn truncate(&self, text: &str) -> String {
    text.chars().take(10).collect()
  }
}

struct Fixture {
  state: Arc<State>,
  registry: MemRegistry,
  hooks: Arc<Recorder>,
  audit: Arc<Entries>,
  calls: Arc<AtomicUsize>,
}

fn init() -> Fixture {
  simple_logger::SimpleLogger::new().init().ok();

  let registry = MemRegistry::new();
  let hooks = Arc::new(Recorder::default());
  let audit = Arc::new(Entries::default());
  let state = State::new(Config::default(),
                         Arc::new(registry.clone()),
                         Arc::new(Mutex::new(StoreData::new()))).with_hooks(hooks.clone())
                                                                .with_audit(audit.clone());

  Fixture { state: Arc::new(state),
            registry,
            hooks,
            audit,
            calls: Arc::new(AtomicUsize::new(0)) }
}

impl Fixture {
  /// Register `name` as a function settling with `outcome`, counting calls
  fn register(&self, name: &str, outcome: Result<Value, Failure>) {
    let calls = self.calls.clone();
    self.registry.register_function(APP,
                                    name,
                                    registry::function(move |_| {
                                      calls.fetch_add(1, Ordering::SeqCst);
                                      let outcome = outcome.clone();
                                      async move { outcome }
                                    }));
  }

  fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

fn call(name: &str) -> Call {
  Call { app_id: APP.into(),
         name: name.into(),
         caller: Caller { user: Some("u1".into()),
                          ..Caller::default() },
         ..Call::default() }
}

async fn run(fx: &Fixture, name: &str) -> Result<serde_json::Value, Error> {
  function::run(&fx.state, call(name)).await
                                      .map(|reply| serde_json::to_value(reply).unwrap())
}

#[tokio::test]
async fn unknown_function_fails_before_running_anything() {
  let fx = init();
  let validated = Arc::new(AtomicUsize::new(0));
  let counter = validated.clone();
  fx.registry.register_validator(APP,
                                 "nope",
                                 registry::validator(move |_| {
                                   counter.fetch_add(1, Ordering::SeqCst);
                                   async { Ok(true) }
                                 }));

  let err = match function::call(&fx.state, call("nope")) {
    | Ok(_) => panic!("should fail synchronously"),
    | Err(e) => e,
  };

  assert_eq!(err, Error::script_failed("Invalid function: \"nope\""));
  assert_eq!(validated.load(Ordering::SeqCst), 0);
  assert_eq!(fx.calls(), 0);
}

#[tokio::test]
async fn functions_are_scoped_to_their_tenant() {
  let fx = init();
  fx.register("hello", Ok(Value::from("hi")));

  let mut other = call("hello");
  other.app_id = "other".into();

  assert!(function::call(&fx.state, other).is_err());
}

#[tokio::test]
async fn returned_value_is_wrapped_in_result() {
  let fx = init();
  fx.register("answer", Ok(Value::from(42i64)));

  assert_eq!(run(&fx, "answer").await, Ok(json!({"response": {"result": 42}})));
  assert_eq!(fx.calls(), 1);
}

#[tokio::test]
async fn rejecting_validator_skips_the_function() {
  let fx = init();
  fx.register("guarded", Ok(Value::Null));
  fx.registry.register_validator(APP, "guarded", registry::validator(|_| async { Ok(false) }));

  assert_eq!(run(&fx, "guarded").await,
             Err(Error::validation_failed(VALIDATION_FAILED)));
  assert_eq!(fx.calls(), 0);

  let failed = fx.hooks.failed.lock().unwrap().clone();
  assert_eq!(failed,
             vec![("guarded".to_string(),
                   Error::validation_failed(VALIDATION_FAILED),
                   Some("u1".to_string()))]);
}

#[tokio::test]
async fn throwing_validator_keeps_its_message() {
  let fx = init();
  fx.register("guarded", Ok(Value::Null));
  fx.registry.register_validator(APP,
                                 "guarded",
                                 registry::validator(|_| async { Err(Failure::from("must be admin")) }));

  assert_eq!(run(&fx, "guarded").await,
             Err(Error::validation_failed("must be admin")));
  assert_eq!(fx.calls(), 0);
}

#[tokio::test]
async fn accepting_validator_sees_the_request() {
  let fx = init();
  fx.register("guarded", Ok(Value::from(true)));
  fx.registry.register_validator(APP,
                                 "guarded",
                                 registry::validator(|req| {
                                   let ok = req.caller.identity() == Some("u1") && req.name == "guarded";
                                   async move { Ok(ok) }
                                 }));

  assert_eq!(run(&fx, "guarded").await, Ok(json!({"response": {"result": true}})));
  assert_eq!(fx.calls(), 1);
}

#[tokio::test]
async fn plain_string_becomes_script_failed() {
  let fx = init();
  fx.register("bad", Err(Failure::from("bad input")));

  assert_eq!(run(&fx, "bad").await, Err(Error::script_failed("bad input")));
  assert_eq!(fx.hooks.failed.lock().unwrap().len(), 1);
  assert!(fx.hooks.faults.lock().unwrap().is_empty());
}

#[tokio::test]
async fn typed_errors_pass_through() {
  let fx = init();
  let typed = Error::new(Kind::Code(101), "Object not found.");
  fx.register("typed", Err(Failure::from(typed.clone())));

  assert_eq!(run(&fx, "typed").await, Err(typed));
}

#[tokio::test]
async fn cloud_errors_unwrap_to_their_message() {
  let fx = init();
  fx.register("cloudy", Err(Failure::from(CloudError::new("Out of stock"))));

  assert_eq!(run(&fx, "cloudy").await, Err(Error::script_failed("Out of stock")));
  assert!(fx.hooks.faults.lock().unwrap().is_empty());
}

#[tokio::test]
async fn internal_faults_are_hidden_from_the_caller() {
  let fx = init();
  let io = std::io::Error::new(std::io::ErrorKind::Other, "db password is hunter2");
  fx.register("crashy", Err(Failure::fault(&io)));

  assert_eq!(run(&fx, "crashy").await, Err(Error::script_failed(DEFAULT_CRASH_MESSAGE)));

  let faults = fx.hooks.faults.lock().unwrap().clone();
  assert_eq!(faults.len(), 1);
  assert!(faults[0].0.contains("hunter2"));
  assert_eq!(faults[0].1, Some("u1".to_string()));
}

#[tokio::test]
async fn panicking_function_is_an_internal_fault() {
  let fx = init();
  fx.registry.register_function(APP,
                                "panicky",
                                registry::function(|_| async {
                                  if true {
                                    panic!("index out of bounds: secret");
                                  }
                                  Ok(Value::Null)
                                }));

  assert_eq!(run(&fx, "panicky").await, Err(Error::script_failed(DEFAULT_CRASH_MESSAGE)));

  let faults = fx.hooks.faults.lock().unwrap().clone();
  assert_eq!(faults.len(), 1);
  assert!(faults[0].0.contains("secret"));
}

#[tokio::test]
async fn function_panicking_before_its_future_is_an_internal_fault() {
  let fx = init();
  fx.registry.register_function(APP,
                                "eager",
                                registry::function(|_| {
                                  if true {
                                    panic!("eager secret");
                                  }
                                  async { Ok(Value::Null) }
                                }));

  assert_eq!(run(&fx, "eager").await, Err(Error::script_failed(DEFAULT_CRASH_MESSAGE)));

  let faults = fx.hooks.faults.lock().unwrap().clone();
  assert_eq!(faults.len(), 1);
  assert!(faults[0].0.contains("eager secret"));
}

#[tokio::test]
async fn panicking_validator_reaches_the_crash_hook() {
  let fx = init();
  fx.register("guarded", Ok(Value::Null));
  fx.registry.register_validator(APP,
                                 "guarded",
                                 registry::validator(|_| async {
                                   if true {
                                     panic!("validator secret");
                                   }
                                   Ok(true)
                                 }));

  assert_eq!(run(&fx, "guarded").await,
             Err(Error::validation_failed(VALIDATION_FAILED)));
  assert_eq!(fx.calls(), 0);

  let faults = fx.hooks.faults.lock().unwrap().clone();
  assert_eq!(faults.len(), 1);
  assert!(faults[0].0.contains("validator secret"));
  assert_eq!(faults[0].1, Some("u1".to_string()));
}

#[tokio::test]
async fn other_values_are_wrapped_as_is() {
  let fx = init();
  fx.register("weird", Err(Failure::from(json!({"reason": 7}))));

  assert_eq!(run(&fx, "weird").await, Err(Error::script_failed(r#"{"reason":7}"#)));
}

#[tokio::test]
async fn failing_hooks_do_not_mask_the_error() {
  simple_logger::SimpleLogger::new().init().ok();

  let registry = MemRegistry::new();
  let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
  let fault = Failure::fault(&io);
  registry.register_function(APP,
                             "crashy",
                             registry::function(move |_| {
                               let fault = fault.clone();
                               async move { Err(fault) }
                             }));

  let state = State::new(Config::default(),
                         Arc::new(registry),
                         Arc::new(Mutex::new(StoreData::new()))).with_hooks(Arc::new(Broken));

  assert_eq!(function::run(&Arc::new(state), call("crashy")).await,
             Err(Error::script_failed(DEFAULT_CRASH_MESSAGE)));
}

#[tokio::test]
async fn params_are_decoded_before_the_function_runs() {
  let fx = init();
  fx.registry.register_function(APP,
                                "when",
                                registry::function(|req| {
                                  let iso = req.params.get("at").and_then(Value::as_date).map(|d| d.iso());
                                  async move { iso.map(Value::from).ok_or_else(|| Failure::from("no date")) }
                                }));

  let mut c = call("when");
  c.body = match json!({"at": {"__type": "Date", "iso": "2020-01-01T00:00:00Z"}}) {
    | serde_json::Value::Object(map) => map,
    | _ => unreachable!(),
  };

  let reply = function::run(&fx.state, c).await.unwrap();
  assert_eq!(reply.response.result, json!("2020-01-01T00:00:00.000Z"));
}

#[tokio::test]
async fn audit_entries_are_written_for_both_outcomes() {
  let fx = init();
  fx.register("ok", Ok(Value::from("a very long result string")));
  fx.register("bad", Err(Failure::from("nope")));

  run(&fx, "ok").await.unwrap();
  run(&fx, "bad").await.unwrap_err();

  let info = fx.audit.info.lock().unwrap().clone();
  assert_eq!(info.len(), 1);
  assert!(info[0].starts_with("Ran cloud function ok for user u1"));
  assert!(info[0].contains("Result: \"a very lo"));

  let error = fx.audit.error.lock().unwrap().clone();
  assert_eq!(error.len(), 1);
  assert!(error[0].starts_with("Failed running cloud function bad for user u1"));
}

#[tokio::test]
async fn responder_fires_exactly_one_sink() {
  let fx = init();
  let successes = AtomicUsize::new(0);
  let errors = AtomicUsize::new(0);

  let on_success = |_: Reply| {
    successes.fetch_add(1, Ordering::SeqCst);
  };
  let on_error = |_: Error| {
    errors.fetch_add(1, Ordering::SeqCst);
  };

  Responder::new(&fx.state, None, on_success, on_error).success(&Value::from(1i64));
  Responder::new(&fx.state, None, on_success, on_error).error(Failure::from("x"));
  Responder::new(&fx.state, None, on_success, on_error).settle(Err(Failure::Fault(Fault { message: "m".into(),
                                                                                          trace: "t".into() })));

  assert_eq!(successes.load(Ordering::SeqCst), 1);
  assert_eq!(errors.load(Ordering::SeqCst), 2);
}
