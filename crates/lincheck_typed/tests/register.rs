use {
    lincheck_typed::{
        check_events, check_events_verbose, check_operations, check_operations_timeout,
        check_operations_verbose, to_typed_operations, visualize, visualize_path, CheckResult,
        Event, LinearizationInfo, Model, Operation, Value,
    },
    std::{
        collections::BTreeMap,
        io::{self, Write},
        time::Duration,
    },
};

#[derive(Clone, Debug, Default, PartialEq)]
enum KvInput {
    #[default]
    Noop,
    Get(String),
    Put(String, String),
}

impl KvInput {
    fn key(&self) -> &str {
        match self {
            KvInput::Noop => "",
            KvInput::Get(k) | KvInput::Put(k, _) => k,
        }
    }
}

fn get(key: &str) -> KvInput {
    KvInput::Get(key.to_string())
}

fn put(key: &str, value: &str) -> KvInput {
    KvInput::Put(key.to_string(), value.to_string())
}

/// A single-key register. Partitioning by key lets the same model describe a whole store.
fn kv_model() -> Model<String, KvInput, String> {
    Model::new(String::new, |state: &String, input: &KvInput, output: &String| {
        match input {
            KvInput::Noop => (true, state.clone()),
            KvInput::Get(_) => (output == state, state.clone()),
            KvInput::Put(_, v) => (true, v.clone()),
        }
    })
    .partition(|history| {
        let mut by_key: BTreeMap<String, Vec<Operation<KvInput, String>>> = BTreeMap::new();
        for op in history {
            by_key
                .entry(op.input.key().to_string())
                .or_default()
                .push(op.clone());
        }
        by_key.into_values().collect()
    })
    .describe_operation(|input, output| match input {
        KvInput::Noop => "noop".to_string(),
        KvInput::Get(k) => format!("get({k:?}) -> {output:?}"),
        KvInput::Put(k, v) => format!("put({k:?}, {v:?})"),
    })
    .describe_state(|state| format!("{state:?}"))
}

fn op(
    client_id: usize,
    input: KvInput,
    call: i64,
    output: &str,
    ret: i64,
) -> Operation<KvInput, String> {
    Operation {
        client_id,
        input,
        call,
        output: output.to_string(),
        ret,
    }
}

fn visualize_temp_file(model: &Model<String, KvInput, String>, info: &LinearizationInfo) -> String {
    let file = tempfile::NamedTempFile::new().unwrap();
    visualize_path(model, info, file.path()).unwrap();
    std::fs::read_to_string(file.path()).unwrap()
}

#[test]
fn partitioned_store_is_linearizable() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let model = kv_model();
    let history = vec![
        op(0, put("x", "1"), 0, "", 10),
        op(1, put("y", "2"), 1, "", 3),
        op(2, get("x"), 2, "1", 12),
        op(1, get("y"), 4, "2", 6),
        op(3, get("x"), 13, "1", 14),
    ];
    assert!(check_operations(&model, &history));
    assert_eq!(
        check_operations_timeout(&model, &history, Duration::from_secs(10)),
        CheckResult::Ok
    );

    let (result, info) = check_operations_verbose(&model, &history, Duration::ZERO);
    assert_eq!(result, CheckResult::Ok);
    assert_eq!(info.partition_count(), 2);

    let html = visualize_temp_file(&model, &info);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("put(\\\"x\\\", \\\"1\\\")"));
    assert!(html.contains("get(\\\"y\\\") -> \\\"2\\\""));
}

#[test]
fn stale_read_is_illegal() {
    let model = kv_model();
    let history = vec![
        op(0, put("x", "1"), 0, "", 10),
        op(1, put("y", "2"), 0, "", 10),
        op(2, get("y"), 20, "2", 30),
        op(2, get("x"), 40, "", 50),
    ];
    assert!(!check_operations(&model, &history));

    let (result, info) = check_operations_verbose(&model, &history, Duration::ZERO);
    assert_eq!(result, CheckResult::Illegal);
    // The "x" partition only gets as far as the write.
    assert_eq!(info.partial_linearizations(0), &[vec![0]]);

    let mut html = Vec::new();
    visualize(&model, &info, &mut html).unwrap();
    let html = String::from_utf8(html).unwrap();
    assert!(html.contains("get(\\\"x\\\") -> \\\"\\\""));
}

#[test]
fn event_histories_use_relative_order() {
    let model = kv_model();
    let history = vec![
        Event::call(0, 0, put("x", "1")),
        Event::call(1, 1, get("x")),
        Event::ret(1, 1, "1".to_string()),
        Event::ret(0, 0, String::new()),
    ];
    assert!(check_events(&model, &history));

    let history = vec![
        Event::call(0, 0, put("x", "1")),
        Event::ret(0, 0, String::new()),
        Event::call(1, 1, get("x")),
        Event::ret(1, 1, String::new()),
    ];
    let (result, info) = check_events_verbose(&model, &history, Duration::ZERO);
    assert_eq!(result, CheckResult::Illegal);
    assert_eq!(info.partition_count(), 1);
}

#[test]
fn partitions_event_histories() {
    let model = kv_model().partition_event(|history| {
        let mut keys: BTreeMap<usize, String> = BTreeMap::new();
        let mut by_key: BTreeMap<String, Vec<Event<KvInput, String>>> = BTreeMap::new();
        for event in history {
            let key = keys
                .entry(event.id)
                .or_insert_with(|| event.input.key().to_string())
                .clone();
            by_key.entry(key).or_default().push(event.clone());
        }
        by_key.into_values().collect()
    });
    assert!(model.capabilities().partition_event);

    let history = vec![
        Event::call(0, 0, put("x", "1")),
        Event::call(1, 1, put("y", "2")),
        Event::ret(0, 0, String::new()),
        Event::ret(1, 1, String::new()),
        Event::call(0, 2, get("y")),
        Event::ret(0, 2, "2".to_string()),
        Event::call(1, 3, get("x")),
        Event::ret(1, 3, "1".to_string()),
    ];
    let (result, info) = check_events_verbose(&model, &history, Duration::ZERO);
    assert_eq!(result, CheckResult::Ok);
    assert_eq!(info.partition_count(), 2);
}

struct FailingSink;

impl Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn sink_errors_propagate() {
    let model = kv_model();
    let history = vec![op(0, put("x", "1"), 0, "", 10)];
    let (_, info) = check_operations_verbose(&model, &history, Duration::ZERO);
    let err = visualize(&model, &info, FailingSink).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    assert_eq!(err.to_string(), "sink closed");

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing").join("out.html");
    let err = visualize_path(&model, &info, &missing).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
}

#[test]
#[should_panic(expected = "model contract violated: input")]
fn mismatched_history_panics_during_check() {
    let history = vec![lincheck::Operation {
        client_id: 0,
        input: Value::new(42u64),
        call: 0,
        output: Value::new(String::new()),
        ret: 1,
    }];
    lincheck::check_operations(&kv_model().to_model(), &history);
}

#[test]
#[should_panic(expected = "model contract violated: output")]
fn mismatched_history_panics_on_conversion() {
    let history = vec![lincheck::Operation {
        client_id: 0,
        input: Value::new(get("x")),
        call: 0,
        output: Value::new(7u8),
        ret: 1,
    }];
    to_typed_operations::<KvInput, String>(&history);
}
