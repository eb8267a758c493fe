//! Tests for step trace sinks

use prometheus_des::core::{Environment, InMemoryTraceSink, Priority, TraceSink, Until, Value};

#[test]
fn test_trace_sink_records_steps() {
    let sink = InMemoryTraceSink::new(16);
    let env = Environment::new().with_trace_sink(sink.clone());
    let t = env.timeout(2.0).unwrap();
    let e = env.clone();
    env.process(async move {
        e.timeout(1.0)?.await?;
        Ok(Value::none())
    });
    env.run(Until::Forever).unwrap();

    let records = sink.records();
    let kinds: Vec<&str> = records.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec!["init", "timeout", "process", "timeout"]);
    assert_eq!(records[0].priority, Priority::Urgent);
    assert_eq!(records.last().map(|r| r.event), Some(t.id()));
    assert!(records.iter().all(|r| r.ok));
    assert!(records.windows(2).all(|w| w[0].time <= w[1].time));
}

#[test]
fn test_trace_sink_overflow() {
    let mut sink = InMemoryTraceSink::new(2);
    let env = Environment::new().with_trace_sink(sink.clone());
    for delay in [1.0, 2.0, 3.0] {
        env.timeout(delay).unwrap();
    }
    env.run(Until::Forever).unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].time, 2.0);
    assert_eq!(records[1].time, 3.0);

    let extra = records[0].clone();
    sink.record(extra);
    assert_eq!(sink.len(), 2);
    assert_eq!(sink.records()[0].time, 3.0);
}

#[test]
fn test_trace_sink_json() {
    let sink = InMemoryTraceSink::new(4);
    let env = Environment::new().with_trace_sink(sink.clone());
    env.timeout(1.5).unwrap();
    env.run(Until::Forever).unwrap();

    let json: serde_json::Value = serde_json::from_str(&sink.to_json().unwrap()).unwrap();
    assert_eq!(json[0]["time"], 1.5);
    assert_eq!(json[0]["kind"], "timeout");
    assert_eq!(json[0]["priority"], "normal");
    assert_eq!(json[0]["ok"], true);
}
