//! Tests for telemetry helpers

use prometheus_des::util::{init_tracing, init_tracing_with};

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing_with("prometheus_des=debug");
    init_tracing();
    init_tracing_with("off");
    tracing::debug!("tracing initialized");
}
