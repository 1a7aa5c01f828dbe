//! Metrics/tracing hooks.
//!
//! No subscriber is installed here; binaries and tests pick one.

/// Emit `key_values` as events inside a `docsim` span named after `event`.
pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::span!(tracing::Level::DEBUG, "docsim", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::debug!(%event, %k, %v, "metric");
    }
}
