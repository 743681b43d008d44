//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use cmdpipe::pipeline::PipelineOutcome;
use cmdpipe::Value;
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(2000)
}

/// Int values, for comparing against pipeline output
pub fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

/// Error ids of every error record the host received
pub fn error_ids(outcome: &PipelineOutcome) -> Vec<String> {
    outcome
        .errors()
        .into_iter()
        .map(|e| e.error_id.clone())
        .collect()
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
