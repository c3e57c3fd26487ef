//! Execution mode classification tests.

use fnserve_core::{ExecutionMode, TypeAnnotation};

fn classify(ty: &str) -> ExecutionMode {
    ExecutionMode::classify(Some(&TypeAnnotation::parse(ty)))
}

#[test]
fn plain_values_are_simple() {
    assert_eq!(ExecutionMode::classify(None), ExecutionMode::Simple);
    assert_eq!(classify("String"), ExecutionMode::Simple);
    assert_eq!(classify("Vec<u8>"), ExecutionMode::Simple);
    assert_eq!(classify("Result<(), String>"), ExecutionMode::Simple);
}

#[test]
fn iterators_and_streams_are_lazy() {
    assert_eq!(classify("impl Iterator<Item = String>"), ExecutionMode::LazySequence);
    assert_eq!(
        classify("Box<dyn Iterator<Item = i32> + Send>"),
        ExecutionMode::LazySequence
    );
    assert_eq!(
        classify("impl futures::Stream<Item = f64> + Send"),
        ExecutionMode::LazySequence
    );
    assert_eq!(
        classify("Result<impl Iterator<Item = u8>, std::io::Error>"),
        ExecutionMode::LazySequence
    );
}

#[test]
fn streaming_response_is_external() {
    assert_eq!(classify("StreamingResponse"), ExecutionMode::ExternallyStreaming);
    assert_eq!(
        classify("fnserve::StreamingResponse"),
        ExecutionMode::ExternallyStreaming
    );
    assert_eq!(
        classify("anyhow::Result<StreamingResponse>"),
        ExecutionMode::ExternallyStreaming
    );
}

#[test]
fn only_simple_fits_one_response() {
    assert!(!ExecutionMode::Simple.is_streaming());
    assert!(ExecutionMode::LazySequence.is_streaming());
    assert!(ExecutionMode::ExternallyStreaming.is_streaming());
    assert_eq!(
        serde_json::to_string(&ExecutionMode::LazySequence).unwrap(),
        "\"lazy_sequence\""
    );
}
