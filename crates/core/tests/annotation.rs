//! Type annotation parsing tests.

use fnserve_core::{AnnotationKind, TypeAnnotation};

#[test]
fn parse_plain_path() {
    let ty = TypeAnnotation::parse("String");
    assert_eq!(ty.kind(), AnnotationKind::Path);
    assert_eq!(ty.name(), "String");
    assert!(ty.args().is_empty());
}

#[test]
fn parse_token_printed_generics() {
    // `quote!` prints types with spaces around punctuation.
    let ty = TypeAnnotation::parse("std :: collections :: HashMap < String , Vec < i64 > >");
    assert_eq!(ty.name(), "HashMap");
    assert_eq!(ty.args().len(), 2);
    assert_eq!(ty.args()[1].name(), "Vec");
    assert_eq!(ty.to_string(), "std::collections::HashMap<String, Vec<i64>>");
}

#[test]
fn parse_impl_iterator_binding() {
    let ty = TypeAnnotation::parse("impl Iterator<Item = u32> + Send + 'static");
    assert_eq!(ty.kind(), AnnotationKind::Impl);
    assert_eq!(ty.name(), "Iterator");
    assert_eq!(ty.binding("Item").map(TypeAnnotation::name), Some("u32"));
    assert_eq!(ty.sequence_item().map(TypeAnnotation::name), Some("u32"));
}

#[test]
fn boxed_dyn_stream_is_a_sequence() {
    let ty = TypeAnnotation::parse("Pin<Box<dyn Stream<Item = String> + Send>>");
    assert_eq!(ty.sequence_item().map(TypeAnnotation::name), Some("String"));

    let ty = TypeAnnotation::parse("BoxStream<'static, f64>");
    assert_eq!(ty.sequence_item().map(TypeAnnotation::name), Some("f64"));
}

#[test]
fn references_slices_and_tuples() {
    let ty = TypeAnnotation::parse("&'a mut [u8]");
    assert_eq!(ty.kind(), AnnotationKind::Reference);
    assert_eq!(ty.peel().kind(), AnnotationKind::Slice);

    let ty = TypeAnnotation::parse("[u8; 32]");
    assert_eq!(ty.kind(), AnnotationKind::Slice);
    assert_eq!(ty.first_arg().map(TypeAnnotation::name), Some("u8"));

    assert!(TypeAnnotation::parse("()").is_unit());
    assert_eq!(TypeAnnotation::parse("(i32,)").to_string(), "(i32,)");
    assert_eq!(TypeAnnotation::parse("(i32, String)").args().len(), 2);
}

#[test]
fn result_outcome_looks_through_one_layer() {
    let ty = TypeAnnotation::parse("Result<Vec<String>, anyhow::Error>");
    assert_eq!(ty.outcome().name(), "Vec");

    let ty = TypeAnnotation::parse("anyhow::Result<u8>");
    assert_eq!(ty.outcome().name(), "u8");
}

#[test]
fn unparseable_text_is_opaque() {
    let ty = TypeAnnotation::parse("fn(u8) -> u8");
    assert_eq!(ty.kind(), AnnotationKind::Opaque);
    assert_eq!(ty.to_string(), "fn(u8) -> u8");
    assert!(ty.sequence_item().is_none());

    let ty = TypeAnnotation::parse("Vec<String");
    assert_eq!(ty.kind(), AnnotationKind::Opaque);
}
