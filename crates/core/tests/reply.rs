//! Reply and sequence tests.

use fnserve_core::{Error, Reply, guarded, run_blocking};
use futures_util::stream;
use serde_json::json;

async fn drain(reply: Reply) -> Vec<Result<serde_json::Value, Error>> {
    let Reply::Sequence(mut seq) = reply else {
        panic!("expected a sequence");
    };
    let mut items = Vec::new();
    while let Some(item) = seq.next().await {
        items.push(item);
    }
    items
}

#[tokio::test]
async fn iterator_elements_arrive_in_order() {
    let reply = Reply::iter_blocking(|| ["a", "b", "c"]).unwrap();
    let items: Vec<_> = drain(reply)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(items, [json!("a"), json!("b"), json!("c")]);
}

#[tokio::test]
async fn panicking_iterator_ends_with_an_error() {
    let reply = Reply::iter_blocking(|| {
        (0..3).map(|i| {
            if i == 2 {
                panic!("ran dry");
            }
            i
        })
    })
    .unwrap();

    let items = drain(reply).await;
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap(), &json!(0));
    assert_eq!(items[1].as_ref().unwrap(), &json!(1));
    let err = items[2].as_ref().unwrap_err();
    assert_eq!(err.to_string(), "function panicked: ran dry");
}

#[tokio::test]
async fn async_streams_are_forwarded() {
    let reply = Reply::stream(stream::iter(vec![1.5, 2.5])).unwrap();
    let items: Vec<_> = drain(reply)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(items, [json!(1.5), json!(2.5)]);
}

#[tokio::test]
async fn run_blocking_turns_panics_into_errors() {
    assert_eq!(run_blocking(|| 40 + 2).await.unwrap(), 42);

    let err = run_blocking(|| -> u8 { panic!("bad input") })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Execution(_)));
    assert_eq!(err.to_string(), "function panicked: bad input");
}

#[tokio::test]
async fn guarded_catches_async_panics() {
    let err = guarded(async {
        if true {
            panic!("{} went wrong", "it");
        }
        Ok::<_, Error>(())
    })
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "function panicked: it went wrong");
}

#[test]
fn results_map_to_execution_errors() {
    let reply = Reply::from_result::<u8, _>(Err("no such file")).unwrap_err();
    assert!(matches!(reply, Error::Execution(ref e) if e == "no such file"));

    let Ok(Reply::Value(value)) = Reply::from_result::<_, String>(Ok(vec![1, 2])) else {
        panic!("expected a value");
    };
    assert_eq!(value, json!([1, 2]));

    assert!(matches!(
        Reply::streamed_result::<(), _>(Err("cut off")),
        Err(Error::Execution(_))
    ));
}

#[test]
fn returned_transport_errors_keep_their_kind() {
    let err = Reply::from_result::<u8, _>(Err(Error::Transport("gone".into()))).unwrap_err();
    assert!(err.is_transport());

    let err = Reply::from_result::<u8, _>(Err(Error::Unsupported("no human".into()))).unwrap_err();
    assert!(matches!(err, Error::Execution(ref e) if e == "no human"));
}
