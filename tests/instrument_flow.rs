//! End-to-end instrument scenarios: event ordering, elapsed timing, and the
//! absorb-and-report failure path.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use pulse::bus::{ChannelEvent, ChannelRegistry, EventPayload, Observer};
use pulse::gate::StaticGate;
use pulse::instrument::OperationInstrument;

type EventLog = Arc<Mutex<Vec<(String, EventPayload)>>>;

fn attach_collector(instrument: &OperationInstrument) -> EventLog {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    instrument
        .channel()
        .subscribe(Observer::new(move |event: &ChannelEvent| {
            sink.lock().push((event.key.clone(), event.payload.clone()));
        }));
    log
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_operation_emits_ordered_lifecycle() {
    let registry = ChannelRegistry::new();
    let instrument =
        OperationInstrument::new(&registry, "SomeRandomJob", Arc::new(StaticGate(true))).unwrap();
    let events = attach_collector(&instrument);

    let result = instrument
        .execute(
            "Run",
            || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, anyhow::Error>("Success".to_string())
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(result, Some("Success".to_string()));

    let seen = events.lock();
    let keys: Vec<&str> = seen.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "SomeRandomJob.Run.Start",
            "SomeRandomJob.Run.Stop",
            "SomeRandomJob.Run.ElapsedMs",
            "SomeRandomJob.Run.Stop",
        ]
    );

    assert_eq!(seen[0].1, EventPayload::Empty);
    assert_eq!(seen[1].1, EventPayload::Text("Success".to_string()));
    match seen[2].1 {
        EventPayload::Number(elapsed) => {
            assert!(elapsed >= 50, "elapsed {elapsed} below the 50ms sleep");
            assert!(elapsed < 5000, "elapsed {elapsed} implausibly large");
        }
        ref other => panic!("expected numeric elapsed, got {other:?}"),
    }
    match &seen[3].1 {
        EventPayload::Text(text) => assert!(text.contains("completed in")),
        other => panic!("expected textual stop, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_operation_reports_error_without_stop_result() {
    let registry = ChannelRegistry::new();
    let instrument =
        OperationInstrument::new(&registry, "SomeRandomJob", Arc::new(StaticGate(true))).unwrap();
    let events = attach_collector(&instrument);

    let result: Option<String> = instrument
        .execute(
            "Run",
            || async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err(anyhow::anyhow!("boom"))
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(result, None, "failure must be absorbed, not returned");

    let seen = events.lock();
    let keys: Vec<&str> = seen.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "SomeRandomJob.Run.Start",
            "SomeRandomJob.Run.Error",
            "SomeRandomJob.Run.ElapsedMs",
            "SomeRandomJob.Run.Stop",
        ]
    );

    match &seen[1].1 {
        EventPayload::Failure(info) => {
            assert!(info.message.contains("boom"));
            assert!(info.message.contains("SomeRandomJob.Run"));
        }
        other => panic!("expected failure payload, got {other:?}"),
    }
    // The only Stop is the textual completion message; no Stop-with-result.
    match &seen[3].1 {
        EventPayload::Text(text) => assert!(text.contains("completed in")),
        other => panic!("expected textual stop, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn gate_disabled_returns_result_with_zero_events() {
    let registry = ChannelRegistry::new();
    let instrument =
        OperationInstrument::new(&registry, "SomeRandomJob", Arc::new(StaticGate(false))).unwrap();
    let events = attach_collector(&instrument);

    let result = instrument
        .execute(
            "Run",
            || async { Ok::<_, anyhow::Error>(41u32 + 1) },
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(result, Some(42));
    assert!(events.lock().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_invocations_keep_per_invocation_order() {
    let registry = ChannelRegistry::new();
    let instrument = Arc::new(
        OperationInstrument::new(&registry, "SomeRandomJob", Arc::new(StaticGate(true))).unwrap(),
    );
    let events = attach_collector(&instrument);

    let mut handles = Vec::new();
    for index in 0..4u64 {
        let instrument = Arc::clone(&instrument);
        handles.push(tokio::spawn(async move {
            let name = format!("Op{index}");
            instrument
                .execute(
                    &name,
                    move || async move {
                        tokio::time::sleep(Duration::from_millis(5 * (index + 1))).await;
                        Ok::<_, anyhow::Error>(format!("result-{index}"))
                    },
                    &CancellationToken::new(),
                )
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }

    let seen = events.lock();
    for index in 0..4u64 {
        let prefix = format!("SomeRandomJob.Op{index}.");
        let sequence: Vec<&str> = seen
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.rsplit('.').next().unwrap())
            .collect();
        assert_eq!(
            sequence,
            vec!["Start", "Stop", "ElapsedMs", "Stop"],
            "invocation {index} events out of order"
        );
    }
}
