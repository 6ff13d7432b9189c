//! Item pipelines: load/render chaining, vetoes, unload and enable/disable.

mod common;

use anyhow::anyhow;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use delivery_runner::{ItemStage, RunnerProvider};

fn item_provider(log: &Log) -> RunnerProvider {
    let render_log = log.clone();
    base_provider()
        .item(ItemStage::LoadItem, |_, item_ref, _| async move {
            Ok(json!(item_ref.to_uppercase()))
        })
        .item(ItemStage::RenderItem, move |_, item_ref, data| {
            let log = render_log.clone();
            async move {
                push(&log, format!("provider:renderItem({},{})", item_ref, data));
                Ok(Value::Null)
            }
        })
}

#[tokio::test]
async fn test_load_item_renders_it() {
    let log = new_log();
    let runner = create_runner(item_provider(&log));
    record(&runner, &log, &["loaditem", "renderitem"]);

    runner.init().await;
    assert!(runner.get_state("ready"));

    runner.load_item("zzz").await;

    assert_eq!(
        entries(&log),
        vec![
            "loaditem(\"zzz\",\"ZZZ\")",
            "provider:renderItem(zzz,\"ZZZ\")",
            "renderitem(\"zzz\",\"ZZZ\")",
        ]
    );
    assert!(runner.get_item_state("zzz", "loaded").unwrap());
    assert!(runner.get_item_state("zzz", "ready").unwrap());
}

// Item calls are not serialized: overlapping loads complete in provider order,
// not in call order.
#[tokio::test]
async fn test_concurrent_loads_land_in_completion_order() {
    let provider = base_provider().item(ItemStage::LoadItem, |_, item_ref, _| async move {
        let delay = if item_ref == "slow" { 40 } else { 5 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(json!(item_ref))
    });
    let runner = create_runner(provider);
    let log = new_log();
    record(&runner, &log, &["loaditem"]);
    let seen = log.clone();
    runner.on("loaditem", move |runner, event| {
        let log = seen.clone();
        async move {
            let slow_loaded = runner.get_item_state("slow", "loaded")?;
            push(&log, format!("{} sees slow loaded={}", event.arg_str(0).unwrap_or_default(), slow_loaded));
            Ok(())
        }
    });

    tokio::join!(runner.load_item("slow"), runner.load_item("fast"));

    assert_eq!(
        entries(&log),
        vec![
            "loaditem(\"fast\",\"fast\")",
            "fast sees slow loaded=false",
            "loaditem(\"slow\",\"slow\")",
            "slow sees slow loaded=true",
        ]
    );
    assert!(runner.get_item_state("fast", "loaded").unwrap());
    assert!(runner.get_item_state("slow", "loaded").unwrap());
}

#[tokio::test]
async fn test_loaditem_listener_vetoes_render() {
    let log = new_log();
    let runner = create_runner(item_provider(&log));
    runner.on("loaditem", |_, _| async { Err(anyhow!("not this one")) });
    record(&runner, &log, &["renderitem"]);

    runner.init().await;
    runner.load_item("x").await;

    assert!(entries(&log).is_empty());
    assert!(runner.get_item_state("x", "loaded").unwrap());
    assert!(!runner.get_item_state("x", "ready").unwrap());
}

#[tokio::test]
async fn test_load_item_without_provider_hook() {
    let runner = create_runner(base_provider());
    let log = new_log();
    record(&runner, &log, &["loaditem", "renderitem"]);

    runner.load_item("item-1").await;

    assert_eq!(
        entries(&log),
        vec!["loaditem(\"item-1\",null)", "renderitem(\"item-1\",null)"]
    );
}

#[tokio::test]
async fn test_load_item_failure_is_reported() {
    let provider = base_provider().item(ItemStage::LoadItem, |_, _, _| async {
        Err(anyhow!("item not found"))
    });
    let runner = create_runner(provider);
    let errors = record_errors(&runner);
    let log = new_log();
    record(&runner, &log, &["loaditem"]);

    runner.load_item("missing").await;

    assert_eq!(entries(&errors), vec!["item not found"]);
    assert!(entries(&log).is_empty());
    assert!(!runner.get_item_state("missing", "loaded").unwrap());
}

#[tokio::test]
async fn test_empty_item_ref_is_reported() {
    let runner = create_runner(base_provider());
    let errors = record_errors(&runner);

    runner.load_item("").await;
    runner.unload_item("").await;

    assert_eq!(entries(&errors).len(), 2);
}

#[tokio::test]
async fn test_unload_item_drops_states() {
    let log = new_log();
    let runner = create_runner(item_provider(&log));
    record(&runner, &log, &["unloaditem"]);

    runner.load_item("item-1").await;
    runner.set_item_state("item-1", "visited", true).unwrap();
    runner.unload_item("item-1").await;

    assert_eq!(entries(&log).last().map(String::as_str), Some("unloaditem(\"item-1\")"));
    assert!(!runner.get_item_state("item-1", "loaded").unwrap());
    assert!(!runner.get_item_state("item-1", "visited").unwrap());
    assert!(runner.item_state("item-1").flags().values().all(|flag| !flag));
}

#[tokio::test]
async fn test_disable_item_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let provider = base_provider().item(ItemStage::DisableItem, move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(Value::Null) }
    });
    let runner = create_runner(provider);
    let log = new_log();
    record(&runner, &log, &["disableitem", "enableitem"]);

    runner.disable_item("item-1").await;
    runner.disable_item("item-1").await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(entries(&log), vec!["disableitem(\"item-1\")"]);
    assert!(runner.get_item_state("item-1", "disabled").unwrap());

    runner.enable_item("item-1").await;
    runner.enable_item("item-1").await;

    assert_eq!(
        entries(&log),
        vec!["disableitem(\"item-1\")", "enableitem(\"item-1\")"]
    );
    assert!(!runner.get_item_state("item-1", "disabled").unwrap());
}

#[tokio::test]
async fn test_enable_item_already_enabled() {
    let runner = create_runner(base_provider());
    let log = new_log();
    record(&runner, &log, &["enableitem"]);

    runner.enable_item("item-1").await;

    assert!(entries(&log).is_empty());
}
