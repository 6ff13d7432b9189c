//! Plugins driven by the runner, their config and the namespaced plugin events.

mod common;

use anyhow::anyhow;
use serde_json::json;

use common::*;
use delivery_runner::{PluginDefinition, RunnerConfig, RunnerFactory, Stage};

fn timer_plugin(log: &Log) -> PluginDefinition {
    let log = log.clone();
    PluginDefinition::new("timer").hook(Stage::Init, move |context| {
        let log = log.clone();
        async move {
            push(&log, format!("timer config {}", context.config()));
            Ok(())
        }
    })
}

#[tokio::test]
async fn test_basic_plugin_lifecycle() {
    let log = new_log();
    let config = RunnerConfig::new().with_plugin_config("timer", json!({ "max": 30 }));

    let factory = RunnerFactory::new();
    factory.register_provider("mock", base_provider()).unwrap();
    let runner = factory
        .create("mock", vec![timer_plugin(&log).factory()], config)
        .unwrap();
    record(&runner, &log, &["plugin-install", "plugin-init", "plugin-render"]);

    runner.init().await;

    assert_eq!(
        entries(&log),
        vec![
            "plugin-install(\"timer\")",
            "timer config {\"max\":30}",
            "plugin-init(\"timer\")",
            "plugin-render(\"timer\")",
        ]
    );

    let plugin = runner.plugin("timer").unwrap();
    assert!(plugin.get_state("install"));
    assert!(plugin.get_state("init"));
    assert!(plugin.get_state("render"));
    assert!(!plugin.get_state("finish"));
    assert!(plugin.set_state("", true).is_err());
}

#[tokio::test]
async fn test_plugin_config_queries() {
    let config = RunnerConfig::new()
        .with_plugin_config("timer", json!({ "max": 30 }))
        .with_plugin_config("ghost", json!({ "boo": true }));

    let factory = RunnerFactory::new();
    factory.register_provider("mock", base_provider()).unwrap();
    let runner = factory
        .create("mock", vec![PluginDefinition::new("timer").factory()], config)
        .unwrap();

    // plugins are only known once the runner is initialized
    assert_eq!(runner.plugin_config("timer"), json!({}));
    runner.init().await;

    assert_eq!(runner.plugin_config("timer"), json!({ "max": 30 }));
    assert_eq!(runner.plugin_config("ghost"), json!({}));
    assert_eq!(runner.plugin_config(""), json!({}));
    assert_eq!(runner.plugins_config().len(), 2);
}

#[tokio::test]
async fn test_plugin_order_and_collisions() {
    let factory = RunnerFactory::new();
    factory.register_provider("mock", base_provider()).unwrap();
    let runner = factory
        .create(
            "mock",
            vec![
                PluginDefinition::new("timer").factory(),
                PluginDefinition::new("calculator").factory(),
                PluginDefinition::new("timer").factory(),
            ],
            RunnerConfig::new(),
        )
        .unwrap();

    runner.init().await;

    let names: Vec<String> = runner.plugins().iter().map(|p| p.name().to_string()).collect();
    assert_eq!(names, vec!["timer", "calculator"]);
    assert!(runner.plugin("highlighter").is_none());
}

#[tokio::test]
async fn test_plugin_context_reaches_runner() {
    let log = new_log();
    let seen = log.clone();
    let definition = PluginDefinition::new("probe").hook(Stage::Render, move |context| {
        let log = seen.clone();
        async move {
            let runner = context.runner().ok_or_else(|| anyhow!("runner gone"))?;
            push(&log, format!("ready={}", runner.get_state("ready")));
            push(&log, format!("area={:?}", context.area_broker().get_area("content")));
            Ok(())
        }
    });

    let factory = RunnerFactory::new();
    factory.register_provider("mock", base_provider()).unwrap();
    let runner = factory
        .create("mock", vec![definition.factory()], RunnerConfig::new())
        .unwrap();
    runner.init().await;

    assert_eq!(
        entries(&log),
        vec!["ready=false", "area=Some(\"content-area\")"]
    );
}

#[tokio::test]
async fn test_plugin_hook_failure_is_reported() {
    let definition = PluginDefinition::new("broken")
        .hook(Stage::Finish, |_| async { Err(anyhow!("cannot finish")) });

    let factory = RunnerFactory::new();
    factory.register_provider("mock", base_provider()).unwrap();
    let runner = factory
        .create("mock", vec![definition.factory()], RunnerConfig::new())
        .unwrap();
    let errors = record_errors(&runner);

    runner.init().await;
    runner.finish().await;

    assert_eq!(entries(&errors), vec!["cannot finish"]);
    assert!(!runner.get_state("finish"));
    assert!(!runner.plugin("broken").unwrap().get_state("finish"));
}

#[tokio::test]
async fn test_namespaced_plugin_events() {
    let factory = RunnerFactory::new();
    factory.register_provider("mock", base_provider()).unwrap();
    let runner = factory
        .create(
            "mock",
            vec![
                PluginDefinition::new("timer").factory(),
                PluginDefinition::new("calculator").factory(),
            ],
            RunnerConfig::new(),
        )
        .unwrap();

    let log = new_log();
    record(&runner, &log, &["plugin-init.timer"]);
    let all = new_log();
    record(&runner, &all, &["plugin-init"]);
    let removed = new_log();
    record(&runner, &removed, &["plugin-init.calculator"]);
    runner.off(".calculator");

    runner.init().await;

    assert_eq!(entries(&log), vec!["plugin-init(\"timer\")"]);
    assert_eq!(entries(&all).len(), 2);
    assert!(entries(&removed).is_empty());
}
