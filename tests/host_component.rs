//! Mounting a runner session in a container.

mod common;

use anyhow::anyhow;
use serde_json::{json, Value};
use std::sync::Arc;

use common::*;
use delivery_runner::host::{
    component::HIDDEN_CLASS, Container, MemoryContainer, ModuleCatalog, RunnerComponent,
};
use delivery_runner::{PluginDefinition, RunnerFactory, Stage};

fn host_config() -> Value {
    json!({
        "serviceCallId": "foo",
        "providers": {
            "runner": { "id": "mock", "module": "mock-runner" },
            "plugins": [{ "id": "timer", "module": "timer-plugin" }]
        },
        "options": { "plugins": { "timer": { "max": 30 } } }
    })
}

fn catalog() -> ModuleCatalog {
    ModuleCatalog::new()
        .with_runner("mock-runner", base_provider())
        .with_plugin("timer-plugin", PluginDefinition::new("timer").factory())
}

fn create_component(
    container: &Arc<MemoryContainer>,
    config: Value,
    catalog: ModuleCatalog,
) -> RunnerComponent {
    let mount: Arc<dyn Container> = container.clone();
    RunnerComponent::new(Some(mount), config, RunnerFactory::new(), Arc::new(catalog)).unwrap()
}

fn record_component(component: &RunnerComponent, log: &Log, events: &[&str]) {
    for name in events {
        let log = log.clone();
        component.on(name, move |_, event| {
            let log = log.clone();
            async move {
                match event.arg_str(0) {
                    Some(message) if event.name == "error" => push(&log, format!("error({})", message)),
                    _ => push(&log, event.name.clone()),
                }
                Ok(())
            }
        });
    }
}

#[test]
fn test_component_requires_container_and_config() {
    let err = RunnerComponent::new(
        None,
        host_config(),
        RunnerFactory::new(),
        Arc::new(catalog()),
    )
    .err()
    .unwrap();
    assert!(err.to_string().contains("container"));

    let container: Arc<dyn Container> = Arc::new(MemoryContainer::new());
    let err = RunnerComponent::new(
        Some(container),
        json!({ "serviceCallId": "foo" }),
        RunnerFactory::new(),
        Arc::new(catalog()),
    )
    .err()
    .unwrap();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_mount_and_show_when_ready() {
    let container = Arc::new(MemoryContainer::new());
    let component = create_component(&container, host_config(), catalog());
    let log = new_log();
    record_component(&component, &log, &["init", "render", "hide", "ready", "show", "error"]);

    component.init().await;

    assert_eq!(entries(&log), vec!["init", "render", "hide", "ready", "show"]);

    let runner = component.runner().unwrap();
    assert!(runner.get_state("ready"));
    assert_eq!(runner.provider_name(), "mock");
    assert_eq!(runner.plugin_config("timer"), json!({ "max": 30 }));

    let element = component.element().unwrap();
    assert_eq!(runner.config().render_to.as_deref(), Some(element.as_str()));
    assert_eq!(container.elements(), vec![element.clone()]);
    assert!(!container.has_class(&element, HIDDEN_CLASS));
}

#[tokio::test]
async fn test_runner_errors_are_relayed() {
    let provider = base_provider().stage(Stage::Render, |_| async { Err(anyhow!("render failed")) });
    let catalog = ModuleCatalog::new().with_runner("mock-runner", provider);
    let config = json!({
        "serviceCallId": "foo",
        "providers": { "runner": { "id": "mock", "module": "mock-runner" } },
        "options": {}
    });

    let container = Arc::new(MemoryContainer::new());
    let component = create_component(&container, config, catalog);
    let log = new_log();
    record_component(&component, &log, &["ready", "error"]);

    component.init().await;

    assert_eq!(entries(&log), vec!["error(render failed)"]);
    let element = component.element().unwrap();
    assert!(container.has_class(&element, HIDDEN_CLASS));
}

#[tokio::test]
async fn test_unknown_module_is_reported() {
    let config = json!({
        "serviceCallId": "foo",
        "providers": { "runner": { "id": "mock", "module": "nope-runner" } },
        "options": {}
    });

    let container = Arc::new(MemoryContainer::new());
    let component = create_component(&container, config, catalog());
    let log = new_log();
    record_component(&component, &log, &["render", "error"]);

    component.init().await;

    assert_eq!(entries(&log).len(), 1);
    assert!(entries(&log)[0].contains("nope-runner"));
    assert!(component.runner().is_none());
    assert!(container.elements().is_empty());
}

#[tokio::test]
async fn test_destroy_unmounts() {
    let container = Arc::new(MemoryContainer::new());
    let component = create_component(&container, host_config(), catalog());
    let log = new_log();
    record_component(&component, &log, &["destroy"]);

    component.init().await;
    let runner = component.runner().unwrap();

    component.destroy().await;

    assert!(runner.get_state("destroy"));
    assert!(component.runner().is_none());
    assert!(component.element().is_none());
    assert!(container.elements().is_empty());
    assert_eq!(entries(&log), vec!["destroy"]);

    // listeners are gone once destroyed
    component.show().await;
    component.destroy().await;
    assert_eq!(entries(&log), vec!["destroy"]);
}

#[tokio::test]
async fn test_runner_destroy_releases_component_runner() {
    let container = Arc::new(MemoryContainer::new());
    let component = create_component(&container, host_config(), catalog());

    component.init().await;
    component.runner().unwrap().destroy().await;

    assert!(component.runner().is_none());
}
