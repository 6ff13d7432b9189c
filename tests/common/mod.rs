#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use delivery_runner::providers::{AreaMap, DataHolder, ErrorHandler, Proxy};
use delivery_runner::{Runner, RunnerConfig, RunnerFactory, RunnerProvider};

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn push(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Provider with only the mandatory area broker.
pub fn base_provider() -> RunnerProvider {
    RunnerProvider::new().area_broker(|_| Arc::new(AreaMap::new().with_area("content", "content-area")))
}

pub fn create_runner(provider: RunnerProvider) -> Runner {
    create_runner_with(provider, RunnerConfig::new())
}

pub fn create_runner_with(provider: RunnerProvider, config: RunnerConfig) -> Runner {
    let factory = RunnerFactory::new();
    factory.register_provider("mock", provider).unwrap();
    factory.create("mock", vec![], config).unwrap()
}

/// Records every listed event, with its arguments, into `log`.
pub fn record(runner: &Runner, log: &Log, events: &[&str]) {
    for name in events {
        let log = log.clone();
        runner.on(name, move |_, event| {
            let log = log.clone();
            async move {
                let entry = if event.args.is_empty() {
                    event.name.clone()
                } else {
                    let args: Vec<String> = event.args.iter().map(Value::to_string).collect();
                    format!("{}({})", event.name, args.join(","))
                };
                push(&log, entry);
                Ok(())
            }
        });
    }
}

/// Collects the messages of the runner `error` events.
pub fn record_errors(runner: &Runner) -> Log {
    let log = new_log();
    let errors = log.clone();
    runner.on("error", move |_, event| {
        let errors = errors.clone();
        async move {
            push(&errors, event.arg_str(0).unwrap_or_default());
            Ok(())
        }
    });
    log
}

/// Proxy whose destroy takes a while, to check it is awaited.
#[derive(Default)]
pub struct MockProxy {
    pub log: Log,
    pub handler: Mutex<Option<ErrorHandler>>,
    pub installed: Mutex<bool>,
    pub install_error: Option<String>,
}

impl MockProxy {
    pub fn with_log(log: Log) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn failing_install(message: &str) -> Self {
        Self {
            install_error: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub async fn fail(&self, message: &str) {
        let handler = self.handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler(anyhow::anyhow!(message.to_string())).await;
        }
    }
}

#[async_trait]
impl Proxy for MockProxy {
    fn install(&self, _data_holder: Arc<dyn DataHolder>) -> Result<()> {
        if let Some(message) = &self.install_error {
            return Err(anyhow::anyhow!(message.clone()));
        }
        *self.installed.lock().unwrap() = true;
        Ok(())
    }

    fn on_error(&self, handler: ErrorHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    async fn destroy(&self) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        push(&self.log, "proxy-destroyed");
        Ok(())
    }
}

/// Persistent states shared by every runner built on the same provider.
pub fn persistent_provider(store: Arc<Mutex<HashMap<String, bool>>>) -> RunnerProvider {
    let reader = store.clone();
    base_provider()
        .persistent_state_getter(move |_, name| reader.lock().unwrap().get(name).copied().unwrap_or(false))
        .persistent_state_setter(move |_, name, active| {
            let store = store.clone();
            async move {
                store.lock().unwrap().insert(name, active);
                Ok(())
            }
        })
}
