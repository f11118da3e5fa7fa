use log::kv::Key;
use log::{set_max_level, Level, Log, Metadata, Record};
use rand::distr::{Alphanumeric, SampleString};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;
use toggle::{ClientError, ConfigStore, ErrorKind, Transport};

pub const PRODUCT_JSON: &str = r#"{
    "status": "ok",
    "config": {
        "name": "myapp",
        "features": [
            {
                "name": "video",
                "default": "enabled",
                "rules": [
                    { "enabled": false, "metadata": "old app", "value": { "appMax": 13 } },
                    { "metadata": "sample metadata", "value": { "appMin": 14, "appMax": 23 } }
                ]
            },
            { "name": "mixpanel", "enabled": "disabled", "default": "enabled" },
            { "name": "speech", "default": "disabled", "rules": [] }
        ]
    }
}"#;

pub fn produce_mock_path() -> String {
    format!("/toggle/{}/product.json", rand_str(16))
}

pub fn rand_namespace() -> String {
    rand_str(12)
}

fn rand_str(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::rng(), len)
}

/// Transport that answers with a fixed payload after an optional delay, counting its calls.
pub struct FakeTransport {
    response: Result<String, ClientError>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub fn ok(body: &str) -> Self {
        Self {
            response: Ok(body.to_owned()),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Err(ClientError::new(
                ErrorKind::Network,
                "connection refused".to_owned(),
            )),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Transport for FakeTransport {
    fn fetch(&self, _: &str) -> Result<String, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            sleep(self.delay);
        }
        self.response.clone()
    }
}

/// Store that records every access and can be told to fail.
#[derive(Default)]
pub struct RecordingStore {
    values: Mutex<HashMap<String, String>>,
    failing: bool,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn accesses(&self) -> usize {
        self.reads.load(Ordering::SeqCst) + self.writes.load(Ordering::SeqCst)
    }

    /// Replaces every stored value with `value`.
    pub fn overwrite_all(&self, value: &str) {
        for stored in self.values.lock().unwrap().values_mut() {
            *stored = value.to_owned();
        }
    }

    pub fn values(&self) -> Vec<String> {
        self.values.lock().unwrap().values().cloned().collect()
    }
}

impl ConfigStore for RecordingStore {
    fn read(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(ClientError::new(ErrorKind::Storage, "disk is gone".to_owned()));
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(ClientError::new(ErrorKind::Storage, "disk is gone".to_owned()));
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

pub struct RecordingLogger {}

impl RecordingLogger {
    thread_local!(pub static LOGS: RefCell<String> = RefCell::new(String::default()));
}

impl Log for RecordingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.target().contains("toggle")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let event_id = record
            .key_values()
            .get(Key::from("event_id"))
            .and_then(|id| id.to_i64())
            .map_or("-".to_owned(), |id| id.to_string());
        Self::LOGS.with_borrow_mut(|l| l.push_str(format!("{level} [{event_id}] {}\n", record.args()).as_str()));
    }

    fn flush(&self) {}
}

pub fn log_record_init() {
    set_max_level(log::LevelFilter::Info);
    _ = log::set_logger(&RecordingLogger {});
}
