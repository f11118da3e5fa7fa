use log::kv::Key;
use log::{Level, LevelFilter, Log, Metadata, Record};
use toggle::*;

#[tokio::main]
async fn main() {
    // Info level logging helps to inspect the rule evaluation process.
    // Use the default Warning level to avoid too detailed logging in your application.
    log::set_max_level(LevelFilter::Info);
    log::set_logger(&PrintLog {}).unwrap();

    let client = Toggle::builder()
        .store(Box::new(FileStore::new(std::env::temp_dir().join("toggle-demo"))))
        .fact(RuntimeFact::new().app_version(20).api_level(23))
        .build()
        .unwrap();

    // Without a source URL the config is supplied directly.
    client
        .set_config_json(
            r#"{
                "config": {
                    "name": "demo",
                    "features": [
                        {
                            "name": "video",
                            "default": "enabled",
                            "rules": [
                                { "enabled": false, "metadata": "old app", "value": { "appMax": 13 } },
                                { "metadata": "beta", "value": { "appMin": 14, "appMax": 23 } }
                            ]
                        },
                        { "name": "mixpanel", "enabled": "disabled", "default": "enabled" }
                    ]
                }
            }"#,
        )
        .unwrap();

    for feature in client.feature_names() {
        let response = client
            .check(&feature)
            .callback(|name, enabled, metadata, cached| {
                println!("{name}: {enabled} (metadata: {metadata:?}, cached: {cached})");
            })
            .start()
            .await
            .unwrap();
        println!("{feature} resolved from {}", response.source);
    }
}

// Example log implementation.
pub struct PrintLog {}

impl Log for PrintLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.target().contains("toggle")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let event_id = record
            .key_values()
            .get(Key::from("event_id"))
            .map_or("-".to_owned(), |id| id.to_string());
        println!("{level} [{event_id}] {}", record.args());
    }

    fn flush(&self) {}
}
