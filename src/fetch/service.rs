use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::Utc;
use log::{debug, error, warn};

use crate::builder::Options;
use crate::check::FeatureCheckRequest;
use crate::errors::{ClientError, ErrorKind};
use crate::eval::details::FeatureCheckResponse;
use crate::eval::evaluator::{evaluate, EvalResult};
use crate::fact::RuntimeFact;
use crate::model::config::{Product, ProductEntry};
use crate::model::enums::ResponseSource;

pub struct CheckService {
    options: Arc<Options>,
    current: ArcSwapOption<ProductEntry>,
    source_url: ArcSwapOption<String>,
}

impl CheckService {
    pub fn new(options: Arc<Options>) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            source_url: ArcSwapOption::new(options.source_url().map(|url| Arc::new(url.to_owned()))),
            options,
        }
    }

    /// Resolves the data source for `request` and evaluates it. Never fails, the worst case is
    /// a response built from the request's own default state.
    pub fn check(&self, request: &FeatureCheckRequest) -> FeatureCheckResponse {
        let fact = request.fact().unwrap_or(self.options.fact());
        if !request.get_latest() {
            if let Some(entry) = self.current.load_full() {
                return respond(&entry, request, fact, ResponseSource::InMemory);
            }
        }
        match self.fetch_contained() {
            Ok(entry) => respond(&entry, request, fact, ResponseSource::Live),
            Err(err) => {
                warn!(event_id = err.kind.as_u16(); "Fetching the latest config failed, falling back to the cached config. ({err})");
                self.fallback(request, fact)
            }
        }
    }

    pub fn refresh(&self) -> Result<(), ClientError> {
        self.fetch_contained().map(|_| ())
    }

    pub fn set_entry(&self, entry: ProductEntry) {
        let entry = Arc::new(entry);
        self.persist(&entry);
        self.current.store(Some(entry));
    }

    pub fn set_source_url(&self, url: &str) {
        if let Err(err) = self.options.cache().store_source_url(url) {
            warn!(event_id = err.kind.as_u16(); "Failed to persist the source URL. ({err})");
        }
        self.source_url.store(Some(Arc::new(url.to_owned())));
    }

    pub fn decode(&self, raw: &str) -> Result<Product, ClientError> {
        self.options.decoder().decode(raw)
    }

    pub fn current(&self) -> Option<Arc<ProductEntry>> {
        self.current.load_full()
    }

    /// Runs [`CheckService::fetch_live`], turning a panicking collaborator into an error.
    fn fetch_contained(&self) -> Result<Arc<ProductEntry>, ClientError> {
        catch_unwind(AssertUnwindSafe(|| self.fetch_live())).unwrap_or_else(|payload| {
            Err(ClientError::new(
                ErrorKind::Network,
                format!(
                    "Unexpected failure occurred while fetching the config. {}",
                    panic_message(payload.as_ref())
                ),
            ))
        })
    }

    fn fetch_live(&self) -> Result<Arc<ProductEntry>, ClientError> {
        let url = self.source_url()?;
        let raw = self.options.transport().fetch(url.as_str())?;
        let product = self.options.decoder().decode(raw.as_str())?;
        debug!("Config fetched from '{url}'");
        let entry = Arc::new(ProductEntry::new(product, Utc::now()));
        self.persist(&entry);
        self.current.store(Some(Arc::clone(&entry)));
        Ok(entry)
    }

    fn fallback(&self, request: &FeatureCheckRequest, fact: &RuntimeFact) -> FeatureCheckResponse {
        match self.options.cache().load() {
            Ok(Some(entry)) => respond(&entry, request, fact, ResponseSource::Cached),
            Ok(None) => {
                warn!(event_id = ErrorKind::Storage.as_u16(); "No cached config is available. Returning the default state for '{}': {}.", request.feature_name(), request.default_state());
                FeatureCheckResponse::from_default(request)
            }
            Err(err) => {
                error!(event_id = err.kind.as_u16(); "Failed to load the cached config. Returning the default state for '{}': {}. ({err})", request.feature_name(), request.default_state());
                FeatureCheckResponse::from_default(request)
            }
        }
    }

    fn persist(&self, entry: &ProductEntry) {
        if let Err(err) = self.options.cache().store(entry) {
            warn!(event_id = err.kind.as_u16(); "Failed to persist the config. ({err})");
        }
    }

    fn source_url(&self) -> Result<String, ClientError> {
        if let Some(url) = self.source_url.load_full() {
            return Ok(url.as_ref().clone());
        }
        match self.options.cache().source_url()? {
            Some(url) => Ok(url),
            None => Err(ClientError::new(
                ErrorKind::Network,
                "No source URL is configured to fetch the config from.".to_owned(),
            )),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<unknown panic>"
    }
}

fn respond(
    entry: &ProductEntry,
    request: &FeatureCheckRequest,
    fact: &RuntimeFact,
    source: ResponseSource,
) -> FeatureCheckResponse {
    let config = entry.config();
    match config.find_feature(request.feature_name()) {
        Some(feature) => FeatureCheckResponse::from_result(
            &feature.name,
            evaluate(feature, fact),
            source,
            entry.fetch_time,
        ),
        None => {
            let names = config
                .feature_names()
                .iter()
                .map(|n| format!("'{n}'"))
                .collect::<Vec<String>>()
                .join(", ");
            warn!(event_id = 1001; "Feature '{}' was not found in the config. Returning the default state: {}. Available features: [{names}].", request.feature_name(), request.default_state());
            let result = EvalResult {
                enabled: request.default_state().is_enabled(),
                ..EvalResult::default()
            };
            FeatureCheckResponse::from_result(request.feature_name(), result, source, entry.fetch_time)
        }
    }
}
