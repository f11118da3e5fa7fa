use crate::builder::{Options, ToggleBuilder};
use crate::check::{Callback, FeatureCheckRequest, FeatureCheckRequestBuilder};
use crate::errors::{ClientError, ErrorKind};
use crate::eval::details::FeatureCheckResponse;
use crate::fact::RuntimeFact;
use crate::fetch::service::CheckService;
use crate::model::config::{Config, Product, ProductEntry};
use crate::model::enums::{ResponseSource, State};
use chrono::Utc;
use log::error;
use std::sync::Arc;

/// The main component for checking features.
///
/// # Examples
///
/// ```no_run
/// use toggle::{RuntimeFact, State, Toggle};
///
/// #[tokio::main]
/// async fn main() {
///     let toggle = Toggle::builder()
///         .source_url("https://example.com/toggle/config.json")
///         .fact(RuntimeFact::new().app_version(20))
///         .build()
///         .unwrap();
///
///     let response = toggle
///         .check("video")
///         .default_state(State::Enabled)
///         .start()
///         .await
///         .unwrap();
/// }
/// ```
pub struct Toggle {
    service: Arc<CheckService>,
}

impl Toggle {
    pub(crate) fn with_options(options: Options) -> Self {
        Self {
            service: Arc::new(CheckService::new(Arc::new(options))),
        }
    }

    /// Creates a new [`ToggleBuilder`] used to build a [`Toggle`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use toggle::Toggle;
    ///
    /// let toggle = Toggle::builder()
    ///     .source_url("https://example.com/toggle/config.json")
    ///     .namespace("myapp")
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn builder() -> ToggleBuilder {
        ToggleBuilder::new()
    }

    /// Creates a new [`Toggle`] with default options.
    ///
    /// Without a source URL, checks resolve from configs supplied through
    /// [`Toggle::set_config`] or [`Toggle::fetch_config`].
    ///
    /// # Errors
    ///
    /// This method fails if the default [`crate::HttpTransport`] can't be initialized.
    pub fn new() -> Result<Self, ClientError> {
        ToggleBuilder::new().build()
    }

    /// Starts building a check of the feature named `feature_name`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use toggle::{State, Toggle};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let toggle = Toggle::new().unwrap();
    ///
    ///     let response = toggle
    ///         .check("video")
    ///         .default_state(State::Enabled)
    ///         .get_latest()
    ///         .callback(|feature, enabled, metadata, cached| {
    ///             println!("{feature}: {enabled} {metadata:?} (cached: {cached})");
    ///         })
    ///         .start()
    ///         .await
    ///         .unwrap();
    /// }
    /// ```
    pub fn check(&self, feature_name: &str) -> CheckBuilder<'_> {
        CheckBuilder {
            toggle: self,
            request: FeatureCheckRequest::builder(feature_name),
        }
    }

    /// Runs a prebuilt [`FeatureCheckRequest`].
    ///
    /// The blocking part of the check runs on tokio's blocking pool. The request's callback,
    /// if any, is invoked exactly once on the awaiting task before this method returns.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use toggle::{FeatureCheckRequest, Toggle};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let toggle = Toggle::new().unwrap();
    ///
    ///     let request = FeatureCheckRequest::builder("video").build().unwrap();
    ///     let response = toggle.run(request).await;
    /// }
    /// ```
    pub async fn run(&self, mut request: FeatureCheckRequest) -> FeatureCheckResponse {
        let callback = request.take_callback();
        let service = Arc::clone(&self.service);
        let request = Arc::new(request);
        let task_request = Arc::clone(&request);
        let response = match tokio::task::spawn_blocking(move || service.check(&task_request)).await {
            Ok(response) => response,
            Err(err) => {
                error!(event_id = 1002; "The check of '{}' was aborted. Returning the default state: {}. ({err})", request.feature_name(), request.default_state());
                FeatureCheckResponse::from_default(&request)
            }
        };
        if let Some(callback) = callback {
            notify(callback, &request, &response);
        }
        response
    }

    /// Installs `config` as the in-memory configuration and persists it.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use toggle::{Config, Feature, State, Toggle};
    ///
    /// let toggle = Toggle::new().unwrap();
    /// let config = Config::new(
    ///     "myapp".to_owned(),
    ///     vec![Feature::new("video", None, State::Enabled, vec![])],
    /// )
    /// .unwrap();
    /// toggle.set_config(config);
    /// ```
    pub fn set_config(&self, config: Config) {
        self.service
            .set_entry(ProductEntry::new(Product::new(config), Utc::now()));
    }

    /// Decodes `json` with the configured [`crate::Decoder`] and installs the result.
    ///
    /// # Errors
    ///
    /// This method fails if the document can't be decoded.
    pub fn set_config_json(&self, json: &str) -> Result<(), ClientError> {
        let product = self.service.decode(json)?;
        self.service.set_entry(ProductEntry::new(product, Utc::now()));
        Ok(())
    }

    /// Persists `url` as the source URL and fetches the configuration from it.
    ///
    /// # Errors
    ///
    /// This method fails if `url` is invalid, or the fetch or decoding fails.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use toggle::Toggle;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let toggle = Toggle::new().unwrap();
    ///
    ///     toggle
    ///         .fetch_config("https://example.com/toggle/config.json")
    ///         .await
    ///         .unwrap();
    /// }
    /// ```
    pub async fn fetch_config(&self, url: &str) -> Result<(), ClientError> {
        if let Err(err) = reqwest::Url::parse(url) {
            return Err(ClientError::new(
                ErrorKind::InvalidArgument,
                format!("Source URL '{url}' is invalid. {err}"),
            ));
        }
        let service = Arc::clone(&self.service);
        let url = url.to_owned();
        self.blocking(move || {
            service.set_source_url(url.as_str());
            service.refresh()
        })
        .await
    }

    /// Fetches the configuration from the current source URL.
    ///
    /// # Errors
    ///
    /// This method fails if no source URL is known, or the fetch or decoding fails.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let service = Arc::clone(&self.service);
        self.blocking(move || service.refresh()).await
    }

    /// Returns a snapshot of the in-memory configuration, `None` if there is none yet.
    pub fn config(&self) -> Option<Config> {
        self.service.current().map(|entry| entry.config().clone())
    }

    /// Returns the names of the features in the in-memory configuration.
    ///
    /// If there's no configuration in memory, this method returns an empty [`Vec`].
    pub fn feature_names(&self) -> Vec<String> {
        match self.service.current() {
            Some(entry) => entry.config().feature_names(),
            None => vec![],
        }
    }

    async fn blocking<F>(&self, f: F) -> Result<(), ClientError>
    where
        F: FnOnce() -> Result<(), ClientError> + Send + 'static,
    {
        tokio::task::spawn_blocking(f).await.map_err(|err| {
            ClientError::new(
                ErrorKind::Network,
                format!("Fetching the config was aborted. {err}"),
            )
        })?
    }
}

fn notify(callback: Callback, request: &FeatureCheckRequest, response: &FeatureCheckResponse) {
    let name = if response.source == ResponseSource::Default {
        request.feature_name()
    } else {
        response.feature_name.as_str()
    };
    callback(
        name,
        response.enabled,
        response.metadata.as_deref(),
        response.cached,
    );
}

/// Fluent builder of a single feature check, created by [`Toggle::check`].
pub struct CheckBuilder<'a> {
    toggle: &'a Toggle,
    request: FeatureCheckRequestBuilder,
}

impl CheckBuilder<'_> {
    /// Sets the state used when the feature can't be resolved from any configuration.
    pub fn default_state(mut self, state: State) -> Self {
        self.request = self.request.default_state(state);
        self
    }

    /// Forces a live fetch of the configuration.
    pub fn get_latest(mut self) -> Self {
        self.request = self.request.get_latest();
        self
    }

    /// Sets the runtime fact the rules are evaluated against.
    pub fn fact(mut self, fact: RuntimeFact) -> Self {
        self.request = self.request.fact(fact);
        self
    }

    /// Sets a callback that is invoked exactly once with the outcome.
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&str, bool, Option<&str>, bool) + Send + 'static,
    {
        self.request = self.request.callback(callback);
        self
    }

    /// Runs the check.
    ///
    /// # Errors
    ///
    /// This method fails with [`ErrorKind::InvalidArgument`] if the feature name is empty.
    /// Every other failure degrades to a cached or default response.
    pub async fn start(self) -> Result<FeatureCheckResponse, ClientError> {
        let request = self.request.build()?;
        Ok(self.toggle.run(request).await)
    }
}
