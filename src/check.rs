use crate::errors::{ClientError, ErrorKind};
use crate::fact::RuntimeFact;
use crate::model::enums::State;
use std::fmt::{Debug, Formatter};

/// Receives the outcome of a feature check: `(feature_name, enabled, metadata, cached)`.
pub type Callback = Box<dyn FnOnce(&str, bool, Option<&str>, bool) + Send + 'static>;

/// Describes a single feature check.
///
/// # Examples
///
/// ```rust
/// use toggle::{FeatureCheckRequest, State};
///
/// let request = FeatureCheckRequest::builder("video")
///     .default_state(State::Enabled)
///     .get_latest()
///     .callback(|feature, enabled, metadata, cached| {
///         println!("{feature} is {enabled} ({metadata:?}, cached: {cached})");
///     })
///     .build()
///     .unwrap();
/// assert!(request.get_latest());
/// ```
pub struct FeatureCheckRequest {
    feature_name: String,
    default_state: State,
    get_latest: bool,
    fact: Option<RuntimeFact>,
    callback: Option<Callback>,
}

impl FeatureCheckRequest {
    /// Creates a new [`FeatureCheckRequestBuilder`] for the feature named `feature_name`.
    pub fn builder(feature_name: &str) -> FeatureCheckRequestBuilder {
        FeatureCheckRequestBuilder::new(feature_name)
    }

    /// Name of the feature to check.
    pub fn feature_name(&self) -> &str {
        &self.feature_name
    }

    /// State used when the feature can't be resolved from any configuration.
    pub fn default_state(&self) -> State {
        self.default_state
    }

    /// `true` when the check must fetch the configuration live.
    pub fn get_latest(&self) -> bool {
        self.get_latest
    }

    /// The runtime fact of this request, if it overrides the client-level one.
    pub fn fact(&self) -> Option<&RuntimeFact> {
        self.fact.as_ref()
    }

    /// `true` when a callback is attached.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn take_callback(&mut self) -> Option<Callback> {
        self.callback.take()
    }
}

impl Debug for FeatureCheckRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureCheckRequest")
            .field("feature_name", &self.feature_name)
            .field("default_state", &self.default_state)
            .field("get_latest", &self.get_latest)
            .field("fact", &self.fact)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Builder to create a [`FeatureCheckRequest`].
pub struct FeatureCheckRequestBuilder {
    feature_name: String,
    default_state: State,
    get_latest: bool,
    fact: Option<RuntimeFact>,
    callback: Option<Callback>,
}

impl FeatureCheckRequestBuilder {
    pub(crate) fn new(feature_name: &str) -> Self {
        Self {
            feature_name: feature_name.to_owned(),
            default_state: State::Disabled,
            get_latest: false,
            fact: None,
            callback: None,
        }
    }

    /// Sets the state used when the feature can't be resolved from any configuration.
    /// Default value is [`State::Disabled`].
    pub fn default_state(mut self, state: State) -> Self {
        self.default_state = state;
        self
    }

    /// Forces a live fetch of the configuration, even if one is already held in memory.
    pub fn get_latest(mut self) -> Self {
        self.get_latest = true;
        self
    }

    /// Sets the runtime fact the rules are evaluated against for this request only.
    pub fn fact(mut self, fact: RuntimeFact) -> Self {
        self.fact = Some(fact);
        self
    }

    /// Sets a callback that is invoked exactly once with the outcome of the check.
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&str, bool, Option<&str>, bool) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Creates the [`FeatureCheckRequest`].
    ///
    /// # Errors
    ///
    /// This method fails with [`ErrorKind::InvalidArgument`] if the feature name is empty.
    pub fn build(self) -> Result<FeatureCheckRequest, ClientError> {
        if self.feature_name.trim().is_empty() {
            return Err(ClientError::new(
                ErrorKind::InvalidArgument,
                "Please pass a valid feature name, it cannot be empty.".to_owned(),
            ));
        }
        Ok(FeatureCheckRequest {
            feature_name: self.feature_name,
            default_state: self.default_state,
            get_latest: self.get_latest,
            fact: self.fact,
            callback: self.callback,
        })
    }
}
