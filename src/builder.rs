use crate::cache::{CacheGateway, ConfigStore, InMemoryStore};
use crate::constants::DEFAULT_NAMESPACE;
use crate::errors::{ClientError, ErrorKind};
use crate::fact::RuntimeFact;
use crate::fetch::transport::{HttpTransport, Transport};
use crate::model::decoder::{Decoder, JsonDecoder};
use crate::Toggle;
use std::borrow::Borrow;
use std::time::Duration;

pub struct Options {
    source_url: Option<String>,
    transport: Box<dyn Transport>,
    decoder: Box<dyn Decoder>,
    cache: CacheGateway,
    fact: RuntimeFact,
}

impl Options {
    pub(crate) fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.borrow()
    }

    pub(crate) fn decoder(&self) -> &dyn Decoder {
        self.decoder.borrow()
    }

    pub(crate) fn cache(&self) -> &CacheGateway {
        &self.cache
    }

    pub(crate) fn fact(&self) -> &RuntimeFact {
        &self.fact
    }
}

/// Builder to create a [`Toggle`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use toggle::{RuntimeFact, Toggle};
///
/// let toggle = Toggle::builder()
///     .source_url("https://example.com/toggle/config.json")
///     .http_timeout(Duration::from_secs(10))
///     .fact(RuntimeFact::new().app_version(20))
///     .build()
///     .unwrap();
/// ```
pub struct ToggleBuilder {
    source_url: Option<String>,
    namespace: String,
    http_timeout: Option<Duration>,
    store: Option<Box<dyn ConfigStore>>,
    transport: Option<Box<dyn Transport>>,
    decoder: Option<Box<dyn Decoder>>,
    fact: Option<RuntimeFact>,
}

impl ToggleBuilder {
    pub(crate) fn new() -> Self {
        Self {
            source_url: None,
            namespace: DEFAULT_NAMESPACE.to_owned(),
            http_timeout: None,
            store: None,
            transport: None,
            decoder: None,
            fact: None,
        }
    }

    /// Sets the URL the configuration document is fetched from.
    ///
    /// When not set, the URL persisted by a previous [`Toggle::fetch_config`] call is used.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use toggle::Toggle;
    ///
    /// let builder = Toggle::builder()
    ///     .source_url("https://example.com/toggle/config.json");
    /// ```
    pub fn source_url(mut self, url: &str) -> Self {
        self.source_url = Some(url.to_owned());
        self
    }

    /// Sets the namespace the persisted entries are keyed by, so multiple configurations can
    /// share one [`ConfigStore`].
    /// Default value is `"default"`.
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_owned();
        self
    }

    /// Sets the HTTP request timeout of the default [`HttpTransport`].
    /// Default value is `30` seconds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use toggle::Toggle;
    ///
    /// let builder = Toggle::builder()
    ///     .http_timeout(Duration::from_secs(60));
    /// ```
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Sets a [`ConfigStore`] implementation used to persist the last known configuration.
    /// Default is an [`InMemoryStore`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use toggle::{ClientError, ConfigStore, Toggle};
    ///
    /// let builder = Toggle::builder()
    ///     .store(Box::new(CustomStore {}));
    ///
    /// struct CustomStore {}
    ///
    /// impl ConfigStore for CustomStore {
    ///     fn read(&self, key: &str) -> Result<Option<String>, ClientError> {
    ///         // read from the store
    ///         Ok(None)
    ///     }
    ///
    ///     fn write(&self, key: &str, value: &str) -> Result<(), ClientError> {
    ///         // write to the store
    ///         Ok(())
    ///     }
    /// }
    /// ```
    pub fn store(mut self, store: Box<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets a custom [`Transport`]. Default is an [`HttpTransport`].
    pub fn transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets a custom [`Decoder`]. Default is a [`JsonDecoder`].
    pub fn decoder(mut self, decoder: Box<dyn Decoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Sets the [`RuntimeFact`] used by checks that don't carry their own.
    pub fn fact(mut self, fact: RuntimeFact) -> Self {
        self.fact = Some(fact);
        self
    }

    /// Creates a [`Toggle`] from the configuration made on the builder.
    ///
    /// # Errors
    ///
    /// This method fails if the source URL is invalid, the namespace is empty,
    /// or the default [`HttpTransport`] can't be initialized.
    pub fn build(self) -> Result<Toggle, ClientError> {
        Ok(Toggle::with_options(self.build_options()?))
    }

    pub(crate) fn build_options(self) -> Result<Options, ClientError> {
        if let Some(url) = self.source_url.as_ref() {
            if let Err(err) = reqwest::Url::parse(url) {
                return Err(ClientError::new(
                    ErrorKind::InvalidArgument,
                    format!("Source URL '{url}' is invalid. {err}"),
                ));
            }
        }
        if self.namespace.is_empty() {
            return Err(ClientError::new(
                ErrorKind::InvalidArgument,
                "Namespace cannot be empty".to_owned(),
            ));
        }
        let transport = match self.transport {
            Some(transport) => transport,
            None => Box::new(HttpTransport::new(
                self.http_timeout.unwrap_or(Duration::from_secs(30)),
            )?),
        };
        Ok(Options {
            source_url: self.source_url,
            transport,
            decoder: self.decoder.unwrap_or(Box::new(JsonDecoder)),
            cache: CacheGateway::new(
                self.store.unwrap_or(Box::new(InMemoryStore::new())),
                self.namespace.as_str(),
            ),
            fact: self.fact.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn invalid_source_url() {
        let err = ToggleBuilder::new()
            .source_url("not a url")
            .build_options()
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn empty_namespace() {
        let err = ToggleBuilder::new().namespace("").build_options().err().unwrap();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn defaults() {
        let options = ToggleBuilder::new().build_options().unwrap();
        assert!(options.source_url().is_none());
        assert_eq!(options.fact(), &RuntimeFact::new());
        assert!(options.cache().load().unwrap().is_none());
    }
}
