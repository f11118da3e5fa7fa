use crate::errors::{ClientError, ErrorKind};
use crate::model::enums::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use thiserror::Error;

/// Failure of decoding, serializing or constructing a [`Config`].
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    /// The document is not valid JSON or doesn't have the expected shape.
    #[error("JSON parsing failed. ({0})")]
    Parse(String),
    /// The product could not be serialized for persistence.
    #[error("JSON serialization failed. ({0})")]
    Serialize(String),
    /// Two features share a name.
    #[error("Feature '{0}' is defined more than once.")]
    DuplicateFeature(String),
    /// A feature has an empty name.
    #[error("Feature name cannot be empty.")]
    EmptyFeatureName,
}

impl Error {
    /// The [`ErrorKind`] this error is reported as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(_) | Error::Serialize(_) => ErrorKind::MalformedDocument,
            Error::DuplicateFeature(_) | Error::EmptyFeatureName => ErrorKind::MalformedConfig,
        }
    }
}

impl From<Error> for ClientError {
    fn from(err: Error) -> Self {
        ClientError::new(err.kind(), err.to_string())
    }
}

/// A decoded [`Product`] together with the time it was obtained.
#[derive(Debug, Clone)]
pub struct ProductEntry {
    /// The decoded product.
    pub product: Arc<Product>,
    /// Time the product was fetched or supplied.
    pub fetch_time: DateTime<Utc>,
}

impl ProductEntry {
    /// Creates a new [`ProductEntry`].
    pub fn new(product: Product, fetch_time: DateTime<Utc>) -> Self {
        Self {
            product: Arc::new(product),
            fetch_time,
        }
    }

    /// The configuration of the product.
    pub fn config(&self) -> &Config {
        &self.product.config
    }

    /// Serializes the entry into its persisted form, `"<fetch time millis>\n<product json>"`.
    pub fn serialize(&self) -> Result<String, Error> {
        let json = serde_json::to_string(self.product.as_ref())
            .map_err(|err| Error::Serialize(err.to_string()))?;
        Ok(self.fetch_time.timestamp_millis().to_string() + "\n" + &json)
    }
}

/// Decodes a raw product document, reporting invalid feature sets separately from JSON errors.
pub fn product_from_json(json: &str) -> Result<Product, Error> {
    let data =
        serde_json::from_str::<ProductData>(json).map_err(|err| Error::Parse(err.to_string()))?;
    Ok(Product {
        status: data.status,
        config: Config::new(data.config.name, data.config.features)?,
    })
}

/// Restores a [`ProductEntry`] written by [`ProductEntry::serialize`].
pub fn entry_from_cached_json(cached_json: &str) -> Result<ProductEntry, Error> {
    let time_index = if let Some(time_index) = cached_json.find('\n') {
        time_index
    } else {
        return Err(Error::Parse(
            "Number of values is fewer than expected".to_owned(),
        ));
    };
    let time_string = &cached_json[..time_index];
    let time = if let Ok(time) = time_string.parse::<i64>() {
        time
    } else {
        return Err(Error::Parse(format!("Invalid fetch time: '{time_string}'")));
    };
    let fetch_time = if let Some(fetch_time) = DateTime::from_timestamp_millis(time) {
        fetch_time
    } else {
        return Err(Error::Parse(format!(
            "Invalid unix milliseconds value: '{time}'"
        )));
    };
    let product = product_from_json(&cached_json[time_index + 1..])?;
    Ok(ProductEntry::new(product, fetch_time))
}

/// The top-level configuration document, the unit that is fetched and persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Optional status reported by the configuration source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// The toggle configuration.
    pub config: Config,
}

impl Product {
    /// Wraps a [`Config`] into a [`Product`] without status metadata.
    pub fn new(config: Config) -> Self {
        Self {
            status: None,
            config,
        }
    }
}

#[derive(Deserialize)]
struct ProductData {
    #[serde(default)]
    status: Option<String>,
    config: ConfigData,
}

#[derive(Deserialize)]
struct ConfigData {
    name: String,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Serialize)]
struct ConfigRef<'a> {
    name: &'a str,
    features: &'a [Feature],
}

/// Describes the features of an application along with their rules.
///
/// Feature names are unique, lookups by name go through an index built when the
/// [`Config`] is constructed or decoded.
///
/// # Examples
///
/// ```rust
/// use toggle::{Config, Feature, Rule, State, Value};
///
/// let rules = vec![Rule::new(true, false, Some("sample metadata"), Value::app_range(Some(14), Some(23)))];
/// let config = Config::new(
///     "myapp".to_owned(),
///     vec![Feature::new("video", None, State::Enabled, rules)],
/// )
/// .unwrap();
///
/// assert!(config.find_feature("video").is_some());
/// assert!(config.find_feature("audio").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    name: String,
    features: Vec<Feature>,
    index: HashMap<String, usize>,
}

impl Config {
    /// Creates a new [`Config`].
    ///
    /// # Errors
    ///
    /// This method fails if a feature has an empty name or two features share a name.
    pub fn new(name: String, features: Vec<Feature>) -> Result<Self, Error> {
        let mut index = HashMap::with_capacity(features.len());
        for (i, feature) in features.iter().enumerate() {
            if feature.name.is_empty() {
                return Err(Error::EmptyFeatureName);
            }
            if index.insert(feature.name.clone(), i).is_some() {
                return Err(Error::DuplicateFeature(feature.name.clone()));
            }
        }
        Ok(Self {
            name,
            features,
            index,
        })
    }

    /// The application or product name this config belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The features in their original order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Looks up a feature by its name.
    pub fn find_feature(&self, name: &str) -> Option<&Feature> {
        self.index.get(name).and_then(|i| self.features.get(*i))
    }

    /// The names of all features in their original order.
    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    /// `true` if the config has no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = ConfigData::deserialize(deserializer)?;
        Config::new(data.name, data.features).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ConfigRef {
            name: &self.name,
            features: &self.features,
        }
        .serialize(serializer)
    }
}

/// Describes a feature and the rules that control its state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// The unique name of the feature.
    pub name: String,
    /// Static override; when set, the rules are not evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<State>,
    /// The state used when none of the rules match.
    #[serde(rename = "default", default)]
    pub default_state: State,
    /// The rules in priority order, the first matching one decides.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Feature {
    /// Creates a new [`Feature`].
    pub fn new(name: &str, enabled: Option<State>, default_state: State, rules: Vec<Rule>) -> Self {
        Self {
            name: name.to_owned(),
            enabled,
            default_state,
            rules,
        }
    }
}

fn default_rule_outcome() -> bool {
    true
}

/// Describes a rule: when its condition holds (or doesn't, if inverted), the feature
/// takes the rule's `enabled` outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// The outcome applied when the rule fires.
    #[serde(default = "default_rule_outcome")]
    pub enabled: bool,
    /// Flips the sense of the condition, the rule fires when the value does not match.
    #[serde(default)]
    pub invert: bool,
    /// Carried to the response when this rule decides the outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    /// The condition of the rule.
    pub value: Value,
}

impl Rule {
    /// Creates a new [`Rule`].
    pub fn new(enabled: bool, invert: bool, metadata: Option<&str>, value: Value) -> Self {
        Self {
            enabled,
            invert,
            metadata: metadata.map(str::to_owned),
            value,
        }
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let cond = if self.invert { "IF NOT" } else { "IF" };
        let outcome = if self.enabled { "ENABLED" } else { "DISABLED" };
        write!(f, "{cond} {} THEN {outcome}", self.value)
    }
}

/// Describes the condition of a [`Rule`].
///
/// Only one group of fields is meant to be populated: the API level range, the app version
/// range, the `date` threshold, or the `expiry` threshold. A value without any populated
/// field always matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    /// Lowest matching platform API level (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_min: Option<i64>,
    /// Highest matching platform API level (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_max: Option<i64>,
    /// Lowest matching app version (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_min: Option<i64>,
    /// Highest matching app version (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_max: Option<i64>,
    /// Unix timestamp in milliseconds, matches from this moment on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
    /// Unix timestamp in milliseconds, matches until this moment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
}

impl Value {
    /// Matches platform API levels within `min..=max`, an unset bound is open.
    pub fn api_range(min: Option<i64>, max: Option<i64>) -> Self {
        Self {
            api_min: min,
            api_max: max,
            ..Value::default()
        }
    }

    /// Matches app versions within `min..=max`, an unset bound is open.
    pub fn app_range(min: Option<i64>, max: Option<i64>) -> Self {
        Self {
            app_min: min,
            app_max: max,
            ..Value::default()
        }
    }

    /// Matches from `date_millis` on.
    pub fn after(date_millis: i64) -> Self {
        Self {
            date: Some(date_millis),
            ..Value::default()
        }
    }

    /// Matches until `expiry_millis`.
    pub fn before(expiry_millis: i64) -> Self {
        Self {
            expiry: Some(expiry_millis),
            ..Value::default()
        }
    }

    /// `true` if no field is populated.
    pub fn is_empty(&self) -> bool {
        self.populated_groups() == 0
    }

    pub(crate) fn has_api_range(&self) -> bool {
        self.api_min.is_some() || self.api_max.is_some()
    }

    pub(crate) fn has_app_range(&self) -> bool {
        self.app_min.is_some() || self.app_max.is_some()
    }

    pub(crate) fn populated_groups(&self) -> usize {
        [
            self.has_api_range(),
            self.has_app_range(),
            self.date.is_some(),
            self.expiry.is_some(),
        ]
        .iter()
        .filter(|populated| **populated)
        .count()
    }
}

fn fmt_range(f: &mut Formatter<'_>, attr: &str, min: Option<i64>, max: Option<i64>) -> std::fmt::Result {
    match (min, max) {
        (Some(min), Some(max)) => write!(f, "{attr} BETWEEN {min} AND {max}"),
        (Some(min), None) => write!(f, "{attr} >= {min}"),
        (None, Some(max)) => write!(f, "{attr} <= {max}"),
        (None, None) => Ok(()),
    }
}

fn fmt_millis(millis: i64) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(date) => format!("{millis} ({date})"),
        None => format!("{millis} (<invalid date>)"),
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.populated_groups() {
            0 => return f.write_str("<always>"),
            1 => {}
            _ => return f.write_str("<ambiguous value>"),
        }
        if self.has_api_range() {
            return fmt_range(f, "API level", self.api_min, self.api_max);
        }
        if self.has_app_range() {
            return fmt_range(f, "App version", self.app_min, self.app_max);
        }
        if let Some(date) = self.date {
            return write!(f, "Now AFTER {}", fmt_millis(date));
        }
        if let Some(expiry) = self.expiry {
            return write!(f, "Now BEFORE {}", fmt_millis(expiry));
        }
        Ok(())
    }
}
