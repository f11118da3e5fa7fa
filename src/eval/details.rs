use crate::check::FeatureCheckRequest;
use crate::eval::evaluator::EvalResult;
use crate::model::enums::ResponseSource;
use chrono::{DateTime, Utc};

/// The result of a feature check.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCheckResponse {
    /// Name of the checked feature.
    pub feature_name: String,
    /// Whether the feature is enabled.
    pub enabled: bool,
    /// Metadata of the rule that decided the outcome (if any).
    pub metadata: Option<String>,
    /// `false` only when the result was computed from a configuration fetched live for this check.
    pub cached: bool,
    /// The tier of data that produced the result.
    pub source: ResponseSource,
    /// Index of the rule that decided the outcome (if any).
    pub matched_rule: Option<usize>,
    /// Time the configuration used for the evaluation was obtained.
    pub fetch_time: Option<DateTime<Utc>>,
}

impl FeatureCheckResponse {
    pub(crate) fn from_result(
        feature_name: &str,
        result: EvalResult,
        source: ResponseSource,
        fetch_time: DateTime<Utc>,
    ) -> Self {
        Self {
            feature_name: feature_name.to_owned(),
            enabled: result.enabled,
            metadata: result.metadata,
            cached: source != ResponseSource::Live,
            source,
            matched_rule: result.matched_rule,
            fetch_time: Some(fetch_time),
        }
    }

    pub(crate) fn from_default(request: &FeatureCheckRequest) -> Self {
        Self {
            feature_name: request.feature_name().to_owned(),
            enabled: request.default_state().is_enabled(),
            metadata: None,
            cached: true,
            source: ResponseSource::Default,
            matched_rule: None,
            fetch_time: None,
        }
    }
}
