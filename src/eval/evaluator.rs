use crate::eval::log_builder::EvalLogBuilder;
use crate::eval::matcher::matches;
use crate::fact::RuntimeFact;
use crate::model::config::{Feature, Rule};
use crate::model::enums::State;
use chrono::{DateTime, Utc};
use log::{info, log_enabled};

macro_rules! eval_log_enabled {
    () => {
        log_enabled!(log::Level::Info)
    };
}

/// The outcome of evaluating a feature's rules.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvalResult {
    /// Whether the feature is enabled.
    pub enabled: bool,
    /// The metadata of the rule that decided the outcome.
    pub metadata: Option<String>,
    /// Index of the rule that decided the outcome, `None` if a static override or the default state did.
    pub matched_rule: Option<usize>,
}

/// Evaluates `feature` for the given runtime fact.
///
/// A feature with a static `enabled` override resolves to it; otherwise the first rule
/// that fires decides, falling back to the feature's default state.
///
/// # Examples
///
/// ```rust
/// use toggle::{evaluate, Feature, Rule, RuntimeFact, State, Value};
///
/// let feature = Feature::new(
///     "video",
///     None,
///     State::Disabled,
///     vec![Rule::new(true, false, Some("beta"), Value::app_range(Some(14), Some(23)))],
/// );
/// let result = evaluate(&feature, &RuntimeFact::new().app_version(20));
/// assert!(result.enabled);
/// assert_eq!(result.metadata.as_deref(), Some("beta"));
/// ```
pub fn evaluate(feature: &Feature, fact: &RuntimeFact) -> EvalResult {
    let mut log = EvalLogBuilder::default();
    if eval_log_enabled!() {
        log.append(format!("Evaluating '{}' for {fact}", feature.name).as_str())
            .inc_indent();
    }
    let result = if let Some(state) = feature.enabled {
        if eval_log_enabled!() {
            log.new_ln(Some(
                format!("Static state {state} is set, skipping rules.").as_str(),
            ));
        }
        EvalResult {
            enabled: state.is_enabled(),
            ..EvalResult::default()
        }
    } else {
        eval_rules(
            &feature.rules,
            fact,
            fact.now(),
            feature.default_state,
            &mut log,
        )
    };
    if eval_log_enabled!() {
        log.dec_indent().new_ln(Some(
            format!("Returning '{}'.", State::from(result.enabled)).as_str(),
        ));
        info!(event_id = 5000; "{}", log.content());
    }
    result
}

/// Evaluates `rules` in order; the first rule whose condition (flipped when `invert` is set)
/// holds decides the outcome. Returns `fallback` when none of them fire.
pub fn evaluate_rules(
    rules: &[Rule],
    fact: &RuntimeFact,
    now: DateTime<Utc>,
    fallback: State,
) -> EvalResult {
    eval_rules(rules, fact, now, fallback, &mut EvalLogBuilder::default())
}

fn eval_rules(
    rules: &[Rule],
    fact: &RuntimeFact,
    now: DateTime<Utc>,
    fallback: State,
    log: &mut EvalLogBuilder,
) -> EvalResult {
    for (index, rule) in rules.iter().enumerate() {
        let fired = matches(&rule.value, fact, now) != rule.invert;
        if eval_log_enabled!() {
            log.append_rule_result(index, rule, fired);
        }
        if fired {
            return EvalResult {
                enabled: rule.enabled,
                metadata: rule.metadata.clone(),
                matched_rule: Some(index),
            };
        }
    }
    if eval_log_enabled!() && !rules.is_empty() {
        log.new_ln(Some(
            format!("No rule matched, using the default state {fallback}.").as_str(),
        ));
    }
    EvalResult {
        enabled: fallback.is_enabled(),
        ..EvalResult::default()
    }
}

#[cfg(test)]
mod evaluator_tests {
    use super::*;
    use crate::model::config::Value;

    fn fact() -> RuntimeFact {
        RuntimeFact::new().app_version(20).api_level(23)
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = vec![
            Rule::new(true, false, Some("A"), Value::app_range(Some(30), None)),
            Rule::new(false, false, Some("B"), Value::app_range(Some(14), Some(23))),
            Rule::new(true, false, Some("C"), Value::default()),
        ];
        let result = evaluate_rules(&rules, &fact(), Utc::now(), State::Enabled);
        assert_eq!(
            result,
            EvalResult {
                enabled: false,
                metadata: Some("B".to_owned()),
                matched_rule: Some(1),
            }
        );
    }

    #[test]
    fn no_rule_matches() {
        let rules = vec![Rule::new(true, false, Some("A"), Value::app_range(Some(30), None))];
        let enabled = evaluate_rules(&rules, &fact(), Utc::now(), State::Enabled);
        assert!(enabled.enabled);
        assert!(enabled.metadata.is_none());
        assert!(enabled.matched_rule.is_none());

        let disabled = evaluate_rules(&rules, &fact(), Utc::now(), State::Disabled);
        assert!(!disabled.enabled);

        let empty = evaluate_rules(&[], &fact(), Utc::now(), State::Enabled);
        assert!(empty.enabled);
    }

    #[test]
    fn normal_rule() {
        let rule = Rule::new(true, false, Some("in range"), Value::app_range(Some(14), Some(23)));
        let matching = evaluate_rules(&[rule.clone()], &fact(), Utc::now(), State::Disabled);
        assert!(matching.enabled);
        assert_eq!(matching.metadata.as_deref(), Some("in range"));

        let other = RuntimeFact::new().app_version(30);
        let not_matching = evaluate_rules(&[rule], &other, Utc::now(), State::Disabled);
        assert!(!not_matching.enabled);
        assert!(not_matching.metadata.is_none());
    }

    #[test]
    fn inverted_rule() {
        let rule = Rule::new(true, true, Some("out of range"), Value::app_range(Some(14), Some(23)));
        let in_range = evaluate_rules(&[rule.clone()], &fact(), Utc::now(), State::Disabled);
        assert!(!in_range.enabled);
        assert!(in_range.matched_rule.is_none());

        let other = RuntimeFact::new().app_version(30);
        let out_of_range = evaluate_rules(&[rule], &other, Utc::now(), State::Disabled);
        assert!(out_of_range.enabled);
        assert_eq!(out_of_range.metadata.as_deref(), Some("out of range"));
        assert_eq!(out_of_range.matched_rule, Some(0));
    }

    #[test]
    fn inverted_empty_value_never_fires() {
        let rule = Rule::new(true, true, None, Value::default());
        let result = evaluate_rules(&[rule], &fact(), Utc::now(), State::Disabled);
        assert!(!result.enabled);
        assert!(result.matched_rule.is_none());
    }

    #[test]
    fn disabling_rule() {
        let rule = Rule::new(false, false, Some("kill switch"), Value::after(1453196880000));
        let result = evaluate_rules(&[rule], &fact(), Utc::now(), State::Enabled);
        assert!(!result.enabled);
        assert_eq!(result.metadata.as_deref(), Some("kill switch"));
    }

    #[test]
    fn static_override_skips_rules() {
        let rules = vec![Rule::new(true, false, Some("always"), Value::default())];
        let feature = Feature::new("video", Some(State::Disabled), State::Enabled, rules.clone());
        assert_eq!(evaluate(&feature, &fact()), EvalResult::default());

        let feature = Feature::new("video", None, State::Disabled, rules);
        let result = evaluate(&feature, &fact());
        assert!(result.enabled);
        assert_eq!(result.matched_rule, Some(0));
    }

    #[test]
    fn feature_default_state() {
        let feature = Feature::new("speech", None, State::Enabled, vec![]);
        assert!(evaluate(&feature, &fact()).enabled);
        let feature = Feature::new("speech", None, State::Disabled, vec![]);
        assert!(!evaluate(&feature, &fact()).enabled);
    }
}
