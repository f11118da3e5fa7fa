use chrono::{DateTime, Utc};
use std::fmt::{Display, Formatter};

/// Describes the runtime context that rule conditions are compared against.
///
/// Every attribute is optional. A condition that needs an attribute which is not set
/// does not match.
///
/// # Examples:
///
/// ```rust
/// use toggle::RuntimeFact;
///
/// let fact = RuntimeFact::new()
///     .app_version(20)
///     .api_level(23);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeFact {
    app_version: Option<i64>,
    api_level: Option<i64>,
    time: Option<DateTime<Utc>>,
}

impl RuntimeFact {
    /// Initializes a new [`RuntimeFact`] without any attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application version (build number).
    pub fn app_version(mut self, version: i64) -> Self {
        self.app_version = Some(version);
        self
    }

    /// Sets the platform API level.
    pub fn api_level(mut self, level: i64) -> Self {
        self.api_level = Some(level);
        self
    }

    /// Pins the evaluation time. When not set, the current time is used.
    ///
    /// # Examples:
    ///
    /// ```rust
    /// use chrono::DateTime;
    /// use toggle::RuntimeFact;
    ///
    /// let fact = RuntimeFact::new().at(DateTime::from_timestamp_millis(1453196880000).unwrap());
    /// ```
    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// The application version, if set.
    pub fn get_app_version(&self) -> Option<i64> {
        self.app_version
    }

    /// The platform API level, if set.
    pub fn get_api_level(&self) -> Option<i64> {
        self.api_level
    }

    /// The pinned evaluation time, or the current time.
    pub fn now(&self) -> DateTime<Utc> {
        self.time.unwrap_or_else(Utc::now)
    }
}

impl Display for RuntimeFact {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let fmt_opt = |val: Option<i64>| match val {
            Some(v) => v.to_string(),
            None => "<unset>".to_owned(),
        };
        write!(
            f,
            "{{app version: {}, API level: {}",
            fmt_opt(self.app_version),
            fmt_opt(self.api_level)
        )?;
        if let Some(time) = self.time {
            write!(f, ", time: {time}")?;
        }
        f.write_str("}")
    }
}
