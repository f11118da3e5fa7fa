//! Feature toggle client for Rust.
//!
//! Fetches a feature configuration from a remote source, keeps the last good copy in memory
//! and in a [`ConfigStore`], and evaluates features against a [`RuntimeFact`].

#![warn(missing_docs)]

mod builder;
mod cache;
mod check;
mod client;
mod constants;
mod errors;
mod eval;
mod fact;
mod fetch;
mod model;
mod utils;

pub use builder::ToggleBuilder;
pub use cache::{CacheGateway, ConfigStore, FileStore, InMemoryStore};
pub use check::{Callback, FeatureCheckRequest, FeatureCheckRequestBuilder};
pub use client::{CheckBuilder, Toggle};
pub use constants::PKG_VERSION;
pub use errors::{ClientError, ErrorKind};
pub use eval::details::FeatureCheckResponse;
pub use eval::evaluator::{evaluate, evaluate_rules, EvalResult};
pub use eval::matcher::matches;
pub use fact::RuntimeFact;
pub use fetch::transport::{HttpTransport, Transport};

pub use model::config::Error as ConfigError;
pub use model::config::{Config, Feature, Product, ProductEntry, Rule, Value};
pub use model::decoder::{Decoder, JsonDecoder};
pub use model::enums::{ResponseSource, State};
