use crate::errors::ClientError;
use crate::model::config::{product_from_json, Product};

/// Converts a raw configuration document into a [`Product`].
pub trait Decoder: Sync + Send {
    /// Decodes `raw`.
    ///
    /// Fails with [`crate::ErrorKind::MalformedDocument`] when the document can't be parsed and
    /// with [`crate::ErrorKind::MalformedConfig`] when it describes an invalid config.
    fn decode(&self, raw: &str) -> Result<Product, ClientError>;
}

/// [`Decoder`] for JSON documents.
///
/// # Examples
///
/// ```rust
/// use toggle::{Decoder, JsonDecoder};
///
/// let product = JsonDecoder
///     .decode(r#"{"config": {"name": "myapp", "features": [{"name": "video", "default": "enabled"}]}}"#)
///     .unwrap();
/// assert!(product.config.find_feature("video").is_some());
/// ```
#[derive(Default, Clone, Copy)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(&self, raw: &str) -> Result<Product, ClientError> {
        Ok(product_from_json(raw)?)
    }
}
