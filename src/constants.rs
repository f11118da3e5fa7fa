/// The version of this crate.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const PRODUCT_FILE_NAME: &str = "product_v1.json";
pub const SOURCE_URL_FILE_NAME: &str = "source_url";
pub const SERIALIZATION_FORMAT_VERSION: &str = "v1";
pub const DEFAULT_NAMESPACE: &str = "default";
