use super::FormatError;
use serde::Serialize;

/// Convert a fold map (or a single file) to YAML
pub fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String, FormatError> {
    serde_yaml::to_string(value).map_err(FormatError::from)
}
