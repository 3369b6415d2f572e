use super::FormatError;
use serde::Serialize;

/// Convert a fold map (or a single file) to pretty-printed JSON
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, FormatError> {
    serde_json::to_string_pretty(value).map_err(FormatError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FoldMap, FoldStats, ScanMetadata};
    use std::path::PathBuf;

    #[test]
    fn test_to_json() {
        let fold_map = FoldMap {
            root: PathBuf::from("/test"),
            files: vec![],
            stats: FoldStats::default(),
            metadata: ScanMetadata::default(),
        };

        let json = to_json(&fold_map).unwrap();
        assert!(json.contains("\"root\""));
        assert!(json.contains("\"files\""));
    }
}
