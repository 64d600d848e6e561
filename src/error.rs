use thiserror::Error;

/// Failure to turn a microcode asset plus a run configuration into something
/// the simulator can execute. Always fatal: no cycles are issued.
#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("Failed to read microcode asset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse microcode YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid microcode: {0}")]
    Invalid(String),

    #[error("Config mismatch: asset declares {loops} loop(s) but {ranges} range(s) were given")]
    ConfigMismatch { loops: usize, ranges: usize },

    #[error("Unsupported nesting depth {depth} (must be 1 to 6 levels)")]
    UnsupportedDepth { depth: usize },

    #[error("Invalid trip count {count} for loop level {level} (must be at least 1)")]
    InvalidRange { level: usize, count: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_mismatch_names_both_arities() {
        let err = AssetLoadError::ConfigMismatch { loops: 1, ranges: 3 };
        let s = err.to_string();
        assert!(s.contains("1 loop"));
        assert!(s.contains("3 range"));
    }

    #[test]
    fn io_error_converts() {
        let err: AssetLoadError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "code.yml").into();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn unsupported_depth_mentions_depth() {
        let err = AssetLoadError::UnsupportedDepth { depth: 7 };
        assert!(err.to_string().contains("depth 7"));
    }

    #[test]
    fn invalid_range_mentions_level() {
        let err = AssetLoadError::InvalidRange { level: 2, count: 0 };
        let s = err.to_string();
        assert!(s.contains("level 2"));
        assert!(s.contains("trip count 0"));
    }
}
