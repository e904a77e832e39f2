//! Metric naming rules.

use crate::error::CoreError;

/// Maximum metric name length in characters.
pub const MAX_METRIC_NAME_LEN: usize = 200;

/// Trim a metric name and reject blank or overlong values.
pub fn normalize_metric_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Metric name must not be blank".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_METRIC_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Metric name must be at most {MAX_METRIC_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(normalize_metric_name("  Bundleness ").unwrap(), "Bundleness");
    }

    #[test]
    fn rejects_blank() {
        assert!(normalize_metric_name("").is_err());
        assert!(normalize_metric_name("   ").is_err());
    }

    #[test]
    fn length_limit_counts_characters() {
        let at_limit = "µ".repeat(MAX_METRIC_NAME_LEN);
        assert!(normalize_metric_name(&at_limit).is_ok());
        let over = "a".repeat(MAX_METRIC_NAME_LEN + 1);
        assert!(normalize_metric_name(&over).is_err());
    }
}
