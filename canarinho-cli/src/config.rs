//! Loading of the tuner configuration file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use canarinho_core::TunerConfig;

/// Loads a tuner configuration from a JSON file.
///
/// Missing fields fall back to their defaults, so a file holding only
/// `{"concert_pitch": 432.0}` is valid. The result is validated before it is
/// returned.
pub fn load_config(path: &Path) -> Result<TunerConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = parse_config(&data).with_context(|| format!("in config {}", path.display()))?;
    Ok(config)
}

fn parse_config(data: &str) -> Result<TunerConfig> {
    let config: TunerConfig = serde_json::from_str(data).context("parsing JSON")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canarinho_core::CorrelationMethod;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config(r#"{ "concert_pitch": 432.0, "correlation": "fft" }"#).unwrap();
        assert_eq!(config.concert_pitch, 432.0);
        assert_eq!(config.correlation, CorrelationMethod::Fft);
        assert_eq!(config.frame_length, 2048);
        assert_eq!(config.in_tune_cents, 5.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = parse_config(r#"{ "min_frequency": 900.0, "max_frequency": 100.0 }"#).unwrap_err();
        assert!(err.to_string().contains("frequency"), "{err}");
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(parse_config("{ concert_pitch: }").is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_config(Path::new("/nonexistent/canarinho.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/canarinho.json"));
    }
}
