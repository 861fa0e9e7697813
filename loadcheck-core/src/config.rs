use crate::{
    ConfigError, LoadProfile, Stage, Threshold, BASE_URL_ENV, DEFAULT_BASE_URL,
    DEFAULT_GRACEFUL_STOP,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

// TODO: Have a separate builder
#[doc(hidden)]
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub vus: Option<usize>,
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    pub duration: Option<Duration>,
    pub start_vus: usize,
    pub stages: Vec<Stage>,
    pub thresholds: Vec<ThresholdSpec>,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub graceful_stop: Duration,
    pub summary_export: Option<PathBuf>,
    pub skip_thresholds: bool,
}

/// A threshold as declared, before parsing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ThresholdSpec {
    pub metric: String,
    pub expression: String,
}

impl ScenarioConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vus: None,
            duration: None,
            start_vus: 0,
            stages: vec![],
            thresholds: vec![],
            graceful_stop: DEFAULT_GRACEFUL_STOP,
            summary_export: None,
            skip_thresholds: false,
        }
    }

    /// Stages win over a plain duration; a duration without VUs runs a single VU.
    pub fn profile(&self) -> Result<LoadProfile, ConfigError> {
        match self {
            ScenarioConfig { stages, .. } if !stages.is_empty() => Ok(LoadProfile::Ramping {
                start_vus: self.start_vus,
                stages: stages.clone(),
            }),

            ScenarioConfig {
                duration: Some(duration),
                vus,
                ..
            } => Ok(LoadProfile::Constant {
                vus: vus.unwrap_or(1),
                duration: *duration,
            }),

            _ => Err(ConfigError::NoProfile(self.name.clone())),
        }
    }

    pub fn parsed_thresholds(&self) -> Result<Vec<Threshold>, ConfigError> {
        if self.skip_thresholds {
            return Ok(vec![]);
        }

        self.thresholds
            .iter()
            .map(|spec| Threshold::parse(&spec.metric, &spec.expression))
            .collect()
    }

    pub fn add_threshold(&mut self, metric: &str, expression: &str) {
        self.thresholds.push(ThresholdSpec {
            metric: metric.to_string(),
            expression: expression.to_string(),
        });
    }
}

/// Read the target base URL from `BASE_URL`, falling back to the default.
pub fn base_url_from_env() -> Result<String, ConfigError> {
    let raw = std::env::var(BASE_URL_ENV).ok();
    let url = normalize_base_url(raw.as_deref())?;
    tracing::debug!("Using base URL {url}");
    Ok(url)
}

/// Validate a base URL, substituting the default for a missing or blank value.
///
/// A trailing `/` is trimmed so that paths can be appended directly.
pub fn normalize_base_url(raw: Option<&str>) -> Result<String, ConfigError> {
    let raw = match raw.map(str::trim) {
        Some(url) if !url.is_empty() => url,
        _ => DEFAULT_BASE_URL,
    };

    let parsed = Url::parse(raw).map_err(|err| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {}", parsed.scheme()),
        });
    }

    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_base_url_default() {
        assert_eq!(normalize_base_url(None).unwrap(), "http://localhost:8000");
        assert_eq!(normalize_base_url(Some("")).unwrap(), "http://localhost:8000");
        assert_eq!(normalize_base_url(Some("  ")).unwrap(), "http://localhost:8000");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        assert_eq!(
            normalize_base_url(Some("http://10.0.0.5:9000/")).unwrap(),
            "http://10.0.0.5:9000"
        );
    }

    #[test]
    fn test_base_url_invalid() {
        assert!(matches!(
            normalize_base_url(Some("not a url")),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            normalize_base_url(Some("ftp://example.com")),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_profile_constant() {
        let mut config = ScenarioConfig::new("smoke");
        config.vus = Some(5);
        config.duration = Some(Duration::from_secs(60));

        assert_eq!(
            config.profile().unwrap(),
            LoadProfile::Constant {
                vus: 5,
                duration: Duration::from_secs(60)
            }
        );
    }

    #[test]
    fn test_profile_stages_win() {
        let mut config = ScenarioConfig::new("stress");
        config.duration = Some(Duration::from_secs(60));
        config.stages = vec![Stage::new(Duration::from_secs(10), 3)];

        assert!(matches!(
            config.profile().unwrap(),
            LoadProfile::Ramping { start_vus: 0, .. }
        ));
    }

    #[test]
    fn test_profile_missing() {
        let config = ScenarioConfig::new("nothing");
        assert_eq!(
            config.profile(),
            Err(ConfigError::NoProfile("nothing".to_string()))
        );
    }

    #[test]
    fn test_thresholds_skipped() {
        let mut config = ScenarioConfig::new("smoke");
        config.add_threshold("errors", "rate<0.01");
        assert_eq!(config.parsed_thresholds().unwrap().len(), 1);

        config.skip_thresholds = true;
        assert!(config.parsed_thresholds().unwrap().is_empty());
    }

    #[test]
    fn test_thresholds_invalid() {
        let mut config = ScenarioConfig::new("smoke");
        config.add_threshold("errors", "rate<<0.01");
        assert!(config.parsed_thresholds().is_err());
    }
}
