//! Process configuration from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use shopdesk_ai::{AggregatorConfig, MAX_WINDOW_DAYS, ModelConfig};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// `None` selects the in-memory repository.
    pub database_url: Option<String>,
    /// `None` when no API key is set; insights then fail with a generation error.
    pub model: Option<ModelConfig>,
    pub insights: AggregatorConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match get("BIND_ADDR") {
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
            Some(raw) => match raw.parse() {
                Ok(addr) => addr,
                Err(_) => {
                    return Err(ConfigError::Invalid {
                        var: "BIND_ADDR",
                        expected: "a socket address",
                        value: raw,
                    });
                }
            },
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        let model = match get("LLM_API_KEY") {
            Some(api_key) => {
                let mut model = ModelConfig::new(api_key);
                if let Some(base_url) = get("LLM_BASE_URL") {
                    model.base_url = base_url;
                }
                if let Some(name) = get("LLM_MODEL") {
                    model.model = name;
                }
                let timeout_ms: u64 = parse_or(&get, "LLM_TIMEOUT_MS", "a positive integer", 30_000)?;
                model.timeout = Duration::from_millis(timeout_ms);
                model.max_tokens = parse_or(&get, "LLM_MAX_TOKENS", "a positive integer", 1024)?;
                Some(model)
            }
            None => {
                tracing::warn!("LLM_API_KEY not set; AI insights are disabled");
                None
            }
        };

        let defaults = AggregatorConfig::default();
        let insights = AggregatorConfig {
            ttl_minutes: parse_or(&get, "INSIGHTS_TTL_MINUTES", "a positive integer", defaults.ttl_minutes)?,
            max_sales: parse_or(&get, "INSIGHTS_MAX_SALES", "a positive integer", defaults.max_sales)?,
            window_days: parse_window_days(&get, defaults.window_days)?,
            dedupe_in_flight: match get("INSIGHTS_DEDUPE") {
                None => defaults.dedupe_in_flight,
                Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid {
                    var: "INSIGHTS_DEDUPE",
                    expected: "true or false",
                    value: v,
                })?,
            },
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            database_url: get("DATABASE_URL"),
            model,
            insights,
        })
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, expected: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => match raw.parse::<T>() {
            // Zero is never a meaningful size, TTL or timeout here.
            Ok(v) if v != T::default() => Ok(v),
            _ => Err(ConfigError::Invalid {
                var,
                expected,
                value: raw,
            }),
        },
        None => Ok(default),
    }
}

fn parse_window_days<G>(get: &G, default: u32) -> Result<u32, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    const VAR: &str = "INSIGHTS_WINDOW_DAYS";
    const EXPECTED: &str = "an integer between 1 and 36500";

    let days: u32 = parse_or(get, VAR, EXPECTED, default)?;
    if days > MAX_WINDOW_DAYS {
        return Err(ConfigError::Invalid {
            var: VAR,
            expected: EXPECTED,
            value: days.to_string(),
        });
    }
    Ok(days)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.jwt_secret, "dev-secret");
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.model, None);
        assert_eq!(cfg.insights, AggregatorConfig::default());
    }

    #[test]
    fn model_settings_follow_api_key() {
        let cfg = config(&[
            ("LLM_API_KEY", "sk-test"),
            ("LLM_MODEL", "claude-test"),
            ("LLM_TIMEOUT_MS", "1500"),
        ])
        .unwrap();
        let model = cfg.model.unwrap();
        assert_eq!(model.api_key, "sk-test");
        assert_eq!(model.model, "claude-test");
        assert_eq!(model.timeout, Duration::from_millis(1500));
        assert_eq!(model.base_url, "https://api.anthropic.com");
        assert_eq!(model.max_tokens, 1024);
    }

    #[test]
    fn insight_settings_are_parsed() {
        let cfg = config(&[
            ("INSIGHTS_TTL_MINUTES", "5"),
            ("INSIGHTS_MAX_SALES", "20"),
            ("INSIGHTS_DEDUPE", "off"),
            ("DATABASE_URL", " postgres://localhost/shop "),
        ])
        .unwrap();
        assert_eq!(cfg.insights.ttl_minutes, 5);
        assert_eq!(cfg.insights.max_sales, 20);
        assert_eq!(cfg.insights.window_days, 30);
        assert!(!cfg.insights.dedupe_in_flight);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/shop"));
    }

    #[test]
    fn invalid_numbers_fail() {
        assert_eq!(
            config(&[("INSIGHTS_TTL_MINUTES", "soon")]),
            Err(ConfigError::Invalid {
                var: "INSIGHTS_TTL_MINUTES",
                expected: "a positive integer",
                value: "soon".to_string(),
            })
        );
        assert!(config(&[("INSIGHTS_TTL_MINUTES", "0")]).is_err());
        assert!(config(&[("BIND_ADDR", "localhost")]).is_err());
        assert!(config(&[("INSIGHTS_DEDUPE", "maybe")]).is_err());
    }

    #[test]
    fn window_days_has_an_upper_bound() {
        assert_eq!(
            config(&[("INSIGHTS_WINDOW_DAYS", "36500")]).unwrap().insights.window_days,
            36_500
        );
        assert_eq!(
            config(&[("INSIGHTS_WINDOW_DAYS", "200000000")]),
            Err(ConfigError::Invalid {
                var: "INSIGHTS_WINDOW_DAYS",
                expected: "an integer between 1 and 36500",
                value: "200000000".to_string(),
            })
        );
        assert!(config(&[("INSIGHTS_WINDOW_DAYS", "0")]).is_err());
    }
}
