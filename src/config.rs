use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

use crate::engine::SlotStep;
use crate::limits::MAX_SESSION_TTL_HOURS;
use crate::model::Minutes;
use crate::timeofday::parse_date;

/// Rules the scheduling core applies to availability and booking requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingPolicy {
    /// How far the slot generator advances between candidate start times.
    pub slot_step: SlotStep,
    /// Requested start times must be a multiple of this many minutes after midnight.
    pub slot_granularity: Minutes,
    /// Sort and merge schedule blocks before generating slots.
    pub normalize_blocks: bool,
    /// Dates before this one are neither offered nor bookable.
    pub booking_opens_on: Option<NaiveDate>,
    /// Reject requests that do not lie inside an open schedule block.
    pub enforce_schedule: bool,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            slot_step: SlotStep::Fixed(30),
            slot_granularity: 30,
            normalize_blocks: true,
            booking_opens_on: None,
            enforce_schedule: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    pub compact_threshold: u64,
    pub admin_user: String,
    pub admin_password: String,
    pub session_ttl: Duration,
    /// Mark the session cookie `Secure`; set when served over HTTPS.
    pub secure_cookies: bool,
    pub studio_name: String,
    pub policy: BookingPolicy,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { var: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "{var} must be set"),
            ConfigError::Invalid { var, value } => write!(f, "invalid {var}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());
        let parsed = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            get(var)
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .map_err(|_| ConfigError::Invalid { var, value: v })
                })
                .transpose()
        };
        let flag = |var: &'static str, default: bool| -> Result<bool, ConfigError> {
            match get(var) {
                None => Ok(default),
                Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => Ok(true),
                    "0" | "false" | "no" | "off" => Ok(false),
                    _ => Err(ConfigError::Invalid { var, value: v }),
                },
            }
        };
        let port = |var: &'static str| -> Result<Option<u16>, ConfigError> {
            parsed(var)?
                .map(|p| {
                    u16::try_from(p).map_err(|_| ConfigError::Invalid {
                        var,
                        value: p.to_string(),
                    })
                })
                .transpose()
        };
        let minutes = |var: &'static str, v: u64| -> Result<Minutes, ConfigError> {
            Minutes::try_from(v)
                .ok()
                .filter(|m| (1..=crate::limits::MINUTES_PER_DAY).contains(m))
                .ok_or(ConfigError::Invalid {
                    var,
                    value: v.to_string(),
                })
        };

        let slot_step = match get("STUDIO_SLOT_STEP") {
            None => SlotStep::Fixed(30),
            Some(v) if v.trim().eq_ignore_ascii_case("duration") => SlotStep::ServiceDuration,
            Some(v) => {
                let n = v.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                    var: "STUDIO_SLOT_STEP",
                    value: v.clone(),
                })?;
                SlotStep::Fixed(minutes("STUDIO_SLOT_STEP", n)?)
            }
        };
        let slot_granularity = match parsed("STUDIO_SLOT_GRANULARITY")? {
            Some(n) => minutes("STUDIO_SLOT_GRANULARITY", n)?,
            None => 30,
        };
        let booking_opens_on = match get("STUDIO_BOOKING_OPENS_ON") {
            None => None,
            Some(v) => Some(parse_date(&v).ok_or(ConfigError::Invalid {
                var: "STUDIO_BOOKING_OPENS_ON",
                value: v.clone(),
            })?),
        };

        let ttl_hours = parsed("STUDIO_SESSION_TTL_HOURS")?.unwrap_or(24 * 30);
        let session_ttl = Some(ttl_hours)
            .filter(|h| (1..=MAX_SESSION_TTL_HOURS).contains(h))
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
            .ok_or(ConfigError::Invalid {
                var: "STUDIO_SESSION_TTL_HOURS",
                value: ttl_hours.to_string(),
            })?;

        Ok(Self {
            bind: get("STUDIO_BIND").unwrap_or_else(|| "0.0.0.0".into()),
            port: port("STUDIO_PORT")?.unwrap_or(8080),
            data_dir: PathBuf::from(get("STUDIO_DATA_DIR").unwrap_or_else(|| "./data".into())),
            metrics_port: port("STUDIO_METRICS_PORT")?,
            compact_threshold: parsed("STUDIO_COMPACT_THRESHOLD")?.unwrap_or(1000),
            admin_user: get("STUDIO_ADMIN_USER").unwrap_or_else(|| "admin".into()),
            admin_password: get("STUDIO_ADMIN_PASS").ok_or(ConfigError::Missing("STUDIO_ADMIN_PASS"))?,
            session_ttl,
            secure_cookies: flag("STUDIO_SECURE_COOKIES", false)?,
            studio_name: get("STUDIO_NAME").unwrap_or_else(|| "the studio".into()),
            policy: BookingPolicy {
                slot_step,
                slot_granularity,
                normalize_blocks: flag("STUDIO_NORMALIZE_BLOCKS", true)?,
                booking_opens_on,
                enforce_schedule: flag("STUDIO_ENFORCE_SCHEDULE", false)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = from_pairs(&[("STUDIO_ADMIN_PASS", "secret")]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.bind, "0.0.0.0");
        assert_eq!(cfg.admin_user, "admin");
        assert_eq!(cfg.compact_threshold, 1000);
        assert_eq!(cfg.metrics_port, None);
        assert_eq!(cfg.session_ttl, Duration::from_secs(30 * 24 * 3600));
        assert!(!cfg.secure_cookies);
        assert_eq!(cfg.policy, BookingPolicy::default());
    }

    #[test]
    fn admin_password_is_required() {
        assert!(matches!(
            from_pairs(&[]),
            Err(ConfigError::Missing("STUDIO_ADMIN_PASS"))
        ));
    }

    #[test]
    fn policy_overrides() {
        let cfg = from_pairs(&[
            ("STUDIO_ADMIN_PASS", "secret"),
            ("STUDIO_SLOT_STEP", "duration"),
            ("STUDIO_SLOT_GRANULARITY", "15"),
            ("STUDIO_NORMALIZE_BLOCKS", "false"),
            ("STUDIO_BOOKING_OPENS_ON", "2026-02-01"),
            ("STUDIO_ENFORCE_SCHEDULE", "yes"),
        ])
        .unwrap();
        assert_eq!(cfg.policy.slot_step, SlotStep::ServiceDuration);
        assert_eq!(cfg.policy.slot_granularity, 15);
        assert!(!cfg.policy.normalize_blocks);
        assert_eq!(
            cfg.policy.booking_opens_on,
            NaiveDate::from_ymd_opt(2026, 2, 1)
        );
        assert!(cfg.policy.enforce_schedule);

        let cfg = from_pairs(&[("STUDIO_ADMIN_PASS", "x"), ("STUDIO_SLOT_STEP", "45")]).unwrap();
        assert_eq!(cfg.policy.slot_step, SlotStep::Fixed(45));

        let cfg = from_pairs(&[
            ("STUDIO_ADMIN_PASS", "x"),
            ("STUDIO_SESSION_TTL_HOURS", "8760"),
            ("STUDIO_SECURE_COOKIES", "true"),
        ])
        .unwrap();
        assert_eq!(cfg.session_ttl, Duration::from_secs(8760 * 3600));
        assert!(cfg.secure_cookies);
    }

    #[test]
    fn invalid_values_are_errors() {
        for (var, value) in [
            ("STUDIO_PORT", "99999"),
            ("STUDIO_SLOT_STEP", "0"),
            ("STUDIO_SLOT_STEP", "half"),
            ("STUDIO_SLOT_GRANULARITY", "-5"),
            ("STUDIO_NORMALIZE_BLOCKS", "maybe"),
            ("STUDIO_BOOKING_OPENS_ON", "tomorrow"),
            ("STUDIO_SESSION_TTL_HOURS", "0"),
            ("STUDIO_SESSION_TTL_HOURS", "18446744073709551615"),
            ("STUDIO_SESSION_TTL_HOURS", "9000"),
            ("STUDIO_SECURE_COOKIES", "sometimes"),
        ] {
            let result = from_pairs(&[("STUDIO_ADMIN_PASS", "x"), (var, value)]);
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "{var}={value} should be rejected"
            );
        }
    }
}
