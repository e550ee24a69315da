//! Application configuration loaded from environment variables.

use anyhow::{ensure, Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Supabase project configuration
    pub supabase: SupabaseConfig,

    /// Course shown on the form
    #[serde(default)]
    pub course: CourseConfig,

    /// Form timing
    #[serde(default)]
    pub form: FormConfig,

    /// Support contact
    #[serde(default)]
    pub support: SupportConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. https://<ref>.supabase.co
    pub url: String,

    /// Public anon key
    pub anon_key: SecretString,

    /// Request timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Table holding registrations
    #[serde(default = "default_table")]
    pub table: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseConfig {
    /// Short name used in messages ("the CCNA course")
    #[serde(default = "default_course_name")]
    pub name: String,

    /// Title shown on the success view
    #[serde(default = "default_course_title")]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormConfig {
    /// How long a sent code blocks the resend button
    #[serde(default = "default_countdown", with = "humantime_serde")]
    pub countdown: Duration,

    /// How long a toast stays visible
    #[serde(default = "default_toast_duration", with = "humantime_serde")]
    pub toast_duration: Duration,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupportConfig {
    /// Link offered when someone is already enrolled
    #[serde(default)]
    pub help_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default implementations
impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            name: default_course_name(),
            title: default_course_title(),
        }
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            countdown: default_countdown(),
            toast_duration: default_toast_duration(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_table() -> String {
    "registrations".into()
}

fn default_course_name() -> String {
    "CCNA".into()
}

fn default_course_title() -> String {
    "CCNA Certification".into()
}

fn default_countdown() -> Duration {
    Duration::from_secs(60)
}

fn default_toast_duration() -> Duration {
    Duration::from_secs(4)
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    // Keep keys and URLs as strings
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.form.countdown >= Duration::from_secs(1),
            "FORM__COUNTDOWN must be at least 1s, got {:?}",
            self.form.countdown
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "supabase": {
                "url": "https://example.supabase.co",
                "anon_key": "anon"
            }
        }))
        .unwrap();

        assert_eq!(config.supabase.table, "registrations");
        assert_eq!(config.supabase.timeout, Duration::from_secs(10));
        assert_eq!(config.course.name, "CCNA");
        assert_eq!(config.course.title, "CCNA Certification");
        assert_eq!(config.form.countdown, Duration::from_secs(60));
        assert_eq!(config.form.toast_duration, Duration::from_secs(4));
        assert_eq!(config.support.help_url, None);
        assert_eq!(config.log.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_humantime_durations() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "supabase": {
                "url": "https://example.supabase.co",
                "anon_key": "anon",
                "timeout": "30s"
            },
            "form": { "countdown": "2m", "toast_duration": "1500ms" }
        }))
        .unwrap();

        assert_eq!(config.supabase.timeout, Duration::from_secs(30));
        assert_eq!(config.form.countdown, Duration::from_secs(120));
        assert_eq!(config.form.toast_duration, Duration::from_millis(1500));
    }

    #[test]
    fn test_rejects_sub_second_countdown() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "supabase": {
                "url": "https://example.supabase.co",
                "anon_key": "anon"
            },
            "form": { "countdown": "500ms" }
        }))
        .unwrap();

        assert!(config.validate().is_err());
    }
}
