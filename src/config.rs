use std::{env, fmt, num::ParseIntError, path::PathBuf};

use dotenvy::dotenv;
use thiserror::Error;
use tracing::info;

const DEFAULT_INPUT: &str = "employees.xlsx";
const DEFAULT_OUTPUT_DIR: &str = ".";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("SMTP_PORT must be an integer port, got {value:?}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Relay settings and sender credentials, loaded once at startup.
#[derive(Clone)]
pub struct MailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub email_address: String,
    pub app_password: String,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("email_address", &self.email_address)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mail: MailConfig,
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
}

impl AppConfig {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let port = required("SMTP_PORT")?;
        let smtp_port = port
            .trim()
            .parse::<u16>()
            .map_err(|source| ConfigError::InvalidPort {
                value: port.clone(),
                source,
            })?;

        let mail = MailConfig {
            smtp_server: required("SMTP_SERVER")?,
            smtp_port,
            email_address: required("EMAIL_ADDRESS")?,
            app_password: required("APP_PASSWORD")?,
        };

        let input_path = lookup("EMPLOYEE_DATA").unwrap_or_else(|| DEFAULT_INPUT.to_string());
        let output_dir =
            lookup("PAYSLIP_OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());

        info!(
            "Loaded configuration: relay {}:{}, sender {}",
            mail.smtp_server, mail.smtp_port, mail.email_address
        );

        Ok(Self {
            mail,
            input_path: PathBuf::from(input_path),
            output_dir: PathBuf::from(output_dir),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn complete() -> HashMap<String, String> {
        vars(&[
            ("SMTP_SERVER", "smtp.example.com"),
            ("SMTP_PORT", "587"),
            ("EMAIL_ADDRESS", "payroll@example.com"),
            ("APP_PASSWORD", "hunter2"),
        ])
    }

    #[test]
    fn loads_required_values_and_defaults() {
        let env = complete();
        let config = AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.mail.smtp_server, "smtp.example.com");
        assert_eq!(config.mail.smtp_port, 587);
        assert_eq!(config.mail.email_address, "payroll@example.com");
        assert_eq!(config.mail.app_password, "hunter2");
        assert_eq!(config.input_path, PathBuf::from("employees.xlsx"));
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn optional_paths_override_defaults() {
        let mut env = complete();
        env.insert("EMPLOYEE_DATA".into(), "staff.csv".into());
        env.insert("PAYSLIP_OUTPUT_DIR".into(), "out".into());
        let config = AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.input_path, PathBuf::from("staff.csv"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn every_mail_variable_is_required() {
        for key in ["SMTP_SERVER", "SMTP_PORT", "EMAIL_ADDRESS", "APP_PASSWORD"] {
            let mut env = complete();
            env.remove(key);
            let err = AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
            assert!(matches!(err, ConfigError::Missing(missing) if missing == key));
        }
    }

    #[test]
    fn non_integer_port_is_rejected() {
        let mut env = complete();
        env.insert("SMTP_PORT".into(), "five-eight-seven".into());
        let err = AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidPort { ref value, .. } if value == "five-eight-seven"
        ));
    }

    #[test]
    fn debug_output_hides_the_password() {
        let env = complete();
        let config = AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        let debug = format!("{:?}", config.mail);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
