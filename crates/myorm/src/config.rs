//! Connection and pool configuration.

use crate::error::{OrmError, OrmResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings handed to a [`Driver`](crate::Driver).
///
/// Deserializes from any serde format; omitted keys take the defaults of
/// [`Config::default`].
///
/// ```ignore
/// let config: Config = toml::from_str(r#"
///     user = "root"
///     host = "127.0.0.1"
///     port = 3306
///     db_name = "test"
///     read_timeout = 3
///     log_level = "debug"
/// "#)?;
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub db_name: String,

    /// Timeouts are written as whole seconds.
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub read_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub write_timeout: Duration,

    pub interpolate_params: bool,
    pub allow_native_passwords: bool,
    pub parse_time: bool,

    /// Level statement lines are logged at.
    #[serde(with = "level_str")]
    pub log_level: Level,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() { "" } else { "***" };
        f.debug_struct("Config")
            .field("user", &self.user)
            .field("password", &password)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db_name", &self.db_name)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("interpolate_params", &self.interpolate_params)
            .field("allow_native_passwords", &self.allow_native_passwords)
            .field("parse_time", &self.parse_time)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: String::new(),
            password: String::new(),
            host: "127.0.0.1".to_string(),
            port: 3306,
            db_name: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            interpolate_params: true,
            allow_native_passwords: true,
            parse_time: true,
            log_level: Level::INFO,
        }
    }
}

impl Config {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        db_name: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            host: host.into(),
            port,
            db_name: db_name.into(),
            ..Self::default()
        }
    }

    /// Read `MYSQL_USER`, `MYSQL_PASSWORD`, `MYSQL_HOST`, `MYSQL_PORT` and
    /// `MYSQL_DATABASE`. Unset host and port fall back to the defaults.
    pub fn from_env() -> OrmResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> OrmResult<Self> {
        let defaults = Self::default();
        let required = |key: &str| {
            lookup(key).ok_or_else(|| OrmError::Config(format!("{key} is not set")))
        };

        let port = match lookup("MYSQL_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| OrmError::Config(format!("MYSQL_PORT '{raw}': {e}")))?,
            None => defaults.port,
        };

        Ok(Self {
            user: required("MYSQL_USER")?,
            password: lookup("MYSQL_PASSWORD").unwrap_or_default(),
            host: lookup("MYSQL_HOST").unwrap_or(defaults.host),
            port,
            db_name: required("MYSQL_DATABASE")?,
            ..Self::default()
        })
    }

    /// `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Render the DSN in the `user:password@tcp(host:port)/db?params` form
    /// most MySQL drivers accept.
    pub fn format_dsn(&self) -> String {
        let mut dsn = String::new();
        if !self.user.is_empty() {
            dsn.push_str(&self.user);
            if !self.password.is_empty() {
                dsn.push(':');
                dsn.push_str(&self.password);
            }
            dsn.push('@');
        }
        dsn.push_str(&format!("tcp({})/{}", self.addr(), self.db_name));

        let mut params = Vec::new();
        if self.allow_native_passwords {
            params.push("allowNativePasswords=true".to_string());
        }
        if self.interpolate_params {
            params.push("interpolateParams=true".to_string());
        }
        if self.parse_time {
            params.push("parseTime=true".to_string());
        }
        params.push(format!("readTimeout={}s", self.read_timeout.as_secs()));
        params.push(format!("timeout={}s", self.connect_timeout.as_secs()));
        params.push(format!("writeTimeout={}s", self.write_timeout.as_secs()));

        dsn.push('?');
        dsn.push_str(&params.join("&"));
        dsn
    }
}

/// Sizing for [`Pool`](crate::Pool).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound of live connections.
    pub max_conns: usize,
    /// Connections idle longer than this are dropped on their next checkout.
    #[serde(with = "duration_secs")]
    pub max_idle_time: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_conns: 16,
            max_idle_time: Duration::from_secs(600),
        }
    }
}

impl PoolConfig {
    pub fn new(max_conns: usize, max_idle_time: Duration) -> Self {
        Self {
            max_conns,
            max_idle_time,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod level_str {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
    use tracing::Level;

    pub fn serialize<S: Serializer>(value: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<Level>().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = Config::new("root", "123", "127.0.0.1", 3306, "test");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(10));
        assert_eq!(config.write_timeout, Duration::from_secs(10));
        assert!(config.interpolate_params && config.allow_native_passwords && config.parse_time);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn dsn_has_address_and_params() {
        let config = Config::new("root", "123", "127.0.0.1", 3306, "test");
        assert_eq!(
            config.format_dsn(),
            "root:123@tcp(127.0.0.1:3306)/test?allowNativePasswords=true&interpolateParams=true\
             &parseTime=true&readTimeout=10s&timeout=10s&writeTimeout=10s"
        );
    }

    #[test]
    fn env_lookup() {
        let vars: HashMap<&str, &str> = [
            ("MYSQL_USER", "root"),
            ("MYSQL_HOST", "db.local"),
            ("MYSQL_PORT", "3307"),
            ("MYSQL_DATABASE", "test"),
        ]
        .into_iter()
        .collect();
        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.addr(), "db.local:3307");
        assert_eq!(config.password, "");
        assert_eq!(config.db_name, "test");
    }

    #[test]
    fn env_lookup_reports_missing_and_bad_values() {
        let err = Config::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, OrmError::Config(ref m) if m.contains("MYSQL_USER")));

        let err = Config::from_lookup(|k| match k {
            "MYSQL_PORT" => Some("abc".to_string()),
            _ => Some("x".to_string()),
        })
        .unwrap_err();
        assert!(matches!(err, OrmError::Config(_)));
    }

    #[test]
    fn deserializes_from_toml() {
        let config: Config = toml::from_str(
            r#"
            user = "root"
            db_name = "test"
            read_timeout = 3
            log_level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.read_timeout, Duration::from_secs(3));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.port, 3306);

        let pool: PoolConfig = toml::from_str("max_conns = 4").unwrap();
        assert_eq!(pool.max_conns, 4);
        assert_eq!(pool.max_idle_time, Duration::from_secs(600));
    }

    #[test]
    fn debug_output_hides_the_password() {
        let config = Config::new("root", "s3cret", "db", 3306, "test");
        let printed = format!("{config:?}");
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("password: \"***\""));
        assert!(printed.contains("user: \"root\""));
    }
}
