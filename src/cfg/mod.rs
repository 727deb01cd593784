//! Configuration

use std::collections::HashMap;
use std::{borrow, env, fmt, io, str};

pub const DISPATCHER_LOGIC_SINGLE_THREADED: &str = "single-threaded";
pub const DISPATCHER_LOGIC_THREAD_PER_FIRING: &str = "thread-per-firing";

/// A `Config` holds simple key/value pairings sourced from a few layers.
///
/// Environment variables take highest precedence, followed by the
/// application's specified defaults (if any), followed by the library's
/// fallback defaults.
#[derive(Clone, Default)]
pub struct Config {
    defaults: HashMap<String, String>,
}

impl Config {
    /// Create a new configuration with the specified defaults, used when a
    /// key is not defined in the environment.
    pub fn new(defaults: &[(&str, &str)]) -> Config {
        let defaults = defaults
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Config { defaults }
    }

    /// Layer fallback defaults underneath this configuration. They only
    /// take effect for keys that neither the environment nor the existing
    /// defaults define.
    pub fn with_fallback(&self, fallback_defaults: &[(&str, &str)]) -> Config {
        let mut cfg = self.clone();

        for (key, value) in Self::new(fallback_defaults).defaults.into_iter() {
            cfg.defaults.entry(key).or_insert(value);
        }

        cfg
    }

    pub fn parsed<T: str::FromStr>(&self, name: &str) -> io::Result<T>
    where
        T::Err: fmt::Display,
    {
        self.string(name).and_then(|value| {
            value.trim().parse::<T>().map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("config parse error: {} {}", name, e),
                )
            })
        })
    }

    pub fn string(&self, name: &str) -> io::Result<String> {
        env::var(name)
            .ok()
            .or_else(|| self.defaults.get(name).map(borrow::ToOwned::to_owned))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("config missing: {}", name),
                )
            })
    }
}

/// Settings for a timer facility and the crate's optional logger.
#[derive(Clone, Debug)]
pub struct TimerConfig {
    /// How firings are delivered, see `dispatcher`.
    pub dispatcher_logic: String,

    /// Maximum number of live timers per facility. Zero means unlimited.
    pub max_timers: usize,

    pub scheduler_thread_name: String,

    /// Install the crate's stderr logger when the default facility starts.
    pub init_logger: bool,
    pub log_level: log::LevelFilter,
    pub log_config_on_start: bool,
}

impl TimerConfig {
    #[rustfmt::skip]
    pub fn new(cfg: &Config) -> io::Result<Self> {
        let cfg = cfg.with_fallback(&[
            ("ITIMER_DISPATCHER_LOGIC",         DISPATCHER_LOGIC_SINGLE_THREADED),
            ("ITIMER_MAX_TIMERS",               "0"),
            ("ITIMER_SCHEDULER_THREAD_NAME",    "itimer-scheduler"),
            ("ITIMER_INIT_LOGGER",              "false"),
            ("ITIMER_LOG_LEVEL",                "info"),
            ("ITIMER_LOG_CONFIG_ON_START",      "false"),
        ]);

        let config = Self {
            dispatcher_logic:       cfg.parsed("ITIMER_DISPATCHER_LOGIC")?,
            max_timers:             cfg.parsed("ITIMER_MAX_TIMERS")?,
            scheduler_thread_name:  cfg.string("ITIMER_SCHEDULER_THREAD_NAME")?,
            init_logger:            cfg.parsed("ITIMER_INIT_LOGGER")?,
            log_level:              cfg.parsed("ITIMER_LOG_LEVEL")?,
            log_config_on_start:    cfg.parsed("ITIMER_LOG_CONFIG_ON_START")?,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> io::Result<()> {
        match self.dispatcher_logic.as_str() {
            DISPATCHER_LOGIC_SINGLE_THREADED | DISPATCHER_LOGIC_THREAD_PER_FIRING => Ok(()),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown dispatcher logic: {}", other),
            )),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            dispatcher_logic: DISPATCHER_LOGIC_SINGLE_THREADED.to_string(),
            max_timers: 0,
            scheduler_thread_name: "itimer-scheduler".to_string(),
            init_logger: false,
            log_level: log::LevelFilter::Info,
            log_config_on_start: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time;

    #[derive(Debug, PartialEq)]
    struct CustomConfig {
        latency: u64,
        time: time::Duration,
        name: String,
    }

    #[test]
    fn test_config() -> io::Result<()> {
        let config = Config::new(&[("ITIMER_TEST_LATENCY", "10"), ("ITIMER_TEST_TIME", "1")])
            .with_fallback(&[
                ("ITIMER_TEST_NAME", "heartbeat"),
                ("ITIMER_TEST_TIME", "2"),
            ]);

        let parsed_config = CustomConfig {
            latency: config.parsed("ITIMER_TEST_LATENCY")?,
            time: config
                .parsed("ITIMER_TEST_TIME")
                .map(time::Duration::from_millis)?,
            name: config.string("ITIMER_TEST_NAME")?,
        };

        assert_eq!(
            parsed_config,
            CustomConfig {
                latency: 10,
                time: time::Duration::from_millis(1),
                name: "heartbeat".to_string(),
            }
        );

        Ok(())
    }

    #[test]
    fn test_config_missing_and_malformed() {
        let config = Config::new(&[("ITIMER_TEST_NUMBER", "ten")]);

        assert_eq!(
            config.string("ITIMER_TEST_ABSENT").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );

        assert_eq!(
            config
                .parsed::<u64>("ITIMER_TEST_NUMBER")
                .unwrap_err()
                .kind(),
            io::ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_timer_config() -> io::Result<()> {
        let config = TimerConfig::new(&Config::new(&[
            ("ITIMER_DISPATCHER_LOGIC", "thread-per-firing"),
            ("ITIMER_MAX_TIMERS", "16"),
            ("ITIMER_LOG_LEVEL", "debug"),
        ]))?;

        assert_eq!(config.dispatcher_logic, DISPATCHER_LOGIC_THREAD_PER_FIRING);
        assert_eq!(config.max_timers, 16);
        assert_eq!(config.log_level, log::LevelFilter::Debug);
        assert!(!config.init_logger);

        Ok(())
    }

    #[test]
    fn test_timer_config_rejects_unknown_dispatcher() {
        let result = TimerConfig::new(&Config::new(&[("ITIMER_DISPATCHER_LOGIC", "fibers")]));

        assert!(result.is_err());
    }
}
