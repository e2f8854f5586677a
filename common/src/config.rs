//! Global judge configuration.
//!
//! `JudgeConfig` is a lazily initialized, globally accessible singleton holding
//! runtime values loaded from the environment (and `.env` via `dotenvy`).
//! Binaries read it once at startup and hand the relevant values to the pool and
//! orchestrator explicitly; tests override individual fields through the setters.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock, RwLockReadGuard};

#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    /// Path to the JSON description of the sandbox workers.
    pub invokers_config: String,
    pub invoker_host: String,
    /// Read timeout applied to every sandbox response.
    pub invoker_timeout_secs: u64,
    pub default_time_limit_secs: f64,
    /// Mixed into every per-run seed.
    pub judge_seed: u64,
    pub docker_binary: String,
    pub python_binary: String,
}

static CONFIG_INSTANCE: OnceLock<RwLock<JudgeConfig>> = OnceLock::new();

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

impl JudgeConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Every key has a default, so a bare environment yields a usable local setup.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: var_or("APP_ENV", "development"),
            project_name: var_or("PROJECT_NAME", "judge"),
            log_level: var_or("LOG_LEVEL", "judge=info,invoker_pool=info"),
            log_file: var_or("LOG_FILE", "judge.log"),
            log_to_stdout: var_or("LOG_TO_STDOUT", "false") == "true",
            database_path: var_or("DATABASE_PATH", "data/judge.db"),
            invokers_config: var_or("INVOKERS_CONFIG", "invokers.json"),
            invoker_host: var_or("INVOKER_HOST", "127.0.0.1"),
            invoker_timeout_secs: parsed_or("INVOKER_TIMEOUT_SECS", 30),
            default_time_limit_secs: parsed_or("DEFAULT_TIME_LIMIT_SECS", 1.0),
            judge_seed: parsed_or("JUDGE_SEED", 0),
            docker_binary: var_or("DOCKER_BINARY", "docker"),
            python_binary: var_or("PYTHON_BINARY", "python3"),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn global() -> RwLockReadGuard<'static, JudgeConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(JudgeConfig::from_env()))
            .read()
            .expect("Failed to acquire JudgeConfig read lock")
    }

    /// Reloads from the environment, dropping any overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            if let Ok(mut guard) = lock.write() {
                *guard = JudgeConfig::from_env();
            }
        }
    }

    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut JudgeConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(JudgeConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire JudgeConfig write lock");
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        JudgeConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_log_level(value: impl Into<String>) {
        JudgeConfig::set_field(|cfg| cfg.log_level = value.into());
    }

    pub fn set_log_file(value: impl Into<String>) {
        JudgeConfig::set_field(|cfg| cfg.log_file = value.into());
    }

    pub fn set_log_to_stdout(value: bool) {
        JudgeConfig::set_field(|cfg| cfg.log_to_stdout = value);
    }

    pub fn set_database_path(value: impl Into<String>) {
        JudgeConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_invokers_config(value: impl Into<String>) {
        JudgeConfig::set_field(|cfg| cfg.invokers_config = value.into());
    }

    pub fn set_invoker_host(value: impl Into<String>) {
        JudgeConfig::set_field(|cfg| cfg.invoker_host = value.into());
    }

    pub fn set_invoker_timeout_secs(value: u64) {
        JudgeConfig::set_field(|cfg| cfg.invoker_timeout_secs = value);
    }

    pub fn set_default_time_limit_secs(value: f64) {
        JudgeConfig::set_field(|cfg| cfg.default_time_limit_secs = value);
    }

    pub fn set_judge_seed(value: u64) {
        JudgeConfig::set_field(|cfg| cfg.judge_seed = value);
    }

    pub fn set_docker_binary(value: impl Into<String>) {
        JudgeConfig::set_field(|cfg| cfg.docker_binary = value.into());
    }

    pub fn set_python_binary(value: impl Into<String>) {
        JudgeConfig::set_field(|cfg| cfg.python_binary = value.into());
    }
}

// Shorthand accessors used by binaries.

pub fn log_file() -> String {
    JudgeConfig::global().log_file.clone()
}

pub fn log_level() -> String {
    JudgeConfig::global().log_level.clone()
}

pub fn log_to_stdout() -> bool {
    JudgeConfig::global().log_to_stdout
}

pub fn database_path() -> String {
    JudgeConfig::global().database_path.clone()
}

pub fn invokers_config() -> String {
    JudgeConfig::global().invokers_config.clone()
}

pub fn invoker_timeout_secs() -> u64 {
    JudgeConfig::global().invoker_timeout_secs
}

pub fn judge_seed() -> u64 {
    JudgeConfig::global().judge_seed
}

pub fn invoker_host() -> String {
    JudgeConfig::global().invoker_host.clone()
}

pub fn default_time_limit_secs() -> f64 {
    JudgeConfig::global().default_time_limit_secs
}

pub fn docker_binary() -> String {
    JudgeConfig::global().docker_binary.clone()
}

pub fn python_binary() -> String {
    JudgeConfig::global().python_binary.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_when_variables_are_absent() {
        env::remove_var("INVOKER_TIMEOUT_SECS");
        env::remove_var("JUDGE_SEED");
        let cfg = JudgeConfig::from_env();
        assert_eq!(cfg.invoker_timeout_secs, 30);
        assert_eq!(cfg.judge_seed, 0);
        assert_eq!(cfg.invoker_host, "127.0.0.1");
    }

    #[test]
    #[serial]
    fn unparsable_numbers_fall_back_to_defaults() {
        env::set_var("INVOKER_TIMEOUT_SECS", "soon");
        let cfg = JudgeConfig::from_env();
        assert_eq!(cfg.invoker_timeout_secs, 30);
        env::remove_var("INVOKER_TIMEOUT_SECS");
    }

    #[test]
    #[serial]
    fn setters_override_until_reset() {
        JudgeConfig::set_judge_seed(42);
        JudgeConfig::set_invoker_timeout_secs(2);
        assert_eq!(judge_seed(), 42);
        assert_eq!(invoker_timeout_secs(), 2);

        JudgeConfig::reset();
        assert_eq!(invoker_timeout_secs(), 30);
    }
}
