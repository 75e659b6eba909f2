use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

/// ✅ Global Config stored in `OnceLock`
static CONFIG: OnceLock<Arc<Config>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("Config already initialized")]
    AlreadyInitialized,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    /// Token lifetime in seconds.
    pub jwt_ttl_secs: u64,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub log_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub permission_cache_ttl_secs: u64,
    pub super_user: Option<SuperUserSeed>,
}

/// Credentials for the account created at startup when none exists yet.
#[derive(Clone, Debug)]
pub struct SuperUserSeed {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl Config {
    /// ✅ Load environment variables and set defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok(); // Load .env only once

        let super_user = match (env::var("SUPER_USER_EMAIL"), env::var("SUPER_USER_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(SuperUserSeed {
                email,
                password,
                full_name: env::var("SUPER_USER_NAME").unwrap_or_else(|_| "Super User".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
            jwt_ttl_secs: parsed("JWT_TTL_SECS", 36_000)?,
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 10)?,
            run_migrations: env::var("RUN_MIGRATIONS").unwrap_or_else(|_| "true".to_string())
                == "true",
            log_dir: env::var("LOG_DIR").ok().map(PathBuf::from),
            request_timeout_secs: parsed("REQUEST_TIMEOUT_SECS", 30)?,
            permission_cache_ttl_secs: parsed("PERMISSION_CACHE_TTL_SECS", 600)?,
            super_user,
        })
    }

    /// ✅ Initialize the global config from the environment
    pub fn init() -> Result<Arc<Config>, ConfigError> {
        let config = Arc::new(Self::from_env()?);
        CONFIG
            .set(config.clone())
            .map_err(|_| ConfigError::AlreadyInitialized)?;
        Ok(config)
    }

    /// Installs an explicit config. The first installed config wins.
    pub fn install(config: Config) -> Arc<Config> {
        CONFIG.get_or_init(|| Arc::new(config)).clone()
    }

    /// ✅ Safe access to Config
    ///
    /// Panics if called before `init`/`install`; every entry point installs
    /// the config before building the router.
    pub fn get() -> Arc<Config> {
        CONFIG.get().expect("Config not initialized").clone()
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
