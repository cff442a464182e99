use crate::{
    recommend::{RecommendError, RecommendOptions},
    storage::{BackendLocal, StorageManager},
};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.yaml";

/// Default address for `shelf daemon`
const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
/// Default number of lines read by `shelf import`
const DEFAULT_IMPORT_LIMIT: usize = 2300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid recommend config: {0}")]
    Recommend(#[from] RecommendError),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("config io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("config is malformed: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("config file is not valid utf8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Address the daemon binds to
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Maximum number of lines read from an import file
    #[serde(default = "default_import_limit")]
    pub import_limit: usize,

    /// Defaults for every recommendation request
    #[serde(default)]
    pub recommend: RecommendOptions,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            import_limit: default_import_limit(),
            recommend: RecommendOptions::default(),
            base_path: String::new(),
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_import_limit() -> usize {
    DEFAULT_IMPORT_LIMIT
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Invalid("listen must not be empty".to_string()));
        }

        if self.import_limit == 0 {
            return Err(ConfigError::Invalid(
                "import_limit must be greater than 0".to_string(),
            ));
        }

        self.recommend.validate()?;

        Ok(())
    }

    pub fn load_with(base_path: &str) -> Result<Self, ConfigError> {
        let store = BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            log::info!("Creating default config at {base_path}/{CONFIG_FILE}");
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str = String::from_utf8(store.read(CONFIG_FILE)?)?;
        let mut config: Self = serde_yml::from_str(&config_str)?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let store = BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;

        Ok(())
    }
}
