mod analysis;
mod core;
mod executor;
mod loader;

pub use analysis::{ClassifierConfig, RecommenderConfig, ScannerConfig};
pub use self::core::PerflabConfig;
pub use executor::{ExecutorConfig, PYTHON_ENV_VAR};
pub use loader::{
    directory_ancestors, discover_config, load_config, load_config_from,
    parse_and_validate_config, CONFIG_FILE_NAME,
};
