use crate::config::CONFIG_FILE_NAME;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = r#"# perflab configuration

[scanner]
max_source_bytes = 100000

[classifier]
min_confidence = 0.3

[recommender]
memory_data_size = 1000
concurrency_users = 10
concurrency_duration_secs = 5.0
load_users = 50
load_duration_secs = 10.0
users_per_component = 5

[executor]
python = "python3"
timeout_secs = 10.0
grace_secs = 5.0
max_scenario_secs = 120.0
max_calls = 10000
max_threads_per_worker = 64
memory_limit_mb = 1024
"#;

pub fn init_config(force: bool) -> Result<()> {
    let path = init_config_in(&std::env::current_dir()?, force)?;
    println!("Created {} configuration file", path.display());
    Ok(())
}

/// Write the default configuration into `dir`, refusing to overwrite unless forced.
pub fn init_config_in(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!("Configuration file already exists. Use --force to overwrite.");
    }

    fs::write(&config_path, DEFAULT_CONFIG)?;
    Ok(config_path)
}
