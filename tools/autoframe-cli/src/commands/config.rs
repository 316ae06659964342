//! Print or write the effective configuration.

use std::path::PathBuf;

use anyhow::Context;

use autoframe_common::config::AppConfig;

use crate::overrides::ConfigOverrides;

pub fn run(
    output: Option<PathBuf>,
    overrides: &ConfigOverrides,
    mut config: AppConfig,
) -> anyhow::Result<()> {
    overrides.apply(&mut config);
    config.validate().context("invalid configuration")?;

    match output {
        Some(path) => {
            config
                .save_to(&path)
                .with_context(|| format!("failed to write config {}", path.display()))?;
            println!("Config written to: {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}
