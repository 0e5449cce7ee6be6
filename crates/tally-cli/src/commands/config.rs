//! Config file management

use crate::args::ConfigAction;
use crate::commands::exit;
use anyhow::bail;
use console::style;
use std::path::Path;
use std::process::ExitCode;
use tally_core::{EvalConfig, config};

pub async fn execute(config_file: &Path, action: ConfigAction) -> anyhow::Result<ExitCode> {
    match action {
        ConfigAction::Show => {
            let cfg = config::load_from_file(config_file)?;
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
        ConfigAction::Validate => {
            let cfg = config::load_from_file(config_file)?;
            cfg.validate()?;
            println!(
                "{} {} is valid",
                style("✓").green(),
                config_file.display()
            );
        }
        ConfigAction::Init { force } => {
            if config_file.exists() && !force {
                bail!(
                    "'{}' already exists (use --force to overwrite)",
                    config_file.display()
                );
            }
            let cfg = EvalConfig::default();
            std::fs::write(config_file, serde_json::to_string_pretty(&cfg)?)?;
            println!(
                "Created {} - edit the dataset path and model list before running",
                config_file.display()
            );
        }
    }

    Ok(ExitCode::from(exit::CHUNK_PROCESSED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_then_validate() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tally_config.json");

        execute(&path, ConfigAction::Init { force: false })
            .await
            .unwrap();
        assert!(path.exists());

        execute(&path, ConfigAction::Validate).await.unwrap();
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tally_config.json");
        std::fs::write(&path, "{}").unwrap();

        let error = execute(&path, ConfigAction::Init { force: false })
            .await
            .unwrap_err();
        assert!(error.to_string().contains("already exists"));

        execute(&path, ConfigAction::Init { force: true })
            .await
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("chunk_size"));
    }
}
