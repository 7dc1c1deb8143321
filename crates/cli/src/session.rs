use anyhow::{Context, Result};
use elements_core::config::{AppConfig, ClassificationConfig};
use elements_core::vault::FsVault;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

/// Loaded configuration plus the vault it points at.
pub struct Session {
    pub config: AppConfig,
    pub vault: Arc<FsVault>,
    classification: Arc<ClassificationConfig>,
}

impl Session {
    /// `vault_override` replaces `vault.root` from the config.
    pub fn open(config: AppConfig, vault_override: Option<&str>) -> Result<Self> {
        let root = PathBuf::from(vault_override.unwrap_or(&config.vault.root));
        let vault = FsVault::open(&root, &config.vault, &config.moves)
            .with_context(|| format!("opening vault {}", root.display()))?;
        let classification = Arc::new(config.classification.clone());
        Ok(Session {
            config,
            vault: Arc::new(vault),
            classification,
        })
    }

    pub fn classification(&self) -> Arc<ClassificationConfig> {
        self.classification.clone()
    }

    /// Journal pool, or `None` when journaling is disabled.
    pub async fn journal(&self) -> Result<Option<SqlitePool>> {
        if !self.config.journal.enabled {
            return Ok(None);
        }
        let path = self.config.journal_path(self.vault.root());
        let pool = elements_storage::connect(&path.to_string_lossy())
            .await
            .context("journal connect")?;
        elements_storage::migrate(&pool)
            .await
            .context("journal migrate")?;
        Ok(Some(pool))
    }
}
