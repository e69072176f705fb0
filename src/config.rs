use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,

    // Comandos
    pub default_prefix: String,

    // Paths
    pub data_dir: PathBuf,

    // Límites
    pub max_queue_size: usize,
    pub default_volume: u8, // 0-100
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            discord_token: std::env::var("DISCORD_TOKEN")?,

            default_prefix: std::env::var("DEFAULT_PREFIX")
                .unwrap_or_else(|_| "!".to_string()),

            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),

            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
        };

        std::fs::create_dir_all(&config.data_dir)?;

        config.validate()?;

        Ok(config)
    }

    /// Chequeos de sanidad sobre la configuración cargada
    pub fn validate(&self) -> Result<()> {
        if self.default_prefix.is_empty() {
            anyhow::bail!("El prefijo por defecto no puede estar vacío");
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("MAX_QUEUE_SIZE debe ser mayor que 0");
        }

        if self.default_volume > 100 {
            anyhow::bail!(
                "DEFAULT_VOLUME debe estar entre 0 y 100, recibido: {}",
                self.default_volume
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            default_prefix: "!".to_string(),
            data_dir: "./data".into(),
            max_queue_size: 100,
            default_volume: 100,
        }
    }
}
