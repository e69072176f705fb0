use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

use crate::error::MusicError;
use crate::sources::SourceKind;

/// Configuración de servidor almacenada en JSON: prefijo de comandos,
/// fuentes de música permitidas/por defecto y playlists con nombre.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildSettings {
    pub guild_id: u64,
    pub prefix: String,
    pub default_source: SourceKind,
    pub allowed_sources: Vec<SourceKind>,
    #[serde(default)]
    pub playlists: Vec<Playlist>,
}

impl GuildSettings {
    fn new(guild_id: u64, default_prefix: &str) -> Self {
        Self {
            guild_id,
            prefix: default_prefix.to_string(),
            default_source: SourceKind::Youtube,
            allowed_sources: SourceKind::ALL.to_vec(),
            playlists: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Playlist {
    pub name: String,
    pub songs: Vec<String>,
}

/// Manager de almacenamiento basado en archivos JSON, un archivo por guild
pub struct JsonStorage {
    data_dir: PathBuf,
    default_prefix: String,
    guilds: HashMap<u64, GuildSettings>,
}

impl JsonStorage {
    pub async fn new(data_dir: PathBuf, default_prefix: String) -> Result<Self> {
        fs::create_dir_all(&data_dir).await?;

        let guilds_dir = data_dir.join("guilds");
        fs::create_dir_all(&guilds_dir).await?;

        info!("📁 Storage inicializado en: {}", data_dir.display());

        let mut storage = Self {
            data_dir,
            default_prefix,
            guilds: HashMap::new(),
        };

        storage.load_all_guilds().await?;

        Ok(storage)
    }

    /// Prefijo de comandos del guild, sin crear configuración si no existe
    pub fn prefix(&self, guild_id: u64) -> String {
        self.guilds
            .get(&guild_id)
            .map(|s| s.prefix.clone())
            .unwrap_or_else(|| self.default_prefix.clone())
    }

    /// Obtiene la configuración de un guild, creando la configuración por
    /// defecto en el primer acceso
    pub async fn guild_settings(&mut self, guild_id: u64) -> Result<GuildSettings> {
        if let Some(settings) = self.guilds.get(&guild_id) {
            return Ok(settings.clone());
        }

        let settings = GuildSettings::new(guild_id, &self.default_prefix);
        self.save_guild_settings(&settings).await?;
        self.guilds.insert(guild_id, settings.clone());

        info!("📝 Configuración por defecto creada para guild {}", guild_id);
        Ok(settings)
    }

    pub async fn set_prefix(&mut self, guild_id: u64, prefix: &str) -> Result<()> {
        let mut settings = self.guild_settings(guild_id).await?;
        settings.prefix = prefix.to_string();
        self.update_guild_settings(settings).await
    }

    pub async fn set_default_source(&mut self, guild_id: u64, source: SourceKind) -> Result<()> {
        let mut settings = self.guild_settings(guild_id).await?;
        settings.default_source = source;
        self.update_guild_settings(settings).await
    }

    /// `Ok(false)` si la fuente ya estaba permitida
    pub async fn add_source(&mut self, guild_id: u64, source: SourceKind) -> Result<bool> {
        let mut settings = self.guild_settings(guild_id).await?;
        if settings.allowed_sources.contains(&source) {
            return Ok(false);
        }

        settings.allowed_sources.push(source);
        self.update_guild_settings(settings).await?;
        Ok(true)
    }

    /// `Ok(false)` si la fuente no estaba permitida
    pub async fn remove_source(&mut self, guild_id: u64, source: SourceKind) -> Result<bool> {
        let mut settings = self.guild_settings(guild_id).await?;
        if !settings.allowed_sources.contains(&source) {
            return Ok(false);
        }

        settings.allowed_sources.retain(|s| *s != source);
        self.update_guild_settings(settings).await?;
        Ok(true)
    }

    pub async fn list_playlists(&mut self, guild_id: u64) -> Result<Vec<Playlist>> {
        Ok(self.guild_settings(guild_id).await?.playlists)
    }

    pub async fn create_playlist(&mut self, guild_id: u64, name: &str) -> Result<()> {
        let mut settings = self.guild_settings(guild_id).await?;

        if settings.playlists.iter().any(|p| p.name == name) {
            return Err(MusicError::DuplicatePlaylist(name.to_string()).into());
        }

        settings.playlists.push(Playlist {
            name: name.to_string(),
            songs: Vec::new(),
        });
        self.update_guild_settings(settings).await
    }

    pub async fn delete_playlist(&mut self, guild_id: u64, name: &str) -> Result<()> {
        let mut settings = self.guild_settings(guild_id).await?;

        let before = settings.playlists.len();
        settings.playlists.retain(|p| p.name != name);
        if settings.playlists.len() == before {
            return Err(MusicError::PlaylistNotFound(name.to_string()).into());
        }

        self.update_guild_settings(settings).await
    }

    pub async fn add_song(&mut self, guild_id: u64, name: &str, url: &str) -> Result<()> {
        let mut settings = self.guild_settings(guild_id).await?;

        let playlist = settings
            .playlists
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| MusicError::PlaylistNotFound(name.to_string()))?;

        playlist.songs.push(url.to_string());
        self.update_guild_settings(settings).await
    }

    pub async fn remove_song(&mut self, guild_id: u64, name: &str, url: &str) -> Result<()> {
        let mut settings = self.guild_settings(guild_id).await?;

        let playlist = settings
            .playlists
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| MusicError::PlaylistNotFound(name.to_string()))?;

        let before = playlist.songs.len();
        playlist.songs.retain(|s| s != url);
        if playlist.songs.len() == before {
            return Err(MusicError::SongNotInPlaylist.into());
        }

        self.update_guild_settings(settings).await
    }

    // Métodos privados

    async fn update_guild_settings(&mut self, settings: GuildSettings) -> Result<()> {
        let guild_id = settings.guild_id;

        self.save_guild_settings(&settings).await?;
        self.guilds.insert(guild_id, settings);

        info!("💾 Configuración actualizada para guild {}", guild_id);
        Ok(())
    }

    async fn save_guild_settings(&self, settings: &GuildSettings) -> Result<()> {
        let file_path = self.guild_file_path(settings.guild_id);
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&file_path, content).await?;
        Ok(())
    }

    async fn load_all_guilds(&mut self) -> Result<()> {
        let guilds_dir = self.data_dir.join("guilds");
        let mut files = fs::read_dir(&guilds_dir).await?;
        let mut loaded_count = 0;

        while let Some(entry) = files.next_entry().await? {
            let path = entry.path();

            if !path.extension().map_or(false, |ext| ext == "json") {
                continue;
            }

            match fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<GuildSettings>(&content) {
                    Ok(settings) => {
                        self.guilds.insert(settings.guild_id, settings);
                        loaded_count += 1;
                    }
                    Err(e) => {
                        warn!("Configuración inválida en {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Error leyendo {}: {}", path.display(), e);
                }
            }
        }

        if loaded_count > 0 {
            info!("📂 Cargadas {} configuraciones de servidor", loaded_count);
        }

        Ok(())
    }

    fn guild_file_path(&self, guild_id: u64) -> PathBuf {
        self.data_dir
            .join("guilds")
            .join(format!("guild_{}.json", guild_id))
    }
}
