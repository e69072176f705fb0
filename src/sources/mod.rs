pub mod ytdlp;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MusicError, MusicResult};

pub use ytdlp::YtDlpResolver;

/// Metadatos de un track ya resuelto. Inmutable una vez creado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub thumbnail_url: String,
    pub source_url: String,
}

impl TrackInfo {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: "Unknown Artist".to_string(),
            thumbnail_url: ytdlp::DEFAULT_THUMBNAIL.to_string(),
            source_url: source_url.into(),
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_thumbnail(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = thumbnail_url.into();
        self
    }
}

/// Stream reproducible listo para entregar al transporte de voz.
///
/// Es un tipo propio (y no un `Input` de songbird) para que el núcleo del
/// reproductor no dependa del transporte y sea testeable en aislamiento.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioStream {
    /// URL directa de audio, se reproduce por streaming HTTP
    Direct(String),
    /// URL original que songbird delega internamente a yt-dlp
    YtDlp(String),
}

/// Contrato de resolución de tracks: de una URL arbitraria a metadatos,
/// y de un track resuelto a un stream reproducible.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resuelve metadatos de un track a partir de una URL o búsqueda
    async fn resolve(&self, url: &str) -> MusicResult<TrackInfo>;

    /// Obtiene un stream reproducible para un track ya resuelto
    async fn open_stream(&self, track: &TrackInfo) -> MusicResult<AudioStream>;
}

/// Fuentes de música soportadas por la configuración de servidor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Youtube,
    Spotify,
    Soundcloud,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Youtube,
        SourceKind::Spotify,
        SourceKind::Soundcloud,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Youtube => "youtube",
            SourceKind::Spotify => "spotify",
            SourceKind::Soundcloud => "soundcloud",
        }
    }

    /// Clasifica una URL según el host. `None` si no corresponde a
    /// ninguna fuente conocida (URLs directas, radios, etc.).
    pub fn from_url(raw: &str) -> Option<SourceKind> {
        let parsed = url::Url::parse(raw).ok()?;
        let host = parsed.host_str()?;

        if host.contains("youtube.com") || host.contains("youtu.be") {
            Some(SourceKind::Youtube)
        } else if host.contains("spotify.com") {
            Some(SourceKind::Spotify)
        } else if host.contains("soundcloud.com") {
            Some(SourceKind::Soundcloud)
        } else {
            None
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = MusicError;

    fn from_str(s: &str) -> MusicResult<Self> {
        match s.to_lowercase().as_str() {
            "youtube" => Ok(SourceKind::Youtube),
            "spotify" => Ok(SourceKind::Spotify),
            "soundcloud" => Ok(SourceKind::Soundcloud),
            other => Err(MusicError::InvalidSource(other.to_string())),
        }
    }
}
