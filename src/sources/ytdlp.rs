use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MusicError, MusicResult};
use crate::sources::{AudioStream, TrackInfo, TrackResolver};

/// Miniatura por defecto cuando la fuente no entrega ninguna
pub const DEFAULT_THUMBNAIL: &str = "https://i.imgur.com/gWv3uX0.png";

/// Resolver basado en yt-dlp: extrae metadatos y URL de stream
/// con `yt-dlp -j`, sin descargar el archivo.
pub struct YtDlpResolver;

impl YtDlpResolver {
    pub fn new() -> Self {
        Self
    }

    /// Extrae el JSON de metadatos de un video usando yt-dlp
    async fn extract_metadata(&self, url: &str) -> MusicResult<YtDlpMetadata> {
        let mut cmd = Command::new("yt-dlp");
        cmd.args([
            "-j",
            "--format",
            "bestaudio/best",
            "--no-playlist",
            "--no-warnings",
            "--default-search",
            "auto",
            "--socket-timeout",
            "30",
            "--retries",
            "3",
        ]);
        cmd.arg(url);

        let output = cmd
            .output()
            .await
            .map_err(|e| MusicError::ResolutionFailed(format!("{url}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("❌ yt-dlp falló para {}: {}", url, stderr.trim());
            return Err(MusicError::ResolutionFailed(url.to_string()));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|_| MusicError::ResolutionFailed(url.to_string()))
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, url: &str) -> MusicResult<TrackInfo> {
        let meta = self.extract_metadata(url).await?;

        let title = meta.title.unwrap_or_else(|| "Unknown Title".to_string());
        let artist = meta
            .artist
            .or(meta.uploader)
            .unwrap_or_else(|| "Unknown Artist".to_string());

        debug!("🔍 Resuelto: {} • {}", title, artist);

        let mut track = TrackInfo::new(title, url).with_artist(artist);
        if let Some(thumbnail) = meta.thumbnail {
            track = track.with_thumbnail(thumbnail);
        }
        Ok(track)
    }

    async fn open_stream(&self, track: &TrackInfo) -> MusicResult<AudioStream> {
        let meta = self.extract_metadata(&track.source_url).await?;

        // URL directa de audio si yt-dlp la entrega; si no, que songbird
        // delegue la extracción a yt-dlp al reproducir
        match meta.url {
            Some(stream_url) => {
                debug!("🎯 Stream directo para: {}", track.title);
                Ok(AudioStream::Direct(stream_url))
            }
            None => Ok(AudioStream::YtDlp(track.source_url.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct YtDlpMetadata {
    title: Option<String>,
    artist: Option<String>,
    uploader: Option<String>,
    thumbnail: Option<String>,
    url: Option<String>,
}
