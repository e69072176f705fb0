use async_trait::async_trait;
use serenity::all::{ChannelId, CreateMessage, Http};
use std::sync::Arc;
use tracing::error;

use crate::sources::TrackInfo;
use crate::ui::embeds;

/// Canal de avisos de reproducción. Los avances automáticos (fin de track,
/// fallos de resolución) ocurren fuera del contexto del comando que los
/// originó, así que el player anuncia por acá en vez de responder mensajes.
#[async_trait]
pub trait PlaybackNotifier: Send + Sync {
    async fn now_playing(&self, track: &TrackInfo);
    async fn track_failed(&self, track: &TrackInfo);
    async fn queue_finished(&self);
}

/// Notifier real: publica en el canal de texto donde se invocó el comando.
pub struct ChannelNotifier {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }

    async fn send_text(&self, content: String) {
        if let Err(e) = self.channel_id.say(&self.http, content).await {
            error!("Error al enviar aviso de reproducción: {:?}", e);
        }
    }
}

#[async_trait]
impl PlaybackNotifier for ChannelNotifier {
    async fn now_playing(&self, track: &TrackInfo) {
        let message = CreateMessage::new().embed(embeds::now_playing_embed(track));
        if let Err(e) = self.channel_id.send_message(&self.http, message).await {
            error!("Error al enviar mensaje now playing: {:?}", e);
        }
    }

    async fn track_failed(&self, track: &TrackInfo) {
        self.send_text(format!(
            "❌ No se pudo reproducir **{}**, saltando a la siguiente...",
            track.title
        ))
        .await;
    }

    async fn queue_finished(&self) {
        self.send_text("📭 Cola terminada.".to_string()).await;
    }
}
