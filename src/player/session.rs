use async_trait::async_trait;
use songbird::{
    input::{HttpRequest, Input, YoutubeDl},
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, TrackEvent,
};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{MusicError, MusicResult};
use crate::player::GuildPlayer;
use crate::sources::AudioStream;

/// Aviso de fin de track. El transporte lo dispara exactamente una vez por
/// cada `play()`, desde su propia tarea (nunca sobre el stack del llamador).
///
/// Lleva el número de generación de la reproducción que lo originó: si el
/// player ya avanzó (stop, leave, reconexión), el aviso llega obsoleto y
/// se descarta en `on_track_end`.
pub struct TrackEndNotifier {
    player: Weak<GuildPlayer>,
    generation: u64,
}

impl TrackEndNotifier {
    pub(crate) fn new(player: Weak<GuildPlayer>, generation: u64) -> Self {
        Self { player, generation }
    }

    pub async fn notify(self) {
        if let Some(player) = self.player.upgrade() {
            player.on_track_end(self.generation).await;
        }
    }
}

/// Contrato de la sesión de voz de un guild: primitivas de transporte
/// (play/pause/resume/stop/volumen) más el aviso de fin de track.
///
/// `GuildPlayer` solo habla con este trait; el adaptador de songbird es la
/// única pieza que toca tipos del transporte real.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceSession: Send + Sync {
    /// Carga un stream y registra el aviso de fin de track
    async fn play(&self, stream: AudioStream, on_end: TrackEndNotifier) -> MusicResult<()>;

    async fn pause(&self) -> MusicResult<()>;

    async fn resume(&self) -> MusicResult<()>;

    /// Detiene el track actual. En songbird esto también dispara el evento
    /// de fin de track, y `skip` depende de ese comportamiento.
    async fn stop(&self) -> MusicResult<()>;

    async fn is_playing(&self) -> bool;

    async fn is_paused(&self) -> bool;

    /// Volumen ya escalado a `0.0..=1.0`; se recuerda para tracks futuros
    async fn set_volume(&self, volume: f32) -> MusicResult<()>;

    async fn disconnect(&self) -> MusicResult<()>;
}

/// Sesión de voz real sobre un `Call` de songbird.
pub struct SongbirdSession {
    call: Arc<Mutex<Call>>,
    http: reqwest::Client,
    current: Mutex<Option<TrackHandle>>,
    volume: Mutex<f32>,
}

impl SongbirdSession {
    pub fn new(call: Arc<Mutex<Call>>) -> Self {
        Self {
            call,
            http: reqwest::Client::new(),
            current: Mutex::new(None),
            volume: Mutex::new(1.0),
        }
    }

    fn make_input(&self, stream: AudioStream) -> Input {
        match stream {
            AudioStream::Direct(url) => HttpRequest::new(self.http.clone(), url).into(),
            AudioStream::YtDlp(url) => YoutubeDl::new(self.http.clone(), url).into(),
        }
    }

    async fn current_handle(&self) -> Option<TrackHandle> {
        self.current.lock().await.clone()
    }
}

#[async_trait]
impl VoiceSession for SongbirdSession {
    async fn play(&self, stream: AudioStream, on_end: TrackEndNotifier) -> MusicResult<()> {
        let input = self.make_input(stream);

        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input)
        };

        let volume = *self.volume.lock().await;
        let _ = handle.set_volume(volume);

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndForwarder {
                    notifier: Mutex::new(Some(on_end)),
                },
            )
            .map_err(|e| MusicError::TransportFailure(e.to_string()))?;

        *self.current.lock().await = Some(handle);
        Ok(())
    }

    async fn pause(&self) -> MusicResult<()> {
        if let Some(handle) = self.current_handle().await {
            handle
                .pause()
                .map_err(|e| MusicError::TransportFailure(e.to_string()))?;
        }
        Ok(())
    }

    async fn resume(&self) -> MusicResult<()> {
        if let Some(handle) = self.current_handle().await {
            handle
                .play()
                .map_err(|e| MusicError::TransportFailure(e.to_string()))?;
        }
        Ok(())
    }

    async fn stop(&self) -> MusicResult<()> {
        if let Some(handle) = self.current_handle().await {
            handle
                .stop()
                .map_err(|e| MusicError::TransportFailure(e.to_string()))?;
        }
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        match self.current_handle().await {
            Some(handle) => handle
                .get_info()
                .await
                .map(|info| info.playing == PlayMode::Play)
                .unwrap_or(false),
            None => false,
        }
    }

    async fn is_paused(&self) -> bool {
        match self.current_handle().await {
            Some(handle) => handle
                .get_info()
                .await
                .map(|info| info.playing == PlayMode::Pause)
                .unwrap_or(false),
            None => false,
        }
    }

    async fn set_volume(&self, volume: f32) -> MusicResult<()> {
        *self.volume.lock().await = volume;

        // Aplicar también al track en curso, si hay uno
        if let Some(handle) = self.current_handle().await {
            let _ = handle.set_volume(volume);
        }
        Ok(())
    }

    async fn disconnect(&self) -> MusicResult<()> {
        *self.current.lock().await = None;

        let mut call = self.call.lock().await;
        call.leave()
            .await
            .map_err(|e| MusicError::TransportFailure(e.to_string()))
    }
}

/// Puente entre el evento de fin de track de songbird y el notifier del
/// player. Se dispara una sola vez y se cancela a sí mismo.
struct TrackEndForwarder {
    notifier: Mutex<Option<TrackEndNotifier>>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndForwarder {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        debug!("🎵 Track terminado, avisando al player");

        let taken = { self.notifier.lock().await.take() };
        if let Some(notifier) = taken {
            notifier.notify().await;
        }

        Some(Event::Cancel)
    }
}
