//! Núcleo de reproducción por guild.
//!
//! Cada guild tiene un [`GuildPlayer`] que coordina su [`PlaybackQueue`],
//! su sesión de voz y el resolver de tracks. Todas las operaciones que
//! mutan estado (join, encolar, skip, stop, avance por fin de track, leave)
//! se serializan con un único mutex por guild: un evento de fin de track y
//! un comando concurrente nunca intentan arrancar el siguiente track a la
//! vez. Guilds distintos operan en paralelo sin estado compartido.

pub mod notify;
pub mod queue;
pub mod registry;
pub mod session;

use serenity::model::id::GuildId;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{MusicError, MusicResult};
use crate::sources::{TrackInfo, TrackResolver};
use notify::PlaybackNotifier;
use queue::PlaybackQueue;
use session::{TrackEndNotifier, VoiceSession};

/// Resultado de una pasada del protocolo play-next: qué track arrancó
/// (si alguno) y cuáles fallaron en el camino.
#[derive(Debug, Default)]
pub struct PlayOutcome {
    pub started: Option<TrackInfo>,
    pub failed: Vec<TrackInfo>,
}

struct PlayerState {
    queue: PlaybackQueue,
    session: Option<Arc<dyn VoiceSession>>,
    notifier: Option<Arc<dyn PlaybackNotifier>>,
    /// Identifica la reproducción en curso. Un aviso de fin de track con
    /// una generación vieja llega obsoleto (hubo stop/leave/reconexión
    /// en el medio) y se descarta.
    generation: u64,
}

/// Máquina de estados de reproducción de un guild:
/// Idle → Conectado-Vacío → Reproduciendo ⇄ Pausado → Idle.
pub struct GuildPlayer {
    guild_id: GuildId,
    resolver: Arc<dyn TrackResolver>,
    state: Mutex<PlayerState>,
}

impl GuildPlayer {
    pub fn new(
        guild_id: GuildId,
        resolver: Arc<dyn TrackResolver>,
        max_queue_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            guild_id,
            resolver,
            state: Mutex::new(PlayerState {
                queue: PlaybackQueue::new(max_queue_size),
                session: None,
                notifier: None,
                generation: 0,
            }),
        })
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Instala una sesión de voz nueva. Si había una anterior la
    /// desconecta primero: a lo sumo una sesión por guild, y un `join`
    /// repetido reconecta en vez de ser no-op.
    pub async fn connect(&self, session: Arc<dyn VoiceSession>) -> MusicResult<()> {
        let mut state = self.state.lock().await;

        if let Some(old) = state.session.take() {
            let _ = old.disconnect().await;
        }

        state.generation += 1;
        state.session = Some(session);

        info!("🔊 Sesión de voz conectada en guild {}", self.guild_id);
        Ok(())
    }

    /// Suelta la sesión actual sin tocar la cola. Lo usa `join` antes de
    /// reconectar, porque songbird reutiliza el mismo `Call` por guild.
    pub async fn disconnect_session(&self) {
        let mut state = self.state.lock().await;
        if let Some(old) = state.session.take() {
            state.generation += 1;
            let _ = old.disconnect().await;
        }
    }

    /// Define a dónde se anuncian los avances automáticos (now playing,
    /// fallos de resolución, cola terminada).
    pub async fn set_notifier(&self, notifier: Arc<dyn PlaybackNotifier>) {
        self.state.lock().await.notifier = Some(notifier);
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.session.is_some()
    }

    /// Encola un track ya resuelto y, si no hay nada sonando, arranca el
    /// protocolo play-next. El llamador resuelve la URL **fuera** del lock;
    /// acá se re-verifica la sesión al reacquirir, así una resolución que
    /// termina después de un `leave` se descarta en vez de arrancar.
    ///
    /// Toda la secuencia encolar-y-arrancar corre bajo el lock del guild:
    /// dos `play` concurrentes sobre una cola vacía no pueden ver ambos
    /// `current` vacío y duplicar el arranque.
    pub async fn enqueue_and_play(self: &Arc<Self>, track: TrackInfo) -> MusicResult<PlayOutcome> {
        let mut state = self.state.lock().await;

        if state.session.is_none() {
            return Err(MusicError::NotConnected);
        }

        state.queue.enqueue(track)?;

        if state.queue.peek_current().is_none() {
            self.play_next_locked(&mut state).await
        } else {
            Ok(PlayOutcome::default())
        }
    }

    /// Protocolo play-next: único camino para el arranque inicial, el fin
    /// natural de un track y el skip. Iterativo a propósito: un fallo de
    /// resolución avanza al siguiente pendiente sin recursión, acotado
    /// porque la cola se achica en cada intento fallido.
    async fn play_next_locked(
        self: &Arc<Self>,
        state: &mut PlayerState,
    ) -> MusicResult<PlayOutcome> {
        let session = state.session.clone().ok_or(MusicError::NotConnected)?;
        let mut outcome = PlayOutcome::default();

        loop {
            // Con loop activo se reenvía el track actual sin tocar pending
            let track = match state.queue.peek_current() {
                Some(current) if state.queue.is_loop() => current.clone(),
                _ => match state.queue.dequeue_next() {
                    Some(next) => next,
                    None => {
                        // Cola agotada: queda conectado e inactivo, sin
                        // auto-desconexión
                        state.queue.skip_current();
                        if let Some(notifier) = &state.notifier {
                            notifier.queue_finished().await;
                        }
                        debug!("📭 Cola vacía en guild {}", self.guild_id);
                        return Ok(outcome);
                    }
                },
            };

            match self.resolver.open_stream(&track).await {
                Ok(stream) => {
                    state.generation += 1;
                    let on_end =
                        TrackEndNotifier::new(Arc::downgrade(self), state.generation);

                    match session.play(stream, on_end).await {
                        Ok(()) => {
                            info!(
                                "🎵 Reproduciendo: {} en guild {}",
                                track.title, self.guild_id
                            );
                            if let Some(notifier) = &state.notifier {
                                notifier.now_playing(&track).await;
                            }
                            outcome.started = Some(track);
                            return Ok(outcome);
                        }
                        Err(e) => {
                            // Fallo de transporte: se trata igual que un
                            // track que no resolvió, nunca es fatal
                            warn!(
                                "❌ Transporte falló para {} en guild {}: {}",
                                track.title, self.guild_id, e
                            );
                            state.queue.skip_current();
                            if let Some(notifier) = &state.notifier {
                                notifier.track_failed(&track).await;
                            }
                            outcome.failed.push(track);
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        "❌ No se pudo resolver {} en guild {}: {}",
                        track.title, self.guild_id, e
                    );
                    // Un track en loop que falla sale del loop-replay
                    state.queue.skip_current();
                    if let Some(notifier) = &state.notifier {
                        notifier.track_failed(&track).await;
                    }
                    outcome.failed.push(track);
                }
            }
        }
    }

    /// Manejador del aviso de fin de track que entrega el transporte.
    pub async fn on_track_end(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock().await;

        if generation != state.generation {
            debug!(
                "⏳ Aviso de fin obsoleto descartado en guild {} (gen {} != {})",
                self.guild_id, generation, state.generation
            );
            return;
        }

        if state.session.is_none() {
            return;
        }

        if let Err(e) = self.play_next_locked(&mut state).await {
            error!(
                "Error al avanzar la cola en guild {}: {:?}",
                self.guild_id, e
            );
        }
    }

    /// `Ok(false)` significa "no hay nada que pausar", para que el comando
    /// responda algo en vez de fallar.
    pub async fn pause(&self) -> MusicResult<bool> {
        let state = self.state.lock().await;
        let session = state.session.clone().ok_or(MusicError::NotConnected)?;

        if !session.is_playing().await {
            return Ok(false);
        }

        session.pause().await?;
        info!("⏸️ Reproducción pausada en guild {}", self.guild_id);
        Ok(true)
    }

    pub async fn resume(&self) -> MusicResult<bool> {
        let state = self.state.lock().await;
        let session = state.session.clone().ok_or(MusicError::NotConnected)?;

        if !session.is_paused().await {
            return Ok(false);
        }

        session.resume().await?;
        info!("▶️ Reproducción reanudada en guild {}", self.guild_id);
        Ok(true)
    }

    /// Stop es "detener y limpiar": corta el track actual y vacía la cola
    /// entera. El aviso de fin que dispara el stop queda obsoleto por el
    /// salto de generación.
    pub async fn stop(&self) -> MusicResult<()> {
        let mut state = self.state.lock().await;
        let session = state.session.clone().ok_or(MusicError::NotConnected)?;

        state.generation += 1;
        let result = session.stop().await;
        state.queue.clear();

        info!("⏹️ Reproducción detenida en guild {}", self.guild_id);
        result
    }

    /// Skip no llama a play-next directamente: descarta el track actual y
    /// detiene el transporte, y el aviso de fin de track (que acá sigue
    /// siendo válido) hace el avance por el camino único de play-next.
    pub async fn skip(&self) -> MusicResult<bool> {
        let mut state = self.state.lock().await;
        let session = state.session.clone().ok_or(MusicError::NotConnected)?;

        if !session.is_playing().await {
            return Ok(false);
        }

        // Sin esto, un track en loop se repetiría después del skip
        state.queue.skip_current();
        session.stop().await?;

        info!("⏭️ Track saltado en guild {}", self.guild_id);
        Ok(true)
    }

    pub async fn set_volume(&self, volume: i64) -> MusicResult<()> {
        if !(0..=100).contains(&volume) {
            return Err(MusicError::InvalidVolume(volume));
        }

        let state = self.state.lock().await;
        let session = state.session.clone().ok_or(MusicError::NotConnected)?;

        session.set_volume(volume as f32 / 100.0).await?;
        info!("🔊 Volumen ajustado a {}% en guild {}", volume, self.guild_id);
        Ok(())
    }

    pub async fn set_loop(&self, enabled: bool) {
        self.state.lock().await.queue.set_loop(enabled);
    }

    pub async fn is_loop(&self) -> bool {
        self.state.lock().await.queue.is_loop()
    }

    pub async fn now_playing(&self) -> Option<TrackInfo> {
        self.state.lock().await.queue.peek_current().cloned()
    }

    /// Copia de los pendientes para mostrar (listado 1-indexado)
    pub async fn queue_snapshot(&self) -> Vec<TrackInfo> {
        self.state.lock().await.queue.snapshot()
    }

    /// Desconecta y vuelve al estado Idle: cola vacía, sin sesión. El
    /// estado se limpia aunque la desconexión del transporte falle.
    pub async fn leave(&self) -> MusicResult<()> {
        let mut state = self.state.lock().await;
        let session = state.session.take().ok_or(MusicError::NotConnected)?;

        state.generation += 1;
        state.queue.clear();

        info!("👋 Player desconectado en guild {}", self.guild_id);
        session.disconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::session::MockVoiceSession;
    use super::*;
    use crate::sources::{AudioStream, MockTrackResolver};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    fn track(title: &str) -> TrackInfo {
        TrackInfo::new(title, format!("https://example.com/{title}"))
    }

    /// Resolver de prueba: resuelve todo salvo las URLs marcadas como rotas
    #[derive(Default)]
    struct FakeResolver {
        failing: StdMutex<HashSet<String>>,
    }

    impl FakeResolver {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn fail_for(&self, url: &str) {
            self.failing.lock().unwrap().insert(url.to_string());
        }
    }

    #[async_trait]
    impl TrackResolver for FakeResolver {
        async fn resolve(&self, url: &str) -> MusicResult<TrackInfo> {
            Ok(TrackInfo::new(url, url))
        }

        async fn open_stream(&self, track: &TrackInfo) -> MusicResult<AudioStream> {
            if self.failing.lock().unwrap().contains(&track.source_url) {
                Err(MusicError::ResolutionFailed(track.source_url.clone()))
            } else {
                Ok(AudioStream::Direct(format!("{}#stream", track.source_url)))
            }
        }
    }

    /// Sesión de prueba. No dispara el fin de track desde `stop()`: el
    /// test lo entrega a mano con `fire_end`, igual que el transporte real
    /// lo entrega desde otra tarea.
    #[derive(Default)]
    struct FakeSession {
        plays: StdMutex<Vec<AudioStream>>,
        playing: AtomicBool,
        paused: AtomicBool,
        stops: AtomicUsize,
        disconnected: AtomicBool,
        volume: StdMutex<Option<f32>>,
        pending_end: tokio::sync::Mutex<Option<TrackEndNotifier>>,
    }

    impl FakeSession {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn play_count(&self) -> usize {
            self.plays.lock().unwrap().len()
        }

        fn played(&self) -> Vec<AudioStream> {
            self.plays.lock().unwrap().clone()
        }

        async fn fire_end(&self) {
            let taken = { self.pending_end.lock().await.take() };
            if let Some(notifier) = taken {
                notifier.notify().await;
            }
        }
    }

    #[async_trait]
    impl VoiceSession for FakeSession {
        async fn play(&self, stream: AudioStream, on_end: TrackEndNotifier) -> MusicResult<()> {
            self.plays.lock().unwrap().push(stream);
            self.playing.store(true, Ordering::SeqCst);
            self.paused.store(false, Ordering::SeqCst);
            *self.pending_end.lock().await = Some(on_end);
            Ok(())
        }

        async fn pause(&self) -> MusicResult<()> {
            self.playing.store(false, Ordering::SeqCst);
            self.paused.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn resume(&self) -> MusicResult<()> {
            self.playing.store(true, Ordering::SeqCst);
            self.paused.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> MusicResult<()> {
            self.playing.store(false, Ordering::SeqCst);
            self.paused.store(false, Ordering::SeqCst);
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }

        async fn is_paused(&self) -> bool {
            self.paused.load(Ordering::SeqCst)
        }

        async fn set_volume(&self, volume: f32) -> MusicResult<()> {
            *self.volume.lock().unwrap() = Some(volume);
            Ok(())
        }

        async fn disconnect(&self) -> MusicResult<()> {
            self.disconnected.store(true, Ordering::SeqCst);
            self.playing.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: StdMutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlaybackNotifier for RecordingNotifier {
        async fn now_playing(&self, track: &TrackInfo) {
            self.events
                .lock()
                .unwrap()
                .push(format!("now_playing:{}", track.title));
        }

        async fn track_failed(&self, track: &TrackInfo) {
            self.events
                .lock()
                .unwrap()
                .push(format!("failed:{}", track.title));
        }

        async fn queue_finished(&self) {
            self.events.lock().unwrap().push("queue_finished".to_string());
        }
    }

    async fn connected_player(
        resolver: Arc<FakeResolver>,
    ) -> (Arc<GuildPlayer>, Arc<FakeSession>, Arc<RecordingNotifier>) {
        let player = GuildPlayer::new(GuildId::new(7), resolver, 10);
        let session = FakeSession::new();
        let notifier = RecordingNotifier::new();

        player.connect(session.clone()).await.unwrap();
        player.set_notifier(notifier.clone()).await;

        (player, session, notifier)
    }

    #[tokio::test]
    async fn enqueue_on_idle_starts_playback() {
        let resolver = FakeResolver::new();
        let (player, session, notifier) = connected_player(resolver).await;

        let outcome = player.enqueue_and_play(track("a")).await.unwrap();

        assert_eq!(outcome.started.unwrap().title, "a");
        assert_eq!(session.play_count(), 1);
        assert_eq!(
            session.played(),
            vec![AudioStream::Direct("https://example.com/a#stream".into())]
        );
        assert_eq!(player.now_playing().await.unwrap().title, "a");
        assert_eq!(notifier.events(), vec!["now_playing:a"]);
    }

    #[tokio::test]
    async fn enqueue_while_playing_only_queues() {
        let resolver = FakeResolver::new();
        let (player, session, _) = connected_player(resolver).await;

        player.enqueue_and_play(track("a")).await.unwrap();
        let outcome = player.enqueue_and_play(track("b")).await.unwrap();

        assert!(outcome.started.is_none());
        assert_eq!(session.play_count(), 1);
        assert_eq!(player.now_playing().await.unwrap().title, "a");

        let titles: Vec<_> = player
            .queue_snapshot()
            .await
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["b"]);
    }

    #[tokio::test]
    async fn completion_advances_to_next_track() {
        let resolver = FakeResolver::new();
        let (player, session, _) = connected_player(resolver).await;

        player.enqueue_and_play(track("a")).await.unwrap();
        player.enqueue_and_play(track("b")).await.unwrap();

        session.fire_end().await;

        assert_eq!(session.play_count(), 2);
        assert_eq!(player.now_playing().await.unwrap().title, "b");
        assert!(player.queue_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn completion_on_empty_queue_goes_idle_but_connected() {
        let resolver = FakeResolver::new();
        let (player, session, notifier) = connected_player(resolver).await;

        player.enqueue_and_play(track("a")).await.unwrap();
        session.fire_end().await;

        assert_eq!(session.play_count(), 1);
        assert!(player.now_playing().await.is_none());
        assert!(player.is_connected().await);
        assert_eq!(notifier.events(), vec!["now_playing:a", "queue_finished"]);
    }

    #[tokio::test]
    async fn loop_replays_same_track_until_disabled() {
        let resolver = FakeResolver::new();
        let (player, session, _) = connected_player(resolver).await;

        player.enqueue_and_play(track("a")).await.unwrap();
        player.set_loop(true).await;

        session.fire_end().await;
        session.fire_end().await;

        assert_eq!(session.play_count(), 3);
        let expected = AudioStream::Direct("https://example.com/a#stream".into());
        assert_eq!(session.played(), vec![expected.clone(), expected.clone(), expected]);
        assert_eq!(player.now_playing().await.unwrap().title, "a");

        player.set_loop(false).await;
        session.fire_end().await;

        assert_eq!(session.play_count(), 3);
        assert!(player.now_playing().await.is_none());
    }

    #[tokio::test]
    async fn failed_resolution_is_reported_and_skipped() {
        let resolver = FakeResolver::new();
        resolver.fail_for("https://example.com/a");
        let (player, session, notifier) = connected_player(resolver).await;

        let outcome = player.enqueue_and_play(track("a")).await.unwrap();

        assert!(outcome.started.is_none());
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].title, "a");
        assert_eq!(session.play_count(), 0);
        assert!(player.now_playing().await.is_none());
        assert!(player.is_connected().await);
        assert_eq!(notifier.events(), vec!["failed:a", "queue_finished"]);
    }

    #[tokio::test]
    async fn failed_track_advances_to_next_pending() {
        let resolver = FakeResolver::new();
        resolver.fail_for("https://example.com/b");
        let (player, session, notifier) = connected_player(resolver).await;

        player.enqueue_and_play(track("a")).await.unwrap();
        player.enqueue_and_play(track("b")).await.unwrap();
        player.enqueue_and_play(track("c")).await.unwrap();

        // Termina "a": "b" falla y se salta directo a "c"
        session.fire_end().await;

        assert_eq!(session.play_count(), 2);
        assert_eq!(player.now_playing().await.unwrap().title, "c");
        assert_eq!(
            notifier.events(),
            vec!["now_playing:a", "failed:b", "now_playing:c"]
        );
    }

    #[tokio::test]
    async fn concurrent_enqueues_start_playback_once() {
        let resolver = FakeResolver::new();
        let (player, session, _) = connected_player(resolver).await;

        let p1 = player.clone();
        let p2 = player.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { p1.enqueue_and_play(track("a")).await }),
            tokio::spawn(async move { p2.enqueue_and_play(track("b")).await }),
        );
        r1.unwrap().unwrap();
        r2.unwrap().unwrap();

        assert_eq!(session.play_count(), 1);
        assert_eq!(player.queue_snapshot().await.len(), 1);
        assert!(player.now_playing().await.is_some());
    }

    #[tokio::test]
    async fn stop_clears_queue_and_discards_stale_completion() {
        let resolver = FakeResolver::new();
        let (player, session, _) = connected_player(resolver).await;

        player.enqueue_and_play(track("a")).await.unwrap();
        player.enqueue_and_play(track("b")).await.unwrap();

        player.stop().await.unwrap();

        assert!(player.now_playing().await.is_none());
        assert!(player.queue_snapshot().await.is_empty());
        assert_eq!(session.stops.load(Ordering::SeqCst), 1);

        // El fin de track del stop llega después, con generación vieja:
        // no debe arrancar nada
        session.fire_end().await;
        assert_eq!(session.play_count(), 1);
        assert!(player.now_playing().await.is_none());
    }

    #[tokio::test]
    async fn skip_advances_even_with_loop_enabled() {
        let resolver = FakeResolver::new();
        let (player, session, _) = connected_player(resolver).await;

        player.enqueue_and_play(track("a")).await.unwrap();
        player.enqueue_and_play(track("b")).await.unwrap();
        player.set_loop(true).await;

        assert!(player.skip().await.unwrap());
        // El transporte entrega el fin de track del stop
        session.fire_end().await;

        assert_eq!(session.play_count(), 2);
        assert_eq!(player.now_playing().await.unwrap().title, "b");
    }

    #[tokio::test]
    async fn skip_without_playing_is_a_noop_signal() {
        let resolver = FakeResolver::new();
        let (player, session, _) = connected_player(resolver).await;

        assert!(!player.skip().await.unwrap());
        assert_eq!(session.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn leave_resets_to_idle() {
        let resolver = FakeResolver::new();
        let (player, session, _) = connected_player(resolver).await;

        player.enqueue_and_play(track("a")).await.unwrap();
        player.enqueue_and_play(track("b")).await.unwrap();

        player.leave().await.unwrap();

        assert!(session.disconnected.load(Ordering::SeqCst));
        assert!(!player.is_connected().await);
        assert!(player.now_playing().await.is_none());
        assert!(player.queue_snapshot().await.is_empty());

        assert!(matches!(
            player.leave().await.unwrap_err(),
            MusicError::NotConnected
        ));
    }

    #[tokio::test]
    async fn reconnect_replaces_previous_session() {
        let resolver = FakeResolver::new();
        let (player, first, _) = connected_player(resolver).await;

        let second = FakeSession::new();
        player.connect(second.clone()).await.unwrap();

        assert!(first.disconnected.load(Ordering::SeqCst));
        assert!(!second.disconnected.load(Ordering::SeqCst));
        assert!(player.is_connected().await);
    }

    #[tokio::test]
    async fn rejoin_while_playing_discards_old_session_completion() {
        let resolver = FakeResolver::new();
        let (player, first, _) = connected_player(resolver).await;

        player.enqueue_and_play(track("a")).await.unwrap();
        player.enqueue_and_play(track("b")).await.unwrap();

        // Flujo de un `join` repetido: soltar la sesión vieja antes de
        // instalar la nueva (songbird reutiliza el mismo Call por guild)
        player.disconnect_session().await;
        let second = FakeSession::new();
        player.connect(second.clone()).await.unwrap();

        assert!(first.disconnected.load(Ordering::SeqCst));
        assert!(player.is_connected().await);

        // El fin de track de la sesión vieja llega tarde, con generación
        // obsoleta: no debe arrancar nada en la sesión nueva
        first.fire_end().await;
        assert_eq!(second.play_count(), 0);
        assert_eq!(player.queue_snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn loop_mode_round_trips_through_the_player() {
        let resolver = FakeResolver::new();
        let (player, _, _) = connected_player(resolver).await;

        assert!(!player.is_loop().await);
        player.set_loop(true).await;
        assert!(player.is_loop().await);
        player.set_loop(false).await;
        assert!(!player.is_loop().await);
    }

    #[tokio::test]
    async fn enqueue_without_session_is_rejected() {
        let resolver = FakeResolver::new();
        let player = GuildPlayer::new(GuildId::new(7), resolver, 10);

        let err = player.enqueue_and_play(track("a")).await.unwrap_err();
        assert!(matches!(err, MusicError::NotConnected));
    }

    #[tokio::test]
    async fn queue_bound_is_enforced() {
        let resolver = FakeResolver::new();
        let player = GuildPlayer::new(GuildId::new(7), resolver, 1);
        let session = FakeSession::new();
        player.connect(session.clone()).await.unwrap();

        player.enqueue_and_play(track("a")).await.unwrap();
        player.enqueue_and_play(track("b")).await.unwrap();

        let err = player.enqueue_and_play(track("c")).await.unwrap_err();
        assert!(matches!(err, MusicError::QueueFull(1)));
    }

    #[tokio::test]
    async fn pause_without_playing_is_a_noop_signal() {
        let resolver: Arc<dyn TrackResolver> = Arc::new(MockTrackResolver::new());
        let player = GuildPlayer::new(GuildId::new(7), resolver, 10);

        let mut session = MockVoiceSession::new();
        session.expect_is_playing().returning(|| false);
        session.expect_pause().times(0);
        player.connect(Arc::new(session)).await.unwrap();

        assert!(!player.pause().await.unwrap());
    }

    #[tokio::test]
    async fn resume_without_paused_is_a_noop_signal() {
        let resolver: Arc<dyn TrackResolver> = Arc::new(MockTrackResolver::new());
        let player = GuildPlayer::new(GuildId::new(7), resolver, 10);

        let mut session = MockVoiceSession::new();
        session.expect_is_paused().returning(|| false);
        session.expect_resume().times(0);
        player.connect(Arc::new(session)).await.unwrap();

        assert!(!player.resume().await.unwrap());
    }

    #[tokio::test]
    async fn pause_and_resume_delegate_when_state_matches() {
        let resolver = FakeResolver::new();
        let (player, session, _) = connected_player(resolver).await;

        player.enqueue_and_play(track("a")).await.unwrap();

        assert!(player.pause().await.unwrap());
        assert!(session.is_paused().await);

        assert!(player.resume().await.unwrap());
        assert!(session.is_playing().await);
    }

    #[tokio::test]
    async fn volume_is_validated_and_scaled() {
        let resolver: Arc<dyn TrackResolver> = Arc::new(MockTrackResolver::new());
        let player = GuildPlayer::new(GuildId::new(7), resolver, 10);

        let mut session = MockVoiceSession::new();
        session
            .expect_set_volume()
            .withf(|v| (v - 0.5).abs() < f32::EPSILON)
            .times(1)
            .returning(|_| Ok(()));
        player.connect(Arc::new(session)).await.unwrap();

        assert!(matches!(
            player.set_volume(150).await.unwrap_err(),
            MusicError::InvalidVolume(150)
        ));
        assert!(matches!(
            player.set_volume(-1).await.unwrap_err(),
            MusicError::InvalidVolume(-1)
        ));

        player.set_volume(50).await.unwrap();
    }
}
