use std::collections::VecDeque;
use tracing::{debug, info};

use crate::error::{MusicError, MusicResult};
use crate::sources::TrackInfo;

/// Cola de reproducción de un guild: tracks pendientes en orden FIFO más
/// el slot del track actual y el flag de loop.
///
/// Datos puros, sin I/O. Invariantes: `current` está ocupado si y solo si
/// la sesión de voz tiene un track cargado; `pending` nunca contiene a
/// `current`; desencolar mueve la cabeza a `current` atómicamente.
#[derive(Debug)]
pub struct PlaybackQueue {
    pending: VecDeque<TrackInfo>,
    current: Option<TrackInfo>,
    loop_current: bool,
    max_size: usize,
}

impl PlaybackQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            current: None,
            loop_current: false,
            max_size,
        }
    }

    /// Agrega un track al final de la cola
    pub fn enqueue(&mut self, track: TrackInfo) -> MusicResult<()> {
        if self.pending.len() >= self.max_size {
            return Err(MusicError::QueueFull(self.max_size));
        }

        info!("➕ Agregado a la cola: {}", track.title);
        self.pending.push_back(track);
        Ok(())
    }

    /// Saca la cabeza de `pending` y la convierte en el track actual.
    /// Con la cola vacía devuelve `None` y deja `current` intacto, para
    /// que el llamador pueda detectar el caso de loop.
    pub fn dequeue_next(&mut self) -> Option<TrackInfo> {
        let next = self.pending.pop_front()?;
        debug!("➡️ Siguiente en cola (FIFO): {}", next.title);
        self.current = Some(next.clone());
        Some(next)
    }

    pub fn peek_current(&self) -> Option<&TrackInfo> {
        self.current.as_ref()
    }

    /// Descarta el track actual sin tocar los pendientes. Lo usa `skip`
    /// para que un track en loop no vuelva a reproducirse.
    pub fn skip_current(&mut self) -> Option<TrackInfo> {
        self.current.take()
    }

    /// Vacía los pendientes y el track actual
    pub fn clear(&mut self) {
        self.pending.clear();
        self.current = None;
        info!("🗑️ Cola limpiada");
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.loop_current = enabled;
        if enabled {
            info!("🔂 Repetir canción activado");
        } else {
            info!("➡️ Repetir canción desactivado");
        }
    }

    pub fn is_loop(&self) -> bool {
        self.loop_current
    }

    /// Copia de los tracks pendientes en orden de reproducción
    pub fn snapshot(&self) -> Vec<TrackInfo> {
        self.pending.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.current.is_none()
    }
}
