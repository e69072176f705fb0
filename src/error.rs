use thiserror::Error;

/// Errores del dominio de música. Cada variante tiene un mensaje
/// presentable directamente al usuario que invocó el comando.
#[derive(Debug, Error)]
pub enum MusicError {
    #[error("No estás conectado a un canal de voz")]
    NotInVoiceChannel,

    #[error("No estoy conectado a un canal de voz")]
    NotConnected,

    #[error("No se pudo resolver la URL: {0}")]
    ResolutionFailed(String),

    #[error("El volumen debe estar entre 0 y 100 (recibido: {0})")]
    InvalidVolume(i64),

    #[error("Fuente de música inválida: `{0}`. Las fuentes válidas son: youtube, spotify, soundcloud")]
    InvalidSource(String),

    #[error("La cola está llena (máximo {0} canciones)")]
    QueueFull(usize),

    #[error("No existe la playlist `{0}`")]
    PlaylistNotFound(String),

    #[error("Ya existe una playlist llamada `{0}`")]
    DuplicatePlaylist(String),

    #[error("La canción no está en la playlist")]
    SongNotInPlaylist,

    #[error("Fallo en el transporte de voz: {0}")]
    TransportFailure(String),
}

pub type MusicResult<T> = Result<T, MusicError>;
