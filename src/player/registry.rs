use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::{debug, info};

use crate::player::GuildPlayer;
use crate::sources::TrackResolver;

/// Mapa proceso-global de players por guild: creación perezosa, una entrada
/// por guild, desalojo al salir del canal de voz.
pub struct GuildPlayerRegistry {
    players: DashMap<GuildId, Arc<GuildPlayer>>,
    resolver: Arc<dyn TrackResolver>,
    max_queue_size: usize,
}

impl GuildPlayerRegistry {
    pub fn new(resolver: Arc<dyn TrackResolver>, max_queue_size: usize) -> Self {
        Self {
            players: DashMap::new(),
            resolver,
            max_queue_size,
        }
    }

    /// Obtiene el player del guild, creándolo si no existe. La entrada se
    /// crea bajo el lock del shard del mapa: dos comandos concurrentes del
    /// mismo guild obtienen el mismo player, nunca dos distintos.
    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<GuildPlayer> {
        self.players
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("🆕 Player creado para guild {}", guild_id);
                GuildPlayer::new(guild_id, self.resolver.clone(), self.max_queue_size)
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<GuildPlayer>> {
        self.players.get(&guild_id).map(|p| p.clone())
    }

    /// Desaloja la entrada del guild (al salir del canal) para que el
    /// registro no crezca sin límite con el churn de guilds.
    pub fn remove(&self, guild_id: GuildId) {
        if self.players.remove(&guild_id).is_some() {
            info!("🗑️ Player eliminado para guild {}", guild_id);
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockTrackResolver;

    fn registry() -> GuildPlayerRegistry {
        let resolver: Arc<dyn TrackResolver> = Arc::new(MockTrackResolver::new());
        GuildPlayerRegistry::new(resolver, 10)
    }

    #[test]
    fn get_or_create_returns_same_player_per_guild() {
        let registry = registry();
        let a = registry.get_or_create(GuildId::new(1));
        let b = registry.get_or_create(GuildId::new(1));

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn different_guilds_get_different_players() {
        let registry = registry();
        let a = registry.get_or_create(GuildId::new(1));
        let b = registry.get_or_create(GuildId::new(2));

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn remove_evicts_the_entry() {
        let registry = registry();
        registry.get_or_create(GuildId::new(1));

        registry.remove(GuildId::new(1));
        assert!(registry.get(GuildId::new(1)).is_none());
        assert!(registry.is_empty());

        // borrar dos veces no es un error
        registry.remove(GuildId::new(1));
    }
}
