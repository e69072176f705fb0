//! Bot de Discord: estado compartido y manejo de eventos del gateway.
//!
//! [`GrooveBot`] implementa el [`EventHandler`] de serenity. Enruta los
//! mensajes con prefijo a los handlers de comandos y mantiene limpio el
//! registro de players cuando el bot sale de un canal de voz.

use serenity::{
    all::{Context, EventHandler, Message, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod handlers;

use crate::config::Config;
use crate::player::registry::GuildPlayerRegistry;
use crate::sources::TrackResolver;
use crate::storage::JsonStorage;
use commands::Parsed;

pub struct GrooveBot {
    pub config: Arc<Config>,
    pub storage: Arc<tokio::sync::Mutex<JsonStorage>>,
    pub registry: Arc<GuildPlayerRegistry>,
    pub resolver: Arc<dyn TrackResolver>,
}

impl GrooveBot {
    pub fn new(
        config: Arc<Config>,
        storage: Arc<tokio::sync::Mutex<JsonStorage>>,
        resolver: Arc<dyn TrackResolver>,
    ) -> Self {
        let registry = Arc::new(GuildPlayerRegistry::new(
            resolver.clone(),
            config.max_queue_size,
        ));

        Self {
            config,
            storage,
            registry,
            resolver,
        }
    }
}

#[async_trait]
impl EventHandler for GrooveBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("✅ Bot conectado como: {}", ready.user.name);
        info!("🎯 Sirviendo {} servidores", ready.guilds.len());
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        // Solo comandos dentro de un servidor
        let Some(guild_id) = msg.guild_id else {
            return;
        };

        let prefix = self.storage.lock().await.prefix(guild_id.get());

        let command = match commands::parse(&msg.content, &prefix) {
            Some(Parsed::Command(command)) => command,
            Some(Parsed::Usage(usage)) => {
                if let Err(e) = msg.channel_id.say(&ctx.http, usage).await {
                    error!("Error al responder uso de comando: {:?}", e);
                }
                return;
            }
            None => return,
        };

        if command.requires_admin() && !handlers::member_is_admin(&ctx, &msg) {
            if let Err(e) = msg
                .channel_id
                .say(&ctx.http, "🚫 Este comando requiere permisos de administrador.")
                .await
            {
                error!("Error al responder: {:?}", e);
            }
            return;
        }

        if let Err(e) = handlers::handle_command(self, &ctx, &msg, guild_id, command).await {
            warn!("Comando falló en guild {}: {:?}", guild_id, e);
            if let Err(e) = msg.channel_id.say(&ctx.http, format!("❌ {e}")).await {
                error!("Error al responder fallo de comando: {:?}", e);
            }
        }
    }

    /// Si echan al bot del canal de voz (kick, cierre del canal), el player
    /// del guild queda huérfano: se limpia acá.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let bot_id = ctx.cache.current_user().id;
        if new.user_id != bot_id {
            return;
        }

        // Desconexión: tenía canal y ya no tiene
        let left = old.as_ref().and_then(|o| o.channel_id).is_some() && new.channel_id.is_none();
        if !left {
            return;
        }

        let Some(guild_id) = new.guild_id else {
            return;
        };

        if let Some(player) = self.registry.get(guild_id) {
            info!("🔌 Bot desconectado del canal de voz en guild {}", guild_id);
            if let Err(e) = player.leave().await {
                // La sesión puede ya estar caída; solo registrar
                warn!("Limpieza tras desconexión externa: {:?}", e);
            }
            self.registry.remove(guild_id);
        }
    }
}
