//! Ejecución de comandos: del [`Command`] parseado a los módulos de
//! reproducción y almacenamiento, con las respuestas al canal de texto.

use anyhow::Result;
use serenity::all::{ChannelId, Context, GuildId, Message, UserId};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::bot::commands::Command;
use crate::bot::GrooveBot;
use crate::error::MusicError;
use crate::player::notify::ChannelNotifier;
use crate::player::session::SongbirdSession;
use crate::player::GuildPlayer;
use crate::sources::SourceKind;
use crate::ui::embeds;

/// Canal de voz en el que está un usuario, según el cache del gateway.
///
/// Síncrono a propósito: la referencia al cache de serenity no es `Send`,
/// así que se resuelve todo antes de cualquier `await`.
pub fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|state| state.channel_id)
}

/// Chequeo de administrador sin el intent GUILD_MEMBERS: dueño del servidor
/// o algún rol del miembro parcial con el permiso de administrador.
pub fn member_is_admin(ctx: &Context, msg: &Message) -> bool {
    let Some(guild_id) = msg.guild_id else {
        return false;
    };
    let Some(guild) = guild_id.to_guild_cached(&ctx.cache) else {
        return false;
    };

    if guild.owner_id == msg.author.id {
        return true;
    }

    let Some(member) = msg.member.as_deref() else {
        return false;
    };

    member.roles.iter().any(|role_id| {
        guild
            .roles
            .get(role_id)
            .map_or(false, |role| role.permissions.administrator())
    })
}

/// Despacho de un comando ya parseado y autorizado
pub async fn handle_command(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    command: Command,
) -> Result<()> {
    match command {
        Command::Join => join(bot, ctx, msg, guild_id).await,
        Command::Leave => leave(bot, ctx, msg, guild_id).await,
        Command::Play { url } => play(bot, ctx, msg, guild_id, &url).await,
        Command::Pause => pause(bot, ctx, msg, guild_id).await,
        Command::Resume => resume(bot, ctx, msg, guild_id).await,
        Command::Stop => stop(bot, ctx, msg, guild_id).await,
        Command::Skip => skip(bot, ctx, msg, guild_id).await,
        Command::Queue => queue(bot, ctx, msg, guild_id).await,
        Command::Clear => clear(bot, ctx, msg, guild_id).await,
        Command::Volume { value } => volume(bot, ctx, msg, guild_id, value).await,
        Command::Loop { enabled } => set_loop(bot, ctx, msg, guild_id, enabled).await,
        Command::Help => help(bot, ctx, msg, guild_id).await,

        Command::SetPrefix { prefix } => set_prefix(bot, ctx, msg, guild_id, &prefix).await,
        Command::SetDefaultSource { source } => {
            set_default_source(bot, ctx, msg, guild_id, &source).await
        }
        Command::AddSource { source } => add_source(bot, ctx, msg, guild_id, &source).await,
        Command::RemoveSource { source } => remove_source(bot, ctx, msg, guild_id, &source).await,
        Command::Playlists => playlists(bot, ctx, msg, guild_id).await,
        Command::CreatePlaylist { name } => create_playlist(bot, ctx, msg, guild_id, &name).await,
        Command::DeletePlaylist { name } => delete_playlist(bot, ctx, msg, guild_id, &name).await,
        Command::AddToPlaylist { name, url } => {
            add_to_playlist(bot, ctx, msg, guild_id, &name, &url).await
        }
        Command::RemoveFromPlaylist { name, url } => {
            remove_from_playlist(bot, ctx, msg, guild_id, &name, &url).await
        }
    }
}

/// Conecta (o reconecta) el player al canal de voz del autor. Un `join`
/// repetido no es no-op: suelta la sesión anterior y reconecta, así el
/// bot se puede mover de canal sin `leave` previo.
async fn connect_to_user_channel(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
) -> Result<Arc<GuildPlayer>> {
    let player = bot.registry.get_or_create(guild_id);

    let channel_id = user_voice_channel(ctx, guild_id, msg.author.id)
        .ok_or(MusicError::NotInVoiceChannel)?;

    // songbird reutiliza el mismo Call por guild: hay que soltar la sesión
    // vieja ANTES del join, o su disconnect cortaría la conexión nueva
    player.disconnect_session().await;

    let manager = songbird::get(ctx)
        .await
        .ok_or_else(|| anyhow::anyhow!("Songbird no está registrado en el cliente"))?;

    let call = manager
        .join(guild_id, channel_id)
        .await
        .map_err(|e| MusicError::TransportFailure(e.to_string()))?;

    let session = Arc::new(SongbirdSession::new(call));
    player.connect(session).await?;
    player.set_volume(bot.config.default_volume as i64).await?;

    info!("🔊 Conectado al canal {} en guild {}", channel_id, guild_id);
    Ok(player)
}

/// Variante para los comandos de reproducción: si el player ya está
/// conectado reutiliza la sesión (`play` auto-conecta, no reconecta).
async fn ensure_connected(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
) -> Result<Arc<GuildPlayer>> {
    let player = bot.registry.get_or_create(guild_id);

    if player.is_connected().await {
        return Ok(player);
    }

    connect_to_user_channel(bot, ctx, msg, guild_id).await
}

async fn join(bot: &GrooveBot, ctx: &Context, msg: &Message, guild_id: GuildId) -> Result<()> {
    connect_to_user_channel(bot, ctx, msg, guild_id).await?;
    msg.channel_id
        .say(&ctx.http, "🔊 Conectado al canal de voz.")
        .await?;
    Ok(())
}

async fn leave(bot: &GrooveBot, ctx: &Context, msg: &Message, guild_id: GuildId) -> Result<()> {
    let player = bot
        .registry
        .get(guild_id)
        .ok_or(MusicError::NotConnected)?;

    player.leave().await?;
    bot.registry.remove(guild_id);

    msg.channel_id
        .say(&ctx.http, "👋 Desconectado del canal de voz.")
        .await?;
    Ok(())
}

async fn play(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    url: &str,
) -> Result<()> {
    // Fuente permitida según la configuración del guild. Las URLs que no
    // corresponden a ninguna fuente conocida pasan (radios, audio directo).
    if let Some(kind) = SourceKind::from_url(url) {
        let settings = bot
            .storage
            .lock()
            .await
            .guild_settings(guild_id.get())
            .await?;

        if !settings.allowed_sources.contains(&kind) {
            msg.channel_id
                .say(
                    &ctx.http,
                    format!("🚫 La fuente **{kind}** no está permitida en este servidor."),
                )
                .await?;
            return Ok(());
        }
    }

    let player = ensure_connected(bot, ctx, msg, guild_id).await?;

    // Los avances automáticos se anuncian en el canal del último `play`
    player
        .set_notifier(Arc::new(ChannelNotifier::new(
            ctx.http.clone(),
            msg.channel_id,
        )))
        .await;

    // Resolución fuera del lock del player: puede tardar segundos y no
    // debe bloquear pause/skip/stop de otros usuarios
    let track = bot.resolver.resolve(url).await?;
    let title = track.title.clone();

    player.enqueue_and_play(track).await?;

    msg.channel_id
        .say(&ctx.http, format!("➕ Agregado **{title}** a la cola."))
        .await?;
    Ok(())
}

async fn pause(bot: &GrooveBot, ctx: &Context, msg: &Message, guild_id: GuildId) -> Result<()> {
    let player = bot
        .registry
        .get(guild_id)
        .ok_or(MusicError::NotConnected)?;

    let reply = if player.pause().await? {
        "⏸️ Reproducción pausada."
    } else {
        "❌ No hay nada sonando."
    };

    msg.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

async fn resume(bot: &GrooveBot, ctx: &Context, msg: &Message, guild_id: GuildId) -> Result<()> {
    let player = bot
        .registry
        .get(guild_id)
        .ok_or(MusicError::NotConnected)?;

    let reply = if player.resume().await? {
        "▶️ Reproducción reanudada."
    } else {
        "❌ No hay nada pausado."
    };

    msg.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

async fn stop(bot: &GrooveBot, ctx: &Context, msg: &Message, guild_id: GuildId) -> Result<()> {
    let player = bot
        .registry
        .get(guild_id)
        .ok_or(MusicError::NotConnected)?;

    player.stop().await?;
    msg.channel_id
        .say(&ctx.http, "⏹️ Reproducción detenida y cola limpiada.")
        .await?;
    Ok(())
}

async fn skip(bot: &GrooveBot, ctx: &Context, msg: &Message, guild_id: GuildId) -> Result<()> {
    let player = bot
        .registry
        .get(guild_id)
        .ok_or(MusicError::NotConnected)?;

    let reply = if player.skip().await? {
        "⏭️ Track saltado."
    } else {
        "❌ No hay nada sonando."
    };

    msg.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

async fn queue(bot: &GrooveBot, ctx: &Context, msg: &Message, guild_id: GuildId) -> Result<()> {
    let Some(player) = bot.registry.get(guild_id) else {
        msg.channel_id
            .say(&ctx.http, "📭 La cola está vacía.")
            .await?;
        return Ok(());
    };

    let current = player.now_playing().await;
    let pending = player.queue_snapshot().await;

    msg.channel_id
        .say(&ctx.http, embeds::queue_listing(current.as_ref(), &pending))
        .await?;
    Ok(())
}

async fn clear(bot: &GrooveBot, ctx: &Context, msg: &Message, guild_id: GuildId) -> Result<()> {
    let player = bot
        .registry
        .get(guild_id)
        .ok_or(MusicError::NotConnected)?;

    // clear es un alias de stop: corta el track actual y vacía todo
    player.stop().await?;
    msg.channel_id.say(&ctx.http, "🗑️ Cola limpiada.").await?;
    Ok(())
}

async fn volume(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    value: i64,
) -> Result<()> {
    let player = bot
        .registry
        .get(guild_id)
        .ok_or(MusicError::NotConnected)?;

    player.set_volume(value).await?;
    msg.channel_id
        .say(&ctx.http, format!("🔊 Volumen ajustado a {value}%."))
        .await?;
    Ok(())
}

async fn set_loop(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    enabled: bool,
) -> Result<()> {
    let player = bot
        .registry
        .get(guild_id)
        .ok_or(MusicError::NotConnected)?;

    player.set_loop(enabled).await;

    let reply = if player.is_loop().await {
        "🔂 Repetir canción activado."
    } else {
        "➡️ Repetir canción desactivado."
    };
    msg.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

async fn help(bot: &GrooveBot, ctx: &Context, msg: &Message, guild_id: GuildId) -> Result<()> {
    let prefix = bot.storage.lock().await.prefix(guild_id.get());

    let text = format!(
        "**🎵 Comandos de música**\n\
         `{p}join` / `{p}leave`: entrar/salir del canal de voz\n\
         `{p}play <url>`: encolar un track (auto-conecta)\n\
         `{p}pause` / `{p}resume` / `{p}stop` / `{p}skip`\n\
         `{p}queue` / `{p}clear`: ver/limpiar la cola\n\
         `{p}volume <0-100>`: ajustar volumen\n\
         `{p}loop on|off`: repetir el track actual\n\n\
         **⚙️ Administración**\n\
         `{p}setprefix <prefijo>`: cambiar el prefijo\n\
         `{p}setdefaultsource <fuente>` / `{p}addsource` / `{p}removesource`\n\
         `{p}playlists` / `{p}createplaylist` / `{p}deleteplaylist`\n\
         `{p}addtoplaylist <nombre> <url>` / `{p}removefromplaylist <nombre> <url>`",
        p = prefix
    );

    msg.channel_id.say(&ctx.http, text).await?;
    Ok(())
}

// Comandos administrativos

async fn set_prefix(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    prefix: &str,
) -> Result<()> {
    bot.storage
        .lock()
        .await
        .set_prefix(guild_id.get(), prefix)
        .await?;

    msg.channel_id
        .say(&ctx.http, format!("✅ Prefijo cambiado a `{prefix}`."))
        .await?;
    Ok(())
}

async fn set_default_source(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    source: &str,
) -> Result<()> {
    let kind = SourceKind::from_str(source)?;
    bot.storage
        .lock()
        .await
        .set_default_source(guild_id.get(), kind)
        .await?;

    msg.channel_id
        .say(&ctx.http, format!("✅ Fuente por defecto: **{kind}**."))
        .await?;
    Ok(())
}

async fn add_source(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    source: &str,
) -> Result<()> {
    let kind = SourceKind::from_str(source)?;
    let added = bot
        .storage
        .lock()
        .await
        .add_source(guild_id.get(), kind)
        .await?;

    let reply = if added {
        format!("✅ Fuente **{kind}** agregada a las permitidas.")
    } else {
        format!("La fuente **{kind}** ya estaba permitida.")
    };
    msg.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

async fn remove_source(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    source: &str,
) -> Result<()> {
    let kind = SourceKind::from_str(source)?;
    let removed = bot
        .storage
        .lock()
        .await
        .remove_source(guild_id.get(), kind)
        .await?;

    let reply = if removed {
        format!("✅ Fuente **{kind}** quitada de las permitidas.")
    } else {
        format!("La fuente **{kind}** no estaba permitida.")
    };
    msg.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

async fn playlists(bot: &GrooveBot, ctx: &Context, msg: &Message, guild_id: GuildId) -> Result<()> {
    let playlists = bot
        .storage
        .lock()
        .await
        .list_playlists(guild_id.get())
        .await?;

    if playlists.is_empty() {
        msg.channel_id
            .say(&ctx.http, "📭 No hay playlists en este servidor.")
            .await?;
        return Ok(());
    }

    let mut text = String::from("**📋 Playlists del servidor**\n");
    for playlist in &playlists {
        text.push_str(&format!(
            "• **{}** ({} canciones)\n",
            playlist.name,
            playlist.songs.len()
        ));
    }

    msg.channel_id.say(&ctx.http, text).await?;
    Ok(())
}

async fn create_playlist(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    name: &str,
) -> Result<()> {
    bot.storage
        .lock()
        .await
        .create_playlist(guild_id.get(), name)
        .await?;

    msg.channel_id
        .say(&ctx.http, format!("✅ Playlist **{name}** creada."))
        .await?;
    Ok(())
}

async fn delete_playlist(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    name: &str,
) -> Result<()> {
    bot.storage
        .lock()
        .await
        .delete_playlist(guild_id.get(), name)
        .await?;

    msg.channel_id
        .say(&ctx.http, format!("🗑️ Playlist **{name}** eliminada."))
        .await?;
    Ok(())
}

async fn add_to_playlist(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    name: &str,
    url: &str,
) -> Result<()> {
    bot.storage
        .lock()
        .await
        .add_song(guild_id.get(), name, url)
        .await?;

    msg.channel_id
        .say(&ctx.http, format!("➕ Canción agregada a **{name}**."))
        .await?;
    Ok(())
}

async fn remove_from_playlist(
    bot: &GrooveBot,
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    name: &str,
    url: &str,
) -> Result<()> {
    bot.storage
        .lock()
        .await
        .remove_song(guild_id.get(), name, url)
        .await?;

    msg.channel_id
        .say(&ctx.http, format!("➖ Canción quitada de **{name}**."))
        .await?;
    Ok(())
}
