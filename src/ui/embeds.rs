use serenity::builder::CreateEmbed;

use crate::sources::TrackInfo;

/// Embed de "Now Playing" con título, artista y miniatura
pub fn now_playing_embed(track: &TrackInfo) -> CreateEmbed {
    CreateEmbed::new()
        .title("🎵 Sonando ahora")
        .description(format!("**{}** • {}", track.title, track.artist))
        .url(track.source_url.clone())
        .thumbnail(track.thumbnail_url.clone())
        .color(0x1DB954)
}

/// Listado 1-indexado de la cola en un bloque de código, con el track
/// actual arriba
pub fn queue_listing(current: Option<&TrackInfo>, pending: &[TrackInfo]) -> String {
    let mut out = String::new();

    if let Some(track) = current {
        out.push_str(&format!("🎵 Sonando: {}\n", track.title));
    }

    if pending.is_empty() {
        out.push_str("📭 La cola está vacía.");
        return out;
    }

    out.push_str("```\n");
    for (i, track) in pending.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, track.title));
    }
    out.push_str("```");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track(title: &str) -> TrackInfo {
        TrackInfo::new(title, format!("https://example.com/{title}"))
    }

    #[test]
    fn queue_listing_is_one_indexed() {
        let pending = vec![track("a"), track("b")];
        let current = track("x");

        let listing = queue_listing(Some(&current), &pending);
        assert_eq!(listing, "🎵 Sonando: x\n```\n1. a\n2. b\n```");
    }

    #[test]
    fn empty_queue_listing() {
        let listing = queue_listing(None, &[]);
        assert_eq!(listing, "📭 La cola está vacía.");
    }
}
