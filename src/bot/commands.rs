//! Parser de comandos con prefijo por servidor.
//!
//! El prefijo viene de la configuración persistida del guild, así que el
//! parseo recibe el prefijo ya resuelto y devuelve un comando tipado.

/// Comando ya parseado desde el contenido de un mensaje
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join,
    Leave,
    Play { url: String },
    Pause,
    Resume,
    Stop,
    Skip,
    Queue,
    Clear,
    Volume { value: i64 },
    Loop { enabled: bool },
    Help,

    // Administrativos
    SetPrefix { prefix: String },
    SetDefaultSource { source: String },
    AddSource { source: String },
    RemoveSource { source: String },
    Playlists,
    CreatePlaylist { name: String },
    DeletePlaylist { name: String },
    AddToPlaylist { name: String, url: String },
    RemoveFromPlaylist { name: String, url: String },
}

impl Command {
    /// Los comandos de configuración requieren permisos de administrador
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::SetPrefix { .. }
                | Command::SetDefaultSource { .. }
                | Command::AddSource { .. }
                | Command::RemoveSource { .. }
                | Command::Playlists
                | Command::CreatePlaylist { .. }
                | Command::DeletePlaylist { .. }
                | Command::AddToPlaylist { .. }
                | Command::RemoveFromPlaylist { .. }
        )
    }
}

/// Resultado del parseo de un mensaje con prefijo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Command(Command),
    /// Comando conocido pero con argumentos inválidos; el texto es el
    /// mensaje de uso para el usuario
    Usage(&'static str),
}

/// Parsea el contenido de un mensaje. `None` si el mensaje no empieza con
/// el prefijo o el comando no existe.
pub fn parse(content: &str, prefix: &str) -> Option<Parsed> {
    let rest = content.strip_prefix(prefix)?;
    let mut parts = rest.split_whitespace();
    let name = parts.next()?.to_lowercase();

    let parsed = match name.as_str() {
        "join" => Parsed::Command(Command::Join),
        "leave" => Parsed::Command(Command::Leave),
        "pause" => Parsed::Command(Command::Pause),
        "resume" => Parsed::Command(Command::Resume),
        "stop" => Parsed::Command(Command::Stop),
        "skip" => Parsed::Command(Command::Skip),
        "queue" => Parsed::Command(Command::Queue),
        "clear" => Parsed::Command(Command::Clear),
        "help" => Parsed::Command(Command::Help),
        "playlists" | "viewplaylists" => Parsed::Command(Command::Playlists),

        "play" => match parts.next() {
            Some(url) => Parsed::Command(Command::Play {
                url: url.to_string(),
            }),
            None => Parsed::Usage("Uso: play <url>"),
        },

        "volume" => match parts.next().and_then(|v| v.parse::<i64>().ok()) {
            Some(value) => Parsed::Command(Command::Volume { value }),
            None => Parsed::Usage("Uso: volume <0-100>"),
        },

        "loop" => match parts.next().map(|m| m.to_lowercase()) {
            Some(mode) if mode == "on" => Parsed::Command(Command::Loop { enabled: true }),
            Some(mode) if mode == "off" => Parsed::Command(Command::Loop { enabled: false }),
            _ => Parsed::Usage("Modo de loop inválido. Usá `on` u `off`."),
        },

        "setprefix" => match parts.next() {
            Some(prefix) => Parsed::Command(Command::SetPrefix {
                prefix: prefix.to_string(),
            }),
            None => Parsed::Usage("Uso: setprefix <prefijo>"),
        },

        "setdefaultsource" => match parts.next() {
            Some(source) => Parsed::Command(Command::SetDefaultSource {
                source: source.to_string(),
            }),
            None => Parsed::Usage("Uso: setdefaultsource <fuente>"),
        },

        "addsource" => match parts.next() {
            Some(source) => Parsed::Command(Command::AddSource {
                source: source.to_string(),
            }),
            None => Parsed::Usage("Uso: addsource <fuente>"),
        },

        "removesource" => match parts.next() {
            Some(source) => Parsed::Command(Command::RemoveSource {
                source: source.to_string(),
            }),
            None => Parsed::Usage("Uso: removesource <fuente>"),
        },

        "createplaylist" => match parts.next() {
            Some(name) => Parsed::Command(Command::CreatePlaylist {
                name: name.to_string(),
            }),
            None => Parsed::Usage("Uso: createplaylist <nombre>"),
        },

        "deleteplaylist" => match parts.next() {
            Some(name) => Parsed::Command(Command::DeletePlaylist {
                name: name.to_string(),
            }),
            None => Parsed::Usage("Uso: deleteplaylist <nombre>"),
        },

        "addtoplaylist" => match (parts.next(), parts.next()) {
            (Some(name), Some(url)) => Parsed::Command(Command::AddToPlaylist {
                name: name.to_string(),
                url: url.to_string(),
            }),
            _ => Parsed::Usage("Uso: addtoplaylist <nombre> <url>"),
        },

        "removefromplaylist" => match (parts.next(), parts.next()) {
            (Some(name), Some(url)) => Parsed::Command(Command::RemoveFromPlaylist {
                name: name.to_string(),
                url: url.to_string(),
            }),
            _ => Parsed::Usage("Uso: removefromplaylist <nombre> <url>"),
        },

        _ => return None,
    };

    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_basic_commands() {
        assert_eq!(parse("!join", "!"), Some(Parsed::Command(Command::Join)));
        assert_eq!(parse("!skip", "!"), Some(Parsed::Command(Command::Skip)));
        assert_eq!(
            parse("!play https://youtu.be/x", "!"),
            Some(Parsed::Command(Command::Play {
                url: "https://youtu.be/x".to_string()
            }))
        );
    }

    #[test]
    fn respects_custom_prefix() {
        assert_eq!(parse("?pause", "?"), Some(Parsed::Command(Command::Pause)));
        assert_eq!(parse("!pause", "?"), None);
        assert_eq!(
            parse(">>volume 30", ">>"),
            Some(Parsed::Command(Command::Volume { value: 30 }))
        );
    }

    #[test]
    fn ignores_messages_without_prefix_or_unknown() {
        assert_eq!(parse("hola", "!"), None);
        assert_eq!(parse("!bailar", "!"), None);
        assert_eq!(parse("", "!"), None);
        assert_eq!(parse("!", "!"), None);
    }

    #[test]
    fn bad_arguments_return_usage() {
        assert!(matches!(parse("!play", "!"), Some(Parsed::Usage(_))));
        assert!(matches!(parse("!volume alto", "!"), Some(Parsed::Usage(_))));
        assert!(matches!(parse("!loop tal_vez", "!"), Some(Parsed::Usage(_))));
        assert!(matches!(
            parse("!addtoplaylist favoritas", "!"),
            Some(Parsed::Usage(_))
        ));
    }

    #[test]
    fn loop_modes() {
        assert_eq!(
            parse("!loop on", "!"),
            Some(Parsed::Command(Command::Loop { enabled: true }))
        );
        assert_eq!(
            parse("!loop OFF", "!"),
            Some(Parsed::Command(Command::Loop { enabled: false }))
        );
    }

    #[test]
    fn command_names_are_case_insensitive() {
        assert_eq!(parse("!Queue", "!"), Some(Parsed::Command(Command::Queue)));
    }

    #[test]
    fn admin_commands_are_flagged() {
        assert!(Command::SetPrefix {
            prefix: "?".to_string()
        }
        .requires_admin());
        assert!(Command::Playlists.requires_admin());
        assert!(!Command::Play {
            url: "x".to_string()
        }
        .requires_admin());
        assert!(!Command::Skip.requires_admin());
    }
}
