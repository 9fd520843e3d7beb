use std::fmt;

/// Enum com todos os comandos suportados.
///
/// O conjunto é fechado: qualquer token que não case vira `Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Echo,
    Ping,
    Set,
    /// SET com TTL em milissegundos.
    SetX,
    Get,
    Delete,
    Increment,
    Decrement,
    LPush,
    RPush,
    /// Remove o elemento da cauda da lista.
    Pop,
    LLen,
    Save,
    Load,
    Invalid,
}

impl Command {
    pub const ALL: [Command; 14] = [
        Command::Echo,
        Command::Ping,
        Command::Set,
        Command::SetX,
        Command::Get,
        Command::Delete,
        Command::Increment,
        Command::Decrement,
        Command::LPush,
        Command::RPush,
        Command::Pop,
        Command::LLen,
        Command::Save,
        Command::Load,
    ];

    /// Faz o match case-insensitive de um token com o nome do comando.
    pub fn from_token(token: &str) -> Command {
        Command::ALL
            .into_iter()
            .find(|cmd| token.eq_ignore_ascii_case(cmd.name()))
            .unwrap_or(Command::Invalid)
    }

    /// Nome canônico (maiúsculo) usado no wire.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Echo => "ECHO",
            Command::Ping => "PING",
            Command::Set => "SET",
            Command::SetX => "SETX",
            Command::Get => "GET",
            Command::Delete => "DELETE",
            Command::Increment => "INCREMENT",
            Command::Decrement => "DECREMENT",
            Command::LPush => "LPUSH",
            Command::RPush => "RPUSH",
            Command::Pop => "POP",
            Command::LLen => "LLEN",
            Command::Save => "SAVE",
            Command::Load => "LOAD",
            Command::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
