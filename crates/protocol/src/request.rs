use crate::Command;

/// Um request já parseado: `<comando> [chave] [args...]`.
///
/// A gramática é só tokens separados por whitespace, sem aspas nem escape,
/// então valores com espaço não são representáveis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub key: Option<String>,
    pub args: Vec<String>,
}

impl Request {
    pub fn new(command: Command, key: Option<String>, args: Vec<String>) -> Self {
        Self { command, key, args }
    }

    /// Faz o parse de uma linha de texto. Nunca falha: token desconhecido
    /// (ou linha vazia) vira `Command::Invalid`.
    pub fn parse(line: &str) -> Request {
        let mut tokens = line.split_whitespace();
        let command = tokens
            .next()
            .map(Command::from_token)
            .unwrap_or(Command::Invalid);
        let key = tokens.next().map(str::to_string);
        let args = tokens.map(str::to_string).collect();

        Request { command, key, args }
    }

    /// Reconstrói a linha canônica do request (sem terminador).
    pub fn to_line(&self) -> String {
        let mut line = self.command.name().to_string();
        for token in self.key.iter().chain(self.args.iter()) {
            line.push(' ');
            line.push_str(token);
        }
        line
    }
}
