use memdb_common::CommandError;

use crate::Request;

/// Cursor sobre os argumentos de um Request para extraí-los em sequência,
/// validando presença e formato.
pub struct Parse<'a> {
    request: &'a Request,
    pos: usize,
}

impl<'a> Parse<'a> {
    pub fn new(request: &'a Request) -> Parse<'a> {
        Parse { request, pos: 0 }
    }

    /// Retorna a chave do request. `missing` nomeia o que faltou na mensagem
    /// de erro ("key" ou "value").
    pub fn key(&self, missing: &'static str) -> Result<&'a str, CommandError> {
        self.request
            .key
            .as_deref()
            .ok_or(CommandError::MissingArgument(missing))
    }

    /// Retorna o próximo argumento posicional.
    pub fn next_string(&mut self, missing: &'static str) -> Result<&'a str, CommandError> {
        let request = self.request;
        let arg = request
            .args
            .get(self.pos)
            .filter(|a| !a.is_empty())
            .ok_or(CommandError::MissingArgument(missing))?;
        self.pos += 1;
        Ok(arg.as_str())
    }

    /// Retorna o próximo argumento como inteiro positivo.
    pub fn next_positive_int(
        &mut self,
        missing: &'static str,
        name: &'static str,
    ) -> Result<u64, CommandError> {
        let s = self.next_string(missing)?;
        match s.parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(CommandError::InvalidArgument {
                name,
                value: s.to_string(),
            }),
        }
    }

    /// Consome todos os argumentos restantes (pelo menos um).
    pub fn rest(&mut self, missing: &'static str) -> Result<&'a [String], CommandError> {
        let request = self.request;
        let rest = &request.args[self.pos.min(request.args.len())..];
        if rest.is_empty() {
            return Err(CommandError::MissingArgument(missing));
        }
        self.pos = request.args.len();
        Ok(rest)
    }
}
