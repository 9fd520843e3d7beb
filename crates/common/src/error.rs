/// Erros de framing do protocolo (linhas de request e frames de resposta).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame incompleto")]
    Incomplete,
    #[error("byte de tipo inválido: {0:#x}")]
    InvalidFrameType(u8),
    #[error("inteiro inválido: {0}")]
    InvalidInteger(String),
    #[error("comprimento de bulk inválido: {0}")]
    InvalidBulkLength(i64),
    #[error("frame excede tamanho máximo ({0} bytes)")]
    FrameTooLarge(usize),
    #[error("linha excede tamanho máximo ({0} bytes)")]
    LineTooLong(usize),
    #[error("encoding inválido: {0}")]
    InvalidEncoding(String),
}

/// Erros do store e dos snapshots.
///
/// As mensagens vão para o cliente como texto da resposta.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("Value is not a number")]
    NotNumeric,
    #[error("null")]
    KeyNotFound,
    #[error("Invalid snapshot name '{0}'")]
    InvalidSnapshotName(String),
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Erros de conexão TCP.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("conexão resetada pelo peer")]
    ConnectionReset,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Erros de validação de um request antes de chegar ao store.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid command")]
    Invalid,
    #[error("Invalid command or {0}")]
    MissingArgument(&'static str),
    #[error("Invalid {name} '{value}': expected a positive integer")]
    InvalidArgument { name: &'static str, value: String },
}

/// Erro de execução de um comando: validação do request ou falha do store.
#[derive(Debug, thiserror::Error)]
pub enum MemDbError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Result type alias.
pub type MemDbResult<T> = Result<T, MemDbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display() {
        let err = ProtocolError::Incomplete;
        assert_eq!(err.to_string(), "frame incompleto");
    }

    #[test]
    fn storage_error_display() {
        assert_eq!(StorageError::NotNumeric.to_string(), "Value is not a number");
        assert_eq!(StorageError::KeyNotFound.to_string(), "null");
    }

    #[test]
    fn memdb_error_keeps_inner_message() {
        let err: MemDbError = StorageError::WrongType.into();
        assert!(matches!(err, MemDbError::Storage(StorageError::WrongType)));
        assert!(err.to_string().starts_with("WRONGTYPE"));

        let err: MemDbError = CommandError::MissingArgument("value").into();
        assert_eq!(err.to_string(), "Invalid command or value");
    }

    #[test]
    fn connection_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken");
        let err: ConnectionError = io_err.into();
        assert!(matches!(err, ConnectionError::Io(_)));
    }

    #[test]
    fn command_error_display() {
        assert_eq!(CommandError::Invalid.to_string(), "Invalid command");
        assert_eq!(
            CommandError::MissingArgument("key").to_string(),
            "Invalid command or key"
        );
        let err = CommandError::InvalidArgument {
            name: "expiry",
            value: "soon".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid expiry 'soon': expected a positive integer"
        );
    }
}
