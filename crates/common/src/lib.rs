#![forbid(unsafe_code)]

mod error;

pub use error::*;

pub const DEFAULT_PORT: u16 = 6400;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const MAX_CONNECTIONS: usize = 1024;
pub const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024; // 4 KB
pub const MAX_LINE_LENGTH: usize = 64 * 1024; // 64 KB
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024; // 64 MB

/// Diretório padrão dos snapshots.
pub const DEFAULT_DATA_DIR: &str = "./data";
/// Extensão dos arquivos de snapshot (`<nome>.<ext>`).
pub const SNAPSHOT_EXTENSION: &str = "json";

/// Texto devolvido ao cliente quando a chave não existe ou expirou.
pub const ABSENT: &str = "null";
