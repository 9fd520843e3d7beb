use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use memdb_common::{SNAPSHOT_EXTENSION, StorageError};
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use crate::Db;
use crate::value::{ListValue, Value, deadline_after};

const SNAPSHOT_VERSION: u32 = 1;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Cópia serializável do mapa inteiro.
///
/// Deadlines são gravados como epoch em milissegundos, então um valor com TTL
/// continua expirando no mesmo instante de relógio depois do LOAD.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    version: u32,
    entries: BTreeMap<String, SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    #[serde(flatten)]
    value: SnapshotValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum SnapshotValue {
    String { value: String },
    List { items: Vec<String> },
}

impl Snapshot {
    pub fn new() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            entries: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, key: &str, value: &Value) {
        let snapshot_value = match value {
            Value::String(s) => SnapshotValue::String {
                value: s.read().unwrap_or_default().to_string(),
            },
            Value::List(l) => SnapshotValue::List {
                items: l.items().map(str::to_string).collect(),
            },
        };
        self.entries.insert(
            key.to_string(),
            SnapshotEntry {
                value: snapshot_value,
                expires_at_ms: value.expires_at().map(deadline_to_epoch_ms),
            },
        );
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Converte de volta para valores do store, descartando os que expiraram
    /// enquanto estavam em disco.
    pub(crate) fn into_values(self) -> Result<Vec<(String, Value)>, StorageError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(StorageError::CorruptSnapshot(format!(
                "unsupported version {}",
                self.version
            )));
        }

        let now_ms = epoch_ms(SystemTime::now());
        let mut values = Vec::with_capacity(self.entries.len());
        for (key, entry) in self.entries {
            let deadline = match entry.expires_at_ms {
                Some(at) if at <= now_ms => {
                    debug!("snapshot: chave {key} já expirada, ignorada");
                    continue;
                }
                Some(at) => Some(deadline_after(Duration::from_millis(at - now_ms))),
                None => None,
            };
            let value = match entry.value {
                SnapshotValue::String { value } => Value::string(value),
                SnapshotValue::List { items } => Value::List(ListValue::from_items(items)),
            };
            values.push((key, value.with_deadline(deadline)));
        }
        Ok(values)
    }
}

/// Arquivos de snapshot `<nome>.json` dentro de um diretório fixo.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Caminho do arquivo para `name`. O nome não pode escapar do diretório.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidSnapshotName(name.to_string()));
        }
        Ok(self.dir.join(format!("{name}.{SNAPSHOT_EXTENSION}")))
    }

    /// Grava o mapa inteiro em `<dir>/<name>.json`, sobrescrevendo o arquivo.
    /// Retorna as chaves gravadas.
    pub async fn save(&self, db: &Db, name: &str) -> Result<Vec<String>, StorageError> {
        let path = self.path_for(name)?;
        let snapshot = db.dump();
        let data = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StorageError::CorruptSnapshot(e.to_string()))?;

        tokio::fs::create_dir_all(&self.dir).await?;
        // escreve ao lado e renomeia: um leitor nunca vê o arquivo pela metade
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self.dir.join(format!(".{name}.{seq}.tmp"));
        tokio::fs::write(&tmp, &data).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        info!(
            "snapshot salvo: {:?} ({} chaves, {} bytes)",
            path,
            snapshot.len(),
            data.len()
        );
        Ok(snapshot.keys())
    }

    /// Substitui o mapa em memória pelo conteúdo de `<dir>/<name>.json`.
    /// Retorna as chaves presentes depois do load.
    pub async fn load(&self, db: &Db, name: &str) -> Result<Vec<String>, StorageError> {
        let path = self.path_for(name)?;
        let data = tokio::fs::read(&path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&data)
            .map_err(|e| StorageError::CorruptSnapshot(e.to_string()))?;

        let values = snapshot.into_values()?;
        let count = values.len();
        db.restore(values);

        info!("snapshot carregado: {:?} ({count} chaves)", path);
        Ok(db.keys())
    }
}

fn epoch_ms(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn deadline_to_epoch_ms(deadline: Instant) -> u64 {
    let remaining = deadline.saturating_duration_since(Instant::now());
    SystemTime::now()
        .checked_add(remaining)
        .map(epoch_ms)
        .unwrap_or(u64::MAX)
}
