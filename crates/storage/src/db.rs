use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use memdb_common::StorageError;
use tokio::sync::Notify;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::snapshot::Snapshot;
use crate::value::{ListValue, Value};

/// Item no BTreeSet de expiração: (instante, chave).
/// Ordenado por instante para purga eficiente.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
struct ExpiryEntry(Instant, String);

/// Estado compartilhado entre todas as conexões.
struct SharedState {
    data: DashMap<String, Value>,
    /// Operações pontuais pegam o lado de leitura (a exclusão por chave fica
    /// com os shards do DashMap); snapshot e restore pegam o de escrita.
    gate: RwLock<()>,
    expiry: Mutex<BTreeSet<ExpiryEntry>>,
    notify_expiry: Notify,
}

impl SharedState {
    fn shared_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn exclusive_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn expiry(&self) -> MutexGuard<'_, BTreeSet<ExpiryEntry>> {
        self.expiry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule_expiry(&self, key: &str, when: Instant) {
        self.expiry().insert(ExpiryEntry(when, key.to_string()));
        self.notify_expiry.notify_one();
    }

    /// Remove a chave só se o valor atual ainda estiver expirado; um valor
    /// regravado depois do agendamento não é afetado.
    fn remove_if_expired(&self, key: &str) -> bool {
        self.data.remove_if(key, |_, v| v.is_expired()).is_some()
    }
}

/// Handle para o banco de dados in-memory.
///
/// Clonar é barato: todos os clones enxergam o mesmo mapa.
#[derive(Clone)]
pub struct Db {
    shared: Arc<SharedState>,
}

impl Db {
    pub fn new() -> Self {
        let db = Db {
            shared: Arc::new(SharedState {
                data: DashMap::new(),
                gate: RwLock::new(()),
                expiry: Mutex::new(BTreeSet::new()),
                notify_expiry: Notify::new(),
            }),
        };

        // Spawn background task para purgar keys expiradas
        let shared = db.shared.clone();
        tokio::spawn(async move {
            purge_expired_keys(shared).await;
        });

        db
    }

    // --- String operations ---

    /// Representação textual atual, ou `None` se a chave não existe/expirou.
    pub fn get(&self, key: &str) -> Option<String> {
        let _gate = self.shared.shared_gate();
        let value = self.shared.data.get(key)?;
        if value.is_expired() {
            drop(value);
            self.shared.remove_if_expired(key);
            return None;
        }
        value.read()
    }

    /// Grava uma string, substituindo qualquer valor anterior (e seu TTL).
    pub fn set(&self, key: String, value: String, ttl: Option<Duration>) {
        let _gate = self.shared.shared_gate();
        let mut value = Value::string(value);
        if let Some(ttl) = ttl {
            value.set_expiry(ttl);
        }
        let deadline = value.expires_at();
        self.shared.data.insert(key.clone(), value);

        if let Some(when) = deadline {
            self.shared.schedule_expiry(&key, when);
        }
    }

    /// Remove a chave. Retorna se havia um valor vivo.
    pub fn delete(&self, key: &str) -> bool {
        let _gate = self.shared.shared_gate();
        self.shared
            .data
            .remove(key)
            .is_some_and(|(_, v)| !v.is_expired())
    }

    pub fn incr(&self, key: &str) -> Result<String, StorageError> {
        self.update_number(key, Value::increment)
    }

    pub fn decr(&self, key: &str) -> Result<String, StorageError> {
        self.update_number(key, Value::decrement)
    }

    fn update_number(
        &self,
        key: &str,
        op: fn(&mut Value) -> Result<String, StorageError>,
    ) -> Result<String, StorageError> {
        let _gate = self.shared.shared_gate();
        // get_mut segura o lock do shard: incrementos concorrentes na mesma
        // chave são serializados
        let mut value = self
            .shared
            .data
            .get_mut(key)
            .ok_or(StorageError::KeyNotFound)?;

        if value.is_expired() {
            drop(value);
            self.shared.remove_if_expired(key);
            return Err(StorageError::KeyNotFound);
        }

        op(value.value_mut())
    }

    /// Instala um TTL relativo em um valor existente, de qualquer tipo.
    pub fn expire(&self, key: &str, ttl: Duration) -> bool {
        let _gate = self.shared.shared_gate();
        let deadline = {
            let Some(mut value) = self.shared.data.get_mut(key) else {
                return false;
            };
            if value.is_expired() {
                drop(value);
                self.shared.remove_if_expired(key);
                return false;
            }
            value.set_expiry(ttl);
            value.expires_at()
        };

        if let Some(when) = deadline {
            self.shared.schedule_expiry(key, when);
        }
        true
    }

    // --- List operations ---

    /// Insere na cabeça da lista, na ordem dada. Retorna a lista resultante.
    pub fn lpush(&self, key: &str, values: &[String]) -> Result<String, StorageError> {
        self.list_push(key, values, true)
    }

    /// Insere na cauda da lista, na ordem dada. Retorna a lista resultante.
    pub fn rpush(&self, key: &str, values: &[String]) -> Result<String, StorageError> {
        self.list_push(key, values, false)
    }

    fn list_push(
        &self,
        key: &str,
        values: &[String],
        to_front: bool,
    ) -> Result<String, StorageError> {
        let _gate = self.shared.shared_gate();
        let mut entry = self
            .shared
            .data
            .entry(key.to_string())
            .or_insert_with(|| Value::List(ListValue::new()));

        if entry.is_expired() {
            *entry = Value::List(ListValue::new());
        }

        let list = entry.as_list_mut()?;
        for v in values {
            if to_front {
                list.lpush(v.as_str());
            } else {
                list.rpush(v.as_str());
            }
        }
        Ok(list.read().unwrap_or_default())
    }

    /// Remove e retorna o elemento da cauda. `None` se a lista está vazia
    /// ou a chave não existe.
    pub fn pop(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _gate = self.shared.shared_gate();
        let mut value = match self.shared.data.get_mut(key) {
            Some(v) => v,
            None => return Ok(None),
        };

        if value.is_expired() {
            drop(value);
            self.shared.remove_if_expired(key);
            return Ok(None);
        }

        Ok(value.as_list_mut()?.pop())
    }

    /// Tamanho da lista, ou `None` se a chave não existe.
    pub fn llen(&self, key: &str) -> Result<Option<usize>, StorageError> {
        let _gate = self.shared.shared_gate();
        let value = match self.shared.data.get(key) {
            Some(v) => v,
            None => return Ok(None),
        };

        if value.is_expired() {
            drop(value);
            self.shared.remove_if_expired(key);
            return Ok(None);
        }

        Ok(Some(value.as_list()?.len()))
    }

    // --- Keyspace ---

    /// Chaves vivas, em ordem lexicográfica.
    pub fn keys(&self) -> Vec<String> {
        let _gate = self.shared.shared_gate();
        let mut keys: Vec<String> = self
            .shared
            .data
            .iter()
            .filter(|e| !e.value().is_expired())
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        let _gate = self.shared.shared_gate();
        self.shared
            .data
            .iter()
            .filter(|e| !e.value().is_expired())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // --- Snapshot ---

    /// Copia o mapa inteiro com o store parado.
    pub(crate) fn dump(&self) -> Snapshot {
        let _gate = self.shared.exclusive_gate();
        let mut snapshot = Snapshot::new();
        for entry in self.shared.data.iter() {
            if !entry.value().is_expired() {
                snapshot.insert(entry.key(), entry.value());
            }
        }
        snapshot
    }

    /// Substitui o mapa inteiro pelo conteúdo do snapshot.
    pub(crate) fn restore(&self, values: Vec<(String, Value)>) {
        let _gate = self.shared.exclusive_gate();
        self.shared.data.clear();
        self.shared.expiry().clear();

        for (key, value) in values {
            if let Some(when) = value.expires_at() {
                self.shared.schedule_expiry(&key, when);
            }
            self.shared.data.insert(key, value);
        }
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task que purga chaves expiradas.
async fn purge_expired_keys(shared: Arc<SharedState>) {
    loop {
        let next_expiry = shared.expiry().iter().next().map(|e| e.0);

        match next_expiry {
            Some(when) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(when) => {}
                    _ = shared.notify_expiry.notified() => { continue; }
                }
            }
            None => {
                shared.notify_expiry.notified().await;
                continue;
            }
        }

        purge_due(&shared, Instant::now());
    }
}

fn purge_due(shared: &SharedState, now: Instant) {
    // Solta o lock do conjunto antes de tocar no mapa: restore pega os dois
    // na ordem inversa.
    let due: Vec<ExpiryEntry> = {
        let mut expiry = shared.expiry();
        let due: Vec<_> = expiry
            .iter()
            .take_while(|e| e.0 <= now)
            .cloned()
            .collect();
        for entry in &due {
            expiry.remove(entry);
        }
        due
    };

    let _gate = shared.shared_gate();
    for ExpiryEntry(_, key) in due {
        if shared.remove_if_expired(&key) {
            debug!("key expirada removida: {key}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Quantas chaves ainda estão fisicamente no mapa (vivas ou não).
    fn raw_len(db: &Db) -> usize {
        db.shared.data.len()
    }

    #[tokio::test]
    async fn get_set_basic() {
        let db = Db::new();
        db.set("key".into(), "value".into(), None);
        assert_eq!(db.get("key").as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn set_empty_string() {
        let db = Db::new();
        db.set("key".into(), String::new(), None);
        assert_eq!(db.get("key").as_deref(), Some(""));
    }

    #[tokio::test]
    async fn get_nonexistent() {
        let db = Db::new();
        assert_eq!(db.get("missing"), None);
    }

    #[tokio::test]
    async fn set_overwrites_list() {
        let db = Db::new();
        db.lpush("key", &strings(&["a"])).unwrap();
        db.set("key".into(), "v".into(), None);
        assert_eq!(db.get("key").as_deref(), Some("v"));
        assert!(matches!(db.llen("key"), Err(StorageError::WrongType)));
    }

    #[tokio::test(start_paused = true)]
    async fn set_with_expiry() {
        let db = Db::new();
        db.set("key".into(), "value".into(), Some(Duration::from_millis(50)));
        assert_eq!(db.get("key").as_deref(), Some("value"));

        tokio::time::sleep(Duration::from_millis(49)).await;
        assert_eq!(db.get("key").as_deref(), Some("value"));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(db.get("key"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_without_reads() {
        let db = Db::new();
        db.set("a".into(), "1".into(), Some(Duration::from_millis(20)));
        db.set("b".into(), "2".into(), Some(Duration::from_millis(40)));
        db.set("c".into(), "3".into(), None);
        assert_eq!(raw_len(&db), 3);

        tokio::time::sleep(Duration::from_millis(60)).await;
        // nenhuma leitura aconteceu; o purger removeu sozinho
        assert_eq!(raw_len(&db), 1);
        assert_eq!(db.keys(), strings(&["c"]));
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_cancels_old_expiry() {
        let db = Db::new();
        db.set("key".into(), "old".into(), Some(Duration::from_millis(20)));
        db.set("key".into(), "new".into(), None);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(db.get("key").as_deref(), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn delete_then_recreate_ignores_stale_timer() {
        let db = Db::new();
        db.set("key".into(), "v1".into(), Some(Duration::from_millis(20)));
        assert!(db.delete("key"));
        db.set("key".into(), "v2".into(), Some(Duration::from_millis(100)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(db.get("key").as_deref(), Some("v2"));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(db.get("key"), None);
    }

    #[tokio::test]
    async fn delete_keys() {
        let db = Db::new();
        db.set("a".into(), "1".into(), None);

        assert!(db.delete("a"));
        assert_eq!(db.get("a"), None);
        // chave inexistente é no-op
        assert!(!db.delete("a"));
        assert!(!db.delete("never"));
    }

    #[tokio::test]
    async fn incr_decr_basic() {
        let db = Db::new();
        db.set("counter".into(), "5".into(), None);
        assert_eq!(db.incr("counter").unwrap(), "6");
        assert_eq!(db.decr("counter").unwrap(), "5");
        assert_eq!(db.get("counter").as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn incr_missing_key_is_noop() {
        let db = Db::new();
        assert!(matches!(db.incr("counter"), Err(StorageError::KeyNotFound)));
        assert_eq!(db.get("counter"), None);
    }

    #[tokio::test]
    async fn incr_not_numeric() {
        let db = Db::new();
        db.set("key".into(), "not_a_number".into(), None);
        assert!(matches!(db.incr("key"), Err(StorageError::NotNumeric)));
        assert_eq!(db.get("key").as_deref(), Some("not_a_number"));
    }

    #[tokio::test]
    async fn incr_wrong_type() {
        let db = Db::new();
        db.lpush("list", &strings(&["a"])).unwrap();
        assert!(matches!(db.incr("list"), Err(StorageError::WrongType)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn incr_concurrent() {
        let db = Db::new();
        db.set("counter".into(), "0".into(), None);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..250 {
                    db.incr("counter").unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(db.get("counter").as_deref(), Some("2000"));
    }

    #[tokio::test]
    async fn lpush_order() {
        let db = Db::new();
        assert_eq!(db.lpush("list", &strings(&["a"])).unwrap(), "a");
        assert_eq!(db.lpush("list", &strings(&["b"])).unwrap(), "b a");
        assert_eq!(db.get("list").as_deref(), Some("b a"));

        // pop sai pela cauda: o primeiro inserido sai primeiro
        assert_eq!(db.pop("list").unwrap().as_deref(), Some("a"));
        assert_eq!(db.pop("list").unwrap().as_deref(), Some("b"));
        assert_eq!(db.pop("list").unwrap(), None);
    }

    #[tokio::test]
    async fn rpush_order() {
        let db = Db::new();
        assert_eq!(db.rpush("list", &strings(&["a", "b"])).unwrap(), "a b");
        assert_eq!(db.lpush("list", &strings(&["c"])).unwrap(), "c a b");

        // pop pela cauda: o último inserido à direita sai primeiro
        assert_eq!(db.pop("list").unwrap().as_deref(), Some("b"));
        assert_eq!(db.llen("list").unwrap(), Some(2));
    }

    #[tokio::test]
    async fn pop_missing_or_empty() {
        let db = Db::new();
        assert_eq!(db.pop("missing").unwrap(), None);

        db.lpush("list", &strings(&["a"])).unwrap();
        db.pop("list").unwrap();
        assert_eq!(db.pop("list").unwrap(), None);
        // lista vazia continua existindo
        assert_eq!(db.llen("list").unwrap(), Some(0));
        assert_eq!(db.get("list"), None);
    }

    #[tokio::test]
    async fn llen_missing() {
        let db = Db::new();
        assert_eq!(db.llen("missing").unwrap(), None);
    }

    #[tokio::test]
    async fn wrong_type_list_on_string() {
        let db = Db::new();
        db.set("key".into(), "value".into(), None);
        assert!(matches!(
            db.lpush("key", &strings(&["a"])),
            Err(StorageError::WrongType)
        ));
        assert!(matches!(db.pop("key"), Err(StorageError::WrongType)));
        assert!(matches!(db.llen("key"), Err(StorageError::WrongType)));
        assert_eq!(db.get("key").as_deref(), Some("value"));
    }

    #[tokio::test(start_paused = true)]
    async fn expire_list() {
        let db = Db::new();
        db.rpush("list", &strings(&["a", "b"])).unwrap();
        assert!(db.expire("list", Duration::from_millis(30)));
        assert!(!db.expire("missing", Duration::from_millis(30)));

        tokio::time::sleep(Duration::from_millis(31)).await;
        assert_eq!(db.get("list"), None);
        assert_eq!(db.llen("list").unwrap(), None);

        // push em chave expirada começa uma lista nova
        assert_eq!(db.lpush("list", &strings(&["z"])).unwrap(), "z");
    }

    #[tokio::test]
    async fn keys_and_len() {
        let db = Db::new();
        assert!(db.is_empty());
        db.set("b".into(), "1".into(), None);
        db.set("a".into(), "2".into(), None);
        db.lpush("c", &strings(&["x"])).unwrap();
        assert_eq!(db.keys(), strings(&["a", "b", "c"]));
        assert_eq!(db.len(), 3);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let db = Db::new();
        let other = db.clone();
        db.set("shared".into(), "yes".into(), None);
        assert_eq!(other.get("shared").as_deref(), Some("yes"));
    }
}
