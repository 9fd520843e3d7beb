use tokio::time::Duration;
use tracing::warn;

use memdb_common::{ABSENT, CommandError, MemDbError, MemDbResult, StorageError};
use memdb_protocol::{Command, Parse, Request, Response};
use memdb_storage::{Db, SnapshotStore};

/// Roteia cada request para exatamente uma operação do store.
///
/// Não guarda estado entre chamadas: tudo vive no `Db` compartilhado.
#[derive(Clone)]
pub struct Dispatcher {
    db: Db,
    snapshots: SnapshotStore,
}

impl Dispatcher {
    pub fn new(db: Db, snapshots: SnapshotStore) -> Self {
        Self { db, snapshots }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Executa o request. Nenhum erro escapa daqui: toda falha vira uma
    /// resposta com `success = false`.
    pub async fn dispatch(&self, request: &Request) -> Response {
        match self.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                if let MemDbError::Storage(StorageError::Io(_) | StorageError::CorruptSnapshot(_)) =
                    &e
                {
                    warn!("{} falhou: {e}", request.command);
                }
                Response::fail(e.to_string())
            }
        }
    }

    async fn execute(&self, request: &Request) -> MemDbResult<Response> {
        let db = &self.db;
        let mut parse = Parse::new(request);

        let response = match request.command {
            Command::Echo => Response::ok("echo"),
            Command::Ping => Response::ok("pong"),
            Command::Set => {
                let key = parse.key("value")?;
                let value = parse.next_string("value")?;
                db.set(key.to_string(), value.to_string(), None);
                Response::ok(value)
            }
            Command::SetX => {
                let key = parse.key("key")?;
                let value = parse.next_string("key")?;
                let ttl = parse.next_positive_int("key", "expiry")?;
                db.set(
                    key.to_string(),
                    value.to_string(),
                    Some(Duration::from_millis(ttl)),
                );
                Response::ok(value)
            }
            Command::Get => match db.get(parse.key("key")?) {
                Some(value) => Response::ok(value),
                None => Response::fail(ABSENT),
            },
            Command::Delete => {
                db.delete(parse.key("key")?);
                Response::ok(ABSENT)
            }
            Command::Increment => Response::ok(db.incr(parse.key("value")?)?),
            Command::Decrement => Response::ok(db.decr(parse.key("value")?)?),
            Command::LPush => {
                let key = parse.key("key")?;
                Response::ok(db.lpush(key, parse.rest("key")?)?)
            }
            Command::RPush => {
                let key = parse.key("key")?;
                Response::ok(db.rpush(key, parse.rest("key")?)?)
            }
            Command::Pop => match db.pop(parse.key("key")?)? {
                Some(item) => Response::ok(item),
                None => Response::fail(ABSENT),
            },
            Command::LLen => match db.llen(parse.key("key")?)? {
                Some(len) => Response::ok(len.to_string()),
                None => Response::fail("-1"),
            },
            Command::Save => {
                let keys = self.snapshots.save(db, parse.key("key")?).await?;
                Response::ok(format_keys(&keys))
            }
            Command::Load => {
                let keys = self.snapshots.load(db, parse.key("key")?).await?;
                Response::ok(format_keys(&keys))
            }
            Command::Invalid => return Err(CommandError::Invalid.into()),
        };

        Ok(response)
    }
}

fn format_keys(keys: &[String]) -> String {
    format!("[{}]", keys.join(", "))
}
