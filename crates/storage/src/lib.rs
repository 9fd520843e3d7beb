#![forbid(unsafe_code)]

mod db;
mod snapshot;
mod value;

pub use db::Db;
pub use snapshot::SnapshotStore;
pub use value::{ListValue, StringValue, Value};
