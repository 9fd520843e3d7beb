use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use memdb_common::{DEFAULT_DATA_DIR, DEFAULT_HOST, DEFAULT_PORT, MAX_CONNECTIONS};
use memdb_server::{Dispatcher, run};
use memdb_storage::{Db, SnapshotStore};

#[derive(Parser, Debug)]
#[command(name = "memdb-server", about = "MemDB: key-value store em memória")]
struct Args {
    #[arg(long, env = "MEMDB_HOST", default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, env = "MEMDB_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    #[arg(long, env = "MEMDB_MAX_CONNECTIONS", default_value_t = MAX_CONNECTIONS)]
    max_connections: usize,
    /// Diretório dos arquivos de snapshot
    #[arg(long, env = "MEMDB_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Snapshot carregado antes de aceitar conexões
    #[arg(long, value_name = "NAME")]
    restore: Option<String>,
    /// Snapshot gravado ao receber o sinal de shutdown
    #[arg(long, value_name = "NAME")]
    save_on_shutdown: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memdb_server=info,memdb_storage=info".into()),
        )
        .init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let db = Db::new();
    let snapshots = SnapshotStore::new(&args.data_dir);

    if let Some(ref name) = args.restore {
        let keys = snapshots.load(&db, name).await?;
        info!("{} chaves restauradas de '{name}'", keys.len());
    }

    let listener = TcpListener::bind(&addr).await?;
    info!("MemDB escutando em {addr} (dados em {:?})", args.data_dir);

    let dispatcher = Dispatcher::new(db.clone(), snapshots.clone());
    run(listener, dispatcher, args.max_connections, signal::ctrl_c()).await;

    if let Some(ref name) = args.save_on_shutdown {
        match snapshots.save(&db, name).await {
            Ok(keys) => info!("{} chaves salvas em '{name}'", keys.len()),
            Err(e) => {
                error!("falha ao salvar snapshot '{name}': {e}");
                return Err(e.into());
            }
        }
    }

    Ok(())
}
