use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast, mpsc};
use tracing::{error, info};

use crate::{Connection, Dispatcher, handle_connection};

/// Aceita conexões até `shutdown` completar.
///
/// Cada conexão roda na sua própria task; `max_connections` limita quantas
/// ficam abertas ao mesmo tempo. Ao sair, as conexões abertas recebem o
/// sinal de shutdown e `run` só retorna depois que todas encerraram.
pub async fn run(
    listener: TcpListener,
    dispatcher: Dispatcher,
    max_connections: usize,
    shutdown: impl Future,
) {
    let semaphore = Arc::new(Semaphore::new(max_connections));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    // cada task segura um sender; o canal fecha quando a última termina
    let (done_tx, mut done_rx) = mpsc::channel::<()>(1);
    tokio::pin!(shutdown);

    loop {
        let permit = tokio::select! {
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
            _ = &mut shutdown => {
                info!("shutdown signal recebido");
                break;
            }
        };

        let (socket, addr) = tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok(v) => v,
                    Err(e) => {
                        error!("erro ao aceitar conexão: {e}");
                        continue;
                    }
                }
            }
            _ = &mut shutdown => {
                info!("shutdown signal recebido");
                break;
            }
        };

        info!("nova conexão: {addr}");
        let dispatcher = dispatcher.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        let done = done_tx.clone();

        tokio::spawn(async move {
            let conn = Connection::new(socket);
            if let Err(e) = handle_connection(conn, dispatcher, &mut shutdown_rx).await {
                error!("erro na conexão {addr}: {e}");
            }
            info!("conexão encerrada: {addr}");
            drop(permit);
            drop(done);
        });
    }

    // Fecha o canal: todo handler vê `recv()` retornar e sai do loop depois
    // do request em andamento.
    drop(shutdown_tx);
    drop(done_tx);
    let _ = done_rx.recv().await;
}
