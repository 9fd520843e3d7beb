use tokio::sync::broadcast;
use tracing::debug;

use memdb_common::ConnectionError;

use crate::{Connection, Dispatcher};

/// Loop principal de tratamento de uma conexão: um request, uma resposta,
/// em ordem.
pub async fn handle_connection(
    mut conn: Connection,
    dispatcher: Dispatcher,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ConnectionError> {
    loop {
        let request = tokio::select! {
            result = conn.read_request() => result?,
            _ = shutdown.recv() => {
                return Ok(());
            }
        };

        let request = match request {
            Some(r) => r,
            None => return Ok(()), // EOF
        };

        debug!("request recebido: {}", request.to_line());

        let response = dispatcher.dispatch(&request).await;
        conn.write_response(&response).await?;
    }
}
