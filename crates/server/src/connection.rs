use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use memdb_common::{ConnectionError, INITIAL_BUFFER_CAPACITY};
use memdb_protocol::{Request, Response, decode_line};

/// Wrapper sobre TcpStream: lê linhas de request e escreve frames de resposta.
pub struct Connection {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Lê um request completo do stream. Retorna None no EOF.
    pub async fn read_request(&mut self) -> Result<Option<Request>, ConnectionError> {
        loop {
            if let Some(line) = self.parse_line()? {
                return Ok(Some(Request::parse(&line)));
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(ConnectionError::ConnectionReset);
            }
        }
    }

    /// Escreve uma resposta no stream.
    pub async fn write_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let mut buf = BytesMut::new();
        response.to_frame().encode(&mut buf);
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;
        Ok(())
    }

    fn parse_line(&mut self) -> Result<Option<String>, ConnectionError> {
        match decode_line(&self.buffer)? {
            Some((line, consumed)) => {
                self.buffer.advance(consumed);
                Ok(Some(line))
            }
            None => Ok(None),
        }
    }
}
