use std::io::{self, Cursor, Write};

use bytes::{Buf, BytesMut};
use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use memdb_common::{DEFAULT_HOST, DEFAULT_PORT};
use memdb_protocol::{Frame, Response, encode_line};

#[derive(Parser, Debug)]
#[command(name = "memdb-cli", about = "MemDB CLI client")]
struct Args {
    #[arg(long, env = "MEMDB_HOST", default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, short, env = "MEMDB_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Comando para executar diretamente (modo não interativo)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

/// Conexão com o servidor: uma linha enviada, um frame de resposta lido.
struct Client {
    stream: TcpStream,
    buffer: BytesMut,
}

impl Client {
    async fn connect(addr: &str) -> anyhow::Result<Client> {
        Ok(Client {
            stream: TcpStream::connect(addr).await?,
            buffer: BytesMut::with_capacity(4096),
        })
    }

    async fn execute(&mut self, line: &str) -> anyhow::Result<Response> {
        let mut buf = BytesMut::new();
        encode_line(line, &mut buf);
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;

        loop {
            let mut cursor = Cursor::new(&self.buffer[..]);
            if Frame::check(&mut cursor).is_ok() {
                cursor.set_position(0);
                let frame =
                    Frame::parse(&mut cursor).map_err(|e| anyhow::anyhow!("parse error: {e}"))?;
                let consumed = cursor.position() as usize;
                self.buffer.advance(consumed);
                return Ok(Response::from_frame(frame)?);
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(anyhow::anyhow!("servidor fechou a conexão"));
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut client = Client::connect(&addr).await?;

    // Modo comando único (via argumentos)
    if !args.command.is_empty() {
        let line = normalize(&args.command.join(" "));
        println!("{}", client.execute(&line).await?);
        return Ok(());
    }

    println!("Conectado a {addr}");

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("memdb> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }

        let line = normalize(&input);
        if line.is_empty() {
            continue;
        }
        if is_quit(&line) {
            break;
        }

        match client.execute(&line).await {
            Ok(response) => println!("{response}"),
            Err(e) => {
                println!("(error) {e}");
                break;
            }
        }
    }

    Ok(())
}

/// Colapsa whitespace em um único espaço entre tokens.
fn normalize(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_quit(line: &str) -> bool {
    line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  SET   key\tvalue \r\n"), "SET key value");
        assert_eq!(normalize("   \n"), "");
    }

    #[test]
    fn quit_is_case_insensitive() {
        assert!(is_quit("quit"));
        assert!(is_quit("EXIT"));
        assert!(!is_quit("quit now"));
        assert!(!is_quit("GET quit"));
    }

    #[test]
    fn responses_print_with_status() {
        assert_eq!(Response::ok("pong").to_string(), "(ok) pong");
        assert_eq!(Response::fail("null").to_string(), "(error) null");
    }
}
