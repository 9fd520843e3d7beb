use bytes::{Buf, BufMut, Bytes, BytesMut};
use memdb_common::{MAX_FRAME_SIZE, MAX_LINE_LENGTH, ProtocolError};
use std::io::Cursor;

/// Frame de resposta no wire.
///
/// Sucesso vai como bulk (`$<len>\r\n<dados>\r\n`), falha como linha de erro
/// (`-<mensagem>\r\n`).
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Bulk(Bytes),
    Error(String),
}

impl Frame {
    /// Verifica se um frame completo está disponível no buffer sem alocar.
    /// Retorna Ok(()) se completo, Err(Incomplete) se precisa mais dados.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), ProtocolError> {
        match get_u8(src)? {
            b'-' => {
                get_line(src)?;
                Ok(())
            }
            b'$' => {
                let len = get_decimal(src)?;
                if len < 0 {
                    return Err(ProtocolError::InvalidBulkLength(len));
                }
                let len = len as usize;
                if len > MAX_FRAME_SIZE {
                    return Err(ProtocolError::FrameTooLarge(len));
                }
                skip(src, len + 2)?; // data + \r\n
                Ok(())
            }
            byte => Err(ProtocolError::InvalidFrameType(byte)),
        }
    }

    /// Faz o parse de um frame completo a partir do cursor.
    /// Deve ser chamado apenas após `check()` retornar Ok.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Frame, ProtocolError> {
        match get_u8(src)? {
            b'-' => {
                let line = get_line(src)?;
                let s = String::from_utf8(line.to_vec())
                    .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))?;
                Ok(Frame::Error(s))
            }
            b'$' => {
                let len = get_decimal(src)?;
                if len < 0 {
                    return Err(ProtocolError::InvalidBulkLength(len));
                }
                let len = len as usize;
                if src.remaining() < len + 2 {
                    return Err(ProtocolError::Incomplete);
                }
                let data = Bytes::copy_from_slice(&src.get_ref()[src.position() as usize..][..len]);
                src.set_position(src.position() + len as u64 + 2);
                Ok(Frame::Bulk(data))
            }
            byte => Err(ProtocolError::InvalidFrameType(byte)),
        }
    }

    /// Encoda o frame no buffer de saída.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Frame::Error(s) => {
                dst.put_u8(b'-');
                // a linha de erro não pode conter o terminador
                for b in s.bytes() {
                    dst.put_u8(if b == b'\r' || b == b'\n' { b' ' } else { b });
                }
                dst.put(&b"\r\n"[..]);
            }
            Frame::Bulk(data) => {
                dst.put_u8(b'$');
                dst.put(data.len().to_string().as_bytes());
                dst.put(&b"\r\n"[..]);
                dst.put(data.as_ref());
                dst.put(&b"\r\n"[..]);
            }
        }
    }

    /// Helper: cria um Frame::Bulk a partir de &str.
    pub fn bulk(s: &str) -> Frame {
        Frame::Bulk(Bytes::from(s.to_string()))
    }
}

/// Extrai a próxima linha de request do buffer (terminada em `\n`, com `\r`
/// opcional), junto com o número de bytes consumidos. Retorna `None` se a
/// linha ainda não chegou inteira.
pub fn decode_line(src: &[u8]) -> Result<Option<(String, usize)>, ProtocolError> {
    match src.iter().position(|&b| b == b'\n') {
        Some(end) => {
            if end > MAX_LINE_LENGTH {
                return Err(ProtocolError::LineTooLong(end));
            }
            let line = src[..end].strip_suffix(b"\r").unwrap_or(&src[..end]);
            // bytes inválidos viram U+FFFD: a linha ainda recebe uma resposta
            Ok(Some((String::from_utf8_lossy(line).into_owned(), end + 1)))
        }
        None if src.len() > MAX_LINE_LENGTH => Err(ProtocolError::LineTooLong(src.len())),
        None => Ok(None),
    }
}

/// Encoda uma linha de request com o terminador `\r\n`.
pub fn encode_line(line: &str, dst: &mut BytesMut) {
    dst.put(line.as_bytes());
    dst.put(&b"\r\n"[..]);
}

fn get_u8(src: &mut Cursor<&[u8]>) -> Result<u8, ProtocolError> {
    if !src.has_remaining() {
        return Err(ProtocolError::Incomplete);
    }
    Ok(src.get_u8())
}

fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ProtocolError> {
    let start = src.position() as usize;
    let end = src.get_ref().len();

    for i in start..end.saturating_sub(1) {
        if src.get_ref()[i] == b'\r' && src.get_ref()[i + 1] == b'\n' {
            src.set_position((i + 2) as u64);
            return Ok(&src.get_ref()[start..i]);
        }
    }

    Err(ProtocolError::Incomplete)
}

fn get_decimal(src: &mut Cursor<&[u8]>) -> Result<i64, ProtocolError> {
    let line = get_line(src)?;
    let s = std::str::from_utf8(line).map_err(|e| ProtocolError::InvalidInteger(e.to_string()))?;
    s.parse::<i64>()
        .map_err(|e| ProtocolError::InvalidInteger(e.to_string()))
}

fn skip(src: &mut Cursor<&[u8]>, n: usize) -> Result<(), ProtocolError> {
    if src.remaining() < n {
        return Err(ProtocolError::Incomplete);
    }
    src.set_position(src.position() + n as u64);
    Ok(())
}
