use std::fmt;

use bytes::Bytes;
use memdb_common::ProtocolError;

use crate::Frame;

/// Resposta a um único request: flag de sucesso + texto legível.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub success: bool,
    pub message: String,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    pub fn to_frame(&self) -> Frame {
        if self.success {
            Frame::bulk(&self.message)
        } else {
            Frame::Error(self.message.clone())
        }
    }

    pub fn from_frame(frame: Frame) -> Result<Response, ProtocolError> {
        match frame {
            Frame::Bulk(data) => Ok(Response::ok(bulk_to_string(data)?)),
            Frame::Error(msg) => Ok(Response::fail(msg)),
        }
    }
}

fn bulk_to_string(data: Bytes) -> Result<String, ProtocolError> {
    String::from_utf8(data.to_vec()).map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(f, "(ok) {}", self.message)
        } else {
            write!(f, "(error) {}", self.message)
        }
    }
}
