#![forbid(unsafe_code)]

mod command;
mod frame;
mod parse;
mod request;
mod response;

pub use command::Command;
pub use frame::{Frame, decode_line, encode_line};
pub use parse::Parse;
pub use request::Request;
pub use response::Response;
