#![forbid(unsafe_code)]

mod connection;
mod dispatcher;
pub mod handler;
pub mod server;

pub use connection::Connection;
pub use dispatcher::Dispatcher;
pub use handler::handle_connection;
pub use server::run;
