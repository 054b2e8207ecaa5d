pub mod app;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod feed;
pub mod health;
pub mod protocol;
pub mod render;
pub mod session;
pub mod transport;

pub use controller::{ChatController, ConnectionState, FeedUpdate};
pub use error::{ClientError, Result};
pub use feed::{Entry, Feed, Role};
pub use protocol::{InboundFrame, OutboundMessage};
pub use transport::{SocketEvent, SocketHandle};
