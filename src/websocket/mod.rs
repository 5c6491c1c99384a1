pub mod chat;
pub mod handler;
pub mod messages;

pub use chat::ChatRoom;
pub use handler::handle_websocket;
