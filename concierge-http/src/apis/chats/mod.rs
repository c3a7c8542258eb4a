pub mod handler;
pub mod socket;

pub use handler::{handle_chat_socket, ChatQuery};
pub use socket::WebSocketChannel;
