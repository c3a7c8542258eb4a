pub mod chats;
pub mod intents;

pub use chats::handle_chat_socket;
pub use intents::{handle_get_intent, handle_health, handle_list_intents};
