pub mod handler;

pub use handler::{handle_get_intent, handle_health, handle_list_intents, HealthResponse, IntentSummary};
