//! Context interface the Telegram handlers are generic over.

pub use sprout_agent::pipeline::MessageContext as TelegramAppContext;
