pub mod error;
pub mod webhook;

pub use error::WebhookError;
pub use webhook::DiscordWebhook;
