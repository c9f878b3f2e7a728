mod compact;
mod core;
mod oauth;
mod tasks;
mod webhook;

pub use compact::{CompactConfig, UndatedPolicy};
pub use core::{Config, ReliabilityConfig, SecretsConfig};
pub use oauth::OAuthConfig;
pub use tasks::TasksConfig;
pub use webhook::WebhookConfig;
