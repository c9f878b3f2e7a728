pub mod schema;

pub use schema::{
    CompactConfig, Config, OAuthConfig, ReliabilityConfig, SecretsConfig, TasksConfig,
    UndatedPolicy, WebhookConfig,
};
