use thiserror::Error;

/// Crate-wide result type.
pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    // =========
    // Config / startup
    // =========
    #[error("Configuration file IO error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    ConfigYaml(#[from] serde_yaml::Error),

    #[error("Missing configuration field: {0}")]
    MissingConfig(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // =========
    // Message bus
    // =========
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    // =========
    // Decoding
    // =========
    #[error("Record decode error: {0}")]
    Decode(String),

    // =========
    // Database
    // =========
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    // =========
    // Application-domain errors
    // =========
    #[error("Writer drain deadline exceeded: {0}")]
    DrainDeadline(String),

    #[error("Failed to spawn task: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
