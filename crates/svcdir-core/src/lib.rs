pub mod app_config;
pub mod config;
pub mod geo;
pub mod retry;
pub mod search_spec;
pub mod vocabulary;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::{haversine_miles, BoundingBox, Coordinates};
pub use retry::{is_transient_message, retry, RetryFailure, RetryPolicy};
pub use search_spec::{Page, SearchSpec, SortOrder, SpecMode};
pub use vocabulary::{
    load_vocabulary, validate_vocabulary, DefaultLocation, ModifierKind, ModifierPhrase, ProductTerm, SearchRadii,
    ServiceSynonyms, StateEntry, Vocabulary,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read vocabulary file {path}: {source}")]
    VocabularyFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse vocabulary file: {0}")]
    VocabularyFileParse(#[from] serde_yaml::Error),

    #[error("vocabulary validation failed: {0}")]
    VocabularyValidation(String),
}
