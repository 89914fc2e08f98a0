pub mod assemble;
pub mod export;
pub mod market;
pub mod normalize;
pub mod records;
pub mod settings;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingEnvVar(String),

    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read market file {path}: {source}")]
    MarketFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse market file: {0}")]
    MarketFileParse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

pub use assemble::assemble;
pub use export::{write_csv, ExportError};
pub use market::{load_market, EndpointConfig, MarketConfig, NormalizationRule};
pub use normalize::{resolve_name, NormalizationTable};
pub use records::{ProductIndexEntry, ProductRecord, ProductType, NO_DATA};
pub use settings::{load_settings, CrawlerSettings};
