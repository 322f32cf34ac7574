use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to decode {document}: {source}")]
    Decode {
        document: &'static str,
        #[source]
        source:   serde_json::Error,
    },

    #[error("failed to encode {document}: {source}")]
    Encode {
        document: &'static str,
        #[source]
        source:   serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
