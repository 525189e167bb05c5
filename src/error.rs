use crate::offer::OfferStatus;

/// Error taxonomy for the negotiation core.
///
/// A transport boundary maps these onto stable responses: `Validation` ≈ 400,
/// `Authentication` ≈ 401, `Authorization` ≈ 403, `NotFound` ≈ 404,
/// `InvalidState`/`ConcurrentModification` ≈ 409, the rest ≈ 500.
#[derive(thiserror::Error, Debug)]
pub enum NegotiationError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("a staff identity is required for this action")]
    Authentication,

    // deliberately generic so callers cannot enumerate listings or offers
    #[error("not authorized to perform this action")]
    Authorization,

    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },

    #[error("offer is `{current}`, cannot move to `{requested}`")]
    InvalidState {
        current: OfferStatus,
        requested: OfferStatus,
    },

    #[error("record was modified concurrently, reload and retry")]
    ConcurrentModification,

    #[error(transparent)]
    Storage(#[from] sled::Error),

    #[error("storage encoding failed: {0}")]
    Encoding(String),
}

impl NegotiationError {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
