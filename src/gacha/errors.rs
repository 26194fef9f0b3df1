use thiserror::Error;

/// Errors that can arise while running a gacha operation or touching the account store.
#[derive(Debug, Error)]
pub enum GachaError {
    /// Username absent or blank after trimming.
    #[error("missing username")]
    MissingUsername,

    /// Currency or shard balance below the required cost.
    #[error("not enough {resource} ({have}/{need})")]
    InsufficientFunds {
        resource: String,
        have: u64,
        need: u64,
    },

    /// Referenced instance id is not in the backpack.
    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    /// Attempted to sell or dismantle units that are on the team.
    #[error("cannot remove units that are on your team: {}", blocked.join(", "))]
    TeamConflict { blocked: Vec<String> },

    /// Level or ascension already at its ceiling.
    #[error("already at max {track} ({max})")]
    MaxTierReached { track: &'static str, max: u32 },

    /// Required identifier or list missing or malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Catalog seed failed validation.
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    /// Wrapper around IO errors (store files, directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around JSON serialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around sled's error type.
    #[cfg(feature = "sled-store")]
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[cfg(feature = "sled-store")]
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Internal error (poisoned locks, task join errors, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

impl GachaError {
    /// Short stable label used for metrics and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            GachaError::MissingUsername => "missing_username",
            GachaError::InsufficientFunds { .. } => "insufficient_funds",
            GachaError::InstanceNotFound(_) => "instance_not_found",
            GachaError::TeamConflict { .. } => "team_conflict",
            GachaError::MaxTierReached { .. } => "max_tier_reached",
            GachaError::InvalidRequest(_) => "invalid_request",
            GachaError::InvalidCatalog(_) => "invalid_catalog",
            GachaError::Io(_) => "io",
            GachaError::Json(_) => "json",
            #[cfg(feature = "sled-store")]
            GachaError::Sled(_) => "sled",
            #[cfg(feature = "sled-store")]
            GachaError::Bincode(_) => "bincode",
            GachaError::SchemaMismatch { .. } => "schema_mismatch",
            GachaError::Internal(_) => "internal",
        }
    }

    /// True for errors caused by the caller's request rather than the store or process.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GachaError::MissingUsername
                | GachaError::InsufficientFunds { .. }
                | GachaError::InstanceNotFound(_)
                | GachaError::TeamConflict { .. }
                | GachaError::MaxTierReached { .. }
                | GachaError::InvalidRequest(_)
        )
    }
}
