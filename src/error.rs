use std::path::PathBuf;

/// Conditions the presentation side has to branch on. Row-level problems
/// never surface here; they only shrink the dataset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StationError {
    /// The station's source could not be opened or parsed.
    #[error("station '{station}' is unavailable ({}): {reason}", .path.display())]
    SourceUnavailable {
        station: String,
        path: PathBuf,
        reason: String,
    },

    #[error("unknown station '{0}'")]
    UnknownStation(String),
}
