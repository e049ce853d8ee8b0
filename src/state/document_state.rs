/// Document state definitions for the two-phase attach protocol
///
/// A document is only attachable to the tree once its downloadable artifact
/// has been confirmed.
use std::fmt;

/// Represents the current state of a document in the resolution process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentState {
    // ===== Active States =====
    /// Reserved in the registry; the book page has not been parsed yet
    PendingMetadata,

    /// Metadata parsed; waiting for the download confirmation page
    PendingDownloadLink,

    // ===== Terminal States =====
    /// Artifact locator found; the document may be attached to parents
    Confirmed,

    /// No retrievable artifact; never attached
    Discarded,
}

impl DocumentState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Discarded)
    }

    /// Returns true if the document is still being resolved
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PendingMetadata | Self::PendingDownloadLink)
    }

    /// Returns true if the document may appear in a parent's children
    pub fn is_attachable(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    ///
    /// ```text
    /// PendingMetadata -> PendingDownloadLink -> Confirmed
    ///        |                   |
    ///        +-------------------+----------> Discarded
    /// ```
    pub fn can_transition_to(&self, next: DocumentState) -> bool {
        matches!(
            (self, next),
            (Self::PendingMetadata, Self::PendingDownloadLink)
                | (Self::PendingMetadata, Self::Discarded)
                | (Self::PendingDownloadLink, Self::Confirmed)
                | (Self::PendingDownloadLink, Self::Discarded)
        )
    }

    /// Stable lowercase name used in logs and exported summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingMetadata => "pending_metadata",
            Self::PendingDownloadLink => "pending_download_link",
            Self::Confirmed => "confirmed",
            Self::Discarded => "discarded",
        }
    }

    /// Returns all possible document states
    pub fn all_states() -> [Self; 4] {
        [
            Self::PendingMetadata,
            Self::PendingDownloadLink,
            Self::Confirmed,
            Self::Discarded,
        ]
    }
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!DocumentState::PendingMetadata.is_terminal());
        assert!(!DocumentState::PendingDownloadLink.is_terminal());
        assert!(DocumentState::Confirmed.is_terminal());
        assert!(DocumentState::Discarded.is_terminal());
    }

    #[test]
    fn test_only_confirmed_is_attachable() {
        for state in DocumentState::all_states() {
            assert_eq!(
                state.is_attachable(),
                state == DocumentState::Confirmed,
                "{}",
                state
            );
        }
    }

    #[test]
    fn test_legal_transitions() {
        use DocumentState::*;

        assert!(PendingMetadata.can_transition_to(PendingDownloadLink));
        assert!(PendingMetadata.can_transition_to(Discarded));
        assert!(PendingDownloadLink.can_transition_to(Confirmed));
        assert!(PendingDownloadLink.can_transition_to(Discarded));
    }

    #[test]
    fn test_illegal_transitions() {
        use DocumentState::*;

        // Confirmation must pass through the download-link phase
        assert!(!PendingMetadata.can_transition_to(Confirmed));

        // Terminal states never move
        for next in DocumentState::all_states() {
            assert!(!Confirmed.can_transition_to(next));
            assert!(!Discarded.can_transition_to(next));
        }

        assert!(!PendingDownloadLink.can_transition_to(PendingMetadata));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", DocumentState::PendingMetadata), "pending_metadata");
        assert_eq!(format!("{}", DocumentState::Confirmed), "confirmed");
    }
}
