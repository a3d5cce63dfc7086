//! Errors raised while driving a playback session.

use thiserror::Error;

/// Errors from the playback engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// A command that requires an open archive arrived before `init`.
    #[error("playback session is not initialized")]
    NotInitialized,

    /// `get_frame`/`seek` named a slave absent from the requested frame.
    #[error("slave {slave_id} not present in frame {frame}")]
    SlaveNotPresent {
        /// Requested slave id.
        slave_id: i32,
        /// Requested frame id.
        frame: u32,
    },

    /// The underlying archive rejected the read.
    #[error("archive error: {0}")]
    Archive(String),
}

impl From<nodelink_archive::ArchiveError> for PlaybackError {
    fn from(error: nodelink_archive::ArchiveError) -> Self {
        Self::Archive(error.to_string())
    }
}
