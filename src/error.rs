use thiserror::Error;

use crate::playlist::Kind;

/// Main error type for playlist decoding and encoding
#[derive(Error, Debug)]
pub enum PlaylistError {
    /// A standard I/O error from the underlying reader or writer
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The `#EXTM3U` format marker was not found
    #[error("hls: no m3u8 tag")]
    HeaderMissing,

    /// The playlist is well-formed but has no variants or segments
    #[error("hls: empty playlist")]
    EmptyPlaylist,

    /// A master playlist was decoded as media, or the other way around
    #[error("hls: playlist type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: Kind, found: Kind },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, PlaylistError>;
