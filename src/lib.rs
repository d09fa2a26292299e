//! HLS playlist codec
//!
//! Decodes and encodes master and media playlists in the m3u8 format,
//! including the common ad-insertion signaling tags.
//!
//! ```no_run
//! use hls_m3u8::{Playlist, Media};
//!
//! # fn main() -> hls_m3u8::Result<()> {
//! let media = Media::decode(std::fs::File::open("index.m3u8")?)?;
//! for file in &media.files {
//!     if file.is_ad() {
//!         println!("{} {}", file.cue().kind, file.inf.url);
//!     }
//! }
//! let playlist = Playlist::decode("#EXTM3U\n#EXTINF:4,\na.ts\n".as_bytes())?;
//! playlist.encode(std::io::stdout())?;
//! # Ok(())
//! # }
//! ```

pub(crate) mod codec;
pub(crate) mod error;
pub(crate) mod m3u;
pub(crate) mod path;
pub(crate) mod playlist;

#[cfg(test)]
pub(crate) mod tests;

pub use codec::{
    format_seconds, is_registered, marshal, parse_seconds, register_tag, unmarshal,
    unregister_tag, Extension, Extensions, Scalar, Shaped, TagValue,
};
pub use error::{PlaylistError, Result};
pub use m3u::{parse, Lexer, Tag, Value};
pub use path::{is_absolute, path_of};
pub use playlist::*;
