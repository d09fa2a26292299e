//! HLS playlist model
//!
//! This module turns tokenized m3u tags into playlists:
//! - classification of a tag stream as master or media
//! - master playlists (variants, renditions, content steering)
//! - media playlists (header, segments, sticky map/key)
//! - ad-insertion signaling attached to segments

pub mod ads;
pub mod file;
pub mod master;
pub mod media;

use std::fmt;
use std::io::{BufReader, Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::m3u::{self, Tag};

pub use ads::{Ad, Cue, CueAdobe, CueKind, DateRange, Scte35};
pub use file::{File, Inf, Key, Map, Range, TimeMap};
pub use master::{Master, MediaInfo, Resolution, Steering, StreamInfo};
pub use media::{runtime, Media, MediaHeader, PlaylistType, Start};

/// Playlist flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Master,
    Media,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Kind::Master => "master",
            Kind::Media => "media",
        })
    }
}

/// Classify tags by the first tag that only one flavour carries. A stream
/// with neither is an empty live media playlist.
pub fn classify(tags: &[Tag]) -> Kind {
    for tag in tags {
        match tag.name.as_str() {
            "EXT-X-MEDIA" | "EXT-X-STREAM-INF" | "EXT-X-I-FRAME-STREAM-INF" => return Kind::Master,
            file::INF_TAG => return Kind::Media,
            _ => {}
        }
    }
    Kind::Media
}

/// Tokenize a playlist and classify it.
pub fn decode_tags<R: Read>(reader: R) -> Result<(Vec<Tag>, Kind)> {
    let tags = m3u::parse(BufReader::new(reader))?;
    let kind = classify(&tags);
    tracing::debug!(tags = tags.len(), %kind, "playlist classified");
    Ok((tags, kind))
}

/// A decoded playlist of either flavour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Playlist {
    Master(Master),
    Media(Media),
}

impl Playlist {
    /// Read, classify and decode a playlist.
    pub fn decode<R: Read>(reader: R) -> Result<Playlist> {
        let (tags, kind) = decode_tags(reader)?;
        Playlist::from_tags(&tags, kind)
    }

    pub fn from_tags(tags: &[Tag], kind: Kind) -> Result<Playlist> {
        Ok(match kind {
            Kind::Master => Playlist::Master(Master::from_tags(tags)?),
            Kind::Media => Playlist::Media(Media::from_tags(tags)?),
        })
    }

    pub fn kind(&self) -> Kind {
        match self {
            Playlist::Master(_) => Kind::Master,
            Playlist::Media(_) => Kind::Media,
        }
    }

    pub fn encode_tags(&self) -> Vec<Tag> {
        match self {
            Playlist::Master(m) => m.encode_tags(),
            Playlist::Media(m) => m.encode_tags(),
        }
    }

    pub fn encode<W: Write>(&self, w: W) -> Result<()> {
        match self {
            Playlist::Master(m) => m.encode(w),
            Playlist::Media(m) => m.encode(w),
        }
    }
}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Playlist::Master(m) => fmt::Display::fmt(m, f),
            Playlist::Media(m) => fmt::Display::fmt(m, f),
        }
    }
}

impl From<Master> for Playlist {
    fn from(m: Master) -> Self {
        Playlist::Master(m)
    }
}

impl From<Media> for Playlist {
    fn from(m: Media) -> Self {
        Playlist::Media(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(input: &str) -> Kind {
        decode_tags(input.as_bytes()).expect("read").1
    }

    #[test]
    fn test_classify() {
        assert_eq!(kind_of("#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\na.m3u8"), Kind::Master);
        assert_eq!(kind_of("#EXTM3U\n#EXT-X-MEDIA:TYPE=AUDIO"), Kind::Master);
        assert_eq!(kind_of("#EXTM3U\n#EXTINF:4,\na.ts"), Kind::Media);
        assert_eq!(kind_of(""), Kind::Media);
        assert_eq!(kind_of("#EXTM3U\n#EXT-X-TARGETDURATION:4"), Kind::Media);
    }

    #[test]
    fn test_classify_first_wins() {
        assert_eq!(
            kind_of("#EXTM3U\n#EXTINF:4,\na.ts\n#EXT-X-STREAM-INF:BANDWIDTH=1\nb.m3u8"),
            Kind::Media
        );
        assert_eq!(
            kind_of("#EXTM3U\n#EXT-X-I-FRAME-STREAM-INF:URI=\"i.m3u8\"\n#EXTINF:4,\na.ts"),
            Kind::Master
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(Kind::Master.to_string(), "master");
        assert_eq!(Kind::Media.to_string(), "media");
    }
}
