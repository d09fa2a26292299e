//! Media playlists
//!
//! A media playlist is a header followed by segments. Every tag up to and
//! including an `EXTINF` belongs to that segment; `EXT-X-MAP` and
//! `EXT-X-KEY` stay in effect for the segments after it until replaced.

use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::file::{File, INF_TAG, KEY_TAG, MAP_TAG};
use super::{decode_tags, Kind};
use crate::codec::{self, shape, tag_value, Scalar, Shaped, TagValue};
use crate::error::{PlaylistError, Result};
use crate::m3u::{Tag, Value};
use crate::path::path_of;

const ENDLIST_TAG: &str = "EXT-X-ENDLIST";

/// `EXT-X-PLAYLIST-TYPE`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaylistType {
    /// Sliding window, no type tag
    #[default]
    Live,
    /// Append-only
    Event,
    /// Immutable
    Vod,
}

impl Scalar for PlaylistType {
    fn parse(text: &str) -> Self {
        match text.trim() {
            "VOD" => PlaylistType::Vod,
            "EVENT" => PlaylistType::Event,
            _ => PlaylistType::Live,
        }
    }

    fn format(&self) -> String {
        String::from(match self {
            PlaylistType::Live => "",
            PlaylistType::Event => "EVENT",
            PlaylistType::Vod => "VOD",
        })
    }

    fn is_zero(&self) -> bool {
        *self == PlaylistType::Live
    }
}

impl TagValue for PlaylistType {
    fn decode_tag(&mut self, tag: &Tag) {
        *self = PlaylistType::parse(tag.value(""));
    }

    fn encode_tag(&self, tag: &mut Tag) {
        tag.args.push(Value::new(self.format()));
    }

    fn is_empty(&self) -> bool {
        self.is_zero()
    }
}

/// `EXT-X-START`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Start {
    /// Seconds; negative values count from the end of the playlist.
    pub offset: f64,
    pub precise: bool,
}

shape! {
    Start {
        attr offset = "TIME-OFFSET";
        attr precise = "PRECISE" [omit_empty];
    }
}

tag_value!(Start);

/// Playlist-wide tags of a media playlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaHeader {
    pub m3u: bool,
    pub version: u32,
    pub independent: bool,
    #[serde(rename = "type")]
    pub kind: PlaylistType,
    pub target: Duration,
    #[serde(skip_serializing_if = "TagValue::is_empty")]
    pub start: Start,
    pub sequence: u64,
    pub discontinuity: u64,
    pub end: bool,
}

shape! {
    MediaHeader {
        tag m3u = "EXTM3U";
        tag version = "EXT-X-VERSION";
        tag independent = "EXT-X-INDEPENDENT-SEGMENTS" [omit_empty];
        tag kind = "EXT-X-PLAYLIST-TYPE" [omit_empty];
        tag target = "EXT-X-TARGETDURATION" [omit_empty];
        tag start = "EXT-X-START" [omit_empty];
        tag sequence = "EXT-X-MEDIA-SEQUENCE" [omit_empty];
        tag discontinuity = "EXT-X-DISCONTINUITY-SEQUENCE" [omit_empty];
        tag end = "EXT-X-ENDLIST" [omit_empty];
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Media {
    #[serde(flatten)]
    pub header: MediaHeader,
    pub files: Vec<File>,
    /// Where the playlist was fetched from. Not part of the encoding.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl Media {
    /// Read and decode a media playlist.
    ///
    /// Fails with [`PlaylistError::TypeMismatch`] when the input is a
    /// master playlist.
    pub fn decode<R: Read>(reader: R) -> Result<Media> {
        let (tags, kind) = decode_tags(reader)?;
        if kind != Kind::Media {
            return Err(PlaylistError::TypeMismatch {
                expected: Kind::Media,
                found: kind,
            });
        }
        Media::from_tags(&tags)
    }

    /// Decode already tokenized tags.
    pub fn from_tags(tags: &[Tag]) -> Result<Media> {
        let mut media = Media::default();
        codec::unmarshal(&mut media.header, tags);
        if !media.header.m3u {
            tracing::warn!("media playlist without EXTM3U header");
            return Err(PlaylistError::HeaderMissing);
        }

        let header = MediaHeader::shape();
        let mut start = 0;
        let mut file = File::default();
        for (i, tag) in tags.iter().enumerate() {
            if tag.name != INF_TAG {
                continue;
            }
            let window = tags[start..=i]
                .iter()
                .filter(|t| header.get(&t.name).is_none());
            codec::unmarshal(&mut file, window);
            start = i + 1;
            let next = file.carry_forward();
            media.files.push(std::mem::replace(&mut file, next));
        }

        if media.files.is_empty() {
            tracing::warn!("media playlist without segments");
            return Err(PlaylistError::EmptyPlaylist);
        }
        tracing::debug!(
            segments = media.files.len(),
            runtime = ?runtime(&media.files),
            "media playlist decoded"
        );
        Ok(media)
    }

    /// Encode the header, then every segment. `EXT-X-ENDLIST` goes last.
    /// `EXT-X-MAP` and `EXT-X-KEY` are only written where they change.
    pub fn encode_tags(&self) -> Vec<Tag> {
        let mut tags = codec::marshal(&self.header);
        let trailer = if tags.last().map_or(false, |t| t.name == ENDLIST_TAG) {
            tags.pop()
        } else {
            None
        };
        let mut prev: Option<&File> = None;
        for file in &self.files {
            let mut segment = codec::marshal(file);
            if let Some(prev) = prev {
                segment.retain(|t| {
                    !((t.name == MAP_TAG && prev.map == file.map)
                        || (t.name == KEY_TAG && prev.key == file.key))
                });
            }
            tags.extend(segment);
            prev = Some(file);
        }
        tags.extend(trailer);
        tags
    }

    /// Write the playlist, one tag per line.
    pub fn encode<W: Write>(&self, mut w: W) -> Result<()> {
        for tag in self.encode_tags() {
            writeln!(w, "{}", tag)?;
        }
        Ok(())
    }

    /// The most recent segment.
    pub fn current(&self) -> Option<&File> {
        self.files.last()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Drop segments from the end while their durations fit in `target`.
    /// Bounds the window kept for DVR.
    pub fn trunc(mut self, target: Duration) -> Media {
        let mut left = target;
        while let Some(last) = self.files.last() {
            match left.checked_sub(last.duration(Duration::ZERO)) {
                Some(rest) => left = rest,
                None => break,
            }
            self.files.pop();
        }
        self
    }

    pub fn path(&self, parent: &str) -> String {
        path_of(parent, &self.url)
    }
}

impl fmt::Display for Media {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for tag in self.encode_tags() {
            writeln!(f, "{}", tag)?;
        }
        Ok(())
    }
}

/// Cumulative duration of `files`, saturating at `Duration::MAX`.
pub fn runtime(files: &[File]) -> Duration {
    files
        .iter()
        .fold(Duration::ZERO, |total, f| total.saturating_add(f.inf.duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::file::Inf;

    fn segment(secs: u64) -> File {
        File {
            inf: Inf {
                duration: Duration::from_secs(secs),
                url: format!("{}.ts", secs),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_playlist_type() {
        assert_eq!(PlaylistType::parse("VOD"), PlaylistType::Vod);
        assert_eq!(PlaylistType::parse("EVENT"), PlaylistType::Event);
        assert_eq!(PlaylistType::parse("junk"), PlaylistType::Live);
        assert_eq!(PlaylistType::Event.format(), "EVENT");
    }

    #[test]
    fn test_trunc() {
        let media = Media {
            files: vec![segment(10), segment(8), segment(10), segment(10)],
            ..Default::default()
        };
        let cut = media.clone().trunc(Duration::from_secs(15));
        assert_eq!(cut.len(), 3);
        assert_eq!(cut.files, media.files[..3]);

        let cut = media.clone().trunc(Duration::from_secs(20));
        assert_eq!(cut.len(), 2);

        let cut = media.clone().trunc(Duration::ZERO);
        assert_eq!(cut.len(), 4);
    }

    #[test]
    fn test_runtime() {
        let files = vec![segment(10), segment(8)];
        assert_eq!(runtime(&files), Duration::from_secs(18));
        assert_eq!(runtime(&[]), Duration::ZERO);
    }

    #[test]
    fn test_runtime_saturates() {
        let input = "#EXTM3U\n#EXTINF:1e19,\na.ts\n#EXTINF:1e19,\nb.ts\n";
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let media = tracing::subscriber::with_default(subscriber, || {
            Media::decode(input.as_bytes()).expect("decode")
        });
        assert_eq!(media.len(), 2);
        assert_eq!(media.files[0].inf.duration, Duration::from_secs(10_000_000_000_000_000_000));
        assert_eq!(runtime(&media.files), Duration::MAX);
    }

    #[test]
    fn test_version_always_written() {
        let media = Media {
            header: MediaHeader {
                m3u: true,
                ..Default::default()
            },
            files: vec![segment(4)],
            ..Default::default()
        };
        let names: Vec<String> = media.encode_tags().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["EXTM3U", "EXT-X-VERSION", "EXTINF"]);
    }

    #[test]
    fn test_current() {
        let mut media = Media::default();
        assert!(media.current().is_none());
        media.files.push(segment(4));
        media.files.push(segment(6));
        assert_eq!(media.current().map(|f| f.inf.duration), Some(Duration::from_secs(6)));
    }

    #[test]
    fn test_start_offset_signed() {
        let mut start = Start::default();
        let tags = crate::m3u::parse("#EXT-X-START:TIME-OFFSET=-12.5,PRECISE=YES".as_bytes())
            .expect("read");
        start.decode_tag(&tags[0]);
        assert_eq!(start.offset, -12.5);
        assert!(start.precise);
    }
}
