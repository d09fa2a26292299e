//! Master playlists
//!
//! A master playlist lists the variant streams of a presentation and the
//! renditions (audio, subtitles, captions) they reference by group id.
//! By convention it does not change once published.

use std::fmt;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use super::{decode_tags, Kind};
use crate::codec::{self, shape, tag_value, Scalar};
use crate::error::{PlaylistError, Result};
use crate::m3u::Tag;
use crate::path::path_of;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Master {
    pub m3u: bool,
    pub version: u32,
    pub independent: bool,
    #[serde(skip_serializing_if = "codec::TagValue::is_empty")]
    pub steering: Steering,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaInfo>,
    pub streams: Vec<StreamInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub iframes: Vec<StreamInfo>,
    /// Where the playlist was fetched from. Not part of the encoding.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

shape! {
    Master {
        tag m3u = "EXTM3U";
        tag version = "EXT-X-VERSION";
        tag independent = "EXT-X-INDEPENDENT-SEGMENTS" [omit_empty];
        tag steering = "EXT-X-CONTENT-STEERING" [omit_empty];
        each media = "EXT-X-MEDIA" [omit_empty];
        each streams = "EXT-X-STREAM-INF" [omit_empty];
        each iframes = "EXT-X-I-FRAME-STREAM-INF" [omit_empty];
    }
}

impl Master {
    /// Read and decode a master playlist.
    ///
    /// Fails with [`PlaylistError::TypeMismatch`] when the input is a media
    /// playlist.
    pub fn decode<R: Read>(reader: R) -> Result<Master> {
        let (tags, kind) = decode_tags(reader)?;
        if kind != Kind::Master {
            return Err(PlaylistError::TypeMismatch {
                expected: Kind::Master,
                found: kind,
            });
        }
        Master::from_tags(&tags)
    }

    /// Decode already tokenized tags.
    pub fn from_tags(tags: &[Tag]) -> Result<Master> {
        let mut master = Master::default();
        codec::unmarshal(&mut master, tags);
        if !master.m3u {
            tracing::warn!("master playlist without EXTM3U header");
            return Err(PlaylistError::HeaderMissing);
        }
        if master.streams.is_empty() {
            tracing::warn!("master playlist without variant streams");
            return Err(PlaylistError::EmptyPlaylist);
        }
        tracing::debug!(
            streams = master.streams.len(),
            iframes = master.iframes.len(),
            renditions = master.media.len(),
            "master playlist decoded"
        );
        Ok(master)
    }

    pub fn encode_tags(&self) -> Vec<Tag> {
        codec::marshal(self)
    }

    /// Write the playlist, one tag per line.
    pub fn encode<W: Write>(&self, mut w: W) -> Result<()> {
        for tag in self.encode_tags() {
            writeln!(w, "{}", tag)?;
        }
        Ok(())
    }

    /// Number of variant streams, I-frame streams excluded.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn path(&self, parent: &str) -> String {
        path_of(parent, &self.url)
    }
}

impl fmt::Display for Master {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for tag in self.encode_tags() {
            writeln!(f, "{}", tag)?;
        }
        Ok(())
    }
}

/// `EXT-X-CONTENT-STEERING`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Steering {
    pub uri: String,
    pub pathway: String,
}

shape! {
    Steering {
        attr uri = "SERVER-URI" [omit_empty];
        attr pathway = "PATHWAY-ID" [omit_empty];
    }
}

impl Steering {
    pub fn path(&self, parent: &str) -> String {
        path_of(parent, &self.uri)
    }
}

/// `EXT-X-MEDIA`: one rendition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub group: String,
    pub name: String,
    pub stable_id: String,
    pub default: bool,
    pub autoselect: bool,
    pub characteristics: Vec<String>,
    pub codecs: Vec<String>,
    pub language: String,
    pub instream: String,
    pub bit_depth: u32,
    pub sample_rate: u32,
    pub channels: String,
    pub uri: String,
}

shape! {
    MediaInfo {
        attr kind = "TYPE" [noquote, omit_empty];
        attr group = "GROUP-ID" [omit_empty];
        attr name = "NAME" [omit_empty];
        attr stable_id = "STABLE-RENDITION-ID" [omit_empty];
        attr default = "DEFAULT";
        attr autoselect = "AUTOSELECT";
        attr characteristics = "CHARACTERISTICS";
        attr codecs = "CODECS" [omit_empty];
        attr language = "LANGUAGE" [omit_empty];
        attr instream = "INSTREAM-ID" [omit_empty];
        attr bit_depth = "BIT-DEPTH" [omit_empty];
        attr sample_rate = "SAMPLE-RATE" [omit_empty];
        attr channels = "CHANNELS" [omit_empty];
        attr uri = "URI" [omit_empty];
    }
}

impl MediaInfo {
    pub fn path(&self, parent: &str) -> String {
        path_of(parent, &self.uri)
    }
}

/// `EXT-X-STREAM-INF` or `EXT-X-I-FRAME-STREAM-INF`: one variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamInfo {
    /// Line following the tag. Regular variants only.
    pub url: String,
    pub program_id: u32,
    pub frame_rate: f64,
    pub bandwidth: u64,
    pub average_bandwidth: u64,
    pub codecs: Vec<String>,
    pub resolution: Resolution,
    pub video_range: String,
    pub hdcp: String,
    pub audio: String,
    pub video: String,
    pub subtitles: String,
    pub pathway: String,
    /// Quoted unless `NONE`
    pub closed_captions: String,
    /// I-frame variants only
    pub uri: String,
}

shape! {
    StreamInfo {
        attr url = "$file";
        attr program_id = "PROGRAM-ID" [omit_empty];
        attr frame_rate = "FRAME-RATE" [omit_empty];
        attr bandwidth = "BANDWIDTH" [omit_empty];
        attr average_bandwidth = "AVERAGE-BANDWIDTH" [omit_empty];
        attr codecs = "CODECS" [omit_empty];
        attr resolution = "RESOLUTION" [omit_empty];
        attr video_range = "VIDEO-RANGE" [noquote, omit_empty];
        attr hdcp = "HDCP-LEVEL" [noquote, omit_empty];
        attr audio = "AUDIO" [omit_empty];
        attr video = "VIDEO" [omit_empty];
        attr subtitles = "SUBTITLES" [omit_empty];
        attr pathway = "PATHWAY-ID" [omit_empty];
        attr closed_captions = "CLOSED-CAPTIONS" [unless_none, omit_empty];
        attr uri = "URI" [omit_empty];
    }
}

impl StreamInfo {
    /// Variant playlist location. I-frame variants carry it in `URI`.
    pub fn path(&self, parent: &str) -> String {
        if self.uri.is_empty() {
            path_of(parent, &self.url)
        } else {
            path_of(parent, &self.uri)
        }
    }
}

tag_value!(Steering, MediaInfo, StreamInfo);

/// Pixel size, written `WxH`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Scalar for Resolution {
    fn parse(text: &str) -> Self {
        text.split_once('x')
            .and_then(|(w, h)| Some(Resolution::new(w.trim().parse().ok()?, h.trim().parse().ok()?)))
            .unwrap_or_default()
    }

    fn format(&self) -> String {
        self.to_string()
    }

    fn is_zero(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
