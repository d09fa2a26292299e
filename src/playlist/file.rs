//! Media segments
//!
//! A [`File`] is one `EXTINF` entry of a media playlist together with every
//! tag that applies to it.

use std::num::ParseIntError;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::ads::{Ad, Cue};
use crate::codec::{format_seconds, shape, tag_value, unmarshal_attrs, Extension, Extensions, TagValue};
use crate::m3u::{Tag, Value};
use crate::path::path_of;

pub(crate) const INF_TAG: &str = "EXTINF";
pub(crate) const MAP_TAG: &str = "EXT-X-MAP";
pub(crate) const KEY_TAG: &str = "EXT-X-KEY";

/// One media segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub discontinuous: bool,
    /// `EXT-X-PROGRAM-DATE-TIME`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "TagValue::is_empty")]
    pub time_map: TimeMap,
    #[serde(skip_serializing_if = "TagValue::is_empty")]
    pub range: Range,
    /// Init segment. Carried over from the previous segment when absent.
    #[serde(skip_serializing_if = "TagValue::is_empty")]
    pub map: Map,
    /// Carried over from the previous segment when absent.
    #[serde(skip_serializing_if = "TagValue::is_empty")]
    pub key: Key,
    #[serde(skip_serializing_if = "Tag::is_empty")]
    pub asset: Tag,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub placement_opp: bool,
    /// Only allocated when one of its tags is present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad: Option<Ad>,
    #[serde(skip_serializing_if = "Extensions::is_empty")]
    pub extra: Extensions,
    pub inf: Inf,
}

// The extension map precedes EXTINF: a tag written after it would belong
// to the next segment.
shape! {
    File {
        tag discontinuous = "EXT-X-DISCONTINUITY" [omit_empty];
        tag time = "EXT-X-PROGRAM-DATE-TIME" [omit_empty];
        tag time_map = "EXT-X-TIMESTAMP-MAP" [omit_empty];
        tag range = "EXT-X-BYTERANGE" [omit_empty];
        tag map = "EXT-X-MAP" [omit_empty];
        tag key = "EXT-X-KEY" [omit_empty];
        tag asset = "EXT-X-ASSET" [omit_empty];
        tag placement_opp = "EXT-X-PLACEMENT-OPPORTUNITY" [omit_empty];
        embed ad = "" [omit_empty];
        extra extra = "*" [omit_empty];
        tag inf = "EXTINF";
    }
}

impl File {
    /// Segment duration, or `target` when the segment has none.
    pub fn duration(&self, target: Duration) -> Duration {
        if self.inf.duration.is_zero() {
            target
        } else {
            self.inf.duration
        }
    }

    /// Media URL, resolved against the playlist path `parent`.
    pub fn path(&self, parent: &str) -> String {
        path_of(parent, &self.inf.url)
    }

    /// The sticky fields of this segment, as the starting point of the
    /// next one.
    pub fn carry_forward(&self) -> File {
        File {
            map: self.map.clone(),
            key: self.key.clone(),
            ..Default::default()
        }
    }

    /// Whether the segment is inside an ad break. See [`Ad::is_ad`].
    pub fn is_ad(&self) -> bool {
        self.ad.as_ref().map_or(false, Ad::is_ad)
    }

    /// The active cue-out, cue-out-cont or cue-in. See [`Ad::cue`].
    pub fn cue(&self) -> Cue {
        self.ad.as_ref().map(Ad::cue).unwrap_or_default()
    }

    pub fn add_extra(&mut self, name: impl Into<String>, value: Extension) {
        self.extra.insert(name.into(), value);
    }
}

/// `EXTINF`: duration, optional title and the media URL line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inf {
    pub duration: Duration,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub url: String,
}

shape! {
    Inf {
        attr duration = "$1";
        attr description = "$2";
        attr url = "$file";
    }
}

/// The comma after the duration is always written, as players expect it.
impl TagValue for Inf {
    fn decode_tag(&mut self, tag: &Tag) {
        unmarshal_attrs(self, tag);
    }

    fn encode_tag(&self, tag: &mut Tag) {
        tag.args = vec![
            Value::new(format_seconds(self.duration)),
            Value::new(self.description.as_str()),
        ];
        tag.lines.push(self.url.clone());
    }

    fn is_empty(&self) -> bool {
        self.duration.is_zero() && self.description.is_empty() && self.url.is_empty()
    }
}

/// `EXT-X-KEY`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Key {
    pub method: String,
    pub uri: String,
    pub iv: String,
    pub format: String,
    pub versions: String,
}

shape! {
    Key {
        attr method = "METHOD" [noquote];
        attr uri = "URI" [omit_empty];
        attr iv = "IV" [noquote, omit_empty];
        attr format = "KEYFORMAT" [omit_empty];
        attr versions = "KEYFORMATVERSIONS" [omit_empty];
    }
}

impl Key {
    pub fn path(&self, parent: &str) -> String {
        path_of(parent, &self.uri)
    }
}

/// `EXT-X-MAP`, the init segment of fragmented MP4 streams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Map {
    pub uri: String,
    pub byterange: String,
}

shape! {
    Map {
        attr uri = "URI" [omit_empty];
        attr byterange = "BYTERANGE" [omit_empty];
    }
}

impl Map {
    pub fn path(&self, parent: &str) -> String {
        path_of(parent, &self.uri)
    }
}

/// `EXT-X-BYTERANGE:<n>[@<o>]`, kept as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range(pub String);

shape! {
    Range {
        attr 0 = "";
    }
}

impl Range {
    /// Returns `(offset, size)`. Without an explicit offset the range
    /// starts at `next`, the byte after the previous range.
    pub fn value(&self, next: u64) -> Result<(u64, u64), ParseIntError> {
        let (size, offset) = match self.0.split_once('@') {
            Some((size, offset)) => (size, Some(offset)),
            None => (self.0.as_str(), None),
        };
        let size = size.trim().parse()?;
        let offset = match offset {
            Some(o) => o.trim().parse()?,
            None => next,
        };
        Ok((offset, size))
    }
}

/// `EXT-X-TIMESTAMP-MAP`. `LOCAL` is kept as written since producers
/// disagree on its format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeMap {
    pub mpeg: i64,
    pub local: String,
}

shape! {
    TimeMap {
        attr mpeg = "MPEGTS";
        attr local = "LOCAL" [noquote, omit_empty];
    }
}

tag_value!(Key, Map, Range, TimeMap);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{marshal, unmarshal, Shaped};
    use crate::m3u::parse;

    fn file(input: &str) -> File {
        let tags = parse(input.as_bytes()).expect("read");
        let mut f = File::default();
        unmarshal(&mut f, &tags);
        f
    }

    fn encode(f: &File) -> Vec<String> {
        marshal(f).iter().map(Tag::to_string).collect()
    }

    #[test]
    fn test_decode_segment() {
        let f = file(
            "#EXT-X-DISCONTINUITY\n\
             #EXT-X-PROGRAM-DATE-TIME:2021-01-11T07:59:41.005Z\n\
             #EXT-X-KEY:METHOD=AES-128,URI=\"https://keys/k1\",IV=0x1A2B\n\
             #EXT-X-MAP:URI=\"init.mp4\"\n\
             #EXTINF:10.0,title\n\
             seg.ts",
        );
        assert!(f.discontinuous);
        assert!(f.time.is_some());
        assert_eq!(f.key.method, "AES-128");
        assert_eq!(f.key.uri, "https://keys/k1");
        assert_eq!(f.key.iv, "0x1A2B");
        assert_eq!(f.map.uri, "init.mp4");
        assert_eq!(f.inf.duration, Duration::from_secs(10));
        assert_eq!(f.inf.description, "title");
        assert_eq!(f.inf.url, "seg.ts");
        assert!(f.ad.is_none());
    }

    #[test]
    fn test_degenerate_inf() {
        let f = file("#EXTINF:10.0,\nfile");
        assert_eq!(
            f.inf,
            Inf {
                duration: Duration::from_secs(10),
                description: String::new(),
                url: "file".into(),
            }
        );
    }

    #[test]
    fn test_encode_segment() {
        let f = file(
            "#EXT-X-KEY:METHOD=AES-128,URI=\"k\",IV=0x1A2B\n\
             #EXT-X-BYTERANGE:1024@0\n\
             #EXTINF:2.5,\n\
             seg.ts",
        );
        assert_eq!(
            encode(&f),
            vec![
                "#EXT-X-BYTERANGE:1024@0",
                "#EXT-X-KEY:METHOD=AES-128,URI=\"k\",IV=0x1A2B",
                "#EXTINF:2.5,\nseg.ts",
            ]
        );
    }

    #[test]
    fn test_ad_allocated_on_demand() {
        let f = file("#EXT-X-CUE-OUT:30\n#EXTINF:10,\na.ts");
        assert!(f.ad.is_some());
        assert!(f.is_ad());
        assert_eq!(f.cue().duration, Duration::from_secs(30));
        assert_eq!(
            encode(&f),
            vec!["#EXT-X-CUE-OUT:DURATION=30", "#EXTINF:10,\na.ts"]
        );

        let f = file("#EXTINF:10,\na.ts");
        assert!(!f.is_ad());
        assert_eq!(f.cue(), Cue::default());
    }

    #[test]
    fn test_carry_forward() {
        let f = file("#EXT-X-MAP:URI=\"init.mp4\"\n#EXT-X-KEY:METHOD=NONE\n#EXT-X-DISCONTINUITY\n#EXTINF:4,\na.ts");
        let next = f.carry_forward();
        assert_eq!(next.map, f.map);
        assert_eq!(next.key, f.key);
        assert!(!next.discontinuous);
        assert_eq!(next.inf, Inf::default());
    }

    #[test]
    fn test_duration_fallback() {
        let f = File::default();
        assert_eq!(f.duration(Duration::from_secs(6)), Duration::from_secs(6));
        let f = file("#EXTINF:4,\na.ts");
        assert_eq!(f.duration(Duration::from_secs(6)), Duration::from_secs(4));
    }

    #[test]
    fn test_range_value() {
        assert_eq!(Range("1024@512".into()).value(0), Ok((512, 1024)));
        assert_eq!(Range("1024".into()).value(2048), Ok((2048, 1024)));
        assert!(Range("x@1".into()).value(0).is_err());
    }

    #[test]
    fn test_asset_kept_verbatim() {
        let f = file("#EXT-X-ASSET:CAID=0x0000000020FB6501\n#EXTINF:4,\na.ts");
        assert_eq!(f.asset.flag("CAID"), "0x0000000020FB6501");
        assert_eq!(encode(&f)[0], "#EXT-X-ASSET:CAID=0x0000000020FB6501");
    }

    #[test]
    fn test_paths() {
        let f = file("#EXT-X-MAP:URI=\"init.mp4\"\n#EXTINF:4,\nsegs/a.ts");
        assert_eq!(f.path("http://cdn/live/index.m3u8"), "http://cdn/live/segs/a.ts");
        assert_eq!(f.map.path("http://cdn/live/"), "http://cdn/live/init.mp4");
    }

    #[test]
    fn test_ad_bindings_are_embedded() {
        let shape = File::shape();
        let cue = shape.get("EXT-X-CUE-OUT").expect("bound");
        assert!(cue.embedded);
        assert!(!cue.aggregate);
        assert!(format!("{:?}", cue).contains("embedded: true"));
        assert!(shape.get("EXT-X-KEY").map_or(false, |b| !b.embedded));
    }
}
