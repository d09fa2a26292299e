//! Ad-insertion signaling
//!
//! Several competing conventions mark ad breaks in media playlists:
//! - `EXT-X-CUE-OUT`, `EXT-X-CUE-OUT-CONT` and `EXT-X-CUE-IN` pairs
//! - `EXT-X-CUE` (Adobe Primetime)
//! - `EXT-X-SCTE35` and `EXT-X-DATERANGE`
//! - bare SCTE-35 splice strings in `EXT-X-SPLICEPOINT-SCTE35` and
//!   `EXT-OATCLS-SCTE35`
//!
//! SCTE-35 payloads are kept as opaque strings (base64, hex or binary).

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::codec::{format_seconds, parse_seconds, shape, tag_value, TagValue};
use crate::m3u::{Tag, Value};

/// Which cue tag a unified [`Cue`] came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueKind {
    #[default]
    None,
    In,
    Out,
    Cont,
}

impl CueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CueKind::None => "",
            CueKind::In => "in",
            CueKind::Out => "out",
            CueKind::Cont => "cont",
        }
    }
}

impl fmt::Display for CueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `EXT-X-CUE-OUT`, `EXT-X-CUE-OUT-CONT` or `EXT-X-CUE-IN`.
///
/// `id` carries the `BREAKID` attribute used by Google Ad Manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cue {
    #[serde(skip_serializing_if = "Duration::is_zero")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Duration::is_zero")]
    pub elapsed: Duration,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scte35: String,
    /// The tag was present
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub set: bool,
    pub kind: CueKind,
}

impl Cue {
    /// A cue is active when its tag was seen or it carries a duration.
    pub fn is_ad(&self) -> bool {
        self.set || !self.duration.is_zero()
    }
}

/// Duration is the first non-zero positional field (`#EXT-X-CUE-OUT:30`),
/// falling back to the `DURATION` attribute.
impl TagValue for Cue {
    fn decode_tag(&mut self, tag: &Tag) {
        let duration = tag
            .args
            .iter()
            .map(|v| parse_seconds(&v.text))
            .find(|d| !d.is_zero())
            .unwrap_or_else(|| parse_seconds(tag.flag("DURATION")));
        self.duration = duration;
        self.elapsed = parse_seconds(tag.flag("ELAPSEDTIME"));
        self.id = tag.flag("BREAKID").to_string();
        self.scte35 = tag.flag("SCTE35").to_string();
        self.set = true;
    }

    fn encode_tag(&self, tag: &mut Tag) {
        if !self.duration.is_zero() {
            tag.insert("DURATION", Value::new(format_seconds(self.duration)));
        }
        if !self.id.is_empty() {
            tag.insert("BREAKID", Value::new(self.id.as_str()));
        }
        if !self.elapsed.is_zero() {
            tag.insert("ELAPSEDTIME", Value::new(format_seconds(self.elapsed)));
        }
        if !self.scte35.is_empty() {
            tag.insert("SCTE35", Value::new(self.scte35.as_str()));
        }
    }

    fn is_empty(&self) -> bool {
        !self.set
            && self.duration.is_zero()
            && self.elapsed.is_zero()
            && self.id.is_empty()
            && self.scte35.is_empty()
    }
}

/// `EXT-X-CUE`, as written by Adobe Primetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CueAdobe {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub duration: Duration,
    pub time: Duration,
    pub elapsed: Duration,
}

shape! {
    CueAdobe {
        attr id = "ID" [omit_empty];
        attr kind = "TYPE" [omit_empty];
        attr duration = "DURATION" [omit_empty];
        attr time = "TIME" [omit_empty];
        attr elapsed = "ELAPSED" [omit_empty];
    }
}

/// `EXT-X-SCTE35`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scte35 {
    pub id: String,
    pub cue: String,
    pub duration: Duration,
    pub elapsed: Duration,
    pub time: Duration,
    #[serde(rename = "type")]
    pub kind: i64,
    pub upid: String,
    pub blackout: String,
    pub cue_in: String,
    pub cue_out: String,
    pub segne: String,
}

impl Scte35 {
    /// Whether this marks a cue-in or cue-out point.
    pub fn is_ad(&self) -> bool {
        !self.cue_in.is_empty() || !self.cue_out.is_empty()
    }
}

shape! {
    Scte35 {
        attr id = "ID" [omit_empty];
        attr cue = "CUE" [omit_empty];
        attr duration = "DURATION" [omit_empty];
        attr elapsed = "ELAPSED" [omit_empty];
        attr time = "TIME" [omit_empty];
        attr kind = "TYPE" [omit_empty];
        attr upid = "UPID" [omit_empty];
        attr blackout = "BLACKOUT" [omit_empty];
        attr cue_in = "CUE-IN" [omit_empty];
        attr cue_out = "CUE-OUT" [omit_empty];
        attr segne = "SEGNE" [omit_empty];
    }
}

/// `EXT-X-DATERANGE`, the standard HLS way to signal a break.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    pub id: String,
    pub class: String,
    pub start: Option<DateTime<FixedOffset>>,
    pub cue: String,
    pub end: Option<DateTime<FixedOffset>>,
    pub duration: Duration,
    pub planned: Duration,
    pub cue_in: String,
    pub cue_out: String,
    pub cmd: String,
    pub end_on_next: bool,
}

impl DateRange {
    /// Whether this marks a cue-in or cue-out point.
    pub fn is_ad(&self) -> bool {
        !self.cue_in.is_empty() || !self.cue_out.is_empty()
    }
}

// SCTE35-* carry hexadecimal sequences, which are never quoted.
shape! {
    DateRange {
        attr id = "ID" [omit_empty];
        attr class = "CLASS" [omit_empty];
        attr start = "START-DATE" [omit_empty];
        attr cue = "CUE" [omit_empty];
        attr end = "END-DATE" [omit_empty];
        attr duration = "DURATION" [omit_empty];
        attr planned = "PLANNED-DURATION" [omit_empty];
        attr cue_in = "SCTE35-IN" [noquote, omit_empty];
        attr cue_out = "SCTE35-OUT" [noquote, omit_empty];
        attr cmd = "SCTE35-CMD" [noquote, omit_empty];
        attr end_on_next = "END-ON-NEXT" [omit_empty];
    }
}

tag_value!(CueAdobe, Scte35, DateRange);

/// Every ad-related tag a segment may carry. A segment only has one of
/// these when at least one of the tags was present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ad {
    #[serde(skip_serializing_if = "TagValue::is_empty")]
    pub cue_out: Cue,
    #[serde(skip_serializing_if = "TagValue::is_empty")]
    pub cue_cont: Cue,
    #[serde(skip_serializing_if = "TagValue::is_empty")]
    pub cue_in: Cue,
    #[serde(skip_serializing_if = "TagValue::is_empty")]
    pub cue_adobe: CueAdobe,
    #[serde(skip_serializing_if = "TagValue::is_empty")]
    pub scte35: Scte35,
    #[serde(skip_serializing_if = "TagValue::is_empty")]
    pub date_range: DateRange,
    /// `EXT-X-SPLICEPOINT-SCTE35`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub splice: String,
    /// `EXT-OATCLS-SCTE35`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub oatcls_splice: String,
}

shape! {
    Ad {
        tag cue_out = "EXT-X-CUE-OUT" [omit_empty];
        tag cue_cont = "EXT-X-CUE-OUT-CONT" [omit_empty];
        tag cue_in = "EXT-X-CUE-IN" [omit_empty];
        tag cue_adobe = "EXT-X-CUE" [omit_empty];
        tag scte35 = "EXT-X-SCTE35" [omit_empty];
        tag date_range = "EXT-X-DATERANGE" [omit_empty];
        tag splice = "EXT-X-SPLICEPOINT-SCTE35" [omit_empty];
        tag oatcls_splice = "EXT-OATCLS-SCTE35" [omit_empty];
    }
}

impl Ad {
    /// Whether the cue-out or cue-out-cont tag is active. A lone
    /// `EXT-X-CUE-IN` does not count.
    pub fn is_ad(&self) -> bool {
        self.cue_out.is_ad() || self.cue_cont.is_ad() || self.cue_out.is_ad()
    }

    /// The active cue, by priority out, cont, in, stamped with its kind.
    /// A cue without its own SCTE-35 payload borrows the OATCLS splice,
    /// else the splice point.
    pub fn cue(&self) -> Cue {
        let candidates = [
            (&self.cue_out, CueKind::Out),
            (&self.cue_cont, CueKind::Cont),
            (&self.cue_in, CueKind::In),
        ];
        let Some((cue, kind)) = candidates.into_iter().find(|(c, _)| c.is_ad()) else {
            return self.cue_in.clone();
        };
        let mut cue = Cue {
            set: true,
            kind,
            ..cue.clone()
        };
        if cue.scte35.is_empty() {
            if let Some(splice) = [&self.oatcls_splice, &self.splice]
                .into_iter()
                .find(|s| !s.is_empty())
            {
                cue.scte35 = splice.clone();
            }
        }
        cue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{marshal, unmarshal};
    use crate::m3u::parse;

    fn ad(input: &str) -> Ad {
        let tags = parse(input.as_bytes()).expect("read");
        let mut ad = Ad::default();
        unmarshal(&mut ad, &tags);
        ad
    }

    #[test]
    fn test_cue_positional_duration() {
        let ad = ad("#EXT-X-CUE-OUT:30.5");
        assert_eq!(ad.cue_out.duration, Duration::from_millis(30500));
        assert!(ad.cue_out.set);
    }

    #[test]
    fn test_cue_attributes() {
        let ad = ad(r#"#EXT-X-CUE-OUT-CONT:DURATION="120",ELAPSEDTIME=6,BREAKID=b1,SCTE35=/DAlAAAAAyiYAP/wFAUAAIMRf+/+0bb+Av4AUmNiAAEBAQAAM5uUog=="#);
        let cue = &ad.cue_cont;
        assert_eq!(cue.duration, Duration::from_secs(120));
        assert_eq!(cue.elapsed, Duration::from_secs(6));
        assert_eq!(cue.id, "b1");
        assert_eq!(
            cue.scte35,
            "/DAlAAAAAyiYAP/wFAUAAIMRf+/+0bb+Av4AUmNiAAEBAQAAM5uUog=="
        );
    }

    #[test]
    fn test_cue_in_without_fields_is_active() {
        let ad = ad("#EXT-X-CUE-IN");
        assert!(ad.cue_in.set);
        assert!(ad.cue_in.is_ad());
    }

    #[test]
    fn test_is_ad_ignores_lone_cue_in() {
        let ad = ad("#EXT-X-CUE-IN");
        assert!(!ad.is_ad());
        assert_eq!(ad.cue().kind, CueKind::In);
    }

    #[test]
    fn test_cue_priority() {
        let ad = ad("#EXT-X-CUE-IN\n#EXT-X-CUE-OUT:10");
        let cue = ad.cue();
        assert_eq!(cue.kind, CueKind::Out);
        assert_eq!(cue.duration, Duration::from_secs(10));

        let ad = self::ad("#EXT-X-CUE-IN\n#EXT-X-CUE-OUT-CONT:ELAPSEDTIME=4,DURATION=10");
        assert_eq!(ad.cue().kind, CueKind::Cont);
    }

    #[test]
    fn test_cue_scte35_backfill() {
        let ad = self::ad("#EXT-X-SPLICEPOINT-SCTE35:/splice\n#EXT-OATCLS-SCTE35:/oatcls\n#EXT-X-CUE-OUT:10");
        assert_eq!(ad.cue().scte35, "/oatcls");

        let ad = self::ad("#EXT-X-SPLICEPOINT-SCTE35:/splice\n#EXT-X-CUE-OUT:10");
        assert_eq!(ad.cue().scte35, "/splice");

        let ad = self::ad("#EXT-OATCLS-SCTE35:/oatcls\n#EXT-X-CUE-OUT:SCTE35=/own");
        assert_eq!(ad.cue().scte35, "/own");
    }

    #[test]
    fn test_no_cue_has_no_backfill() {
        let ad = self::ad("#EXT-OATCLS-SCTE35:/oatcls");
        let cue = ad.cue();
        assert_eq!(cue.kind, CueKind::None);
        assert!(cue.scte35.is_empty());
    }

    #[test]
    fn test_daterange() {
        let ad = self::ad(r#"#EXT-X-DATERANGE:ID="splice-6FFFFFF0",START-DATE="2014-03-05T11:15:00Z",PLANNED-DURATION=60.5,SCTE35-OUT=0xFC002F0000000000FF0"#);
        let dr = &ad.date_range;
        assert_eq!(dr.id, "splice-6FFFFFF0");
        assert!(dr.start.is_some());
        assert_eq!(dr.planned, Duration::from_millis(60500));
        assert!(dr.is_ad());

        let out: Vec<String> = marshal(&ad).iter().map(Tag::to_string).collect();
        assert_eq!(
            out,
            vec![r#"#EXT-X-DATERANGE:ID="splice-6FFFFFF0",START-DATE="2014-03-05T11:15:00Z",PLANNED-DURATION=60.5,SCTE35-OUT=0xFC002F0000000000FF0"#]
        );
    }

    #[test]
    fn test_scte35_tag() {
        let ad = self::ad(r#"#EXT-X-SCTE35:CUE="/DAIAAAAAAAAAAAQAAZ/I0VniQAQAgBDVUVJQAAAAH+cAAAAAA==",CUE-OUT=YES"#);
        assert!(ad.scte35.is_ad());
        assert_eq!(ad.scte35.cue, "/DAIAAAAAAAAAAAQAAZ/I0VniQAQAgBDVUVJQAAAAH+cAAAAAA==");
    }

    #[test]
    fn test_cue_encode() {
        let cue = Cue {
            duration: Duration::from_secs(30),
            id: "b".into(),
            set: true,
            ..Default::default()
        };
        let mut tag = Tag::new("EXT-X-CUE-OUT");
        cue.encode_tag(&mut tag);
        assert_eq!(tag.to_string(), "#EXT-X-CUE-OUT:DURATION=30,BREAKID=b");
    }
}
