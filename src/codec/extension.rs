//! Extension tags
//!
//! Tags that no binding of a type claims can still be kept: register a
//! constructor for the tag name with [`register_tag`] at startup and the
//! decoder stores every occurrence in the type's extension map.
//!
//! Registration is process-wide. Finish it before decoding concurrently.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::m3u::Tag;
use crate::playlist::{Cue, CueAdobe, DateRange, Scte35};

use super::TagValue;

/// Extension tags by name. Sorted, so encoding is deterministic.
pub type Extensions = BTreeMap<String, Extension>;

/// Builds an empty extension value for one tag name.
pub type Constructor = fn() -> Extension;

static REGISTRY: OnceLock<DashMap<String, Constructor>> = OnceLock::new();

fn registry() -> &'static DashMap<String, Constructor> {
    REGISTRY.get_or_init(DashMap::new)
}

/// A decoded extension tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Extension {
    Cue(Cue),
    CueAdobe(CueAdobe),
    Scte35(Scte35),
    DateRange(DateRange),
    /// The tag as it was lexed
    Raw(Tag),
}

impl Extension {
    /// Constructor that keeps the tag verbatim.
    pub fn raw() -> Extension {
        Extension::Raw(Tag::default())
    }

    pub fn decode_tag(&mut self, tag: &Tag) {
        match self {
            Extension::Cue(v) => v.decode_tag(tag),
            Extension::CueAdobe(v) => v.decode_tag(tag),
            Extension::Scte35(v) => v.decode_tag(tag),
            Extension::DateRange(v) => v.decode_tag(tag),
            Extension::Raw(v) => v.decode_tag(tag),
        }
    }

    pub fn encode_tag(&self, tag: &mut Tag) {
        match self {
            Extension::Cue(v) => v.encode_tag(tag),
            Extension::CueAdobe(v) => v.encode_tag(tag),
            Extension::Scte35(v) => v.encode_tag(tag),
            Extension::DateRange(v) => v.encode_tag(tag),
            Extension::Raw(v) => v.encode_tag(tag),
        }
    }
}

/// Register a constructor for extension tags named `name`.
///
/// ```ignore
/// register_tag("EXT-X-ASSET-INFO", Extension::raw);
/// register_tag("EXT-X-AD-CUE", || Extension::Cue(Cue::default()));
/// ```
pub fn register_tag(name: impl Into<String>, new: Constructor) {
    let name = name.into();
    tracing::debug!(tag = %name, "extension tag registered");
    registry().insert(name, new);
}

/// Remove a registration. Returns whether one existed.
pub fn unregister_tag(name: &str) -> bool {
    registry().remove(name).is_some()
}

pub fn is_registered(name: &str) -> bool {
    registry().contains_key(name)
}

/// Decode `tag` with its registered constructor, if any.
pub(crate) fn construct(tag: &Tag) -> Option<Extension> {
    let Some(new) = registry().get(&tag.name).map(|entry| *entry.value()) else {
        tracing::trace!(tag = %tag.name, "no extension registered, dropped");
        return None;
    };
    let mut ext = new();
    ext.decode_tag(tag);
    tracing::trace!(tag = %tag.name, "extension decoded");
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::m3u::parse;

    #[test]
    fn test_construct_registered() {
        register_tag("X-TEST-EXT-CUE", || Extension::Cue(Cue::default()));
        let tags = parse("#X-TEST-EXT-CUE:DURATION=30".as_bytes()).expect("read");
        match construct(&tags[0]) {
            Some(Extension::Cue(cue)) => {
                assert_eq!(cue.duration, std::time::Duration::from_secs(30));
                assert!(cue.set);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_construct_unregistered() {
        let tags = parse("#X-TEST-EXT-NOBODY:1".as_bytes()).expect("read");
        assert!(construct(&tags[0]).is_none());
    }

    #[test]
    fn test_raw_keeps_tag() {
        register_tag("X-TEST-EXT-RAW", Extension::raw);
        assert!(is_registered("X-TEST-EXT-RAW"));
        let tags = parse("#X-TEST-EXT-RAW:B=\"c\",a".as_bytes()).expect("read");
        let ext = construct(&tags[0]).expect("registered");
        assert_eq!(ext, Extension::Raw(tags[0].clone()));

        let mut out = Tag::new("X-TEST-EXT-RAW");
        ext.encode_tag(&mut out);
        assert_eq!(out.to_string(), "#X-TEST-EXT-RAW:a,B=\"c\"");
        assert!(unregister_tag("X-TEST-EXT-RAW"));
        assert!(!is_registered("X-TEST-EXT-RAW"));
    }
}
