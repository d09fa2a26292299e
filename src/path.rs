//! Reference resolution
//!
//! Playlists reference other playlists, segments and keys relative to
//! their own location. A parent that parses as a URL resolves references
//! the way a browser does (`../`, `./`, root-relative). Any other parent is
//! taken as a filesystem path.

use url::Url;

/// Resolve `reference` against the playlist at `parent`.
///
/// Absolute references (with a scheme) are returned unchanged. Against a
/// filesystem path, `reference` replaces the last path element of `parent`
/// unless it starts with `/`; a `parent` ending in `/` is already a
/// directory.
pub fn path_of(parent: &str, reference: &str) -> String {
    if reference.is_empty() {
        return String::new();
    }
    if let Ok(base) = Url::parse(parent) {
        return match base.join(reference) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::trace!(parent, reference, error = %e, "unresolvable reference kept as is");
                reference.to_string()
            }
        };
    }
    if is_absolute(reference) {
        return reference.to_string();
    }
    let dir = parent.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    match dir.rfind('/') {
        Some(i) => format!("{}{}", &dir[..=i], reference),
        None => reference.to_string(),
    }
}

/// Whether `reference` starts with `/` or is a complete URL.
pub fn is_absolute(reference: &str) -> bool {
    reference.starts_with('/') || Url::parse(reference).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative() {
        assert_eq!(path_of("http://cdn/a/master.m3u8", "v1/index.m3u8"), "http://cdn/a/v1/index.m3u8");
        assert_eq!(path_of("http://cdn/a/", "seg.ts"), "http://cdn/a/seg.ts");
        assert_eq!(path_of("/srv/hls/index.m3u8", "seg.ts"), "/srv/hls/seg.ts");
        assert_eq!(path_of("index.m3u8", "seg.ts"), "seg.ts");
        assert_eq!(path_of("", "seg.ts"), "seg.ts");
    }

    #[test]
    fn test_dot_segments() {
        assert_eq!(path_of("http://cdn/a/master.m3u8", "../b/seg.ts"), "http://cdn/b/seg.ts");
        assert_eq!(path_of("http://cdn/a/master.m3u8", "./seg.ts"), "http://cdn/a/seg.ts");
        assert_eq!(path_of("https://cdn/a/b/c.m3u8", "../../d.ts"), "https://cdn/d.ts");
    }

    #[test]
    fn test_root_relative_keeps_host() {
        assert_eq!(path_of("http://cdn/a/master.m3u8", "/b/seg.ts"), "http://cdn/b/seg.ts");
        assert_eq!(path_of("https://cdn:8443/a/x.m3u8", "/k"), "https://cdn:8443/k");
        assert_eq!(path_of("/srv/hls/index.m3u8", "/other/seg.ts"), "/other/seg.ts");
    }

    #[test]
    fn test_parent_query_ignored() {
        assert_eq!(
            path_of("http://cdn/a/master.m3u8?token=x/y", "seg.ts"),
            "http://cdn/a/seg.ts"
        );
        assert_eq!(path_of("/srv/hls/index.m3u8?v=1/2", "seg.ts"), "/srv/hls/seg.ts");
    }

    #[test]
    fn test_absolute() {
        assert_eq!(path_of("http://cdn/a/master.m3u8", "https://other/b.ts"), "https://other/b.ts");
        assert_eq!(path_of("http://cdn/a/master.m3u8", "skd://key-id"), "skd://key-id");
        assert_eq!(path_of("/srv/hls/index.m3u8", "https://other/b.ts"), "https://other/b.ts");
        assert_eq!(path_of("http://cdn/a/master.m3u8", ""), "");
    }

    #[test]
    fn test_colon_in_query_is_relative() {
        assert!(!is_absolute("seg.ts?t=12:30"));
        assert!(is_absolute("data:text/plain;base64,AAAA"));
        assert!(is_absolute("/seg.ts"));
        assert_eq!(path_of("/srv/index.m3u8", "seg.ts?t=12:30"), "/srv/seg.ts?t=12:30");
    }
}
