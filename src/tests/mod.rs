//! Cross-module tests
//!
//! These decode and encode complete playlists through the public entry
//! points. Set `RUST_LOG=hls_m3u8=trace` to see the decoder's logging.



/// Install a test-writer subscriber once per test binary.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hls_m3u8=warn".into()),
        )
        .with_test_writer()
        .try_init();
}
