//! Response body decompression.

use std::io::Read;

use flate2::read::GzDecoder;

/// Inflate a complete gzip body.
pub fn gunzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(body);
    let mut out = Vec::with_capacity(body.len().saturating_mul(4));
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Whether a `Content-Encoding` value names gzip.
pub(crate) fn is_gzip(content_encoding: &str) -> bool {
    content_encoding
        .split(',')
        .map(str::trim)
        .any(|enc| enc.eq_ignore_ascii_case("gzip") || enc.eq_ignore_ascii_case("x-gzip"))
}
