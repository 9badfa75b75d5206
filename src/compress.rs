//! zlib-wrapped deflate helpers for session payloads.

use std::io::{Read as _, Write as _};

use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};

pub fn deflate(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(bytes.len() / 2 + 16),
        Compression::default(),
    );
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Inflate `bytes`, failing once the output would grow past `limit` bytes.
pub fn inflate(bytes: &[u8], limit: usize) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len().saturating_mul(2).min(limit));
    ZlibDecoder::new(bytes)
        .take(limit as u64 + 1)
        .read_to_end(&mut out)?;
    if out.len() > limit {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("inflated data exceeds {limit} bytes"),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 64 * 1024;

    #[test]
    fn inflate_restores_deflated_bytes() {
        let input = "cart=1,2,3;cart=1,2,3;cart=1,2,3;cart=1,2,3".repeat(8);
        let packed = deflate(input.as_bytes()).expect("deflate succeeds");
        assert!(packed.len() < input.len());
        let unpacked = inflate(&packed, LIMIT).expect("inflate succeeds");
        assert_eq!(unpacked, input.as_bytes());
    }

    #[test]
    fn empty_input() {
        let packed = deflate(b"").expect("deflate succeeds");
        assert!(inflate(&packed, LIMIT).expect("inflate succeeds").is_empty());
    }

    #[test]
    fn inflate_rejects_garbage() {
        assert!(inflate(b"definitely not zlib", LIMIT).is_err());
    }

    #[test]
    fn inflate_stops_at_limit() {
        let input = vec![b'a'; 4096];
        let packed = deflate(&input).expect("deflate succeeds");
        assert!(packed.len() < 64);

        assert_eq!(inflate(&packed, 4096).expect("fits exactly").len(), 4096);
        let err = inflate(&packed, 4095).expect_err("output is capped");
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
