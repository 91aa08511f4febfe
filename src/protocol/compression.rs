use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{self, Read, Write};

/// Gzip-compress a payload (StartSession bodies are sent compressed).
pub fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

pub fn gunzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gunzip_restores_input() {
        let input = br#"{"round_id":1,"speaker":"host"}"#;
        let packed = gzip(input).unwrap();

        assert_ne!(packed.as_slice(), input.as_slice());
        assert_eq!(gunzip(&packed).unwrap(), input);
    }

    #[test]
    fn test_gunzip_rejects_plain_bytes() {
        assert!(gunzip(b"not gzip").is_err());
    }
}
