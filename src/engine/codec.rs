use super::traits::UrlCodec;
use anyhow::{Context, Result};
use percent_encoding::{percent_decode_str, percent_encode, utf8_percent_encode, NON_ALPHANUMERIC};

/// Component-encodes the whole target URL into one path segment.
pub struct PlainCodec;

impl UrlCodec for PlainCodec {
    fn encode(&self, url: &str) -> String {
        utf8_percent_encode(url, NON_ALPHANUMERIC).to_string()
    }

    fn decode(&self, encoded: &str) -> Result<String> {
        let decoded = percent_decode_str(encoded)
            .decode_utf8()
            .context("Encoded path is not valid UTF-8")?;
        Ok(decoded.into_owned())
    }
}

/// Key-cycled XOR over the URL bytes, percent-encoded for path safety.
pub struct XorCodec {
    key: Vec<u8>,
}

impl XorCodec {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        let key = key.into();
        Self {
            key: if key.is_empty() { vec![0] } else { key },
        }
    }

    fn xor(&self, bytes: &mut [u8]) {
        for (i, b) in bytes.iter_mut().enumerate() {
            *b ^= self.key[i % self.key.len()];
        }
    }
}

impl UrlCodec for XorCodec {
    fn encode(&self, url: &str) -> String {
        let mut bytes = url.as_bytes().to_vec();
        self.xor(&mut bytes);
        percent_encode(&bytes, NON_ALPHANUMERIC).to_string()
    }

    fn decode(&self, encoded: &str) -> Result<String> {
        let mut bytes: Vec<u8> = percent_decode_str(encoded).collect();
        self.xor(&mut bytes);
        String::from_utf8(bytes).context("Decoded path is not valid UTF-8")
    }
}
