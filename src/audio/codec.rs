//! PCM wire codec for the realtime channel
//!
//! The realtime session exchanges raw audio as base64-encoded 16-bit
//! little-endian PCM. Outbound blocks are mono 16kHz, inbound chunks mono
//! 24kHz. Encoding is pure and total: empty input produces an empty payload.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// MIME type tagging outbound microphone audio
pub const CAPTURE_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// An encoded audio payload as exchanged with the realtime channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBlob {
    /// Base64-encoded 16-bit little-endian PCM
    pub data: String,
    /// MIME type identifying the raw format and sample rate
    pub mime_type: String,
}

/// Encode f32 samples (-1.0..1.0) as a base64 16-bit PCM blob
#[must_use]
pub fn encode_blob(samples: &[f32]) -> AudioBlob {
    AudioBlob {
        data: STANDARD.encode(samples_to_pcm16(samples)),
        mime_type: CAPTURE_MIME_TYPE.to_string(),
    }
}

/// Decode a base64 16-bit PCM chunk into f32 samples
///
/// # Errors
///
/// Returns [`Error::Decode`] if the payload is not valid base64 or its byte
/// length is not a whole number of 16-bit frames.
pub fn decode_blob(data: &str) -> Result<Vec<f32>> {
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| Error::Decode(format!("invalid base64 payload: {e}")))?;
    pcm16_to_samples(&bytes)
}

/// Convert f32 samples to 16-bit little-endian PCM bytes
#[must_use]
pub fn samples_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        // f32 [-1.0, 1.0] to i16
        #[allow(clippy::cast_possible_truncation)]
        let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        bytes.extend_from_slice(&sample_i16.to_le_bytes());
    }
    bytes
}

/// Convert 16-bit little-endian PCM bytes to f32 samples
///
/// # Errors
///
/// Returns [`Error::Decode`] if the byte length is odd.
pub fn pcm16_to_samples(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 2 != 0 {
        return Err(Error::Decode(format!(
            "PCM payload has odd length {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_payload() {
        let blob = encode_blob(&[]);
        assert!(blob.data.is_empty());
        assert_eq!(blob.mime_type, CAPTURE_MIME_TYPE);
    }

    #[test]
    fn decode_rejects_odd_length() {
        let payload = STANDARD.encode([0u8, 1, 2]);
        assert!(decode_blob(&payload).is_err());
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(decode_blob("not//valid===base64!!").is_err());
    }

    #[test]
    fn roundtrip_within_integer_tolerance() {
        let original = vec![0.0, 0.5, -0.5, 0.25, -1.0, 0.999];
        let blob = encode_blob(&original);
        let decoded = decode_blob(&blob.data).unwrap();

        assert_eq!(decoded.len(), original.len());
        for (a, b) in original.iter().zip(&decoded) {
            assert!((a - b).abs() < 1.0 / 16384.0, "{a} vs {b}");
        }
    }

    #[test]
    fn clamps_out_of_range_samples() {
        let bytes = samples_to_pcm16(&[2.0, -2.0]);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 32767);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), -32768);
    }
}
