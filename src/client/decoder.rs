//! Stateful UTF-8 decoding for chunked response bodies

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid UTF-8 sequence in response stream")]
    InvalidSequence,

    #[error("response stream ended inside a UTF-8 sequence ({0} byte(s) pending)")]
    Truncated(usize),
}

/// Decodes a byte stream chunk by chunk.
///
/// A multi-byte character split across two reads is held back until the
/// rest of it arrives, so no read boundary can corrupt the text.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning every complete character so far.
    ///
    /// Valid text ahead of an invalid sequence is still returned; the error
    /// is reported by the next call to `decode` or `finish`.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<String, DecodeError> {
        self.pending.extend_from_slice(bytes);

        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                Ok(text)
            }
            Err(e) if e.valid_up_to() == 0 && e.error_len().is_some() => {
                self.pending.clear();
                Err(DecodeError::InvalidSequence)
            }
            Err(e) => {
                let complete = self.pending.drain(..e.valid_up_to()).collect::<Vec<u8>>();
                String::from_utf8(complete).map_err(|_| DecodeError::InvalidSequence)
            }
        }
    }

    /// End of stream; fails when a character was left incomplete.
    pub fn finish(self) -> Result<(), DecodeError> {
        match std::str::from_utf8(&self.pending) {
            Ok(_) => Ok(()),
            Err(e) if e.error_len().is_some() => Err(DecodeError::InvalidSequence),
            Err(_) => Err(DecodeError::Truncated(self.pending.len())),
        }
    }
}
