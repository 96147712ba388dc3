//! Message codec - text to fixed-width encrypted-word sequences
//!
//! Messages travel on the ledger as sequences of encrypted 32-bit words.
//! This module is the deterministic, stateless transform between human text
//! and those word sequences: UTF-8 bytes are packed four per word in
//! little-endian order, a partial final group is zero-padded on the missing
//! high-order bytes, and each message is terminated by a sentinel word so
//! several messages can share one flat sequence.
//!
//! Known gap: a message whose raw bytes happen to form the sentinel word
//! mid-stream is misread as a message boundary. The format neither escapes
//! nor rejects that case.

use thiserror::Error;

/// Word marking the end of one message inside a flat sequence
pub const SENTINEL: u32 = 0xFFFF_FFFF;

/// Maximum words per message, sentinel included (wire-format constant)
pub const MAX_MESSAGE_WORDS: usize = 100;

/// Practical input cap in characters, enforced by callers before encoding
pub const MAX_MESSAGE_CHARS: usize = 400;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding a message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Encoded form exceeds the per-message word cap
    #[error("message too long: {words} words exceeds the {max} word cap")]
    MessageTooLong { words: usize, max: usize },
}

/// Encode text into 32-bit words, sentinel-terminated
///
/// Four UTF-8 bytes per word, little-endian; the final partial group is
/// zero-padded. Fails if the result (sentinel included) would exceed
/// [`MAX_MESSAGE_WORDS`].
pub fn encode(text: &str) -> CodecResult<Vec<u32>> {
    let bytes = text.as_bytes();
    let mut words = Vec::with_capacity(bytes.len() / 4 + 2);

    for chunk in bytes.chunks(4) {
        let mut word: u32 = 0;
        for (i, byte) in chunk.iter().enumerate() {
            word |= (*byte as u32) << (i * 8);
        }
        words.push(word);
    }

    words.push(SENTINEL);

    if words.len() > MAX_MESSAGE_WORDS {
        return Err(CodecError::MessageTooLong {
            words: words.len(),
            max: MAX_MESSAGE_WORDS,
        });
    }

    Ok(words)
}

/// Decode a single message's words back into text
///
/// Unpacks four little-endian bytes per word, strips trailing NUL padding,
/// and decodes UTF-8 with replacement rather than failing.
pub fn decode_one(words: &[u32]) -> String {
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }

    while bytes.last() == Some(&0) {
        bytes.pop();
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

/// Split a flat word sequence on the sentinel and decode each message
///
/// Whitespace-only segments are dropped; a trailing segment without its
/// terminating sentinel is still decoded.
pub fn decode_many(words: &[u32]) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current: Vec<u32> = Vec::new();

    for word in words {
        if *word == SENTINEL {
            if !current.is_empty() {
                push_nonblank(&mut messages, decode_one(&current));
                current.clear();
            }
        } else {
            current.push(*word);
        }
    }

    if !current.is_empty() {
        push_nonblank(&mut messages, decode_one(&current));
    }

    messages
}

fn push_nonblank(messages: &mut Vec<String>, decoded: String) {
    if !decoded.trim().is_empty() {
        messages.push(decoded);
    }
}
