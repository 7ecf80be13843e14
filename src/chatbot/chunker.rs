//! Fixed-width splitting of replies for Telegram's message size limit.

/// Default chunk size in UTF-16 code units. Telegram caps a message at 4096.
pub const DEFAULT_CHUNK_SIZE: usize = 3500;

/// One piece of a split text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageChunk {
    pub sequence_index: usize,
    pub text: String,
}

/// Split `text` into consecutive pieces of at most `max_chunk_size` UTF-16
/// code units, the unit Telegram measures message length in.
///
/// A character is never cut in half, so a chunk may end one unit short when
/// the next character is a surrogate pair. Boundaries fall at fixed offsets
/// only; words and sentences are not respected. An empty text yields no chunks.
///
/// A `max_chunk_size` of zero is treated as 1. A lone character wider than
/// the limit still gets a chunk of its own.
pub fn split(text: &str, max_chunk_size: usize) -> Vec<MessageChunk> {
    let max = max_chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut units = 0;

    for (offset, ch) in text.char_indices() {
        let width = ch.len_utf16();
        if units > 0 && units + width > max {
            chunks.push(MessageChunk {
                sequence_index: chunks.len(),
                text: text[start..offset].to_string(),
            });
            start = offset;
            units = 0;
        }
        units += width;
    }

    if start < text.len() {
        chunks.push(MessageChunk {
            sequence_index: chunks.len(),
            text: text[start..].to_string(),
        });
    }

    chunks
}
