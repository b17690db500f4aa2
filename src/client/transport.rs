use crate::models::chat::ChatMessage;
use super::session::ChatSession;

use futures_util::StreamExt;
use log::debug;
use std::error::Error;

/// Incremental UTF-8 decoder. A multi-byte sequence split across two chunks
/// is carried over and completed by the next chunk; invalid sequences decode
/// to replacement characters instead of failing the read loop.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    carry: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, prepending any bytes carried over from the
    /// previous one.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.carry.extend_from_slice(chunk);
        let input = std::mem::take(&mut self.carry);

        let mut out = String::new();
        let mut start = 0;
        loop {
            match std::str::from_utf8(&input[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let valid_len = e.valid_up_to();
                    if let Ok(valid) = std::str::from_utf8(&input[start..start + valid_len]) {
                        out.push_str(valid);
                    }
                    match e.error_len() {
                        Some(bad_len) => {
                            out.push('\u{FFFD}');
                            start += valid_len + bad_len;
                        }
                        None => {
                            // Incomplete trailing sequence: keep for the next chunk.
                            self.carry = input[start + valid_len..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush a dangling incomplete sequence once the stream is done.
    pub fn finish(&mut self) -> String {
        if self.carry.is_empty() {
            String::new()
        } else {
            self.carry.clear();
            "\u{FFFD}".to_string()
        }
    }
}

/// HTTP client for the relay endpoint. Owns no conversation state; the
/// caller's `ChatSession` is updated in place as chunks arrive.
pub struct RelayClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RelayClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Submit one user turn and drive the session through the streamed
    /// reply. `render` fires after every applied chunk and once after the
    /// turn resolves. Returns `false` when the submission was a no-op
    /// (blank text or a turn already in flight).
    pub async fn submit_turn<F>(
        &self,
        session: &mut ChatSession,
        text: &str,
        mut render: F
    ) -> bool
        where F: FnMut(&ChatSession)
    {
        let outbound = match session.begin_turn(text) {
            Some(outbound) => outbound,
            None => {
                return false;
            }
        };
        render(session);

        if let Err(e) = self.stream_turn(session, &outbound, &mut render).await {
            debug!("Turn failed: {}", e);
            session.fail_turn();
        }
        session.finish_turn();
        render(session);
        true
    }

    async fn stream_turn<F>(
        &self,
        session: &mut ChatSession,
        outbound: &[ChatMessage],
        render: &mut F
    ) -> Result<(), Box<dyn Error + Send + Sync>>
        where F: FnMut(&ChatSession)
    {
        let resp = self.http
            .post(&self.endpoint)
            .json(&outbound)
            .send().await?
            .error_for_status()?;

        let mut stream = resp.bytes_stream();
        let mut decoder = StreamDecoder::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let text = decoder.decode(&chunk);
            if !text.is_empty() {
                session.apply_chunk(&text);
                render(session);
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            session.apply_chunk(&tail);
            render(session);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_ascii() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.decode(b"hello"), "hello");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_decode_multibyte_split_across_chunks() {
        // "é" is 0xC3 0xA9; split it between two chunks.
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.decode(&[b'c', b'a', b'f', 0xc3]), "caf");
        assert_eq!(decoder.decode(&[0xa9, b'!']), "é!");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_decode_four_byte_sequence_split_three_ways() {
        // U+1F30D EARTH GLOBE EUROPE-AFRICA: F0 9F 8C 8D
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.decode(&[0xf0]), "");
        assert_eq!(decoder.decode(&[0x9f, 0x8c]), "");
        assert_eq!(decoder.decode(&[0x8d]), "\u{1F30D}");
    }

    #[test]
    fn test_invalid_bytes_become_replacement_chars() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xff, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn test_truncated_stream_flushes_replacement() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.decode(&[0xc3]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }
}
