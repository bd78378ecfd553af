//! Stream-level tests for the RDM6300 parser and repeat filter.
//!
//! Simulates what the serial reader sees: a module that keeps emitting the
//! same frame while a card is held, split at arbitrary byte boundaries.
//!
//! Run with: cargo test --package latchkey-hardware --test reader_stream

use latchkey_core::CardId;
use latchkey_hardware::rdm6300::{FrameParser, Rdm6300Frame, RepeatFilter};
use std::time::Duration;

/// Feed `stream` in chunks of `chunk` bytes and collect accepted tags.
fn accepted_tags(stream: &[u8], chunk: usize, filter: &mut RepeatFilter) -> Vec<u32> {
    let mut parser = FrameParser::new();
    let mut tags = Vec::new();
    for part in stream.chunks(chunk) {
        parser.feed(part);
        while let Some(frame) = parser.next_frame() {
            if filter.accept(frame.tag) {
                tags.push(frame.tag);
            }
        }
    }
    tags
}

#[tokio::test(start_paused = true)]
async fn test_held_card_is_reported_once_for_any_chunking() {
    let frame = Rdm6300Frame::new(0x01, 0x00a1_b2c3).encode();
    let stream: Vec<u8> = frame.iter().copied().cycle().take(frame.len() * 8).collect();

    for chunk in [1, 3, 7, 14, 64] {
        let mut filter = RepeatFilter::new(Duration::from_secs(1));
        assert_eq!(accepted_tags(&stream, chunk, &mut filter), vec![0x00a1_b2c3]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_noise_between_cards() {
    let mut stream = b"\x00\xff".to_vec();
    stream.extend_from_slice(&Rdm6300Frame::new(0x01, 0xa1b2).encode());
    stream.extend_from_slice(b"\x02\x30\x31");
    stream.extend_from_slice(&Rdm6300Frame::new(0x01, 0xffee).encode());

    let mut filter = RepeatFilter::default();
    let tags = accepted_tags(&stream, 5, &mut filter);

    assert_eq!(tags, vec![0xa1b2, 0xffee]);
    let ids: Vec<String> = tags
        .into_iter()
        .map(|t| CardId::from_raw_code(t).to_string())
        .collect();
    assert_eq!(ids, vec!["01a1b2", "01ffee"]);
}

#[tokio::test(start_paused = true)]
async fn test_card_presented_again_after_window() {
    let frame = Rdm6300Frame::new(0x01, 0x1234).encode();
    let mut filter = RepeatFilter::new(Duration::from_secs(1));

    assert_eq!(accepted_tags(&frame, 14, &mut filter), vec![0x1234]);
    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(accepted_tags(&frame, 14, &mut filter), vec![0x1234]);
}
