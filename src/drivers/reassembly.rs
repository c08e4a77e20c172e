use log::warn;

use crate::drivers::frame::SAMPLE_FRAME_LEN;

/// Consecutive pushes that leave a partial frame pending before warning once.
const STALL_WARN_PUSHES: u32 = 64;

/// Reassembles arbitrarily-chunked serial reads into whole 201-byte frames.
///
/// Bytes accumulate in a private cursor; every push drains as many complete
/// frames as the cursor holds, so the leftover is always shorter than one
/// frame. Bytes are never dropped or reordered: frames come off the front in
/// FIFO order, preserving the temporal order of samples.
pub struct FrameReassembler {
    cursor: Vec<u8>,
    starved_pushes: u32,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self {
            cursor: Vec::with_capacity(SAMPLE_FRAME_LEN * 2),
            starved_pushes: 0,
        }
    }

    /// Appends a chunk and returns every frame it completed, in arrival order.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.cursor.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while self.cursor.len() >= SAMPLE_FRAME_LEN {
            let rest = self.cursor.split_off(SAMPLE_FRAME_LEN);
            frames.push(std::mem::replace(&mut self.cursor, rest));
        }
        if !frames.is_empty() {
            self.starved_pushes = 0;
        } else if !self.cursor.is_empty() {
            self.starved_pushes += 1;
            if self.starved_pushes == STALL_WARN_PUSHES {
                warn!(
                    "no complete frame after {} reads, {} byte(s) pending; stream stalled or garbled",
                    self.starved_pushes,
                    self.cursor.len()
                );
            }
        }
        frames
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn pending(&self) -> usize {
        self.cursor.len()
    }

    /// Discards any partial frame, e.g. across a close/reopen cycle.
    pub fn reset(&mut self) {
        self.cursor.clear();
        self.starved_pushes = 0;
    }
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::frame::{decode_sample_frame, encode_sample_frame};

    #[test]
    fn whole_chunk_yields_one_frame() {
        let frame = encode_sample_frame(1, &[0.25; 24]);
        let mut reassembler = FrameReassembler::new();
        let frames = reassembler.push_chunk(&frame);
        assert_eq!(frames, vec![frame]);
        assert_eq!(reassembler.pending(), 0);
    }

    #[test]
    fn split_points_do_not_change_the_decoded_samples() {
        let frame = encode_sample_frame(9, &[1.0, -2.0, 3.0, -4.0]);
        let whole = decode_sample_frame(&frame).unwrap();
        for split in 1..frame.len() {
            let mut reassembler = FrameReassembler::new();
            assert!(reassembler.push_chunk(&frame[..split]).is_empty());
            let frames = reassembler.push_chunk(&frame[split..]);
            assert_eq!(frames.len(), 1);
            assert_eq!(decode_sample_frame(&frames[0]).unwrap(), whole);
        }
    }

    #[test]
    fn byte_at_a_time_feed_reassembles() {
        let frame = encode_sample_frame(3, &[7.0; 24]);
        let mut reassembler = FrameReassembler::new();
        let mut frames = Vec::new();
        for &byte in &frame {
            frames.extend(reassembler.push_chunk(&[byte]));
        }
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn multiple_frames_in_one_chunk_come_out_in_order() {
        let first = encode_sample_frame(1, &[1.0; 24]);
        let second = encode_sample_frame(2, &[2.0; 24]);
        let mut chunk = first.clone();
        chunk.extend_from_slice(&second);
        chunk.extend_from_slice(&second[..50]);

        let mut reassembler = FrameReassembler::new();
        let frames = reassembler.push_chunk(&chunk);
        assert_eq!(frames, vec![first, second]);
        assert_eq!(reassembler.pending(), 50);
    }

    #[test]
    fn leftover_survives_until_completed() {
        let frame = encode_sample_frame(5, &[0.5; 24]);
        let mut reassembler = FrameReassembler::new();
        reassembler.push_chunk(&frame[..100]);
        reassembler.push_chunk(&frame[100..150]);
        assert_eq!(reassembler.pending(), 150);
        let frames = reassembler.push_chunk(&frame[150..]);
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut reassembler = FrameReassembler::new();
        reassembler.push_chunk(&[0u8; 120]);
        reassembler.reset();
        assert_eq!(reassembler.pending(), 0);
    }
}
