/// Length of one bulk sample frame on the wire.
pub const SAMPLE_FRAME_LEN: usize = 201;
/// Opaque header preceding the packet counter.
const FRAME_HEADER_LEN: usize = 7;
/// Width of the little-endian packet sequence counter.
const COUNTER_LEN: usize = 2;
/// At most this many channel-0 values are taken from one frame.
pub const CHANNEL0_MAX_SAMPLES: usize = 48;

/// First byte of a battery status chunk.
pub const BATTERY_MARKER: u8 = 0x08;
/// A battery chunk carries its reading only when at least this long.
const BATTERY_MIN_LEN: usize = 9;
/// Exact chunk announcing the data signal is present.
pub const SIGNAL_PRESENT: [u8; 3] = [0xFF, 0x01, 0x01];
/// Exact chunk announcing the data signal is absent.
pub const SIGNAL_ABSENT: [u8; 3] = [0xFF, 0x01, 0x02];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalStatus {
    Present,
    Absent,
}

/// Typed status frames picked out of a raw chunk before bulk reassembly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFrame {
    /// Battery level reconstructed from the chunk's last two bytes.
    Battery(u16),
    Signal(SignalStatus),
}

/// Classifies a chunk as a status frame, if it is one.
///
/// Status frames are short and arrive whole, so the check runs per chunk as
/// received. A match never withholds the chunk from bulk routing; the caller
/// still offers the same bytes to the reassembler afterwards.
pub fn classify_chunk(chunk: &[u8]) -> Option<StatusFrame> {
    if chunk.first() == Some(&BATTERY_MARKER) && chunk.len() >= BATTERY_MIN_LEN {
        let high = chunk[chunk.len() - 2] as u16;
        let low = chunk[chunk.len() - 1] as u16;
        return Some(StatusFrame::Battery(high * 256 + low));
    }
    if chunk == SIGNAL_PRESENT {
        return Some(StatusFrame::Signal(SignalStatus::Present));
    }
    if chunk == SIGNAL_ABSENT {
        return Some(StatusFrame::Signal(SignalStatus::Absent));
    }
    None
}

/// One decoded bulk sample frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplePacket {
    /// Sequence counter from the frame header; informational only.
    pub counter: u16,
    /// Channel-0 voltages in wire order, no timestamps yet.
    pub samples: Vec<f32>,
}

/// Decodes a complete sample frame into channel-0 voltages.
///
/// The first 7 bytes are discarded, the next 2 read as the little-endian
/// counter, and the rest interpreted as a run of little-endian `f32`s.
/// Channel 0 occupies the even-indexed slots of that run. Trailing bytes
/// that do not fill a whole float are dropped (at most 3 per frame).
///
/// Whole 201-byte frames are the caller's responsibility (the reassembler
/// only hands those out); anything at least 9 bytes long still decodes, so
/// the channel selection and cap stay checkable on oversized runs.
pub fn decode_sample_frame(frame: &[u8]) -> Option<SamplePacket> {
    let body = frame.get(FRAME_HEADER_LEN..)?;
    let counter = u16::from_le_bytes([*body.first()?, *body.get(1)?]);
    let samples = body[COUNTER_LEN..]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .step_by(2)
        .take(CHANNEL0_MAX_SAMPLES)
        .collect();
    Some(SamplePacket { counter, samples })
}

/// Builds a wire frame carrying the given channel-0 values in the even float
/// slots (odd slots zeroed). Used by the simulated device and tests.
pub fn encode_sample_frame(counter: u16, channel0: &[f32]) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_HEADER_LEN];
    frame.extend_from_slice(&counter.to_le_bytes());
    let slots = (SAMPLE_FRAME_LEN - frame.len()) / 4;
    for i in 0..slots {
        let value = if i % 2 == 0 {
            channel0.get(i / 2).copied().unwrap_or(0.0)
        } else {
            0.0
        };
        frame.extend_from_slice(&value.to_le_bytes());
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_run_frame(floats: &[f32]) -> Vec<u8> {
        let mut frame = vec![0u8; FRAME_HEADER_LEN];
        frame.extend_from_slice(&7u16.to_le_bytes());
        for value in floats {
            frame.extend_from_slice(&value.to_le_bytes());
        }
        frame
    }

    #[test]
    fn battery_chunk_decodes_last_two_bytes() {
        let chunk = [0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x0A];
        assert_eq!(classify_chunk(&chunk), Some(StatusFrame::Battery(266)));
    }

    #[test]
    fn short_battery_chunk_is_not_classified() {
        let chunk = [0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x0A];
        assert_eq!(classify_chunk(&chunk), None);
    }

    #[test]
    fn signal_patterns_classify_exactly() {
        assert_eq!(
            classify_chunk(&[0xFF, 0x01, 0x01]),
            Some(StatusFrame::Signal(SignalStatus::Present))
        );
        assert_eq!(
            classify_chunk(&[0xFF, 0x01, 0x02]),
            Some(StatusFrame::Signal(SignalStatus::Absent))
        );
        assert_eq!(classify_chunk(&[0xFF, 0x01, 0x02, 0x00]), None);
    }

    #[test]
    fn decoder_selects_even_indexed_floats() {
        let frame = float_run_frame(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let packet = decode_sample_frame(&frame).unwrap();
        assert_eq!(packet.counter, 7);
        assert_eq!(packet.samples, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn decoder_caps_channel_samples_at_48() {
        let floats: Vec<f32> = (0..200).map(|i| i as f32).collect();
        let packet = decode_sample_frame(&float_run_frame(&floats)).unwrap();
        assert_eq!(packet.samples.len(), CHANNEL0_MAX_SAMPLES);
        assert_eq!(packet.samples[0], 0.0);
        assert_eq!(packet.samples[47], 94.0);
    }

    #[test]
    fn decoder_drops_trailing_partial_float() {
        let mut frame = float_run_frame(&[1.5, 2.5, 3.5]);
        frame.extend_from_slice(&[0xAA, 0xBB]);
        let packet = decode_sample_frame(&frame).unwrap();
        assert_eq!(packet.samples, vec![1.5, 3.5]);
    }

    #[test]
    fn counter_is_little_endian() {
        let mut frame = vec![0u8; FRAME_HEADER_LEN];
        frame.extend_from_slice(&[0x34, 0x12]);
        let packet = decode_sample_frame(&frame).unwrap();
        assert_eq!(packet.counter, 0x1234);
        assert!(packet.samples.is_empty());
    }

    #[test]
    fn frame_shorter_than_preamble_does_not_decode() {
        assert!(decode_sample_frame(&[0u8; 8]).is_none());
    }

    #[test]
    fn encoded_frame_round_trips_channel_values() {
        let channel0: Vec<f32> = (0..24).map(|i| i as f32 * 0.5).collect();
        let frame = encode_sample_frame(42, &channel0);
        assert_eq!(frame.len(), SAMPLE_FRAME_LEN);
        let packet = decode_sample_frame(&frame).unwrap();
        assert_eq!(packet.counter, 42);
        assert_eq!(packet.samples, channel0);
    }
}
