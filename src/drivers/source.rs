use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::drivers::buffer::SAMPLE_RATE_HZ;
use crate::drivers::command::OutboundCommand;
use crate::drivers::error::DriverError;
use crate::drivers::frame::{encode_sample_frame, BATTERY_MARKER, SIGNAL_ABSENT, SIGNAL_PRESENT};

/// Byte-chunk source abstraction over the serial connection.
///
/// Reads surface whatever bytes happen to be pending, with no regard for
/// protocol frame boundaries; framing is the reassembler's job.
pub trait ByteSource {
    /// Bytes currently available, possibly empty. Must not block beyond a
    /// short I/O timeout.
    fn read_available(&mut self) -> Result<Vec<u8>, DriverError>;
    /// Writes a control payload to the device.
    fn write(&mut self, bytes: &[u8]) -> Result<(), DriverError>;
    /// Releases the connection; later reads report a closed port.
    fn close(&mut self);
}

/// In-memory source useful for tests and deterministic playback.
///
/// Chunks are replayed in order (empty chunks model idle polls); once the
/// queue is exhausted the source reports a closed port.
pub struct ManualSource {
    queue: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    closed: bool,
}

impl ManualSource {
    pub fn new(chunks: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            queue: chunks.into_iter().collect(),
            written: Vec::new(),
            closed: false,
        }
    }

    /// Payloads written back toward the device, in order.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }
}

impl ByteSource for ManualSource {
    fn read_available(&mut self) -> Result<Vec<u8>, DriverError> {
        if self.closed {
            return Err(DriverError::PortClosed);
        }
        match self.queue.pop_front() {
            Some(chunk) => Ok(chunk),
            None => Err(DriverError::PortClosed),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::PortClosed);
        }
        self.written.push(bytes.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Channel-0 samples carried per simulated frame (48 wire floats, every
/// second one belongs to channel 0).
const SIM_SAMPLES_PER_FRAME: usize = 24;
/// Simulated battery level reported after opening (2.56 V scale units).
const SIM_BATTERY: [u8; 2] = [0x01, 0x0A];
/// Settling time between a start command and the first bulk frame, like the
/// real device, which answers status traffic while idle and only then streams.
const SIM_START_DELAY: Duration = Duration::from_millis(500);

/// Synthetic device speaking the real wire protocol: status frames plus
/// 201-byte sample frames carrying a sine tone with measurement noise.
///
/// It honors the same outbound commands as the hardware (enable/disable
/// channel, start/stop, close-all), emits status frames only between
/// measurements the way the device does, and paces sample frames at the
/// nominal 125 Hz so a demo run behaves like a live port.
pub struct SimulatedSource {
    tone_hz: f32,
    start_delay: Duration,
    frame_period: Duration,
    stream_start: Option<Instant>,
    closed: bool,
    counter: u16,
    phase: f32,
    rng: StdRng,
    pending_status: VecDeque<Vec<u8>>,
    outbox: Vec<u8>,
    last_frame: Instant,
}

impl SimulatedSource {
    pub fn new(tone_hz: f32) -> Self {
        let frame_period = Duration::from_secs_f32(SIM_SAMPLES_PER_FRAME as f32 / SAMPLE_RATE_HZ);
        Self::with_timing(tone_hz, SIM_START_DELAY, frame_period)
    }

    /// Timing overrides for tests and accelerated playback.
    pub fn with_timing(tone_hz: f32, start_delay: Duration, frame_period: Duration) -> Self {
        let mut pending_status = VecDeque::new();
        let mut battery = vec![BATTERY_MARKER, 0, 0, 0, 0, 0, 0];
        battery.extend_from_slice(&SIM_BATTERY);
        pending_status.push_back(battery);
        Self {
            tone_hz,
            start_delay,
            frame_period,
            stream_start: None,
            closed: false,
            counter: 0,
            phase: 0.0,
            rng: StdRng::seed_from_u64(0x51_6E_41_4C),
            pending_status,
            outbox: Vec::new(),
            last_frame: Instant::now() - frame_period,
        }
    }

    fn synthesize_frame(&mut self) -> Vec<u8> {
        let mut channel0 = [0.0f32; SIM_SAMPLES_PER_FRAME];
        for slot in channel0.iter_mut() {
            *slot = self.phase.sin() + self.rng.gen_range(-0.05..0.05);
            self.phase += 2.0 * std::f32::consts::PI * self.tone_hz / SAMPLE_RATE_HZ;
        }
        self.phase %= 2.0 * std::f32::consts::PI;
        self.counter = self.counter.wrapping_add(1);
        encode_sample_frame(self.counter, &channel0)
    }
}

impl ByteSource for SimulatedSource {
    fn read_available(&mut self) -> Result<Vec<u8>, DriverError> {
        if self.closed {
            return Err(DriverError::PortClosed);
        }
        if let Some(status) = self.pending_status.pop_front() {
            return Ok(status);
        }
        let streaming = self
            .stream_start
            .map_or(false, |start| Instant::now() >= start);
        if !streaming {
            return Ok(Vec::new());
        }
        if self.outbox.is_empty() {
            if self.last_frame.elapsed() < self.frame_period {
                return Ok(Vec::new());
            }
            let frame = self.synthesize_frame();
            self.outbox.extend_from_slice(&frame);
            self.last_frame = Instant::now();
        }
        // hand out an irregular prefix so reads do not align to frames
        let take = self.rng.gen_range(32..=256).min(self.outbox.len());
        let rest = self.outbox.split_off(take);
        Ok(std::mem::replace(&mut self.outbox, rest))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::PortClosed);
        }
        if bytes == OutboundCommand::EnableChannel.encode() {
            self.pending_status.push_back(SIGNAL_PRESENT.to_vec());
        } else if bytes == OutboundCommand::DisableChannel.encode() {
            self.pending_status.push_back(SIGNAL_ABSENT.to_vec());
        } else if bytes == OutboundCommand::StartMeasurement.encode() {
            self.stream_start = Some(Instant::now() + self.start_delay);
        } else if bytes == OutboundCommand::StopMeasurement.encode() {
            self.stream_start = None;
        } else if bytes == OutboundCommand::CloseAllPorts.encode() {
            self.stream_start = None;
            self.closed = true;
        } else {
            debug!("simulated device ignoring payload {bytes:02X?}");
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
