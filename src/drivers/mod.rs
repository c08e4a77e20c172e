// src/drivers/mod.rs
pub mod buffer;
pub mod command;
pub mod error;
pub mod fft;
pub mod frame;
pub mod pipeline;
pub mod reassembly;
pub mod source;
// re-export the main entry points for callers outside the driver layer
pub use buffer::{TraceBuffer, TraceSnapshot, SAMPLE_RATE_HZ, TRACE_CAPACITY};
pub use command::OutboundCommand;
pub use error::DriverError;
pub use fft::{Spectrum, SpectrumBuilder, SPECTRUM_MIN_SAMPLES};
pub use frame::{SamplePacket, SignalStatus, StatusFrame, SAMPLE_FRAME_LEN};
pub use pipeline::{IngestReport, SignalPipeline};
pub use reassembly::FrameReassembler;
pub use source::{ByteSource, ManualSource, SimulatedSource};
