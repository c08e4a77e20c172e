// src/types.rs

use crate::drivers::buffer::TraceSnapshot;
use crate::drivers::fft::Spectrum;
use crate::drivers::frame::SignalStatus;

// control messages into the ingestion engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineCommand {
    /// A new measurement run begins: reset the window and session clock.
    BeginSession,
    /// Stop draining the source and release it.
    Shutdown,
}

// events published by the engine for display and persistence sinks
#[derive(Clone, Debug)]
pub enum DeviceEvent {
    /// Battery level decoded from a status frame.
    Battery(u16),
    /// Data-signal indicator changed.
    Signal(SignalStatus),
    /// Window contents after an append; feeds charts and the CSV sink.
    Trace(TraceSnapshot),
    /// Fresh magnitude spectrum over the current window.
    Spectrum(Spectrum),
    /// The source stopped yielding data (external close or transport error).
    Closed(String),
}
