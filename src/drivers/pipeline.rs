use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::debug;

use crate::drivers::buffer::{TraceBuffer, TraceSnapshot};
use crate::drivers::fft::{Spectrum, SpectrumBuilder};
use crate::drivers::frame::{classify_chunk, decode_sample_frame, StatusFrame};
use crate::drivers::reassembly::FrameReassembler;

/// Everything one raw chunk produced on its way through the pipeline.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub status: Option<StatusFrame>,
    /// Complete sample frames decoded from this chunk.
    pub frames: usize,
    /// Window contents after the appends, when any frame landed.
    pub snapshot: Option<TraceSnapshot>,
    /// Fresh spectrum, when the window is past the recompute threshold.
    pub spectrum: Option<Spectrum>,
}

/// Chunk-to-spectrum pipeline: classify, reassemble, decode, buffer, analyze.
///
/// Owned by the ingestion context, which is the buffer's single writer;
/// consumers only ever see the owned snapshots and spectra in the report.
pub struct SignalPipeline {
    reassembler: FrameReassembler,
    buffer: TraceBuffer,
    analyzer: SpectrumBuilder,
    last_counter: Option<u16>,
    counter_gaps: u64,
}

impl SignalPipeline {
    pub fn new(measuring: Arc<AtomicBool>) -> Self {
        Self {
            reassembler: FrameReassembler::new(),
            buffer: TraceBuffer::new(measuring),
            analyzer: SpectrumBuilder::new(),
            last_counter: None,
            counter_gaps: 0,
        }
    }

    /// Routes one chunk. Status classification never withholds bytes from
    /// reassembly: bulk sample data may share a read with a status frame, so
    /// every chunk is also offered to the reassembler.
    pub fn ingest_chunk(&mut self, chunk: &[u8]) -> IngestReport {
        let status = classify_chunk(chunk);
        let mut frames = 0;
        for frame in self.reassembler.push_chunk(chunk) {
            let Some(packet) = decode_sample_frame(&frame) else {
                continue;
            };
            self.note_counter(packet.counter);
            self.buffer.append(&packet.samples);
            frames += 1;
        }
        let (snapshot, spectrum) = if frames > 0 {
            let spectrum = self.analyzer.compute_if_ready(self.buffer.values());
            (Some(self.buffer.snapshot()), spectrum)
        } else {
            (None, None)
        };
        IngestReport {
            status,
            frames,
            snapshot,
            spectrum,
        }
    }

    /// Starts a fresh measurement run: clears the window, the session clock,
    /// and any half-assembled frame left over from the idle stream.
    pub fn begin_session(&mut self) {
        self.buffer.reset();
        self.reassembler.reset();
        self.last_counter = None;
    }

    pub fn snapshot(&self) -> TraceSnapshot {
        self.buffer.snapshot()
    }

    /// Counter discontinuities observed so far. Informational only; frames
    /// are never reordered or re-requested.
    pub fn counter_gaps(&self) -> u64 {
        self.counter_gaps
    }

    fn note_counter(&mut self, counter: u16) {
        if let Some(last) = self.last_counter {
            let expected = last.wrapping_add(1);
            if counter != expected {
                self.counter_gaps += 1;
                debug!("packet counter jumped {last} -> {counter} (expected {expected})");
            }
        }
        self.last_counter = Some(counter);
    }
}
