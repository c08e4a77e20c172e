// src/engine.rs
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info};

use crate::drivers::frame::StatusFrame;
use crate::drivers::pipeline::SignalPipeline;
use crate::drivers::source::ByteSource;
use crate::types::{DeviceEvent, EngineCommand};

/// Pause between polls while the source has nothing pending.
const IDLE_POLL: Duration = Duration::from_millis(5);

enum Flow {
    Continue,
    Stop,
}

/// Spawns the ingestion context: drains the byte source, drives the
/// classify/reassemble/decode/buffer/analyze pipeline and broadcasts owned
/// snapshots over the event channel.
///
/// The thread is the pipeline's single writer; readers only ever receive
/// owned copies, so they can never observe the parallel sequences mid-trim.
/// It blocks only on the I/O read itself and exits on `Shutdown`, on a
/// transport error (after reporting it), or once every receiver is gone.
/// A partial frame left in the reassembler is discarded with the pipeline.
pub fn spawn_ingest<S>(
    mut source: S,
    measuring: Arc<AtomicBool>,
    tx: Sender<DeviceEvent>,
    rx: Receiver<EngineCommand>,
) -> JoinHandle<()>
where
    S: ByteSource + Send + 'static,
{
    thread::spawn(move || {
        let mut pipeline = SignalPipeline::new(measuring);
        info!("ingestion loop started");
        loop {
            if let Flow::Stop = drain_commands(&rx, &mut pipeline) {
                break;
            }
            let chunk = match source.read_available() {
                Ok(chunk) => chunk,
                Err(e) => {
                    error!("transport failure, stopping ingestion: {e}");
                    let _ = tx.send(DeviceEvent::Closed(e.to_string()));
                    break;
                }
            };
            if chunk.is_empty() {
                thread::sleep(IDLE_POLL);
                continue;
            }
            let report = pipeline.ingest_chunk(&chunk);
            if !forward(&tx, report) {
                break;
            }
        }
        source.close();
        info!("ingestion loop stopped");
    })
}

fn drain_commands(rx: &Receiver<EngineCommand>, pipeline: &mut SignalPipeline) -> Flow {
    loop {
        match rx.try_recv() {
            Ok(EngineCommand::BeginSession) => pipeline.begin_session(),
            Ok(EngineCommand::Shutdown) => return Flow::Stop,
            Err(TryRecvError::Empty) => return Flow::Continue,
            Err(TryRecvError::Disconnected) => return Flow::Stop,
        }
    }
}

fn forward(tx: &Sender<DeviceEvent>, report: crate::drivers::pipeline::IngestReport) -> bool {
    let mut alive = true;
    match report.status {
        Some(StatusFrame::Battery(level)) => {
            alive &= tx.send(DeviceEvent::Battery(level)).is_ok();
        }
        Some(StatusFrame::Signal(status)) => {
            alive &= tx.send(DeviceEvent::Signal(status)).is_ok();
        }
        None => {}
    }
    if let Some(snapshot) = report.snapshot {
        alive &= tx.send(DeviceEvent::Trace(snapshot)).is_ok();
    }
    if let Some(spectrum) = report.spectrum {
        alive &= tx.send(DeviceEvent::Spectrum(spectrum)).is_ok();
    }
    alive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::frame::{encode_sample_frame, SignalStatus};
    use crate::drivers::source::ManualSource;
    use std::sync::mpsc;

    fn collect_events(chunks: Vec<Vec<u8>>) -> Vec<DeviceEvent> {
        let (tx, rx_events) = mpsc::channel();
        let (_tx_cmd, rx_cmd) = mpsc::channel();
        let measuring = Arc::new(AtomicBool::new(true));
        let handle = spawn_ingest(ManualSource::new(chunks), measuring, tx, rx_cmd);
        handle.join().unwrap();
        rx_events.try_iter().collect()
    }

    #[test]
    fn playback_produces_status_trace_and_close_events() {
        let battery = vec![0x08, 0, 0, 0, 0, 0, 0, 0x01, 0x0A];
        let signal = vec![0xFF, 0x01, 0x01];
        let frame = encode_sample_frame(1, &[0.5; 24]);
        let events = collect_events(vec![battery, signal, frame]);

        assert!(matches!(events[0], DeviceEvent::Battery(266)));
        assert!(matches!(
            events[1],
            DeviceEvent::Signal(SignalStatus::Present)
        ));
        assert!(matches!(&events[2], DeviceEvent::Trace(s) if s.len() == 24));
        assert!(matches!(events.last(), Some(DeviceEvent::Closed(_))));
    }

    #[test]
    fn shutdown_command_ends_the_loop_without_close_event() {
        let (tx, rx_events) = mpsc::channel();
        let (tx_cmd, rx_cmd) = mpsc::channel();
        let measuring = Arc::new(AtomicBool::new(false));
        // an endless supply of empty polls
        let source = ManualSource::new(std::iter::repeat(Vec::new()).take(100_000));
        let handle = spawn_ingest(source, measuring, tx, rx_cmd);
        tx_cmd.send(EngineCommand::Shutdown).unwrap();
        handle.join().unwrap();
        assert!(rx_events
            .try_iter()
            .all(|e| !matches!(e, DeviceEvent::Closed(_))));
    }

    #[test]
    fn transport_error_reports_closed() {
        let events = collect_events(vec![vec![0u8; 10]]);
        assert!(matches!(events.last(), Some(DeviceEvent::Closed(_))));
    }
}
