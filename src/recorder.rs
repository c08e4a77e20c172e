use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use log::debug;

use crate::drivers::buffer::TraceSnapshot;

/// Persistence sink: serializes trace snapshots to a two-column CSV.
///
/// The whole file is rewritten on every offer, so it always holds the
/// current sliding window rather than an ever-growing append log.
pub struct TraceRecorder {
    path: PathBuf,
}

impl TraceRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Replaces the file contents with the snapshot's (timestamp, value) rows.
    pub fn write_snapshot(&self, snapshot: &TraceSnapshot) -> std::io::Result<()> {
        let mut w = BufWriter::new(File::create(&self.path)?);
        writeln!(w, "Time (s),Value")?;
        for (timestamp, value) in snapshot.timestamps.iter().zip(&snapshot.values) {
            writeln!(w, "{timestamp:.4},{value:.6}")?;
        }
        w.flush()?;
        debug!(
            "wrote {} samples to {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }
}
