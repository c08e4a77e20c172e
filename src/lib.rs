//! Serial acquisition core for a framed biosignal (EEG/EMG/ECG) device.
//!
//! The crate decodes the device's framed binary protocol from arbitrarily
//! chunked serial reads, maintains a bounded rolling window of channel-0
//! voltages, and computes a magnitude spectrum over that window. Ingestion
//! runs on its own thread ([`engine::spawn_ingest`]) and publishes owned
//! snapshots; device control goes through an independent write handle
//! ([`link::CommandPort`]).

pub mod drivers;
pub mod engine;
pub mod link;
pub mod recorder;
pub mod types;
