// src/main.rs
use std::path::PathBuf;
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use log::{info, warn};

use emglink::drivers::command::OutboundCommand;
use emglink::drivers::source::{ByteSource, SimulatedSource};
use emglink::engine::spawn_ingest;
use emglink::link::{self, CommandPort, LinkConfig, SerialLink};
use emglink::recorder::TraceRecorder;
use emglink::types::{DeviceEvent, EngineCommand};

/// Tone frequency of the synthetic device, Hz.
const SIM_TONE_HZ: f32 = 20.0;
/// Idle period granted to status traffic before the stream is started.
const SETTLE: Duration = Duration::from_millis(300);

#[derive(Parser, Debug)]
#[command(
    name = "emglink",
    about = "Stream, decode and analyze biosignal data from a serial device"
)]
struct Args {
    /// Serial port to open (e.g., /dev/ttyUSB0 or COM4)
    #[arg(short, long)]
    port: Option<String>,
    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,
    /// JSON file with link settings (overridden by --port/--baud)
    #[arg(long)]
    config: Option<PathBuf>,
    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
    /// Run against a synthetic device instead of hardware
    #[arg(long)]
    simulate: bool,
    /// Measurement duration in seconds
    #[arg(long, default_value_t = 30)]
    seconds: u64,
    /// Rewrite the rolling window to this CSV file on every update
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Send raw hex bytes (space separated, e.g. "04 00 0A 01 02") and exit
    #[arg(long)]
    send: Option<String>,
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    if args.list_ports {
        for name in link::list_ports()? {
            println!("{name}");
        }
        return Ok(());
    }

    if args.simulate {
        let mut source = SimulatedSource::new(SIM_TONE_HZ);
        source.write(OutboundCommand::EnableChannel.encode())?;
        source.write(OutboundCommand::StartMeasurement.encode())?;
        info!("running against the synthetic device ({SIM_TONE_HZ} Hz tone)");
        return run_session(source, None, &args);
    }

    let mut config = match &args.config {
        Some(path) => LinkConfig::from_json_file(path)?,
        None => LinkConfig::default(),
    };
    if let Some(port) = &args.port {
        config.port = port.clone();
    }
    if let Some(baud) = args.baud {
        config.baud_rate = baud;
    }
    ensure!(
        !config.port.is_empty(),
        "no serial port specified; use --port, --config or --list-ports"
    );

    let link = SerialLink::open(&config)?;
    let mut commands = link.command_port()?;

    if let Some(hex) = &args.send {
        let payload = parse_hex_payload(hex)?;
        commands.send_raw(&payload)?;
        info!("sent {} byte(s) to {}", payload.len(), config.port);
        return Ok(());
    }

    commands.send(OutboundCommand::EnableChannel)?;
    run_session(link, Some(commands), &args)
}

/// Drives one measurement run: spawns the ingestion thread, lets the idle
/// status traffic drain, starts the device, consumes events until the
/// deadline, then stops the device and shuts the engine down.
///
/// Starting the stream only after the settle period keeps the short status
/// frames out of the middle of the bulk byte sequence, and the session reset
/// clears whatever did reach the reassembler beforehand.
fn run_session<S>(source: S, mut commands: Option<CommandPort>, args: &Args) -> Result<()>
where
    S: ByteSource + Send + 'static,
{
    let (tx_event, rx_event) = mpsc::channel();
    let (tx_cmd, rx_cmd) = mpsc::channel();
    let measuring = Arc::new(AtomicBool::new(false));
    let handle = spawn_ingest(source, measuring.clone(), tx_event, rx_cmd);
    let recorder = args.csv.as_ref().map(TraceRecorder::new);

    if pump_events(&rx_event, recorder.as_ref(), Instant::now() + SETTLE) {
        if let Some(commands) = commands.as_mut() {
            commands.send(OutboundCommand::StartMeasurement)?;
        }
        measuring.store(true, Ordering::Relaxed);
        let _ = tx_cmd.send(EngineCommand::BeginSession);
        info!("measuring for {} second(s)", args.seconds);

        let deadline = Instant::now() + Duration::from_secs(args.seconds);
        pump_events(&rx_event, recorder.as_ref(), deadline);

        measuring.store(false, Ordering::Relaxed);
        if let Some(commands) = commands.as_mut() {
            commands.send(OutboundCommand::StopMeasurement)?;
        }
    }

    let _ = tx_cmd.send(EngineCommand::Shutdown);
    let _ = handle.join();
    Ok(())
}

/// Consumes engine events until the deadline. Returns `false` once the
/// source is gone and no further events will arrive.
fn pump_events(
    rx: &Receiver<DeviceEvent>,
    recorder: Option<&TraceRecorder>,
    until: Instant,
) -> bool {
    while Instant::now() < until {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(DeviceEvent::Battery(level)) => info!("battery level: {level}"),
            Ok(DeviceEvent::Signal(status)) => info!("data signal: {status:?}"),
            Ok(DeviceEvent::Trace(snapshot)) => {
                if let Some(recorder) = recorder {
                    if let Err(e) = recorder.write_snapshot(&snapshot) {
                        warn!("failed to persist snapshot: {e}");
                    }
                }
            }
            Ok(DeviceEvent::Spectrum(spectrum)) => {
                if let Some((hz, magnitude)) = spectrum.peak() {
                    info!("spectrum peak at {hz:.1} Hz (|X| = {magnitude:.1})");
                }
            }
            Ok(DeviceEvent::Closed(reason)) => {
                warn!("source closed: {reason}");
                return false;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
    true
}

/// Parses the operator's space-separated hex byte string ("04 00 0A").
fn parse_hex_payload(input: &str) -> Result<Vec<u8>> {
    let payload: Vec<u8> = input
        .split_whitespace()
        .map(|token| {
            let digits = token.trim_start_matches("0x").trim_start_matches("0X");
            u8::from_str_radix(digits, 16).with_context(|| format!("invalid hex byte {token:?}"))
        })
        .collect::<Result<_>>()?;
    ensure!(!payload.is_empty(), "no hex bytes to send");
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_payload_accepts_bare_and_prefixed_bytes() {
        assert_eq!(
            parse_hex_payload("04 00 0A 0x01 0X02").unwrap(),
            vec![0x04, 0x00, 0x0A, 0x01, 0x02]
        );
    }

    #[test]
    fn hex_payload_rejects_junk() {
        assert!(parse_hex_payload("zz").is_err());
        assert!(parse_hex_payload("").is_err());
    }
}
