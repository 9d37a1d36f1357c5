use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use serialport::SerialPortType;

use pmdmon::config::AppConfig;
use pmdmon::device::PmdUsb;
use pmdmon::export::CsvSink;
use pmdmon::logging;
use pmdmon::poll::PollLoop;
use pmdmon::tui::ChartApp;
use pmdmon::window::SampleWindow;

#[derive(Parser, Debug)]
#[command(
    name = "pmdmon",
    about = "Live power monitor for the ElmorLabs PMD-USB",
    version
)]
struct Args {
    /// Configuration file (TOML).
    #[arg(long, default_value = "pmdmon.toml")]
    config: PathBuf,
    /// Serial port override (e.g. /dev/ttyUSB0, COM9).
    #[arg(short, long)]
    port: Option<String>,
    /// Baud rate override.
    #[arg(long)]
    baudrate: Option<u32>,
    /// Poll period override in milliseconds.
    #[arg(long)]
    period_ms: Option<u64>,
    /// Window capacity override in flattened rows.
    #[arg(long)]
    max_length: Option<usize>,
    /// CSV log path override.
    #[arg(long)]
    csv: Option<String>,
    /// Disable the CSV log.
    #[arg(long)]
    no_csv: bool,
    /// List available serial ports and exit.
    #[arg(long)]
    list_ports: bool,
    /// Run without the terminal chart (CSV log only).
    #[arg(long)]
    headless: bool,
}

fn main() {
    logging::init_logging();
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    if args.list_ports {
        return list_ports();
    }

    let mut config = AppConfig::load(&args.config);
    if let Some(port) = args.port {
        config.device.port = port;
    }
    if let Some(baudrate) = args.baudrate {
        config.device.baudrate = baudrate;
    }
    if let Some(period_ms) = args.period_ms {
        config.monitor.poll_period_ms = period_ms;
    }
    if let Some(max_length) = args.max_length {
        config.monitor.max_length = max_length;
    }
    if let Some(csv) = args.csv {
        config.monitor.csv_path = csv;
    }
    if args.no_csv {
        config.monitor.csv_enabled = false;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        bail!("invalid configuration: {}", errors.join("; "));
    }

    let mut session = PmdUsb::open(&config.device)
        .with_context(|| format!("failed to open {}", config.device.port))?;

    // A failed handshake is fatal: without a verified device on the other
    // end every decoded frame would be garbage.
    session
        .verify_identity()
        .context("identity handshake failed")?;
    info!("PMD-USB verified on {}", config.device.port);

    match session.read_sensor_struct() {
        Ok(raw) => debug!("sensor struct ({} bytes): {:02X?}", raw.len(), raw),
        Err(e) => warn!("sensor struct probe failed: {e}"),
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
            .context("failed to install Ctrl-C handler")?;
    }

    let mut csv = if config.monitor.csv_enabled {
        Some(CsvSink::open(Path::new(&config.monitor.csv_path))?)
    } else {
        None
    };

    let mut window = SampleWindow::new(config.monitor.max_length);
    let poll = PollLoop::new(
        Duration::from_millis(config.monitor.poll_period_ms),
        stop.clone(),
    );

    let (tx, rx) = mpsc::channel();
    let poller = thread::spawn(move || {
        poll.run(&mut session, &mut window, move |snapshot| {
            if let Some(csv) = csv.as_mut() {
                if let Some(newest) = snapshot.last() {
                    if let Err(e) = csv.append(newest) {
                        warn!("csv append failed: {e}");
                    }
                }
            }
            // The renderer going away is fine; the stop flag ends the loop.
            let _ = tx.send(snapshot);
        });
    });

    if args.headless {
        drop(rx);
        info!("headless mode, Ctrl-C to stop");
    } else {
        let tui_result = ChartApp::new(rx, stop.clone()).run();
        stop.store(true, Ordering::Relaxed);
        tui_result?;
    }

    poller
        .join()
        .map_err(|_| anyhow!("poll thread panicked"))?;
    Ok(())
}

fn list_ports() -> Result<()> {
    let ports = serialport::available_ports().context("failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }
    println!("USB PORTS:");
    for port in ports {
        match port.port_type {
            SerialPortType::UsbPort(usb) => {
                let product = usb.product.unwrap_or_else(|| "unknown device".into());
                println!(
                    "  {}  {:04x}:{:04x}  {}",
                    port.port_name, usb.vid, usb.pid, product
                );
            }
            _ => println!("  {}", port.port_name),
        }
    }
    Ok(())
}
