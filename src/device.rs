//! Device session: command/response exchanges with a PMD-USB.

use std::io::{self, Read, Write};
use std::time::Duration;

use chrono::Local;
use log::debug;
use serialport::{DataBits, StopBits};

use crate::config::DeviceConfig;
use crate::errors::{DriverError, Result};
use crate::protocol::{self, Command};
use crate::types::Sample;

/// Upper bound on the sensor-struct response; the device sends fewer bytes.
const SENSOR_STRUCT_MAX: usize = 100;

/// Trait for Read + Write + Send, allowing different transport backends.
trait Transport: Read + Write + Send {}
impl<T: Read + Write + Send> Transport for T {}

/// An open session with a PMD-USB.
///
/// The session exclusively owns its transport handle and releases it when
/// dropped, on every exit path including decode failures. Every public
/// operation performs exactly one command write followed by one bounded read
/// of a known length; a short read within the timeout is a hard failure for
/// that exchange, never buffered into the next one.
pub struct PmdUsb {
    transport: Box<dyn Transport>,
}

impl PmdUsb {
    /// Open the serial port described by `config`.
    pub fn open(config: &DeviceConfig) -> Result<Self> {
        let port = serialport::new(config.port.as_str(), config.baudrate)
            .data_bits(data_bits(config.bytesize)?)
            .stop_bits(stop_bits(config.stopbits)?)
            .timeout(Duration::from_millis(config.timeout_ms))
            .open()?;
        debug!("opened {} at {} baud", config.port, config.baudrate);
        Ok(Self {
            transport: Box::new(port),
        })
    }

    /// Wrap an already-connected byte stream (scripted transports in tests,
    /// pre-opened ports).
    pub fn from_transport<T: Read + Write + Send + 'static>(transport: T) -> Self {
        Self {
            transport: Box::new(transport),
        }
    }

    /// Verify the identity handshake.
    ///
    /// Sends the welcome command and checks the full 18-byte response
    /// against the device identity string. A short response within the
    /// timeout is a handshake failure: nothing else the port says can be
    /// trusted without a verified device on the other end.
    pub fn verify_identity(&mut self) -> Result<()> {
        self.send_command(Command::Welcome)?;
        let frame = self
            .read_frame(protocol::WELCOME_LEN)
            .map_err(|e| match e {
                DriverError::ReadTimeout { expected, got } => DriverError::Handshake(format!(
                    "device sent {got} of {expected} identity bytes before timeout"
                )),
                other => other,
            })?;
        protocol::decode_welcome(&frame)?;
        debug!(
            "identity verified: {}",
            String::from_utf8_lossy(&frame[..protocol::WELCOME_LEN - 1])
        );
        Ok(())
    }

    /// Read the raw sensor definition struct (startup diagnostic probe).
    ///
    /// Returns whatever the device sends within one timeout, up to 100
    /// bytes. This is the only exchange without a fixed response length.
    pub fn read_sensor_struct(&mut self) -> Result<Vec<u8>> {
        self.send_command(Command::SensorStruct)?;
        let mut buf = vec![0u8; SENSOR_STRUCT_MAX];
        let n = match self.transport.read(&mut buf) {
            Ok(n) => n,
            Err(e) if is_timeout(&e) => 0,
            Err(e) => return Err(e.into()),
        };
        buf.truncate(n);
        Ok(buf)
    }

    /// Poll the live values and stamp them into a sample.
    pub fn read_values(&mut self) -> Result<Sample> {
        self.send_command(Command::ReadValues)?;
        let frame = self.read_frame(protocol::VALUES_LEN)?;
        let readings = protocol::decode_values(&frame)?;
        Ok(Sample::new(Local::now(), readings))
    }

    fn send_command(&mut self, command: Command) -> Result<()> {
        self.transport.write_all(&[command.byte()])?;
        self.transport.flush()?;
        Ok(())
    }

    /// Read exactly `len` bytes. The transport blocks up to its configured
    /// timeout per read; anything short of `len` by then fails the exchange.
    fn read_frame(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut frame = vec![0u8; len];
        let mut got = 0;
        while got < len {
            match self.transport.read(&mut frame[got..]) {
                Ok(0) => return Err(DriverError::ReadTimeout { expected: len, got }),
                Ok(n) => got += n,
                Err(e) if is_timeout(&e) => {
                    return Err(DriverError::ReadTimeout { expected: len, got })
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(frame)
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

fn data_bits(bits: u8) -> Result<DataBits> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(DriverError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported data bits: {other}"),
        ))),
    }
}

fn stop_bits(bits: u8) -> Result<StopBits> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(DriverError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported stop bits: {other}"),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_serial::MockSerial;
    use crate::types::Rail;

    #[test]
    fn verify_identity_accepts_the_device() {
        let mut mock = MockSerial::new();
        mock.push_response(protocol::WELCOME_FRAME);
        let mut session = PmdUsb::from_transport(mock);
        assert!(session.verify_identity().is_ok());
    }

    #[test]
    fn verify_identity_rejects_an_imposter() {
        let mut mock = MockSerial::new();
        mock.push_response(b"NotAPowerMeter 1.0");
        let mut session = PmdUsb::from_transport(mock);
        let err = session.verify_identity().unwrap_err();
        assert!(matches!(err, DriverError::Handshake(_)));
    }

    #[test]
    fn short_welcome_is_a_handshake_failure() {
        let mut mock = MockSerial::new();
        mock.push_response(&protocol::WELCOME_FRAME[..9]);
        let mut session = PmdUsb::from_transport(mock);
        let err = session.verify_identity().unwrap_err();
        assert!(matches!(err, DriverError::Handshake(_)));
    }

    #[test]
    fn read_values_decodes_a_scripted_frame() {
        let mut frame = [0u8; protocol::VALUES_LEN];
        frame[0] = 0x64; // 1.00 V
        frame[2] = 0x0A; // 1.0 A
        let mut mock = MockSerial::new();
        mock.push_response(&frame);
        let mut session = PmdUsb::from_transport(mock);

        let sample = session.read_values().unwrap();
        assert_eq!(sample.readings[0].rail, Rail::Pcie1);
        assert_eq!(sample.readings[0].power, 1.0);
    }

    #[test]
    fn silent_device_times_out_a_values_read() {
        let mut mock = MockSerial::new();
        mock.push_timeout();
        let mut session = PmdUsb::from_transport(mock);
        let err = session.read_values().unwrap_err();
        assert!(matches!(
            err,
            DriverError::ReadTimeout {
                expected: protocol::VALUES_LEN,
                got: 0
            }
        ));
    }

    #[test]
    fn partial_values_frame_times_out_with_count() {
        let mut mock = MockSerial::new();
        mock.push_response(&[0u8; 7]);
        let mut session = PmdUsb::from_transport(mock);
        let err = session.read_values().unwrap_err();
        assert!(matches!(
            err,
            DriverError::ReadTimeout {
                expected: protocol::VALUES_LEN,
                got: 7
            }
        ));
    }

    #[test]
    fn sensor_struct_probe_returns_raw_bytes() {
        let mut mock = MockSerial::new();
        mock.push_response(b"\x02sensor-definitions");
        let mut session = PmdUsb::from_transport(mock);
        let raw = session.read_sensor_struct().unwrap();
        assert_eq!(raw, b"\x02sensor-definitions");
    }
}
