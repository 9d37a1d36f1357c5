//! Fixed-cadence polling driver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::device::PmdUsb;
use crate::types::Sample;
use crate::window::SampleWindow;

/// Drives periodic polling of an open session.
///
/// One tick is one values exchange. Successful samples land in the window
/// and the sink receives a fresh snapshot; failed ticks are logged and
/// skipped without aborting the loop. Ticks never overlap: the next poll is
/// issued only after the previous exchange has completed or failed.
pub struct PollLoop {
    period: Duration,
    stop: Arc<AtomicBool>,
}

impl PollLoop {
    pub fn new(period: Duration, stop: Arc<AtomicBool>) -> Self {
        Self { period, stop }
    }

    /// Poll until the stop flag is raised.
    ///
    /// The flag is checked between ticks; a tick in flight always runs to
    /// completion. Each tick sleeps away whatever remains of the period
    /// after the exchange, so the cadence stays close to `period` without
    /// drift from slow reads.
    pub fn run<F>(&self, session: &mut PmdUsb, window: &mut SampleWindow, mut sink: F)
    where
        F: FnMut(Vec<Sample>),
    {
        while !self.stop.load(Ordering::Relaxed) {
            let tick_started = Instant::now();
            match session.read_values() {
                Ok(sample) => {
                    window.append(sample);
                    sink(window.snapshot());
                }
                Err(e) => warn!("poll failed, skipping tick: {e}"),
            }
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            if let Some(rest) = self.period.checked_sub(tick_started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
        debug!("poll loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_serial::MockSerial;
    use crate::protocol;
    use crate::window::ROWS_PER_SAMPLE;

    fn values_frame(raw_voltage: u16) -> [u8; protocol::VALUES_LEN] {
        let mut frame = [0u8; protocol::VALUES_LEN];
        let le = raw_voltage.to_le_bytes();
        for rail in 0..4 {
            frame[rail * 4] = le[0];
            frame[rail * 4 + 1] = le[1];
        }
        frame
    }

    #[test]
    fn three_frames_produce_three_samples_in_order() {
        let mut mock = MockSerial::new();
        mock.push_response(protocol::WELCOME_FRAME);
        for n in 1..=3u16 {
            mock.push_response(&values_frame(n * 100));
        }
        let mut session = PmdUsb::from_transport(mock);
        session.verify_identity().unwrap();

        let mut window = SampleWindow::new(100 * ROWS_PER_SAMPLE);
        let stop = Arc::new(AtomicBool::new(false));
        let poll = PollLoop::new(Duration::ZERO, stop.clone());

        let mut snapshots = Vec::new();
        poll.run(&mut session, &mut window, |snapshot| {
            if snapshot.len() == 3 {
                stop.store(true, Ordering::Relaxed);
            }
            snapshots.push(snapshot);
        });

        assert_eq!(snapshots.len(), 3);
        let last = snapshots.last().unwrap();
        let voltages: Vec<f64> = last.iter().map(|s| s.readings[0].voltage).collect();
        assert_eq!(voltages, [1.0, 2.0, 3.0]);
        assert!(last.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn timeout_tick_is_skipped_and_polling_continues() {
        let mut mock = MockSerial::new();
        mock.push_response(&values_frame(100));
        mock.push_timeout();
        mock.push_response(&values_frame(200));
        let mut session = PmdUsb::from_transport(mock);

        let mut window = SampleWindow::new(100 * ROWS_PER_SAMPLE);
        let stop = Arc::new(AtomicBool::new(false));
        let poll = PollLoop::new(Duration::ZERO, stop.clone());

        let mut sink_calls = 0;
        poll.run(&mut session, &mut window, |snapshot| {
            sink_calls += 1;
            if snapshot.len() == 2 {
                stop.store(true, Ordering::Relaxed);
            }
        });

        // The timed-out tick contributed nothing; both good frames arrived.
        assert_eq!(sink_calls, 2);
        assert_eq!(window.len(), 2);
        let voltages: Vec<f64> = window.snapshot().iter().map(|s| s.readings[0].voltage).collect();
        assert_eq!(voltages, [1.0, 2.0]);
    }

    #[test]
    fn stop_raised_before_run_polls_nothing() {
        let mut mock = MockSerial::new();
        mock.push_response(&values_frame(100));
        let mut session = PmdUsb::from_transport(mock);

        let mut window = SampleWindow::new(100 * ROWS_PER_SAMPLE);
        let stop = Arc::new(AtomicBool::new(true));
        let poll = PollLoop::new(Duration::ZERO, stop);

        let mut sink_calls = 0;
        poll.run(&mut session, &mut window, |_| sink_calls += 1);

        assert_eq!(sink_calls, 0);
        assert!(window.is_empty());
    }
}
