//! Live terminal chart: voltage, current and power panels, one line per rail.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph};

use crate::types::{Metric, Rail, Sample};

const RAIL_COLORS: [Color; 4] = [Color::Cyan, Color::Magenta, Color::Yellow, Color::Green];

/// How long to wait for a key event before redrawing.
const FRAME_PERIOD: Duration = Duration::from_millis(100);

/// Terminal chart renderer.
///
/// Owns all of its axis and layout state and consumes immutable window
/// snapshots from the poll thread; it never reaches back into the window.
/// Stale snapshots are dropped so rendering always shows the newest one.
pub struct ChartApp {
    snapshot: Vec<Sample>,
    snapshots: Receiver<Vec<Sample>>,
    stop: Arc<AtomicBool>,
}

impl ChartApp {
    pub fn new(snapshots: Receiver<Vec<Sample>>, stop: Arc<AtomicBool>) -> Self {
        Self {
            snapshot: Vec::new(),
            snapshots,
            stop,
        }
    }

    /// Run until `q`/Esc, Ctrl-C, or the poll thread going away.
    pub fn run(mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
        while !self.stop.load(Ordering::Relaxed) {
            self.drain_snapshots();
            terminal.draw(|f| self.draw(f))?;

            if event::poll(FRAME_PERIOD)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press
                        && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                    {
                        self.stop.store(true, Ordering::Relaxed);
                    }
                }
            }
        }
        Ok(())
    }

    /// Keep only the newest snapshot; polling may outpace rendering.
    fn drain_snapshots(&mut self) {
        loop {
            match self.snapshots.try_recv() {
                Ok(snapshot) => self.snapshot = snapshot,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.stop.store(true, Ordering::Relaxed);
                    break;
                }
            }
        }
    }

    fn draw(&self, f: &mut Frame) {
        let panels = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ])
            .split(f.area());

        for (metric, area) in Metric::ALL.into_iter().zip(panels.iter()) {
            self.draw_panel(f, *area, metric);
        }
    }

    fn draw_panel(&self, f: &mut Frame, area: Rect, metric: Metric) {
        let title = panel_title(metric);

        let Some(newest) = self.snapshot.last() else {
            let block = Block::default().borders(Borders::ALL).title(title);
            let placeholder = Paragraph::new("waiting for samples... (q to quit)")
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            f.render_widget(placeholder, area);
            return;
        };

        // X axis: seconds since the oldest retained sample.
        let t0 = self.snapshot[0].timestamp;
        let series: Vec<Vec<(f64, f64)>> = (0..Rail::ALL.len())
            .map(|rail| {
                self.snapshot
                    .iter()
                    .map(|s| {
                        let dt = s.timestamp.signed_duration_since(t0);
                        let x = dt.num_milliseconds() as f64 / 1000.0;
                        (x, s.readings[rail].value(metric))
                    })
                    .collect()
            })
            .collect();

        let datasets: Vec<Dataset> = series
            .iter()
            .enumerate()
            .map(|(rail, points)| {
                let latest = points.last().map(|p| p.1).unwrap_or(0.0);
                Dataset::default()
                    .name(format!("{} {:.2}", Rail::ALL[rail], latest))
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(RAIL_COLORS[rail]))
                    .data(points)
            })
            .collect();

        let x_max = series[0].last().map(|p| p.0).unwrap_or(0.0).max(1.0);
        let values = series.iter().flatten().map(|p| p.1);
        let y_min = values.clone().fold(f64::MAX, f64::min);
        let y_max = values.fold(f64::MIN, f64::max);
        let pad = ((y_max - y_min) * 0.1).max(0.1);
        let y_lo = (y_min - pad).max(0.0);
        let y_hi = y_max + pad;

        let first = t0.format("%H:%M:%S").to_string();
        let last = newest.timestamp.format("%H:%M:%S").to_string();

        let chart = Chart::new(datasets)
            .block(Block::default().borders(Borders::ALL).title(title))
            .x_axis(
                Axis::default()
                    .bounds([0.0, x_max])
                    .labels(vec![Line::from(first), Line::from(last)]),
            )
            .y_axis(Axis::default().bounds([y_lo, y_hi]).labels(vec![
                Line::from(format!("{y_lo:.2}")),
                Line::from(format!("{y_hi:.2}")),
            ]));

        f.render_widget(chart, area);
    }
}

fn panel_title(metric: Metric) -> &'static str {
    match metric {
        Metric::Voltage => " Voltage [V] ",
        Metric::Current => " Current [A] ",
        Metric::Power => " Power [W] ",
    }
}
