//! Serialized progress display.
//!
//! Watchers never touch the terminal. They push [`ProgressEvent`]s through a
//! [`ProgressSink`]; a single [`ProgressRenderer`] task owns the surface and
//! applies events one at a time, interleaved with spinner ticks.

use chrono::Local;
use log::{debug, LevelFilter};
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Spinner redraw period
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Events a producer may have in flight before `send` waits for the renderer
pub const PROGRESS_QUEUE_DEPTH: usize = 8;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const INITIAL_DESCRIPTION: &str = "waiting";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Print a line above the spinner.
    Line(String),
    /// Replace the text next to the spinner.
    Describe(String),
}

/// One spinner redraw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    pub spinner: &'a str,
    pub description: &'a str,
    pub elapsed: Duration,
    pub remaining: Duration,
}

impl fmt::Display for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{} / {} left]",
            self.spinner,
            self.description,
            format_clock(self.elapsed),
            format_clock(self.remaining)
        )
    }
}

/// Render a duration as `12s`, `4m05s` or `1h02m03s`.
pub fn format_clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, mins, secs) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h{:02}m{:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m{:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

/// The display owned by the renderer.
pub trait ProgressSurface: Send + 'static {
    /// Erase the spinner line, if one is drawn.
    fn clear(&mut self) -> io::Result<()>;
    /// Redraw the spinner line.
    fn draw(&mut self, frame: &Frame<'_>) -> io::Result<()>;
    /// Print a permanent line. The spinner has already been cleared.
    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

/// ANSI spinner on a writer, normally stderr.
pub struct TerminalSurface<W> {
    out: W,
    animate: bool,
    drawn: bool,
}

impl TerminalSurface<io::Stderr> {
    /// Spinner on stderr, animated only when stderr is a terminal and no
    /// debug logging shares it.
    pub fn stderr() -> Self {
        let out = io::stderr();
        let animate = should_animate(out.is_terminal(), log::max_level());
        Self::new(out, animate)
    }
}

/// Debug and trace records are written to stderr mid-run, outside the
/// renderer, and would land on a half-drawn spinner line.
fn should_animate(is_terminal: bool, log_level: LevelFilter) -> bool {
    is_terminal && log_level < LevelFilter::Debug
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, animate: bool) -> Self {
        Self {
            out,
            animate,
            drawn: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> ProgressSurface for TerminalSurface<W> {
    fn clear(&mut self) -> io::Result<()> {
        if !self.drawn {
            return Ok(());
        }
        write!(self.out, "\r\x1b[2K")?;
        self.out.flush()?;
        self.drawn = false;
        Ok(())
    }

    fn draw(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        if !self.animate {
            return Ok(());
        }
        write!(self.out, "\r\x1b[2K{}", frame)?;
        self.out.flush()?;
        self.drawn = true;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(
            self.out,
            "{} {}",
            Local::now().format("%Y/%m/%d %H:%M:%S"),
            line
        )?;
        self.out.flush()
    }
}

/// Producer side of the progress queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    sender: mpsc::Sender<ProgressEvent>,
}

impl ProgressSink {
    /// Hand an event to the renderer, waiting while its queue is full.
    /// Events sent after the renderer stopped are dropped.
    pub async fn send(&self, event: ProgressEvent) {
        if let Err(e) = self.sender.send(event).await {
            debug!("progress_dropped: {:?}", e.0);
        }
    }

    pub async fn line(&self, text: impl Into<String>) {
        self.send(ProgressEvent::Line(text.into())).await
    }

    pub async fn describe(&self, text: impl Into<String>) {
        self.send(ProgressEvent::Describe(text.into())).await
    }
}

/// Consumer side: the only code that writes to the surface.
pub struct ProgressRenderer<P> {
    surface: P,
    events: mpsc::Receiver<ProgressEvent>,
    description: String,
    spinner: usize,
    started: Instant,
    timeout: Duration,
}

/// Create a sink/renderer pair. `started` and `timeout` drive the readout.
pub fn progress_channel<P: ProgressSurface>(
    surface: P,
    started: Instant,
    timeout: Duration,
) -> (ProgressSink, ProgressRenderer<P>) {
    let (sender, events) = mpsc::channel(PROGRESS_QUEUE_DEPTH);
    let renderer = ProgressRenderer {
        surface,
        events,
        description: INITIAL_DESCRIPTION.to_string(),
        spinner: 0,
        started,
        timeout,
    };
    (ProgressSink { sender }, renderer)
}

impl<P: ProgressSurface> ProgressRenderer<P> {
    /// Render until `cancel` fires, then apply whatever is still queued and
    /// clear the spinner. Returns the surface so callers can inspect it.
    pub async fn run(mut self, cancel: CancellationToken) -> io::Result<P> {
        let mut ticker = interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut open = true;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = self.events.recv(), if open => match event {
                    Some(event) => self.apply(event)?,
                    None => open = false,
                },
                _ = ticker.tick() => {
                    self.spinner = self.spinner.wrapping_add(1);
                    self.draw()?;
                }
            }
        }

        self.events.close();
        while let Ok(event) = self.events.try_recv() {
            self.apply(event)?;
        }
        self.surface.clear()?;
        Ok(self.surface)
    }

    fn apply(&mut self, event: ProgressEvent) -> io::Result<()> {
        match event {
            ProgressEvent::Line(text) => {
                self.surface.clear()?;
                self.surface.write_line(&text)?;
                self.draw()
            }
            ProgressEvent::Describe(text) => {
                self.description = text;
                self.draw()
            }
        }
    }

    fn draw(&mut self) -> io::Result<()> {
        let elapsed = self.started.elapsed();
        let frame = Frame {
            spinner: SPINNER_FRAMES[self.spinner % SPINNER_FRAMES.len()],
            description: &self.description,
            elapsed,
            remaining: self.timeout.saturating_sub(elapsed),
        };
        self.surface.draw(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Clear,
        Draw(String),
        Line(String),
    }

    #[derive(Clone, Default)]
    struct Recording(Arc<Mutex<Vec<Op>>>);

    impl ProgressSurface for Recording {
        fn clear(&mut self) -> io::Result<()> {
            self.0.lock().unwrap().push(Op::Clear);
            Ok(())
        }

        fn draw(&mut self, frame: &Frame<'_>) -> io::Result<()> {
            self.0
                .lock()
                .unwrap()
                .push(Op::Draw(frame.description.to_string()));
            Ok(())
        }

        fn write_line(&mut self, line: &str) -> io::Result<()> {
            self.0.lock().unwrap().push(Op::Line(line.to_string()));
            Ok(())
        }
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(Duration::ZERO), "0s");
        assert_eq!(format_clock(Duration::from_millis(59_900)), "59s");
        assert_eq!(format_clock(Duration::from_secs(245)), "4m05s");
        assert_eq!(format_clock(Duration::from_secs(3723)), "1h02m03s");
    }

    #[test]
    fn frame_readout() {
        let frame = Frame {
            spinner: "⠋",
            description: "waiting",
            elapsed: Duration::from_secs(12),
            remaining: Duration::from_secs(3588),
        };
        assert_eq!(frame.to_string(), "⠋ waiting [12s / 59m48s left]");
    }

    #[test]
    fn spinner_only_without_debug_logging() {
        assert!(should_animate(true, LevelFilter::Info));
        assert!(should_animate(true, LevelFilter::Off));
        assert!(!should_animate(true, LevelFilter::Debug));
        assert!(!should_animate(true, LevelFilter::Trace));
        assert!(!should_animate(false, LevelFilter::Info));
    }

    #[test]
    fn terminal_surface_without_animation_only_prints_lines() {
        let mut surface = TerminalSurface::new(Vec::new(), false);
        let frame = Frame {
            spinner: "⠋",
            description: "waiting",
            elapsed: Duration::ZERO,
            remaining: Duration::ZERO,
        };
        surface.draw(&frame).unwrap();
        surface.clear().unwrap();
        surface.write_line("got .ok").unwrap();

        let out = String::from_utf8(surface.into_inner()).unwrap();
        assert!(out.ends_with(" got .ok\n"));
        assert!(!out.contains('\x1b'));
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn terminal_surface_erases_the_spinner() {
        let mut surface = TerminalSurface::new(Vec::new(), true);
        let frame = Frame {
            spinner: "⠋",
            description: "waiting",
            elapsed: Duration::ZERO,
            remaining: Duration::from_secs(60),
        };
        surface.draw(&frame).unwrap();
        surface.clear().unwrap();
        // second clear is a no-op
        surface.clear().unwrap();

        let out = String::from_utf8(surface.into_inner()).unwrap();
        assert_eq!(out, "\r\x1b[2K⠋ waiting [0s / 1m00s left]\r\x1b[2K");
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_lines_never_interleave() {
        let recording = Recording::default();
        let (sink, renderer) =
            progress_channel(recording.clone(), Instant::now(), Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let render = tokio::spawn(renderer.run(cancel.clone()));

        let producers: Vec<_> = (0..3)
            .map(|p| {
                let sink = sink.clone();
                tokio::spawn(async move {
                    for i in 0..20 {
                        sink.line(format!("{}:{}", p, i)).await;
                        if i % 7 == 0 {
                            tokio::time::sleep(Duration::from_millis(130)).await;
                        }
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }
        cancel.cancel();
        render.await.unwrap().unwrap();

        let ops = recording.0.lock().unwrap().clone();
        let mut seen = vec![Vec::new(); 3];
        for (i, op) in ops.iter().enumerate() {
            if let Op::Line(text) = op {
                assert_eq!(ops[i - 1], Op::Clear, "line {text} not preceded by clear");
                assert!(matches!(ops[i + 1], Op::Draw(_)), "line {text} not followed by draw");
                let (p, n) = text.split_once(':').unwrap();
                seen[p.parse::<usize>().unwrap()].push(n.parse::<usize>().unwrap());
            }
        }
        for lines in seen {
            assert_eq!(lines, (0..20).collect::<Vec<_>>());
        }
        assert_eq!(ops.last(), Some(&Op::Clear));
    }

    #[tokio::test]
    async fn queued_events_survive_cancellation() {
        let recording = Recording::default();
        let (sink, renderer) =
            progress_channel(recording.clone(), Instant::now(), Duration::from_secs(60));
        let cancel = CancellationToken::new();

        sink.describe("running").await;
        sink.line("got .ok").await;
        cancel.cancel();
        renderer.run(cancel).await.unwrap();

        let ops = recording.0.lock().unwrap().clone();
        assert_eq!(
            ops,
            vec![
                Op::Draw("running".to_string()),
                Op::Clear,
                Op::Line("got .ok".to_string()),
                Op::Draw("running".to_string()),
                Op::Clear,
            ]
        );

        // renderer is gone, sending must not block
        sink.line("late").await;
    }
}
