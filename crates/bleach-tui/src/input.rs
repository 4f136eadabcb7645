//! Terminal input thread.
//!
//! Polls crossterm on a dedicated OS thread and forwards key presses,
//! resizes and periodic [`Event::Tick`]s into the event loop's channel.
//! While a child process owns the terminal (an interactive password prompt)
//! the thread is paused so it does not steal the child's keystrokes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as TermEvent, KeyEventKind};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::event::Event;

/// Longest single poll; bounds how quickly pause and stop are noticed.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// How long [`InputReader::pause`] waits for the thread to acknowledge.
const PAUSE_ACK_TIMEOUT: Duration = Duration::from_secs(1);

/// Handle to the input thread. Dropping it stops the thread.
pub struct InputReader {
    paused: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    ack_rx: std_mpsc::Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl InputReader {
    /// Start reading terminal input, with a tick every `tick_rate`.
    pub fn spawn(tx: UnboundedSender<Event>, tick_rate: Duration) -> std::io::Result<Self> {
        let paused = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));
        let (ack_tx, ack_rx) = std_mpsc::channel();

        let thread = std::thread::Builder::new().name("bleach-input".into()).spawn({
            let paused = Arc::clone(&paused);
            let stop = Arc::clone(&stop);
            move || read_loop(tx, tick_rate, paused, stop, ack_tx)
        })?;

        Ok(Self {
            paused,
            stop,
            ack_rx,
            thread: Some(thread),
        })
    }

    /// Stop reading the terminal and wait until the thread has let go of it.
    pub fn pause(&self) {
        while self.ack_rx.try_recv().is_ok() {}
        self.paused.store(true, Ordering::SeqCst);
        if self.ack_rx.recv_timeout(PAUSE_ACK_TIMEOUT).is_err() {
            warn!("input thread did not acknowledge pause");
        }
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("input thread panicked");
            }
        }
    }
}

fn read_loop(
    tx: UnboundedSender<Event>,
    tick_rate: Duration,
    paused: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    ack_tx: std_mpsc::Sender<()>,
) {
    let mut last_tick = Instant::now();
    let mut acked = false;

    while !stop.load(Ordering::SeqCst) {
        if paused.load(Ordering::SeqCst) {
            if !acked {
                let _ = ack_tx.send(());
                acked = true;
            }
            std::thread::sleep(POLL_SLICE);
            continue;
        }
        acked = false;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed()).min(POLL_SLICE);
        let forwarded = match event::poll(timeout) {
            Ok(true) => match event::read() {
                Ok(TermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    tx.send(Event::Key(key)).is_ok()
                }
                Ok(TermEvent::Resize(width, height)) => tx.send(Event::Resize(width, height)).is_ok(),
                Ok(_) => true,
                Err(e) => {
                    warn!(error = %e, "failed to read terminal event");
                    break;
                }
            },
            Ok(false) => true,
            Err(e) => {
                warn!(error = %e, "failed to poll terminal");
                break;
            }
        };

        if !forwarded {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            if tx.send(Event::Tick).is_err() {
                break;
            }
            last_tick = Instant::now();
        }
    }

    debug!("input thread exiting");
}
