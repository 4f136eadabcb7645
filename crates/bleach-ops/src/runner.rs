//! Process runner and line streamer.
//!
//! [`ProcessRunner::start`] launches an operation with stdout and stderr
//! attached to the write end of one OS pipe, so both channels are merged in
//! the order the process wrote them before any line splitting happens. A
//! blocking reader splits the merged stream into lines; an async driver
//! forwards them to the event loop one at a time.
//!
//! ## Pacing
//!
//! After each [`StreamEvent::Line`] the driver waits until the consumer calls
//! [`StreamHandle::request_next`]. At most one line is in flight and at most
//! one more is buffered, whatever the volume of output.
//!
//! ## Termination
//!
//! Every stream ends with exactly one [`StreamEvent::Complete`], including
//! when the program cannot be started or the stream is cancelled. Nothing is
//! sent after it.
//!
//! The stream completes when the started process exits, not when its output
//! pipe closes. Output still buffered at exit is forwarded first; descendants
//! left running in the background do not hold the stream open.
//!
//! The process leads its own process group. Cancelling, or dropping the
//! handle, signals the whole group so that commands started through a shell
//! or `sudo` stop with it.

use std::fmt;
use std::io::{self, BufRead, BufReader, PipeReader};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use bleach_core::{BleachError, OperationDescriptor};
use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// After the process exits, how long to wait for each further buffered line.
const DRAIN_IDLE: Duration = Duration::from_millis(200);

/// How long a cancelled process group gets between SIGTERM and SIGKILL.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// How a stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    /// The process exited with status 0
    Success,
    /// The process exited unsuccessfully
    Failed {
        exit_code: Option<i32>,
        message: String,
    },
    /// The process could not be started
    StartFailed { message: String },
    /// The stream was cancelled and the process killed
    Cancelled,
}

impl StreamStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, StreamStatus::Success)
    }

    fn from_exit(status: ExitStatus) -> Self {
        if status.success() {
            return StreamStatus::Success;
        }
        let message = match status.code() {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        StreamStatus::Failed {
            exit_code: status.code(),
            message,
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamStatus::Success => write!(f, "success"),
            StreamStatus::Failed { message, .. } => write!(f, "{message}"),
            StreamStatus::StartFailed { message } => write!(f, "{message}"),
            StreamStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Events produced by one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// One line of merged output, without its terminator
    Line(String),
    /// Terminal event of the stream
    Complete(StreamStatus),
}

/// Control handle for one running operation.
///
/// Owned by whoever consumes the stream for the lifetime of that one
/// operation. Dropping it cancels the operation.
#[derive(Debug)]
pub struct StreamHandle {
    next: Arc<Notify>,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Allow the driver to emit the next line.
    pub fn request_next(&self) {
        self.next.notify_one();
    }

    /// Ask the driver to kill the process and finish with
    /// [`StreamStatus::Cancelled`].
    ///
    /// Returns false if cancellation was already requested.
    pub fn cancel(&mut self) -> bool {
        match self.cancel.take() {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_none()
    }
}

/// Starts operations on a tokio runtime.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    runtime: Handle,
}

impl ProcessRunner {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Start `operation` and stream its output to `tx`.
    ///
    /// Never fails: a process that cannot be spawned produces an immediate
    /// [`StreamStatus::StartFailed`] completion.
    pub fn start<E>(&self, operation: &OperationDescriptor, tx: UnboundedSender<E>) -> StreamHandle
    where
        E: From<StreamEvent> + Send + 'static,
    {
        let next = Arc::new(Notify::new());
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = self
            .runtime
            .spawn(drive(operation.clone(), tx, Arc::clone(&next), cancel_rx));

        StreamHandle {
            next,
            cancel: Some(cancel_tx),
            task,
        }
    }
}

#[instrument(level = "debug", skip_all, fields(operation = %operation.title))]
async fn drive<E>(
    operation: OperationDescriptor,
    tx: UnboundedSender<E>,
    next: Arc<Notify>,
    mut cancel_rx: oneshot::Receiver<()>,
) where
    E: From<StreamEvent> + Send + 'static,
{
    info!(command = %operation.command_line(), "starting operation");

    let status = match spawn_merged(&operation) {
        Ok((mut child, reader)) => {
            let mut group = ProcessGroup::of(&child);
            pump(&mut child, &mut group, reader, &tx, &next, &mut cancel_rx).await
        }
        Err(e) => {
            let err = BleachError::process_start(&operation.program, e.to_string());
            warn!(error = %err, "operation failed to start");
            StreamStatus::StartFailed {
                message: err.to_string(),
            }
        }
    };

    if let StreamStatus::Failed { exit_code, .. } = &status {
        let err = BleachError::process_exit(&operation.program, *exit_code);
        warn!(error = %err, "operation failed");
    }
    info!(status = %status, "operation finished");
    let _ = tx.send(StreamEvent::Complete(status).into());
}

/// Spawn the process with both output channels on one pipe.
fn spawn_merged(operation: &OperationDescriptor) -> io::Result<(Child, PipeReader)> {
    let (reader, writer) = io::pipe()?;
    let writer_err = writer.try_clone()?;

    let mut command = Command::new(&operation.program);
    command
        .args(&operation.args)
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(writer_err)
        .process_group(0)
        .kill_on_drop(true);
    let child = command.spawn()?;
    // The command keeps our copies of the write end open; EOF on the reader
    // requires every writer to be closed.
    drop(command);

    Ok((child, reader))
}

/// The process group led by a started operation.
///
/// Dropped while still armed, it SIGKILLs every member of the group.
struct ProcessGroup {
    pgid: Option<libc::pid_t>,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self {
            pgid: child.id().and_then(|id| libc::pid_t::try_from(id).ok()),
        }
    }

    fn signal(&self, signal: libc::c_int) {
        let Some(pgid) = self.pgid else { return };
        // SAFETY: killpg only takes plain integers.
        if unsafe { libc::killpg(pgid, signal) } != 0 {
            debug!(pgid, signal, error = %io::Error::last_os_error(), "killpg failed");
        }
    }

    /// Leave whatever the process left behind alone.
    fn release(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.signal(libc::SIGKILL);
    }
}

/// One wake-up of the driver.
enum Step {
    Cancel,
    Exited(io::Result<ExitStatus>),
    Line(Option<String>),
}

async fn pump<E>(
    child: &mut Child,
    group: &mut ProcessGroup,
    reader: PipeReader,
    tx: &UnboundedSender<E>,
    next: &Notify,
    cancel_rx: &mut oneshot::Receiver<()>,
) -> StreamStatus
where
    E: From<StreamEvent> + Send + 'static,
{
    let (line_tx, mut line_rx) = mpsc::channel::<String>(1);
    tokio::task::spawn_blocking(move || read_lines(reader, line_tx));

    let mut exit: Option<io::Result<ExitStatus>> = None;
    let mut open = true;

    while open {
        let step = tokio::select! {
            biased;
            _ = &mut *cancel_rx => Step::Cancel,
            status = child.wait(), if exit.is_none() => Step::Exited(status),
            line = next_line(&mut line_rx, exit.is_some()) => Step::Line(line),
        };

        match step {
            Step::Cancel => return terminate(child, group).await,
            Step::Exited(status) => {
                debug!("process exited, draining buffered output");
                group.release();
                exit = Some(status);
            }
            Step::Line(None) => open = false,
            Step::Line(Some(line)) => {
                if tx.send(StreamEvent::Line(line).into()).is_err() {
                    debug!("event loop is gone, stopping operation");
                    return terminate(child, group).await;
                }
                tokio::select! {
                    biased;
                    _ = &mut *cancel_rx => return terminate(child, group).await,
                    _ = next.notified() => {}
                }
            }
        }
    }

    let status = match exit {
        Some(status) => status,
        None => {
            // Output closed but the process is still running
            let step = tokio::select! {
                biased;
                _ = &mut *cancel_rx => Step::Cancel,
                status = child.wait() => Step::Exited(status),
            };
            match step {
                Step::Exited(status) => {
                    group.release();
                    status
                }
                _ => return terminate(child, group).await,
            }
        }
    };

    match status {
        Ok(status) => StreamStatus::from_exit(status),
        Err(e) => StreamStatus::Failed {
            exit_code: None,
            message: format!("failed to wait for process: {e}"),
        },
    }
}

/// The next merged line, or `None` at EOF.
///
/// Once the process has exited, a line that does not arrive within
/// [`DRAIN_IDLE`] counts as EOF; the pipe may be held open by descendants.
async fn next_line(rx: &mut mpsc::Receiver<String>, exited: bool) -> Option<String> {
    if !exited {
        return rx.recv().await;
    }
    tokio::time::timeout(DRAIN_IDLE, rx.recv()).await.ok().flatten()
}

/// Stop the whole process group: SIGTERM, then SIGKILL after [`KILL_GRACE`].
async fn terminate(child: &mut Child, group: &mut ProcessGroup) -> StreamStatus {
    group.signal(libc::SIGTERM);
    if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
        debug!("process ignored SIGTERM");
    }
    group.signal(libc::SIGKILL);
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "kill failed, process already exited");
    }
    let _ = child.wait().await;
    group.release();
    info!("operation cancelled");
    StreamStatus::Cancelled
}

/// Split the merged stream into lines until EOF or until nobody listens.
fn read_lines(reader: PipeReader, line_tx: mpsc::Sender<String>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if line_tx.blocking_send(decode_line(&buf)).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(error = %e, "output pipe read failed");
                break;
            }
        }
    }
}

/// Decode one raw line as the terminal would show it.
///
/// Invalid UTF-8 is replaced, the terminator is dropped, and for progress
/// output redrawn with carriage returns only the last segment is kept.
fn decode_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_end_matches(['\n', '\r']);
    match text.rsplit('\r').find(|segment| !segment.is_empty()) {
        Some(segment) => segment.to_string(),
        None => String::new(),
    }
}
