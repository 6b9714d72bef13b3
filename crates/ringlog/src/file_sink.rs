//! [`FileSink`]: the primary asynchronous sink. Tries a lock-free ring
//! buffer first, falls back to a worker pool on overflow, serializes to
//! JSON through a pooled buffer, and writes line-prefixed records to a
//! single log file.

use crate::context::Context;
use crate::error::FileSinkError;
use crate::level::passes_level_gate;
use crate::path::validate_path;
use crate::record::LogRecord;
use crate::sink::{handle_critical, Sink, StderrSink};
use crate::source::Source;
use chrono::Utc;
use ringcore::{RingBuffer, Task, WorkerPool, WorkerPoolOptions, DEFAULT_CAPACITY_EXP};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);
const FALLBACK_WORKERS: usize = 2;

/// Pool of reusable encode buffers, handed out to whichever thread is
/// serializing a record and returned once the bytes have been written.
struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    fn new() -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
        }
    }

    fn acquire(&self) -> Vec<u8> {
        self.buffers.lock().unwrap().pop().unwrap_or_default()
    }

    fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        if buf.capacity() > 0 {
            self.buffers.lock().unwrap().push(buf);
        }
    }
}

/// Writes length-prefixed-by-nothing, newline-terminated lines to a single
/// file, prepending a `YYYY/MM/DD HH:MM:SS.ffffff ` timestamp. All writes
/// go through the one internal mutex, so the writer is safe to share
/// across the ring consumer and every fallback-pool worker.
struct LineWriter {
    file: Mutex<File>,
}

impl LineWriter {
    fn new(file: File) -> Self {
        Self {
            file: Mutex::new(file),
        }
    }

    fn write_line(&self, body: &[u8]) -> std::io::Result<()> {
        let prefix = Utc::now().format("%Y/%m/%d %H:%M:%S%.6f ").to_string();
        let mut guard = self.file.lock().unwrap();
        guard.write_all(prefix.as_bytes())?;
        guard.write_all(body)?;
        guard.write_all(b"\n")
    }

    fn sync_and_close(&self) -> std::io::Result<()> {
        self.file.lock().unwrap().sync_all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
}

struct Shared {
    name: String,
    ctx: Context,
    phase: Mutex<Phase>,
    ring: RingBuffer<LogRecord>,
    pool: Mutex<WorkerPool>,
    pool_opts: WorkerPoolOptions,
    writer: Mutex<Option<Arc<LineWriter>>>,
    forwardings: Mutex<Vec<Arc<dyn Sink>>>,
    buffers: BufferPool,
    diagnostics: Source<StderrSink>,
    started_consumer: AtomicBool,
    stop_timeout: Duration,
    /// Weak handle to the owning `FileSink`, used to reject a sink
    /// forwarding to itself in [`FileSink::attach`].
    self_ref: Weak<FileSink>,
    /// Closed by [`FileSink::stop`]; [`FileSink::start`] blocks on it.
    done: Mutex<bool>,
    done_cvar: Condvar,
}

/// The primary async sink: `new` → `init(dir)` → `start(debug)` → `log(...)`
/// → `stop`. Restart after `stop` is not supported.
pub struct FileSink {
    shared: Arc<Shared>,
}

impl FileSink {
    /// Builds a sink with the default ring capacity, returned already
    /// behind an `Arc` so it can hold a weak handle to itself (used to
    /// reject self-forwarding in [`FileSink::attach`]) and be shared
    /// across the threads `start` spawns.
    pub fn new(name: impl Into<String>, ctx: Context) -> Arc<Self> {
        Self::with_ring(name, ctx, RingBuffer::new(DEFAULT_CAPACITY_EXP))
    }

    /// Test-only hook to exercise the ring-full/fallback-pool path without
    /// publishing 2^16 records first.
    #[cfg(test)]
    fn with_ring_capacity_exp(name: impl Into<String>, ctx: Context, capacity_exp: u32) -> Arc<Self> {
        Self::with_ring(name, ctx, RingBuffer::new(capacity_exp))
    }

    fn with_ring(name: impl Into<String>, ctx: Context, ring: RingBuffer<LogRecord>) -> Arc<Self> {
        let name = name.into();
        Arc::new_cyclic(|self_ref| {
            let diagnostics = Source::new("FILESINK", StderrSink, ctx.clone());
            Self {
                shared: Arc::new(Shared {
                    name,
                    ctx,
                    phase: Mutex::new(Phase::Uninitialized),
                    ring,
                    pool: Mutex::new(WorkerPool::new(WorkerPoolOptions::default())),
                    pool_opts: WorkerPoolOptions::default(),
                    writer: Mutex::new(None),
                    forwardings: Mutex::new(Vec::new()),
                    buffers: BufferPool::new(),
                    diagnostics,
                    started_consumer: AtomicBool::new(false),
                    stop_timeout: DEFAULT_STOP_TIMEOUT,
                    self_ref: self_ref.clone(),
                    done: Mutex::new(false),
                    done_cvar: Condvar::new(),
                }),
            }
        })
    }

    /// Validates `dir`, checks it exists and is writable, and opens the log
    /// file `<dir>/<name>:<instance>[<rfc3339>].log` with mode 0640.
    pub fn init(&self, dir: &str) -> Result<(), FileSinkError> {
        validate_path(dir)?;
        let metadata = std::fs::metadata(dir).map_err(|_| {
            FileSinkError::DirectoryNotFound(dir.to_string())
        })?;
        if !metadata.is_dir() {
            return Err(FileSinkError::DirectoryNotFound(dir.to_string()));
        }
        if metadata.permissions().readonly() {
            return Err(FileSinkError::DirectoryNotFound(dir.to_string()));
        }

        let filename = format!(
            "{}:{}[{}].log",
            self.shared.name,
            self.shared.ctx.instance(),
            Utc::now().to_rfc3339()
        );
        let path = Path::new(dir).join(filename);
        let file = open_log_file(&path)?;

        *self.shared.writer.lock().unwrap() = Some(Arc::new(LineWriter::new(file)));
        *self.shared.phase.lock().unwrap() = Phase::Initialized;
        Ok(())
    }

    /// Spawns the ring consumer and fallback-pool workers, then blocks the
    /// calling thread until [`FileSink::stop`] is called from elsewhere.
    /// Run this on its own thread.
    pub fn start(&self, debug: bool) -> Result<(), FileSinkError> {
        {
            let mut phase = self.shared.phase.lock().unwrap();
            match *phase {
                Phase::Uninitialized => return Err(FileSinkError::NotInitialized),
                Phase::Running => return Err(FileSinkError::AlreadyStarted),
                Phase::Stopped => return Err(FileSinkError::AlreadyStarted),
                Phase::Initialized => *phase = Phase::Running,
            }
        }
        crate::level::set_debug(debug);

        {
            let mut pool_guard = self.shared.pool.lock().unwrap();
            if pool_guard.is_canceled() {
                *pool_guard = WorkerPool::new(self.shared.pool_opts);
            }
            pool_guard.start(FALLBACK_WORKERS);
        }

        if !self.shared.started_consumer.swap(true, Ordering::SeqCst) {
            let shared = Arc::clone(&self.shared);
            thread::spawn(move || {
                shared.ring.consume(|record| handle(&shared, record));
            });
        }

        let guard = self.shared.done.lock().unwrap();
        let _ = self.shared.done_cvar.wait_while(guard, |done| !*done).unwrap();
        Ok(())
    }

    /// Stops accepting ring publishes, waits up to the configured timeout
    /// for the fallback pool and ring to drain, syncs and closes the file.
    pub fn stop(&self) -> Result<(), FileSinkError> {
        {
            let mut phase = self.shared.phase.lock().unwrap();
            if *phase != Phase::Running {
                return Err(FileSinkError::NotRunning);
            }
            *phase = Phase::Stopped;
        }
        self.shared.ring.close();

        let deadline = Instant::now() + self.shared.stop_timeout;
        while !self.shared.ring.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if !self.shared.ring.is_empty() {
            self.shared
                .diagnostics
                .warning("file sink stop timed out before ring buffer drained", None);
        }

        let _ = self.shared.pool.lock().unwrap().cancel();

        if let Some(writer) = self.shared.writer.lock().unwrap().as_ref() {
            if let Err(err) = writer.sync_and_close() {
                self.shared
                    .diagnostics
                    .error("failed to sync log file on stop", err, None);
            }
        }

        *self.shared.done.lock().unwrap() = true;
        self.shared.done_cvar.notify_all();
        Ok(())
    }

    /// Registers `sink` to receive every record this sink accepts, via its
    /// low-level [`Sink::write`]. Rejects self-attachment and an
    /// already-attached sink.
    pub fn attach(&self, sink: Arc<dyn Sink>) -> Result<(), FileSinkError> {
        if let Some(self_arc) = self.shared.self_ref.upgrade() {
            let self_dyn: Arc<dyn Sink> = self_arc;
            if Arc::ptr_eq(&self_dyn, &sink) {
                return Err(FileSinkError::SelfForwarding);
            }
        }
        let mut forwardings = self.shared.forwardings.lock().unwrap();
        if forwardings.iter().any(|existing| Arc::ptr_eq(existing, &sink)) {
            return Err(FileSinkError::DuplicateForwarding);
        }
        forwardings.push(sink);
        Ok(())
    }

    /// Removes a previously attached forwarding sink.
    pub fn detach(&self, sink: &Arc<dyn Sink>) -> Result<(), FileSinkError> {
        let mut forwardings = self.shared.forwardings.lock().unwrap();
        let before = forwardings.len();
        forwardings.retain(|existing| !Arc::ptr_eq(existing, sink));
        if forwardings.len() == before {
            return Err(FileSinkError::UnknownForwarding);
        }
        Ok(())
    }
}

impl Sink for FileSink {
    /// Side-effect-free low-level write: serializes and dispatches without
    /// gating or critical handling. Used when this sink is itself attached
    /// as someone else's forwarding target.
    fn write(&self, record: &LogRecord) {
        dispatch(&self.shared, record.clone());
    }

    fn log(&self, record: &LogRecord) {
        if !passes_level_gate(record.raw_level) {
            return;
        }
        for forwarding in self.shared.forwardings.lock().unwrap().iter() {
            forwarding.write(record);
        }
        dispatch(&self.shared, record.clone());
        if record.raw_level >= crate::level::Level::Fatal {
            handle_critical(record);
        }
    }
}

fn dispatch(shared: &Arc<Shared>, record: LogRecord) {
    if let Err(record) = shared.ring.try_publish(record) {
        let task_shared = Arc::clone(shared);
        let task: Task = Box::new(move || handle(&task_shared, record));
        let _ = shared.pool.lock().unwrap().push(task);
    }
}

fn handle(shared: &Arc<Shared>, record: LogRecord) {
    let mut buf = shared.buffers.acquire();
    match serde_json::to_writer(&mut buf, &record) {
        Ok(()) => {
            if let Some(writer) = shared.writer.lock().unwrap().as_ref() {
                if let Err(err) = writer.write_line(&buf) {
                    shared
                        .diagnostics
                        .error("failed to write log line", err, None);
                }
            }
        }
        Err(err) => {
            shared
                .diagnostics
                .error("failed to encode log record", err, None);
        }
    }
    shared.buffers.release(buf);
}

fn open_log_file(path: &Path) -> Result<File, FileSinkError> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o640);
    }
    options.open(path).map_err(FileSinkError::IoFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_rejects_nonexistent_directory() {
        let ctx = Context::new("svc", "1");
        let sink = FileSink::new("test", ctx);
        assert!(matches!(
            sink.init("/definitely/not/a/real/dir/anywhere"),
            Err(FileSinkError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn start_before_init_is_refused() {
        let ctx = Context::new("svc", "1");
        let sink = FileSink::new("test", ctx);
        assert!(matches!(sink.start(false), Err(FileSinkError::NotInitialized)));
    }

    #[test]
    fn stop_before_start_is_refused() {
        let ctx = Context::new("svc", "1");
        let sink = FileSink::new("test", ctx);
        assert!(matches!(sink.stop(), Err(FileSinkError::NotRunning)));
    }

    #[test]
    fn full_lifecycle_writes_records_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new("svc", "1");
        let sink = FileSink::new("test", ctx.clone());
        sink.init(dir.path().to_str().unwrap()).unwrap();

        let runner = Arc::clone(&sink);
        let handle = thread::spawn(move || runner.start(false));
        thread::sleep(Duration::from_millis(50));

        let source = Source::new("UNIT", Arc::clone(&sink), ctx);
        source.info("hello world", None);
        thread::sleep(Duration::from_millis(50));

        sink.stop().unwrap();
        handle.join().unwrap().unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let contents = std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
        assert!(contents.contains("\"msg\":\"hello world\""));
    }

    #[test]
    fn duplicate_attach_is_rejected() {
        let ctx = Context::new("svc", "1");
        let sink = FileSink::new("test", ctx);
        let aux: Arc<dyn Sink> = Arc::new(StderrSink);
        sink.attach(Arc::clone(&aux)).unwrap();
        assert!(matches!(
            sink.attach(Arc::clone(&aux)),
            Err(FileSinkError::DuplicateForwarding)
        ));
    }

    #[test]
    fn detach_unknown_sink_is_rejected() {
        let ctx = Context::new("svc", "1");
        let sink = FileSink::new("test", ctx);
        let aux: Arc<dyn Sink> = Arc::new(StderrSink);
        assert!(matches!(
            sink.detach(&aux),
            Err(FileSinkError::UnknownForwarding)
        ));
    }

    #[test]
    fn self_attach_is_rejected() {
        let ctx = Context::new("svc", "1");
        let sink = FileSink::new("test", ctx);
        let self_as_sink = Arc::clone(&sink) as Arc<dyn Sink>;
        assert!(matches!(
            sink.attach(self_as_sink),
            Err(FileSinkError::SelfForwarding)
        ));
    }

    #[test]
    fn overflow_routes_through_fallback_pool() {
        use crate::level::Level;

        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new("svc", "1");
        let sink = FileSink::with_ring_capacity_exp("test", ctx.clone(), 1); // capacity 2
        sink.init(dir.path().to_str().unwrap()).unwrap();

        // Fill the ring directly, with no consumer thread running yet to drain it.
        let capacity = sink.shared.ring.capacity();
        for i in 0..capacity {
            let filler = LogRecord::new(Level::Info, "svc", "1", "SRC", format!("filler {i}"), None, None);
            assert!(sink.shared.ring.publish(filler));
        }

        // The ring is full, so this dispatch must fall through to the pool.
        let overflow = LogRecord::new(Level::Info, "svc", "1", "SRC", "overflow", None, None);
        dispatch(&sink.shared, overflow);

        let runner = Arc::clone(&sink);
        let handle = thread::spawn(move || runner.start(false));
        thread::sleep(Duration::from_millis(100));
        sink.stop().unwrap();
        handle.join().unwrap().unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let contents = std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
        assert_eq!(contents.lines().count(), capacity + 1);
        assert!(contents.contains("\"msg\":\"overflow\""));
    }
}
