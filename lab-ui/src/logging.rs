//! Process-wide logging for `lab-calc`.
//!
//! One global `EnvFilter` caps two layers: a stdout layer that can be
//! switched off and a file layer that stays silent until a file is set.
//! Both are reloadable after [`init_default_logging`].

use std::{
    fs::File,
    io::{self, IsTerminal, Write},
    path::Path,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{
        FmtContext, MakeWriter,
        format::{FormatEvent, FormatFields, Writer},
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
};

use crate::config::LoggingSection;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,lab_ui=debug";

// --- Formatter ---

/// `<local time> <LEVEL> <file:line> <fields>`, coloured on a terminal.
struct LocalFmt;

impl<S, N> FormatEvent<S, N> for LocalFmt
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();

        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
        if ansi {
            write!(writer, "\x1b[2m{timestamp}\x1b[0m ")?;
        } else {
            write!(writer, "{timestamp} ")?;
        }

        let colour = match *meta.level() {
            Level::ERROR => "\x1b[1;31m",
            Level::WARN => "\x1b[1;33m",
            Level::INFO => "\x1b[1;32m",
            Level::DEBUG => "\x1b[1;34m",
            Level::TRACE => "\x1b[1;35m",
        };
        if ansi {
            write!(writer, "{colour}{:>5}\x1b[0m ", meta.level())?;
        } else {
            write!(writer, "{:>5} ", meta.level())?;
        }

        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            let file = file
                .rsplit_once("src/")
                .or_else(|| file.rsplit_once("src\\"))
                .map_or(file, |(_, rest)| rest);
            if ansi {
                write!(writer, "\x1b[36m{file}:{line}\x1b[0m ")?;
            } else {
                write!(writer, "{file}:{line} ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

// --- Late-bound file writer ---

type SharedFile = Arc<Mutex<Option<File>>>;

/// Writer target that can be pointed at a file after initialization.
/// Records are dropped while no file is set.
#[derive(Clone)]
struct FileSlot(SharedFile);

struct SlotWriter<'a>(MutexGuard<'a, Option<File>>);

impl Write for SlotWriter<'_> {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        match &mut *self.0 {
            Some(f) => f.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut *self.0 {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for FileSlot {
    type Writer = SlotWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        // A panic while writing a record must not silence logging for good.
        SlotWriter(self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

// --- Reload handles ---

type SetStrFn = Box<dyn Fn(&str) -> Result<()> + Send + Sync>;
type SetBoolFn = Box<dyn Fn(bool) -> Result<()> + Send + Sync>;

static SET_LOG_LEVEL: OnceLock<SetStrFn> = OnceLock::new();
static SET_STDOUT_ENABLED: OnceLock<SetBoolFn> = OnceLock::new();
static FILE_SLOT: OnceLock<SharedFile> = OnceLock::new();

fn make_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn store_level_handle<S>(handle: reload::Handle<EnvFilter, S>)
where
    S: Subscriber + Send + Sync + 'static,
{
    let _ = SET_LOG_LEVEL.set(Box::new(move |directives: &str| {
        let filter = EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log level '{directives}'"))?;
        handle.reload(filter).context("filter reload failed")
    }));
}

fn store_stdout_handle<S>(handle: reload::Handle<EnvFilter, S>)
where
    S: Subscriber + Send + Sync + 'static,
{
    let _ = SET_STDOUT_ENABLED.set(Box::new(move |enabled: bool| {
        // "trace" lets everything through; the global filter stays the ceiling.
        let filter = EnvFilter::new(if enabled { "trace" } else { "off" });
        handle.reload(filter).context("stdout reload failed")
    }));
}

fn file_slot() -> Result<&'static SharedFile> {
    FILE_SLOT.get().context("logging not yet initialized")
}

// --- Public API ---

/// Changes the global filter. Takes a bare level (`"debug"`) or any
/// `EnvFilter` directive string.
pub fn set_log_level(directives: &str) -> Result<()> {
    let set = SET_LOG_LEVEL.get().context("logging not yet initialized")?;
    set(directives)
}

/// Shows or hides stdout output; file logging is unaffected.
pub fn set_stdout_enabled(enabled: bool) -> Result<()> {
    let set = SET_STDOUT_ENABLED
        .get()
        .context("logging not yet initialized")?;
    set(enabled)
}

/// Appends log output to `path`, replacing any file already open.
/// The directory must exist.
pub fn enable_file_logging(path: &Path) -> Result<()> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file '{}'", path.display()))?;
    *file_slot()?.lock().unwrap_or_else(PoisonError::into_inner) = Some(file);
    Ok(())
}

/// Closes the log file, if any.
pub fn disable_file_logging() {
    if let Ok(slot) = file_slot() {
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Applies the `[logging]` section of the config file.
pub fn configure(section: &LoggingSection) -> Result<()> {
    set_log_level(&section.level)?;
    set_stdout_enabled(section.stdout)?;
    match &section.file {
        Some(path) => enable_file_logging(path),
        None => {
            disable_file_logging();
            Ok(())
        }
    }
}

/// Installs the global subscriber. Call once at startup; later calls are
/// no-ops.
///
/// - Stdout: coloured on a terminal, plain when piped.
/// - File: silent until [`enable_file_logging`].
/// - Level: `RUST_LOG`, or [`DEFAULT_FILTER`].
pub fn init_default_logging() {
    let file_inner: SharedFile = Arc::new(Mutex::new(None));

    let (stdout_gate, stdout_handle) = reload::Layer::new(EnvFilter::new("trace"));
    let (level_filter, level_handle) = reload::Layer::new(make_filter());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .event_format(LocalFmt)
        .with_ansi(io::stdout().is_terminal())
        .with_filter(stdout_gate);

    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(LocalFmt)
        .with_ansi(false)
        .with_writer(FileSlot(file_inner.clone()));

    if tracing_subscriber::registry()
        .with(level_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok()
    {
        let _ = FILE_SLOT.set(file_inner);
        store_level_handle(level_handle);
        store_stdout_handle(stdout_handle);
    }
}
