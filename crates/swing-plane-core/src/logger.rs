//! Log sinks for binaries and tests.
//!
//! Library stages only talk to the `log` facade. A binary installs either the
//! plain stderr sink (`init_with_level`) or, with the `tracing` feature, a
//! `tracing-subscriber` pipeline (`init_tracing`).

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, fmt::format::FmtSpan, util::SubscriberInitExt, EnvFilter};

/// Short stage label for a module path: `swing_plane_trace::outlier` becomes
/// `trace/outlier`, `swing_plane::pipeline` becomes `pipeline`.
fn stage_label(target: &str) -> String {
    let mut parts = target.split("::");
    let krate = parts.next().unwrap_or(target);
    let module = parts.last();
    let stage = krate
        .strip_prefix("swing_plane_")
        .or_else(|| (krate == "swing_plane").then_some(""));
    match (stage, module) {
        (Some(""), Some(m)) => m.to_string(),
        (Some(s), Some(m)) if s != m => format!("{s}/{m}"),
        (Some(s), _) if !s.is_empty() => s.to_string(),
        _ => krate.to_string(),
    }
}

struct StageLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StageLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let ms = self.started.elapsed().as_millis();
        let mut err = std::io::stderr().lock();
        let _ = writeln!(
            err,
            "{ms:>6}ms {:<5} {:<16} {}",
            record.level(),
            stage_label(record.target()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static SINK: OnceLock<StageLogger> = OnceLock::new();

/// Install the stderr sink. Later calls keep the first level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if SINK.get().is_some() {
        return Ok(());
    }
    let sink = SINK.get_or_init(|| StageLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(sink)?;
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` subscriber. `RUST_LOG` wins over `level`.
///
/// Stage spans are reported when they close, so each instrumented stage
/// shows its duration. With `json` every line is one flat JSON object.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: LevelFilter, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
