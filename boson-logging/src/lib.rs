// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! Tracing setup shared by the `boson-node` binary and its integration tests.
//!
//! Structured logging, not `println!`: every other crate in this workspace logs
//! through `tracing`'s `info!`/`warn!`/`error!`/`debug!`/`trace!` macros, and this
//! crate is the only place that decides where those events end up.

pub mod error;

use self::error::{Error, Result};
use std::{fs, path::Path};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt as tracing_fmt,
    fmt::{
        format::Writer,
        time::{FormatTime, SystemTime},
        FmtContext, FormatEvent, FormatFields,
    },
    prelude::*,
    registry::LookupSpan,
};

/// Env var consulted when no explicit directive string is passed to [`init_logging`].
pub const LOG_ENV_VAR: &str = "BOSON_LOG";

/// Compact, greppable event formatter: `[<time> <level> <module>] <fields>`.
#[derive(Default, Debug)]
pub struct LogFormatter;

impl<S, N> FormatEvent<S, N> for LogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let level = *event.metadata().level();
        let module = event.metadata().module_path().unwrap_or("<unknown module>");
        let time = SystemTime::default();

        write!(writer, "[")?;
        time.format_time(&mut writer)?;
        write!(writer, " {level} {module}")?;
        ctx.visit_spans(|span| write!(writer, "/{}", span.name()))?;
        write!(writer, "] ")?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Initializes node logging, returning the guard that must be held for the life of
/// the program (dropping it flushes and stops the background writer thread).
///
/// `directives` takes precedence; if empty, `BOSON_LOG` is consulted, then the
/// caller-supplied `default_directives` as a last resort. Logging should be
/// initialized exactly once per process.
pub fn init_logging(
    default_directives: &str,
    log_dir: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let directive_source = std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| default_directives.to_string());
    let env_filter = EnvFilter::try_new(&directive_source)
        .map_err(|e| Error::LoggingConfiguration(format!("invalid directives {directive_source:?}: {e}")))?;

    let (guard, layer) = if let Some(log_dir) = log_dir {
        if fs::create_dir_all(log_dir).is_err() {
            return Err(Error::LoggingConfiguration(format!(
                "could not create log directory {log_dir:?}"
            )));
        }
        let file_appender = tracing_appender::rolling::never(log_dir, "boson.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking)
            .event_format(LogFormatter)
            .boxed();
        (Some(guard), layer)
    } else {
        let layer = tracing_fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .event_format(LogFormatter)
            .boxed();
        (None, layer)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .map_err(|e| Error::LoggingConfiguration(e.to_string()))?;

    Ok(guard)
}

/// Initializes a bare stdout logger for tests; safe to call from many test threads,
/// the underlying subscriber is installed only once per process.
#[cfg(feature = "test-utils")]
static TEST_INIT_LOGGER: std::sync::Once = std::sync::Once::new();
#[cfg(feature = "test-utils")]
pub fn init_test_logger() {
    TEST_INIT_LOGGER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_target(false)
            .event_format(LogFormatter)
            .with_env_filter(EnvFilter::from_env(LOG_ENV_VAR))
            .try_init();
    });
}
