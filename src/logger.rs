use std::{fs::File, path::Path};

use anyhow::Context;
use time::{
    format_description::{self, parse},
    OffsetDateTime, UtcOffset,
};
use tracing::{subscriber::set_global_default, Level};
use tracing_subscriber::{
    fmt::{time::OffsetTime, writer::BoxMakeWriter},
    FmtSubscriber,
};

/// Install the global subscriber.
///
/// With a file, everything down to `TRACE` is written there without colors. Otherwise events
/// at `level` and above go to stderr.
pub fn init_logger(log_file: Option<&Path>, level: Level) -> anyhow::Result<()> {
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(
        local_offset,
        format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]")?,
    );

    let builder = FmtSubscriber::builder().with_timer(timer);
    let subscriber = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file '{}'", path.display()))?;
            builder
                .with_max_level(Level::TRACE)
                .with_ansi(false)
                .with_writer(BoxMakeWriter::new(file))
                .finish()
        }
        None => builder
            .with_max_level(level)
            .with_writer(BoxMakeWriter::new(std::io::stderr))
            .finish(),
    };

    set_global_default(subscriber).context(
        "could not set global default tracing subscriber, one is probably already set",
    )
}

/// Timestamped log file name, such as `2026-10-19_09:12:44_log.txt`.
pub fn default_log_file_name() -> anyhow::Result<String> {
    let format = parse("[year]-[month]-[day]_[hour]:[minute]:[second]_log.txt")?;
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    Ok(now.format(&format)?)
}
