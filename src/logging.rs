// File: ./src/logging.rs
// Logger bootstrap: terminal plus a log file in the context's log directory.
use crate::context::AppContext;
use anyhow::Result;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::OpenOptions;

/// Config `log_level` to a filter. Unknown names mean `info`.
pub fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::Info)
}

/// Installs the global logger. Calling this twice is harmless; the first
/// logger stays in place.
pub fn init(ctx: &dyn AppContext, level: &str) -> Result<()> {
    let level = parse_level(level);
    let config = ConfigBuilder::new()
        .add_filter_allow_str("edcal")
        .set_time_format_rfc3339()
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(path) = ctx.log_path() {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        loggers.push(WriteLogger::new(level, config, file));
    }

    if CombinedLogger::init(loggers).is_err() {
        log::debug!("Logger already initialised");
    }
    Ok(())
}
