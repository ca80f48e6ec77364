use colored::*;
use env_logger::Env;
use log::Level;
use std::io::Write;

fn level_header(level: Level) -> ColoredString {
    let header = format!("[{}]", level);
    match level {
        Level::Error => header.bright_red().bold(),
        Level::Warn => header.bright_yellow().bold(),
        Level::Info => header.cyan(),
        Level::Debug => header.blue(),
        Level::Trace => header.white(),
    }
}

/// Installs the process-wide logger. `RUST_LOG` overrides the default `info` filter.
pub fn init() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{}[{}] {}",
                level_header(record.level()),
                record.target(),
                record.args()
            )
        })
        .init();
}
