use colored::Colorize;
use env_logger::Builder;
use log::Level;
use std::io::Write;

/// Terminal colors shared by the CLI summary output.
pub struct Colors;

impl Colors {
    pub fn label(s: &str) -> colored::ColoredString {
        s.cyan().bold()
    }

    pub fn found(s: &str) -> colored::ColoredString {
        s.green().bold()
    }

    pub fn miss(s: &str) -> colored::ColoredString {
        s.yellow()
    }
}

pub fn setup_logging(verbose: bool) {
    use log::LevelFilter;

    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // try_init: the lib may be driven more than once in one process (tests, embedding).
    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level) // Our crate: use requested level
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        Level::Error => "ERROR".red(),
                        _ => unreachable!(),
                    };
                    let path = record.target().to_string().white();
                    format!("[{} {} {}] {}", name.cyan(), level_str, path, record.args())
                }
                _ => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
}
