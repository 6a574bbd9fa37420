#[macro_use]
extern crate log;

use pngbench_report::{config, debug_enabled, report};
use simplelog::{Config, LevelFilter, SimpleLogger, TermLogger, TerminalMode};

fn configure_log(verbosity: u64) {
    let filter = if debug_enabled() {
        LevelFilter::max()
    } else {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    };
    if TermLogger::init(filter, Config::default(), TerminalMode::Stderr).is_err() {
        // No terminal to attach to.
        let _ = SimpleLogger::init(filter, Config::default());
    }
}

fn main() -> anyhow::Result<()> {
    let configuration = config::configure()?;
    configure_log(configuration.verbosity);
    debug!("{:?}", configuration);

    let fields = report::run(&configuration.self_config)?;
    println!(
        "Wrote {} summary fields to {:?}",
        fields.len(),
        configuration
            .self_config
            .output_directory
            .join(report::FIELDS_FILE)
    );
    Ok(())
}
