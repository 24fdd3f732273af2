#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

mod args;
mod options;

use clap::Parser;
use log::{debug, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crlforge::Diagnostics;

use crate::args::*;
use crate::options::*;

/// `configure_logging` uses the log4rs configuration file named by `--logging-config`, if any,
/// otherwise logs at info level to standard error. Standard output is reserved for PEM output.
fn configure_logging(args: &CrlToolArgs) {
    if let Some(logging_config) = &args.logging_config {
        if let Err(e) = log4rs::init_file(logging_config, Default::default()) {
            eprintln!(
                "ERROR: failed to configure logging using {} with {:?}. Continuing without logging.",
                logging_config, e
            );
        }
        return;
    }

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{l} {m}{n}")))
        .build();
    match Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info))
    {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!(
                    "ERROR: failed to configure logging for stderr with {:?}. Continuing without logging.",
                    e
                );
            }
        }
        Err(e) => {
            eprintln!("ERROR: failed to prepare default logging configuration with {:?}. Continuing without logging", e);
        }
    }
}

fn main() {
    let args = CrlToolArgs::parse();
    configure_logging(&args);
    debug!("crltool start");
    if let Ok(json) = serde_json::to_string(&args) {
        debug!("Arguments: {}", json);
    }

    let mut diag = Diagnostics::new();
    let result = match &args.command {
        Command::Create(create) => options_create(&args, create, &mut diag),
        Command::Assemble(assemble) => options_assemble(&args, assemble, &mut diag),
    };
    if !diag.is_empty() {
        debug!("{} warnings reported", diag.warnings().len());
    }
    if let Err(e) = result {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
    debug!("crltool end");
}
