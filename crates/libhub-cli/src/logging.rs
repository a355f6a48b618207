use std::io::{self, IsTerminal};

use libhub_core::logging::LogFormatter;
use tracing::{level_filters::LevelFilter, Level, Subscriber};
use tracing_subscriber::fmt::{self, format::FmtSpan, writer::MakeWriterExt};

use crate::cli::Args;

pub fn use_color(args: &Args) -> bool {
    !args.no_color && !args.json && io::stderr().is_terminal()
}

pub fn log_level(args: &Args) -> LevelFilter {
    if args.quiet {
        LevelFilter::ERROR
    } else if args.verbose >= 2 {
        LevelFilter::TRACE
    } else if args.verbose == 1 {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

pub fn setup_logging(args: &Args) {
    let filter_level = log_level(args);

    // INFO goes to stdout, everything else to stderr.
    let writer = io::stdout
        .with_max_level(Level::INFO)
        .with_min_level(Level::INFO)
        .or_else(io::stderr);

    let builder = fmt::Subscriber::builder()
        .with_env_filter(format!("libhub={filter_level}"))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .compact()
        .without_time();

    let subscriber: Box<dyn Subscriber + Send + Sync> = if args.json {
        Box::new(builder.json().flatten_event(true).finish())
    } else {
        Box::new(builder.event_format(LogFormatter::new(use_color(args))).finish())
    };

    let _ = tracing::subscriber::set_global_default(subscriber);
}
