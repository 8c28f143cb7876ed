#![warn(clippy::all)]

use clap::Parser;

use crate::opts::{Opts, Subcommand};
use crate::prelude::*;

mod cli;
mod error;
mod helpers;
mod math;
mod opts;
mod prelude;
mod trainer;

fn main() -> Result {
    let opts = Opts::parse();
    let _sentry_guard = helpers::tracing::init(opts.sentry_dsn, opts.traces_sample_rate)?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting…");

    let result = match opts.subcommand {
        Subcommand::Train(opts) => cli::train::run(opts),
    };
    if let Err(error) = &result {
        sentry::integrations::anyhow::capture_anyhow(error);
    }
    result
}
