//! Command line interface of the demo binary.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;

/// Largest Fibonacci index whose value fits in a `u128`.
pub const MAX_FIB_INDEX: u64 = 186;
/// Largest row of Pascal's triangle whose entries all fit in a `u128`.
pub const MAX_BINOMIAL_ROW: u64 = 131;

#[derive(Parser, Debug)]
#[command(version, about = "Memoized Fibonacci and binomial coefficients", long_about = None)]
pub struct Args {
    #[arg(
        value_name = "N",
        value_parser = clap::value_parser!(u64).range(0..=MAX_FIB_INDEX),
        help = "Index of the Fibonacci number to compute"
    )]
    pub n: u64,

    #[arg(
        short = 'k',
        long = "choose",
        value_name = "K",
        help = "Also compute the binomial coefficient C(N, K)"
    )]
    pub choose: Option<u64>,

    #[arg(long, help = "Also print row N of Pascal's triangle")]
    pub row: bool,

    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase verbosity level"
    )]
    pub verbosity: u8,

    #[arg(
        long,
        short = 'l',
        value_name = "LOG_FILE",
        help = "Optional path to the log file. Defaults to stderr if not specified."
    )]
    pub log_output: Option<PathBuf>,
}

impl Args {
    /// Checks the constraints clap cannot express on its own, exiting with a
    /// usage error when one is broken.
    pub fn validate(&self) {
        if let Err(message) = self.check() {
            Args::command().error(ErrorKind::ValueValidation, message).exit();
        }
    }

    fn check(&self) -> Result<(), String> {
        let needs_binomials = self.choose.is_some() || self.row;
        if needs_binomials && self.n > MAX_BINOMIAL_ROW {
            return Err(format!(
                "binomial coefficients need N <= {}, got {}",
                MAX_BINOMIAL_ROW, self.n
            ));
        }
        match self.choose {
            Some(k) if k > self.n => Err(format!("K must not exceed N, got K = {} > N = {}", k, self.n)),
            _ => Ok(()),
        }
    }
}
