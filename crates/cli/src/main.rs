use crate::args::RunArgs;
use anyhow::Result;
use clap::Parser;
use std::process;

mod args;

/// Demonstrates the embedding surface end to end: load a module, instantiate
/// it against a [`vorpal_capi::TestCapabilityHost`], invoke an export, and map
/// the outcome to a process exit code the way a real embedder's frontend
/// would. Not a general-purpose `wasm` CLI; the `--invoke`/arg surface here
/// only needs to cover the scenarios this workspace tests against.
fn main() -> Result<()> {
    env_logger::init();
    let args = RunArgs::parse();
    let exit_code = args::run(args)?;
    process::exit(exit_code);
}
