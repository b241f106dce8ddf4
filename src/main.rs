// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Sable - a small dynamically typed language with a bytecode VM
//!
//! This is the main entry point for the `sable` CLI.
//!
//! ## Exit codes
//!
//! - `0` success
//! - `1` lexical or syntax errors
//! - `2` compile errors
//! - `3` runtime error
//! - `74` the program could not be read

mod cli;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use sable_engine::{Engine, Error};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            let code = err.downcast_ref::<Error>().map_or(1, Error::exit_code);
            ExitCode::from(code)
        }
    }
}

/// Logs go to stderr so they never mix with program output.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "sable=debug,sable_engine=debug"
    } else {
        "sable=warn,sable_engine=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let source = match &cli.command {
        Command::Run { file } => std::fs::read_to_string(file)
            .map_err(Error::from)
            .with_context(|| format!("cannot read {}", file.display()))?,
        Command::Eval { code } => code.clone(),
    };

    let engine = Engine::with_config(cli.engine_config());
    tracing::debug!(config = ?engine.config(), bytes = source.len(), "starting");

    if cli.dump_ir {
        println!("{}", engine.lower(&source)?);
    }
    if cli.dump_bytecode {
        println!("{}", engine.compile(&source)?);
    }

    engine.run(&source)?;
    Ok(())
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<Error>() {
        Some(Error::Syntax(report)) | Some(Error::Compile(report)) => {
            for line in report.to_string().lines() {
                eprintln!("{}: {}", "error".red().bold(), line);
            }
        }
        Some(Error::Runtime(runtime)) => {
            eprintln!("{}: runtime error: {}", "error".red().bold(), runtime.message);
            for line in runtime.trace_lines() {
                eprintln!("    {} {}", "at".dimmed(), line);
            }
        }
        _ => eprintln!("{}: {:#}", "error".red().bold(), err),
    }
}
