// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Command line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sable_engine::EngineConfig;

/// sable - compile and run Sable programs
#[derive(Parser, Debug)]
#[command(name = "sable")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the label IR before running
    #[arg(long, global = true)]
    pub dump_ir: bool,

    /// Print the bytecode, constant pool and global slots before running
    #[arg(long, global = true)]
    pub dump_bytecode: bool,

    /// Skip the peephole optimizer
    #[arg(long, global = true)]
    pub no_optimize: bool,

    /// Call-stack budget in kilobytes
    #[arg(long, global = true, value_name = "KB")]
    pub max_stack_kb: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a program file
    Run {
        /// Path to the program
        file: PathBuf,
    },

    /// Run a program given on the command line
    #[command(alias = "e")]
    Eval {
        /// Program text
        code: String,
    },
}

impl Cli {
    /// Engine configuration selected by the flags.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default().with_optimizer(!self.no_optimize);
        if let Some(kb) = self.max_stack_kb {
            config = config.with_max_call_stack_bytes(kb * 1024);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_with_flags() {
        let cli = Cli::parse_from(["sable", "run", "prog.sb", "--no-optimize", "--max-stack-kb", "8"]);
        assert!(matches!(cli.command, Command::Run { ref file } if file == &PathBuf::from("prog.sb")));
        let config = cli.engine_config();
        assert!(!config.optimize);
        assert_eq!(config.max_call_stack_bytes, 8 * 1024);
    }

    #[test]
    fn test_eval_defaults() {
        let cli = Cli::parse_from(["sable", "eval", "println(1);"]);
        assert!(matches!(cli.command, Command::Eval { ref code } if code == "println(1);"));
        assert_eq!(cli.engine_config(), EngineConfig::default());
        assert!(!cli.verbose && !cli.dump_ir && !cli.dump_bytecode);
    }
}
