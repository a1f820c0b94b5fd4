// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `server`: start the control plane
//! - `operator`: start an operator agent
//! - `validate`: validate the configuration file
//! - `version`: show version information

mod operator;
mod server;
mod validate;
mod version;

pub use operator::operator;
pub use server::server;
pub use validate::validate;
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Server(args) => server::server(&cli, args).await,
        Commands::Operator(args) => operator::operator(&cli, args).await,
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Version => version::version(),
    }
}
