// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! AEGIS - temporary privilege escalation for databases and clusters.
//!
//! Main binary entry point.

use aegis_bin::cli::Cli;
use aegis_bin::error::report_error;
use aegis_bin::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.effective_log_level(), cli.log_format);

    if let Err(err) = aegis_bin::commands::execute(cli).await {
        report_error(&err);
        std::process::exit(err.exit_code());
    }
}
