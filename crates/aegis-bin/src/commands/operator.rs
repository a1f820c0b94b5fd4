// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `operator` command.

use tracing::info;

use aegis_config::load_config;

use crate::cli::{Cli, OperatorArgs};
use crate::error::BinResult;
use crate::runtime::OperatorRuntime;

/// Executes the `operator` command to start a distributed agent.
pub async fn operator(cli: &Cli, args: OperatorArgs) -> BinResult<()> {
    info!("Starting AEGIS operator...");

    let mut config = load_config(&cli.config)?;
    if let Some(id) = args.id {
        config.operator.id = id;
    }
    if let Some(url) = args.control_plane_url {
        config.operator.control_plane_url = url;
    }
    if let Some(port) = args.port {
        config.operator.port = port;
    }

    OperatorRuntime::new(config).run().await
}
