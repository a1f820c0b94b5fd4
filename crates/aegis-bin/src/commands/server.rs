// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `server` command.

use tracing::info;

use aegis_config::load_config;

use crate::cli::{Cli, ServerArgs};
use crate::error::BinResult;
use crate::runtime::ControlPlaneRuntime;

/// Executes the `server` command to start the control plane.
pub async fn server(cli: &Cli, args: ServerArgs) -> BinResult<()> {
    info!("Starting AEGIS control plane...");

    let mut config = load_config(&cli.config)?;
    if let Some(port) = args.port {
        config.control_plane.port = port;
    }

    ControlPlaneRuntime::new(config)
        .with_sweep(!args.no_sweep)
        .run()
        .await
}
