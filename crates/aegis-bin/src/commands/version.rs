// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::error::BinResult;

/// Executes the `version` command.
pub fn version() -> BinResult<()> {
    println!("AEGIS v{}", aegis_core::VERSION);
    println!("Temporary privilege escalation for databases and clusters");
    println!();
    println!("Components:");
    println!("  aegis-core      {}", aegis_core::VERSION);
    println!("  aegis-api       {}", aegis_api::VERSION);
    println!("  aegis-operator  {}", aegis_operator::VERSION);
    Ok(())
}
