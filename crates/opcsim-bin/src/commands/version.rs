// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::error::BinResult;

/// Executes the `version` command to display version information.
pub fn version() -> BinResult<()> {
    println!("opcsim - OPC DA/AE sample server plugin");
    println!();
    println!("Version Information:");
    println!("  opcsim-bin:    {}", env!("CARGO_PKG_VERSION"));
    println!("  opcsim-core:   {}", opcsim_core::VERSION);
    println!("  opcsim-config: {}", opcsim_config::VERSION);
    println!();
    println!("Build Information:");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
