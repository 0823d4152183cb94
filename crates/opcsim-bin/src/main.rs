// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! opcsim - OPC DA/AE sample server plugin
//!
//! Main binary entry point.

use opcsim_bin::cli::Cli;
use opcsim_bin::error::{report_error_and_exit, BinError};
use opcsim_bin::logging::{init_logging, LogSettings};
use opcsim_bin::commands;

fn main() {
    let cli = Cli::parse_args();

    let config = match commands::load_config(&cli) {
        Ok(config) => config,
        Err(e) => report_error_and_exit(e),
    };

    if let Err(e) = init_logging(&LogSettings::resolve(&cli, &config.logging)) {
        report_error_and_exit(e);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("opcsim-rt")
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => report_error_and_exit(BinError::startup(format!(
            "Failed to build tokio runtime: {}",
            e
        ))),
    };

    if let Err(e) = runtime.block_on(commands::execute(cli, config)) {
        report_error_and_exit(e);
    }
}
