// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use std::time::Duration;

use opcsim_config::OpcsimConfig;
use opcsim_core::BrowseMode;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::{BinError, BinResult};
use crate::runtime::ServerRuntime;

/// Executes the `run` command to start the sample server.
pub async fn run(mut config: OpcsimConfig, args: RunArgs) -> BinResult<()> {
    if let Some(groups) = args.mass_item_groups {
        config.simulation.mass_item_groups = groups;
    }
    if args.custom_browse {
        config.server.browse_mode = BrowseMode::Custom;
    }
    config.validate()?;

    info!("Starting opcsim sample server...");
    let report = ServerRuntime::new(config)
        .with_run_for(args.duration.map(Duration::from_secs))
        .with_status_interval(Duration::from_secs(args.status_interval))
        .run()
        .await?;

    if report.is_clean() {
        Ok(())
    } else {
        Err(BinError::WorkersOverran {
            builder: report.builder,
            refresher: report.refresher,
        })
    }
}
