// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `definition` command.

use opcsim_config::OpcsimConfig;
use opcsim_core::{OptimizationParameters, ServerDefinition};

use crate::cli::{DefinitionArgs, OutputFormat};
use crate::commands::validate::to_pretty_json;
use crate::error::BinResult;

/// Prints the registration data and the parameters handed to the host.
pub fn definition(config: &OpcsimConfig, args: DefinitionArgs) -> BinResult<()> {
    let definition = ServerDefinition::sample_data_access();
    let parameters = config.server_parameters();
    let optimization = OptimizationParameters::default();

    match args.format {
        OutputFormat::Text => {
            println!("Data Access Server:");
            println!("  Registration id:  {}", definition.registration_id);
            println!("  Application id:   {}", definition.application_id);
            println!("  ProgID:           {}", definition.prog_id);
            println!("  ProgID (version): {}", definition.prog_id_versioned);
            println!("  Name:             {}", definition.friendly_name);
            println!("  Name (version):   {}", definition.friendly_name_versioned);
            println!("  Vendor:           {}", definition.vendor_name);
            println!();
            println!("Alarms & Events Server: not provided");
            println!();
            println!("Server Parameters:");
            println!("  Update period: {} ms", parameters.update_period_ms);
            println!("  Delimiter:     '{}'", parameters.branch_delimiter);
            println!("  Browse mode:   {:?}", parameters.browse_mode);
            println!();
            println!("Optimization Parameters:");
            println!("  Request items: {}", optimization.use_on_request_items);
            println!("  Refresh items: {}", optimization.use_on_refresh_items);
            println!("  Add item:      {}", optimization.use_on_add_item);
            println!("  Remove item:   {}", optimization.use_on_remove_item);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "data_access": definition,
                "alarms_events": serde_json::Value::Null,
                "parameters": parameters,
                "optimization": optimization,
            });
            println!("{}", to_pretty_json(&output)?);
        }
    }

    Ok(())
}
