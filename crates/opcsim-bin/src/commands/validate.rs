// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use opcsim_config::OpcsimConfig;
use opcsim_core::BrowseMode;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command.
///
/// The configuration has already been loaded and validated by the time this
/// runs; the command reports the outcome and any soft warnings.
pub fn validate(cli: &Cli, config: &OpcsimConfig, args: ValidateArgs) -> BinResult<()> {
    let source = cli
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    let warnings = collect_warnings(config);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", source);
            println!();
            println!("Summary:");
            println!("  Update period: {} ms", config.server.update_period_ms);
            println!("  Delimiter: '{}'", config.server.branch_delimiter);
            println!("  Browse mode: {:?}", config.server.browse_mode);
            println!("  Tick: {} ms", config.simulation.tick_ms);
            println!("  Mass item blocks: {}", config.simulation.mass_item_groups);
            println!(
                "  Event space: {}",
                if config.simulation.event_space { "enabled" } else { "disabled" }
            );
            println!(
                "  Grace periods: builder {} ms, refresher {} ms",
                config.lifecycle.builder_grace_ms, config.lifecycle.refresher_grace_ms
            );
            println!("  Log level: {:?}", config.logging.level);

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!("{}", to_pretty_json(config)?);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": source,
                "summary": {
                    "update_period_ms": config.server.update_period_ms,
                    "branch_delimiter": config.server.branch_delimiter.to_string(),
                    "browse_mode": config.server.browse_mode,
                    "tick_ms": config.simulation.tick_ms,
                    "mass_item_groups": config.simulation.mass_item_groups,
                    "event_space": config.simulation.event_space,
                },
                "warnings": warnings,
                "config": if args.show_config { Some(config) } else { None },
            });
            println!("{}", to_pretty_json(&output)?);
        }
    }

    Ok(())
}

/// Scalar plus array items created per mass item block.
const ITEMS_PER_MASS_BLOCK: usize = 72;

fn collect_warnings(config: &OpcsimConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.simulation.mass_item_groups > 1000 {
        warnings.push(format!(
            "{} mass item blocks create {} items; startup will be slow",
            config.simulation.mass_item_groups,
            config.simulation.mass_item_groups * ITEMS_PER_MASS_BLOCK
        ));
    }
    if config.server.browse_mode == BrowseMode::Generic && config.server.branch_delimiter != '.' {
        warnings.push("Generic browsing with a non-default delimiter".to_string());
    }
    if config.simulation.tick_ms > u64::from(config.server.update_period_ms) {
        warnings.push(format!(
            "Tick of {} ms is slower than the update period of {} ms",
            config.simulation.tick_ms, config.server.update_period_ms
        ));
    }
    if let Some(parent) = config.logging.file.as_ref().and_then(|f| f.parent()) {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            warnings.push(format!("Log directory {} will be created", parent.display()));
        }
    }

    warnings
}

pub(crate) fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> BinResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| BinError::runtime(format!("Failed to serialize output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_no_warnings() {
        assert!(collect_warnings(&OpcsimConfig::default()).is_empty());
    }

    #[test]
    fn test_slow_tick_warning() {
        let mut config = OpcsimConfig::default();
        config.simulation.tick_ms = 5_000;
        config.server.update_period_ms = 200;
        let warnings = collect_warnings(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("slower"));
    }
}
