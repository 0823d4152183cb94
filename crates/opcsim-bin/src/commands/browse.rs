// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `browse` command.
//!
//! Builds the sample address space without starting the workers and walks
//! it through the plugin's custom browse interface.

use std::sync::Arc;
use std::time::Duration;

use opcsim_config::OpcsimConfig;
use opcsim_core::{
    BrowseDirection, BrowseFilter, BrowseMode, BrowseType, CancellationSignal, ClientId,
    InMemoryHost, SampleWorkload, ServerContext, Workload,
};
use tracing::debug;

use crate::cli::{BrowseArgs, OutputFormat};
use crate::commands::validate::to_pretty_json;
use crate::error::{BinError, BinResult};

/// Result of one browse listing.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BrowseListing {
    /// Position the listing was taken at; empty for the root.
    pub position: String,
    /// Child branches, empty for flat listings.
    pub branches: Vec<String>,
    /// Leaves as fully qualified item names.
    pub leaves: Vec<String>,
}

/// Executes the `browse` command.
pub fn browse(config: &OpcsimConfig, args: BrowseArgs) -> BinResult<()> {
    let listing = collect(config, &args)?;

    match args.format {
        OutputFormat::Text => {
            let position = if listing.position.is_empty() {
                "(root)"
            } else {
                listing.position.as_str()
            };
            println!("{}", position);
            for branch in &listing.branches {
                println!("  + {}", branch);
            }
            for leaf in &listing.leaves {
                println!("  - {}", leaf);
            }
            println!();
            println!(
                "{} branch(es), {} item(s)",
                listing.branches.len(),
                listing.leaves.len()
            );
        }
        OutputFormat::Json => println!("{}", to_pretty_json(&listing)?),
    }
    Ok(())
}

/// Builds the address space and lists the requested branch.
pub fn collect(config: &OpcsimConfig, args: &BrowseArgs) -> BinResult<BrowseListing> {
    let parameters = config.server_parameters().with_browse_mode(BrowseMode::Custom);
    let host = InMemoryHost::shared(parameters.branch_delimiter);
    let ctx = ServerContext::new(host, parameters);

    let mut sample = config.sample_config();
    sample.mass_item_groups = args.mass_item_groups;
    sample.mass_item_delay = Duration::ZERO;
    sample.event_space = false;

    let workload = Arc::new(SampleWorkload::new(sample, config.simulation.tick())?);
    workload
        .populate(&ctx, &CancellationSignal::new())
        .map_err(|e| BinError::from(e).with_context("Address space creation failed"))?;
    debug!(items = ctx.item_count(), "Address space built for browsing");

    let client = ClientId::new();
    let position = ctx.browse_change_position(client, BrowseDirection::To, args.branch.as_deref())?;

    let filter = |browse_type| {
        let filter = BrowseFilter::new(browse_type);
        match &args.pattern {
            Some(pattern) => filter.with_name_filter(pattern.clone()),
            None => filter,
        }
    };

    let mut listing = BrowseListing {
        position,
        ..BrowseListing::default()
    };
    if args.flat {
        listing.leaves = ctx.browse_list_ids(client, &filter(BrowseType::Flat))?.collect();
    } else {
        listing.branches = ctx
            .browse_list_ids(client, &filter(BrowseType::Branch))?
            .collect();
        listing.leaves = ctx
            .browse_list_ids(client, &filter(BrowseType::Leaf))?
            .map(|leaf| ctx.browse_resolve_full_id(client, &leaf))
            .collect::<Result<_, _>>()?;
    }
    ctx.forget_client(&client);

    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(branch: Option<&str>) -> BrowseArgs {
        BrowseArgs {
            branch: branch.map(str::to_string),
            mass_item_groups: 1,
            ..BrowseArgs::default()
        }
    }

    #[test]
    fn test_root_listing() {
        let listing = collect(&OpcsimConfig::default(), &args(None)).unwrap();
        assert!(listing.position.is_empty());
        assert!(listing.branches.contains(&"CTT".to_string()));
        assert!(listing.branches.contains(&"SimulatedData".to_string()));
        assert!(listing.branches.contains(&"MassItems".to_string()));
    }

    #[test]
    fn test_branch_listing_with_pattern() {
        let mut args = args(Some("CTT.SimpleTypes.In"));
        args.pattern = Some("*Float".to_string());
        let listing = collect(&OpcsimConfig::default(), &args).unwrap();

        assert_eq!(listing.position, "CTT.SimpleTypes.In");
        assert!(listing.branches.is_empty());
        assert_eq!(
            listing.leaves,
            vec![
                "CTT.SimpleTypes.In.DoubleFloat".to_string(),
                "CTT.SimpleTypes.In.SingleFloat".to_string(),
            ]
        );
    }

    #[test]
    fn test_unknown_branch_is_rejected() {
        let result = collect(&OpcsimConfig::default(), &args(Some("No.Such.Branch")));
        assert!(result.is_err());
    }
}
