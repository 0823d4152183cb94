// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Integration tests for address space browsing.

use opcsim_core::browse::matches_pattern;
use opcsim_core::{
    AccessRights, BrowseDirection, BrowseFilter, BrowseType, CanonicalType, ClientId, NodeManager,
    Status, TypeKind,
};
use opcsim_tests::prelude::*;

fn custom_server(mass_item_groups: usize) -> ServerHarness {
    let harness = ServerHarness::start(
        SampleServerBuilder::new()
            .custom_browse()
            .with_mass_item_groups(mass_item_groups)
            .with_event_space(false),
    )
    .expect("sample server should start");
    assert!(harness.wait_running());
    harness
}

fn list(harness: &ServerHarness, client: ClientId, filter: BrowseFilter) -> Vec<String> {
    harness
        .manager()
        .on_browse_list_ids(client, &filter)
        .assert_ok()
        .collect()
}

fn move_to(harness: &ServerHarness, client: ClientId, path: &str) -> String {
    harness
        .manager()
        .on_browse_change_position(client, BrowseDirection::To, Some(path))
        .assert_ok()
}

// =============================================================================
// Custom Browse
// =============================================================================

#[test]
fn test_root_listing() {
    let harness = custom_server(0);
    let client = ClientId::new();

    assert_eq!(
        list(&harness, client, BrowseFilter::new(BrowseType::Branch)),
        vec!["CTT", "Commands", "SimulatedData"]
    );
    assert!(list(&harness, client, BrowseFilter::new(BrowseType::Leaf)).is_empty());
}

#[test]
fn test_navigate_down_and_up() {
    let harness = custom_server(0);
    let manager = harness.manager();
    let client = ClientId::new();

    let position = manager
        .on_browse_change_position(client, BrowseDirection::Down, Some("CTT"))
        .assert_ok();
    assert_eq!(position, "CTT");
    assert_eq!(
        list(&harness, client, BrowseFilter::new(BrowseType::Branch)),
        vec!["Arrays", "SimpleTypes", "SpecialItems"]
    );

    let position = manager
        .on_browse_change_position(client, BrowseDirection::Down, Some("SimpleTypes"))
        .assert_ok();
    assert_eq!(position, "CTT.SimpleTypes");
    assert_eq!(
        list(&harness, client, BrowseFilter::new(BrowseType::Branch)),
        vec!["In", "InOut", "Out"]
    );

    let position = manager
        .on_browse_change_position(client, BrowseDirection::Up, None)
        .assert_ok();
    assert_eq!(position, "CTT");
    let position = manager
        .on_browse_change_position(client, BrowseDirection::Up, None)
        .assert_ok();
    assert_eq!(position, "");
    manager
        .on_browse_change_position(client, BrowseDirection::Up, None)
        .assert_status(Status::Fail);
}

#[test]
fn test_invalid_moves_keep_position() {
    let harness = custom_server(0);
    let manager = harness.manager();
    let client = ClientId::new();
    move_to(&harness, client, "CTT.SimpleTypes");

    for (direction, target) in [
        (BrowseDirection::Down, Some("Missing")),
        (BrowseDirection::Down, Some("In.Boolean")),
        (BrowseDirection::Down, None),
        (BrowseDirection::To, Some("CTT.SimpleTypes.In.Boolean")),
        (BrowseDirection::To, Some("CTT..In")),
    ] {
        manager
            .on_browse_change_position(client, direction, target)
            .assert_status(Status::InvalidArgument);
    }
    assert_eq!(
        manager.on_browse_resolve_full_id(client, "").assert_ok(),
        "CTT.SimpleTypes"
    );

    let position = manager
        .on_browse_change_position(client, BrowseDirection::To, None)
        .assert_ok();
    assert_eq!(position, "");
}

#[test]
fn test_leaf_listing_sorted() {
    let harness = custom_server(0);
    let client = ClientId::new();
    move_to(&harness, client, "CTT.SimpleTypes.In");

    assert_eq!(
        list(&harness, client, BrowseFilter::new(BrowseType::Leaf)),
        vec![
            "Boolean",
            "Byte",
            "Character",
            "Currency",
            "Date",
            "DoubleFloat",
            "DoubleWord",
            "Integer",
            "Short",
            "SingleFloat",
            "String",
            "Word",
        ]
    );
}

#[test]
fn test_name_filters() {
    let harness = custom_server(0);
    let client = ClientId::new();
    move_to(&harness, client, "CTT.SimpleTypes.In");

    let leaves = |pattern: &str| {
        list(
            &harness,
            client,
            BrowseFilter::new(BrowseType::Leaf).with_name_filter(pattern),
        )
    };
    assert_eq!(leaves("*Float"), vec!["DoubleFloat", "SingleFloat"]);
    assert_eq!(leaves("Double*"), vec!["DoubleFloat", "DoubleWord"]);
    assert_eq!(leaves("?yte"), vec!["Byte"]);
    assert!(leaves("Nothing*").is_empty());
}

#[test]
fn test_digit_pattern_on_mass_blocks() {
    let harness = custom_server(2);
    let client = ClientId::new();
    move_to(&harness, client, "MassItems");

    assert_eq!(
        list(&harness, client, BrowseFilter::new(BrowseType::Branch)),
        vec!["Arrays[0]", "Arrays[1]", "SimpleTypes[0]", "SimpleTypes[1]"]
    );
    assert_eq!(
        list(
            &harness,
            client,
            BrowseFilter::new(BrowseType::Branch).with_name_filter("SimpleTypes[#]")
        ),
        vec!["SimpleTypes[0]", "SimpleTypes[1]"]
    );
}

#[test]
fn test_type_and_access_filters() {
    let harness = custom_server(0);
    let client = ClientId::new();
    move_to(&harness, client, "CTT.SimpleTypes");

    let flat = list(&harness, client, BrowseFilter::new(BrowseType::Flat));
    assert_eq!(flat.len(), 36);

    let doubles = list(
        &harness,
        client,
        BrowseFilter::new(BrowseType::Flat)
            .with_type_filter(CanonicalType::scalar(TypeKind::Float64)),
    );
    assert_eq!(doubles, vec!["DoubleFloat"; 3]);

    let writable = list(
        &harness,
        client,
        BrowseFilter::new(BrowseType::Flat).with_access_filter(AccessRights::Writable),
    );
    assert_eq!(writable.len(), 24);

    // Branches carry no type and pass type filters.
    let branches = list(
        &harness,
        client,
        BrowseFilter::new(BrowseType::Branch)
            .with_type_filter(CanonicalType::scalar(TypeKind::Bool)),
    );
    assert_eq!(branches, vec!["In", "InOut", "Out"]);
}

#[test]
fn test_resolve_full_id() {
    let harness = custom_server(0);
    let manager = harness.manager();
    let client = ClientId::new();

    assert_eq!(
        manager.on_browse_resolve_full_id(client, "CTT").assert_ok(),
        "CTT"
    );
    move_to(&harness, client, "CTT.SimpleTypes.In");
    let full = manager
        .on_browse_resolve_full_id(client, "Boolean")
        .assert_ok();
    assert_eq!(full, "CTT.SimpleTypes.In.Boolean");
    assert!(harness.handle(&full).is_some());

    manager
        .on_browse_resolve_full_id(client, "In.Boolean")
        .assert_status(Status::InvalidArgument);
}

#[test]
fn test_listing_is_restartable() {
    let harness = custom_server(0);
    let client = ClientId::new();
    move_to(&harness, client, "CTT.SimpleTypes.Out");

    let mut iter = harness
        .manager()
        .on_browse_list_ids(client, &BrowseFilter::new(BrowseType::Leaf))
        .assert_ok();
    let first: Vec<String> = iter.by_ref().collect();
    assert_eq!(iter.next(), None);
    iter.restart();
    let second: Vec<String> = iter.collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 12);
}

#[test]
fn test_clients_browse_independently() {
    let harness = custom_server(0);
    let manager = harness.manager();
    let (alice, bob) = (ClientId::new(), ClientId::new());

    move_to(&harness, alice, "CTT.Arrays");
    move_to(&harness, bob, "SimulatedData");

    assert_eq!(
        manager.on_browse_resolve_full_id(alice, "").assert_ok(),
        "CTT.Arrays"
    );
    assert_eq!(
        list(&harness, bob, BrowseFilter::new(BrowseType::Leaf)),
        vec!["NumberItems", "Ramp", "Random", "Sine"]
    );

    manager.on_client_disconnect(alice);
    assert_eq!(manager.on_browse_resolve_full_id(alice, "").assert_ok(), "");
    assert_eq!(
        manager.on_browse_resolve_full_id(bob, "").assert_ok(),
        "SimulatedData"
    );
}

#[test]
fn test_removed_items_leave_listing() {
    let harness = custom_server(0);
    let ctx = harness.manager().context();
    let client = ClientId::new();
    move_to(&harness, client, "CTT.SpecialItems");

    let handle = harness.handle("CTT.SpecialItems.WithAnalogEUInfo2").unwrap();
    ctx.remove_item(handle).assert_ok();
    assert_eq!(
        list(&harness, client, BrowseFilter::new(BrowseType::Leaf)),
        vec!["WithAnalogEUInfo", "WithVendorSpecificProperties"]
    );
}

// =============================================================================
// Generic Browse
// =============================================================================

#[test]
fn test_generic_mode_declines_custom_browse() {
    let harness = ServerHarness::start(
        SampleServerBuilder::new()
            .with_mass_item_groups(0)
            .with_event_space(false),
    )
    .expect("sample server should start");
    assert!(harness.wait_running());
    let manager = harness.manager();
    let client = ClientId::new();

    manager
        .on_browse_change_position(client, BrowseDirection::Down, Some("CTT"))
        .assert_status(Status::NotSupported);
    manager
        .on_browse_list_ids(client, &BrowseFilter::new(BrowseType::Branch))
        .map(|iter| iter.count())
        .assert_status(Status::NotSupported);
    manager
        .on_browse_resolve_full_id(client, "CTT")
        .assert_status(Status::NotSupported);

    // The host walks its own catalog instead.
    let host = harness.host();
    let position = host
        .browse_change_position(client, BrowseDirection::To, Some("CTT.SimpleTypes.InOut"))
        .assert_ok();
    assert_eq!(position, "CTT.SimpleTypes.InOut");
    let leaves: Vec<String> = host
        .browse_list_ids(client, &BrowseFilter::new(BrowseType::Leaf).with_name_filter("S*"))
        .collect();
    assert_eq!(leaves, vec!["Short", "SingleFloat", "String"]);
    assert_eq!(
        host.browse_resolve_full_id(client, "Short").assert_ok(),
        "CTT.SimpleTypes.InOut.Short"
    );
}

#[test]
fn test_custom_delimiter_namespace() {
    let (_host, ctx) = ContextBuilder::new()
        .with_delimiter('/')
        .custom_browse()
        .build();
    ctx.add_item(opcsim_core::ItemDefinition::new(
        "Line 1/Press.A/Force",
        AccessRights::Readable,
        opcsim_core::Value::Float64(0.0),
    ))
    .assert_ok();

    let client = ClientId::new();
    let position = ctx
        .browse_change_position(client, BrowseDirection::To, Some("Line 1/Press.A"))
        .assert_ok();
    assert_eq!(position, "Line 1/Press.A");
    assert_eq!(
        ctx.browse_resolve_full_id(client, "Force").assert_ok(),
        "Line 1/Press.A/Force"
    );
}

#[test]
fn test_wildcard_patterns() {
    assert!(matches_pattern("*", ""));
    assert!(matches_pattern("*", "anything"));
    assert!(matches_pattern("Tank?", "Tank1"));
    assert!(!matches_pattern("Tank?", "Tank12"));
    assert!(matches_pattern("Tank##", "Tank12"));
    assert!(!matches_pattern("Tank#", "TankA"));
    assert!(matches_pattern("*Level*", "Tank1.Level.High"));
    assert!(matches_pattern("a*b*c", "aXXbYYc"));
    assert!(!matches_pattern("a*b*c", "aXXbYY"));
    assert!(!matches_pattern("", "x"));
}
