// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Integration tests for the item catalog and the quality codec.

use std::sync::Arc;
use std::thread;

use chrono::Utc;

use opcsim_core::{
    AccessRights, ItemCatalog, ItemDefinition, LimitBits, OpcError, PropertyId, Quality,
    QualityBits, Status, TypeKind, Value,
};
use opcsim_tests::prelude::*;

// =============================================================================
// Quality Codec
// =============================================================================

#[test]
fn test_quality_words_for_every_pattern() {
    for quality in QualityBits::ALL {
        for limit in LimitBits::ALL {
            let original = Quality::new(quality, limit, 0x5A);
            let word = original.encode();
            assert_eq!(word >> 8, 0x5A);
            assert_eq!((word & 0x00FC) as u8, quality.bits());
            assert_eq!((word & 0x0003) as u8, limit.bits());
            assert_eq!(Quality::decode(word).unwrap(), original);
        }
    }
}

#[test]
fn test_quality_well_known_words() {
    assert_eq!(Quality::GOOD.encode(), 0x00C0);
    assert_eq!(Quality::BAD.encode(), 0x0000);
    assert_eq!(Quality::UNCERTAIN.encode(), 0x0040);
    assert_eq!(
        Quality::GOOD.with_limit(LimitBits::High).with_vendor(1).encode(),
        0x01C2
    );
}

#[test]
fn test_quality_undefined_bits_rejected() {
    // 0x60 lies in the uncertain class but is not an enumerated pattern.
    assert_status(&Quality::decode(0x0060), Status::InvalidArgument);
    assert_status(&Quality::decode(0x00FC), Status::InvalidArgument);
}

// =============================================================================
// Item Creation
// =============================================================================

#[test]
fn test_add_and_read_item() {
    let catalog = ItemCatalog::new('.');
    let handle = catalog.add_item(ItemFixtures::setpoint()).assert_ok();

    let snapshot = catalog.read(handle).assert_ok();
    assert_eq!(snapshot.name, "Plant.Tank1.Setpoint");
    assert_eq!(snapshot.access_rights, AccessRights::ReadWritable);
    assert_eq!(snapshot.canonical_type.kind, TypeKind::Int32);
    assert!(!snapshot.canonical_type.is_array);
    assert!(!snapshot.removed);
    snapshot.assert_value(&Value::Int32(50));
    snapshot.assert_quality(Quality::UNCERTAIN);

    assert_eq!(catalog.find("Plant.Tank1.Setpoint"), Some(handle));
    assert_eq!(catalog.len(), 1);
}

#[test]
fn test_handles_are_unique() {
    let catalog = ItemCatalog::new('.');
    let mut handles: Vec<_> = ItemFixtures::batch("Bulk", 50)
        .into_iter()
        .map(|definition| catalog.add_item(definition).assert_ok())
        .collect();
    handles.sort();
    handles.dedup();
    assert_eq!(handles.len(), 50);
    assert_eq!(catalog.metrics().snapshot().items_added, 50);
}

#[test]
fn test_array_item_canonical_type() {
    let catalog = ItemCatalog::new('.');
    let handle = catalog.add_item(ItemFixtures::string_array()).assert_ok();
    let snapshot = catalog.read(handle).assert_ok();
    assert_eq!(snapshot.canonical_type.kind, TypeKind::String);
    assert!(snapshot.canonical_type.is_array);
}

#[test]
fn test_duplicate_name_conflicts() {
    let catalog = ItemCatalog::new('.');
    catalog.add_item(ItemFixtures::setpoint()).assert_ok();
    catalog
        .add_item(ItemFixtures::setpoint())
        .assert_status(Status::Conflict);
    assert_eq!(catalog.len(), 1);
}

#[test]
fn test_malformed_definitions_rejected() {
    let catalog = ItemCatalog::new('.');
    for name in ["", "Plant..Level", ".Plant", "Plant."] {
        let result = catalog.add_item(ItemDefinition::new(
            name,
            AccessRights::Readable,
            Value::Int32(0),
        ));
        assert_status(&result, Status::InvalidArgument);
    }

    let untyped = ItemDefinition::new("Plant.Empty", AccessRights::Readable, Value::Empty);
    catalog.add_item(untyped).assert_status(Status::InvalidArgument);

    let inverted = ItemDefinition::analog(
        "Plant.Inverted",
        AccessRights::Readable,
        Value::Float64(1.0),
        10.0,
        0.0,
    );
    catalog.add_item(inverted).assert_status(Status::InvalidArgument);
    assert!(catalog.is_empty());
}

#[test]
fn test_custom_delimiter() {
    let catalog = ItemCatalog::new('/');
    let handle = catalog
        .add_item(ItemDefinition::new(
            "Plant/Tank.1/Level",
            AccessRights::Readable,
            Value::Float64(0.0),
        ))
        .assert_ok();
    assert_eq!(catalog.find("Plant/Tank.1/Level"), Some(handle));
}

// =============================================================================
// Value Updates
// =============================================================================

#[test]
fn test_set_value_updates_whole_record() {
    let catalog = ItemCatalog::new('.');
    let handle = catalog.add_item(ItemFixtures::analog_level()).assert_ok();
    let timestamp = Utc::now();

    catalog
        .set_item_value(handle, Some(Value::Float64(42.0)), Quality::GOOD, timestamp)
        .assert_ok();

    let snapshot = catalog.read(handle).assert_ok();
    snapshot.assert_good();
    snapshot.assert_value_approx(42.0, 1e-9);
    assert_eq!(snapshot.timestamp, timestamp);
}

#[test]
fn test_set_value_without_value_keeps_cache() {
    let catalog = ItemCatalog::new('.');
    let handle = catalog.add_item(ItemFixtures::setpoint()).assert_ok();

    catalog
        .set_item_value(handle, None, Quality::new(QualityBits::BadCommFailure, LimitBits::None, 0), Utc::now())
        .assert_ok();

    let snapshot = catalog.read(handle).assert_ok();
    snapshot.assert_value(&Value::Int32(50));
    snapshot.assert_quality_bits(QualityBits::BadCommFailure);
}

#[test]
fn test_type_mismatch_rejected() {
    let catalog = ItemCatalog::new('.');
    let handle = catalog.add_item(ItemFixtures::setpoint()).assert_ok();

    catalog
        .set_item_value(handle, Some(Value::from("fifty")), Quality::GOOD, Utc::now())
        .assert_status(Status::InvalidArgument);
    catalog
        .set_item_value(handle, Some(Value::Int64(50)), Quality::GOOD, Utc::now())
        .assert_status(Status::InvalidArgument);

    let snapshot = catalog.read(handle).assert_ok();
    snapshot.assert_value(&Value::Int32(50));
    snapshot.assert_quality(Quality::UNCERTAIN);

    let metrics = catalog.metrics().snapshot();
    assert_eq!(metrics.updates_rejected, 2);
    assert_eq!(metrics.updates_applied, 0);
}

#[test]
fn test_set_value_unknown_handle() {
    let catalog = ItemCatalog::new('.');
    let handle = catalog.add_item(ItemFixtures::setpoint()).assert_ok();
    catalog.delete_item(handle).assert_ok();
    catalog
        .set_item_value(handle, Some(Value::Int32(1)), Quality::GOOD, Utc::now())
        .assert_status(Status::NotFound);
}

#[test]
fn test_concurrent_updates_keep_records_consistent() {
    let catalog = Arc::new(ItemCatalog::new('.'));
    let handle = catalog.add_item(ItemFixtures::setpoint()).assert_ok();

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let catalog = Arc::clone(&catalog);
            thread::spawn(move || {
                for i in 0..500 {
                    let value = w * 1000 + i;
                    let quality = Quality::GOOD.with_vendor((value % 256) as u8);
                    catalog
                        .set_item_value(handle, Some(Value::Int32(value)), quality, Utc::now())
                        .unwrap();
                }
            })
        })
        .collect();

    for _ in 0..2000 {
        let snapshot = catalog.read(handle).unwrap();
        if let Value::Int32(value) = snapshot.value {
            if snapshot.quality.is_good() {
                assert_eq!(snapshot.quality.vendor, (value % 256) as u8);
            }
        }
    }

    for writer in writers {
        writer.join().unwrap();
    }
    assert_eq!(catalog.metrics().snapshot().updates_applied, 2000);
}

// =============================================================================
// Removal
// =============================================================================

#[test]
fn test_remove_unreferenced_item_frees_it() {
    let catalog = ItemCatalog::new('.');
    let handle = catalog.add_item(ItemFixtures::setpoint()).assert_ok();

    catalog.remove_item(handle).assert_ok();
    assert_eq!(catalog.find("Plant.Tank1.Setpoint"), None);
    catalog.read(handle).assert_status(Status::NotFound);
    catalog.remove_item(handle).assert_status(Status::NotFound);

    let again = catalog.add_item(ItemFixtures::setpoint()).assert_ok();
    assert_ne!(again, handle);
    assert_eq!(catalog.metrics().snapshot().items_removed, 1);
}

#[test]
fn test_remove_referenced_item_retained_until_released() {
    let host = opcsim_core::InMemoryHost::shared('.');
    let catalog = host.catalog();
    let handle = catalog.add_item(ItemFixtures::setpoint()).assert_ok();

    let client = host.connect_client("test-client");
    let group = host.add_group(client, "fast", 100).assert_ok();
    host.add_group_item(group, handle).assert_ok();

    catalog.remove_item(handle).assert_ok();
    assert_eq!(catalog.find("Plant.Tank1.Setpoint"), None);
    let snapshot = catalog.read(handle).assert_ok();
    assert!(snapshot.removed);
    catalog.remove_item(handle).assert_status(Status::NotFound);

    // The name is free while the old record lingers.
    let replacement = catalog.add_item(ItemFixtures::setpoint()).assert_ok();
    assert_ne!(replacement, handle);

    host.remove_group(group).assert_ok();
    catalog.read(handle).assert_status(Status::NotFound);
    assert_eq!(catalog.find("Plant.Tank1.Setpoint"), Some(replacement));
}

#[test]
fn test_delete_referenced_item_fails() {
    let host = opcsim_core::InMemoryHost::shared('.');
    let catalog = host.catalog();
    let handle = catalog.add_item(ItemFixtures::setpoint()).assert_ok();
    catalog.add_group_reference(handle).assert_ok();

    catalog.delete_item(handle).assert_status(Status::PreconditionFailed);
    catalog.release_group_reference(handle).assert_ok();
    catalog.delete_item(handle).assert_ok();
    assert_eq!(catalog.metrics().snapshot().items_deleted, 1);
}

#[test]
fn test_release_without_reference_fails() {
    let catalog = ItemCatalog::new('.');
    let handle = catalog.add_item(ItemFixtures::setpoint()).assert_ok();
    catalog
        .release_group_reference(handle)
        .assert_status(Status::PreconditionFailed);
}

#[test]
fn test_active_items_exclude_inactive_and_removed() {
    let catalog = ItemCatalog::new('.');
    let active = catalog.add_item(ItemFixtures::setpoint()).assert_ok();
    catalog
        .add_item(ItemFixtures::boolean_in().with_active(false))
        .assert_ok();
    let removed = catalog.add_item(ItemFixtures::analog_level()).assert_ok();
    catalog.remove_item(removed).assert_ok();

    assert_eq!(catalog.active_items(), vec![active]);
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_vendor_property_lifecycle() {
    let catalog = ItemCatalog::new('.');
    let (id, description, default) = ItemFixtures::casing_material();
    catalog.add_property(id, description, default.clone()).assert_ok();
    catalog
        .add_property(id, description, default)
        .assert_status(Status::Conflict);

    let handle = catalog
        .add_item(ItemFixtures::setpoint().with_property(id, "Steel"))
        .assert_ok();
    assert_eq!(catalog.query_properties(handle).assert_ok(), vec![id]);
    assert_eq!(
        catalog.get_property_value(handle, id).assert_ok(),
        Value::from("Steel")
    );
    assert_eq!(
        catalog.property_definition(id).map(|p| p.description),
        Some("Casing Material".to_string())
    );
}

#[test]
fn test_reserved_property_ids_rejected() {
    let catalog = ItemCatalog::new('.');
    for raw in [1, 102, 4999] {
        catalog
            .add_property(PropertyId::new(raw), "reserved", Value::Int32(0))
            .assert_status(Status::InvalidArgument);
    }
    catalog
        .add_property(PropertyId::new(5000), "first vendor id", Value::Int32(0))
        .assert_ok();
}

#[test]
fn test_unregistered_or_mistyped_property_rejected() {
    let catalog = ItemCatalog::new('.');
    let (id, description, default) = ItemFixtures::casing_material();

    catalog
        .add_item(ItemFixtures::setpoint().with_property(id, "Steel"))
        .assert_status(Status::InvalidArgument);

    catalog.add_property(id, description, default).assert_ok();
    catalog
        .add_item(ItemFixtures::setpoint().with_property(id, 3i32))
        .assert_status(Status::InvalidArgument);
    assert!(catalog.is_empty());
}

#[test]
fn test_standard_and_analog_properties() {
    let catalog = ItemCatalog::new('.');
    let analog = catalog.add_item(ItemFixtures::analog_level()).assert_ok();
    let plain = catalog.add_item(ItemFixtures::setpoint()).assert_ok();

    assert_eq!(
        catalog.query_properties(analog).assert_ok(),
        vec![PropertyId::HIGH_EU, PropertyId::LOW_EU]
    );
    assert_eq!(
        catalog.get_property_value(analog, PropertyId::HIGH_EU).assert_ok(),
        Value::Float64(100.0)
    );
    assert_eq!(
        catalog.get_property_value(analog, PropertyId::LOW_EU).assert_ok(),
        Value::Float64(0.0)
    );

    catalog
        .query_properties(plain)
        .assert_status(Status::NotApplicable);
    assert_eq!(
        catalog.get_property_value(plain, PropertyId::VALUE).assert_ok(),
        Value::Int32(50)
    );
    assert_eq!(
        catalog.get_property_value(plain, PropertyId::QUALITY).assert_ok(),
        Value::Int16(Quality::UNCERTAIN.encode() as i16)
    );
    catalog
        .get_property_value(plain, PropertyId::HIGH_EU)
        .assert_status(Status::NotApplicable);
}

#[test]
fn test_error_status_mapping() {
    assert_eq!(OpcError::not_supported("x").status(), Status::NotSupported);
    assert_eq!(
        OpcError::conflict("item", "Plant.Tank1").status(),
        Status::Conflict
    );
    assert!(OpcError::fatal("boom").is_fatal());
    assert!(!OpcError::fail("boom").is_fatal());
}
