// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built test data for consistent and reproducible testing.

use opcsim_core::event_space::{
    AreaId, CategoryId, ConditionDefinitionId, ConditionId, SourceId, SubConditionId, AREA_ROOT,
};
use opcsim_core::{
    AccessRights, CanonicalType, EventSpace, ItemDefinition, OpcResult, PropertyId,
    SingleStateDefinition, SubConditionDefinition, TypeKind, Value,
};

// =============================================================================
// Item Fixtures
// =============================================================================

/// Fixture providing item definitions.
pub struct ItemFixtures;

impl ItemFixtures {
    /// A readable boolean item.
    pub fn boolean_in() -> ItemDefinition {
        ItemDefinition::new("Plant.Tank1.Running", AccessRights::Readable, Value::Bool(false))
    }

    /// A read-write integer item.
    pub fn setpoint() -> ItemDefinition {
        ItemDefinition::new("Plant.Tank1.Setpoint", AccessRights::ReadWritable, Value::Int32(50))
    }

    /// An analog level item with a 0 to 100 range.
    pub fn analog_level() -> ItemDefinition {
        ItemDefinition::analog(
            "Plant.Tank1.Level",
            AccessRights::Readable,
            Value::Float64(12.5),
            0.0,
            100.0,
        )
    }

    /// A string array item.
    pub fn string_array() -> ItemDefinition {
        ItemDefinition::new(
            "Plant.Tank1.Alarms[]",
            AccessRights::Readable,
            Value::from(vec!["low".to_string(), "high".to_string()]),
        )
    }

    /// `count` integer items named `<prefix>.Item0000` and up.
    pub fn batch(prefix: &str, count: usize) -> Vec<ItemDefinition> {
        (0..count)
            .map(|i| {
                ItemDefinition::new(
                    format!("{}.Item{:04}", prefix, i),
                    AccessRights::ReadWritable,
                    Value::Int32(i as i32),
                )
            })
            .collect()
    }

    /// A vendor specific property: id, description and default value.
    pub fn casing_material() -> (PropertyId, &'static str, Value) {
        (PropertyId::new(5650), "Casing Material", Value::from("Aluminum"))
    }
}

// =============================================================================
// Event Space Fixtures
// =============================================================================

/// A small plant alarm model.
///
/// ```text
/// Plant (10)
/// ├── Pump (source 101)
/// └── Tanks (11)
///     └── Tank1 (source 100, multi-area)
/// ```
pub struct PlantEventSpace;

impl PlantEventSpace {
    /// Simple category with one I4 attribute.
    pub const SYSTEM: CategoryId = 1;
    /// Tracking category without attributes.
    pub const OPERATOR: CategoryId = 2;
    /// Condition category.
    pub const LEVEL: CategoryId = 3;

    /// Top-level area.
    pub const PLANT: AreaId = 10;
    /// Area below `PLANT`.
    pub const TANKS: AreaId = 11;

    /// Multi-area source in `TANKS`.
    pub const TANK1: SourceId = 100;
    /// Single-area source in `PLANT`.
    pub const PUMP: SourceId = 101;

    /// Single-state definition.
    pub const HIGH: ConditionDefinitionId = 200;
    /// Multi-state definition.
    pub const LEVEL_DEF: ConditionDefinitionId = 201;
    /// Low sub-condition of `LEVEL_DEF`.
    pub const SUB_LOW: SubConditionId = 1;
    /// High-high sub-condition of `LEVEL_DEF`.
    pub const SUB_HIGH_HIGH: SubConditionId = 2;

    /// `HIGH` bound to `TANK1`.
    pub const TANK1_HIGH: ConditionId = 1000;
    /// `LEVEL_DEF` bound to `TANK1`.
    pub const TANK1_LEVEL: ConditionId = 1001;

    /// Builds the model in `space`.
    pub fn populate(space: &EventSpace) -> OpcResult<()> {
        space.add_simple_event_category(Self::SYSTEM, "System message")?;
        space.add_event_attribute(
            Self::SYSTEM,
            1,
            "Item count",
            CanonicalType::scalar(TypeKind::Int32),
        )?;
        space.add_tracking_event_category(Self::OPERATOR, "Operator action")?;
        space.add_condition_event_category(Self::LEVEL, "Level")?;

        space.add_area(AREA_ROOT, Self::PLANT, "Plant")?;
        space.add_area(Self::PLANT, Self::TANKS, "Tanks")?;
        space.add_source(Self::TANKS, Self::TANK1, "Tank1", true)?;
        space.add_source(Self::PLANT, Self::PUMP, "Pump", false)?;

        space.add_single_state_condition_definition(SingleStateDefinition {
            category_id: Self::LEVEL,
            id: Self::HIGH,
            name: "High".to_string(),
            condition: "level > 90".to_string(),
            severity: 600,
            description: "Level high".to_string(),
            ack_required: true,
        })?;
        space.add_multi_state_condition_definition(Self::LEVEL, Self::LEVEL_DEF, "Level")?;
        space.add_sub_condition_definition(
            Self::LEVEL_DEF,
            Self::sub_condition(Self::SUB_LOW, "Lo", 300, false),
        )?;
        space.add_sub_condition_definition(
            Self::LEVEL_DEF,
            Self::sub_condition(Self::SUB_HIGH_HIGH, "HiHi", 800, true),
        )?;

        space.add_condition(Self::TANK1, Self::HIGH, Self::TANK1_HIGH)?;
        space.add_condition(Self::TANK1, Self::LEVEL_DEF, Self::TANK1_LEVEL)?;
        Ok(())
    }

    /// Creates a populated event space with `.` as delimiter.
    pub fn build() -> EventSpace {
        let space = EventSpace::new('.');
        Self::populate(&space).expect("Failed to build plant event space");
        space
    }

    /// A sub-condition definition.
    pub fn sub_condition(
        id: SubConditionId,
        name: &str,
        severity: u32,
        ack_required: bool,
    ) -> SubConditionDefinition {
        SubConditionDefinition {
            id,
            name: name.to_string(),
            condition: format!("{} limit", name),
            severity,
            description: format!("Level {}", name),
            ack_required,
        }
    }
}

// =============================================================================
// Configuration Fixtures
// =============================================================================

/// Fixture providing configuration file contents.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// A complete YAML configuration.
    pub fn full_yaml() -> &'static str {
        r#"
server:
  update_period_ms: 100
  browse_mode: custom

simulation:
  tick_ms: 50
  mass_item_groups: 2
  mass_item_delay_ms: 5
  event_space: true
  seed: 42

lifecycle:
  builder_grace_ms: 1000
  refresher_grace_ms: 2000

logging:
  level: debug
  format: json
  file: logs/opcsim.log
"#
    }

    /// A minimal TOML configuration.
    pub fn minimal_toml() -> &'static str {
        r#"
[server]
branch_delimiter = "/"

[simulation]
mass_item_groups = 0
"#
    }

    /// A YAML configuration with environment placeholders.
    pub fn yaml_with_placeholders(var: &str) -> String {
        format!(
            r#"
simulation:
  mass_item_groups: ${{{}:7}}
"#,
            var
        )
    }
}
