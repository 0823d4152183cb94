// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Integration tests for the alarms and events model.

use chrono::Utc;

use opcsim_core::event_space::{AREA_ROOT, AREA_UNSPECIFIED, ATTRIBUTE_ACK_COMMENT, ATTRIBUTE_AREAS};
use opcsim_core::{
    ConditionStateChange, EventFilter, EventKind, EventSpace, HostCallbacks, Quality, QualityBits,
    LimitBits, SimpleEvent, Status, TrackingEvent, Value,
};
use opcsim_tests::prelude::*;

type P = PlantEventSpace;

fn system_event(severity: u32, values: Vec<Value>) -> SimpleEvent {
    SimpleEvent {
        category_id: P::SYSTEM,
        source_id: P::PUMP,
        message: "Pump started".to_string(),
        severity,
        attribute_values: values,
        timestamp: None,
    }
}

fn operator_event(actor: &str) -> TrackingEvent {
    TrackingEvent {
        category_id: P::OPERATOR,
        source_id: P::TANK1,
        message: "Setpoint changed".to_string(),
        severity: 100,
        actor_id: actor.to_string(),
        attribute_values: Vec::new(),
        timestamp: None,
    }
}

// =============================================================================
// Model Construction
// =============================================================================

#[test]
fn test_categories_and_attributes() {
    let space = P::build();

    let system = space.category(P::SYSTEM).unwrap();
    assert_eq!(system.kind, EventKind::Simple);
    assert_eq!(system.attribute_count(), 1);

    let level = space.category(P::LEVEL).unwrap();
    assert_eq!(level.kind, EventKind::Condition);
    let implicit: Vec<_> = level.attributes.iter().map(|a| a.id).collect();
    assert_eq!(implicit, vec![ATTRIBUTE_ACK_COMMENT, ATTRIBUTE_AREAS]);
    assert_eq!(level.attribute_count(), 0);

    let stats = space.stats();
    assert_eq!(stats.categories, 3);
    assert_eq!(stats.condition_definitions, 2);
    assert_eq!(stats.areas, 2);
    assert_eq!(stats.sources, 2);
    assert_eq!(stats.conditions, 2);
}

#[test]
fn test_duplicate_registrations_conflict() {
    let space = P::build();
    assert_status(
        &space.add_simple_event_category(P::SYSTEM, "again"),
        Status::Conflict,
    );
    assert_status(
        &space.add_event_attribute(
            P::SYSTEM,
            1,
            "again",
            opcsim_core::CanonicalType::scalar(opcsim_core::TypeKind::Int32),
        ),
        Status::Conflict,
    );
    assert_status(
        &space.add_multi_state_condition_definition(P::LEVEL, 999, "Level"),
        Status::Conflict,
    );
    assert_status(&space.add_area(AREA_ROOT, 12, "Plant"), Status::Conflict);
    assert_status(&space.add_source(P::TANKS, 102, "Tank1", false), Status::Conflict);
    assert_status(
        &space.add_condition(P::PUMP, P::HIGH, P::TANK1_HIGH),
        Status::Conflict,
    );
}

#[test]
fn test_condition_definition_needs_condition_category() {
    let space = P::build();
    let result = space.add_multi_state_condition_definition(P::SYSTEM, 300, "Flow");
    assert_status(&result, Status::InvalidArgument);
}

#[test]
fn test_area_and_source_names() {
    let space = P::build();
    assert_eq!(space.area_name(P::PLANT).as_deref(), Some("Plant"));
    assert_eq!(space.area_name(P::TANKS).as_deref(), Some("Plant.Tanks"));
    assert_eq!(space.source_name(P::TANK1).as_deref(), Some("Plant.Tanks.Tank1"));
    assert_eq!(space.source_name(P::PUMP).as_deref(), Some("Plant.Pump"));
}

#[test]
fn test_reserved_and_malformed_areas_rejected() {
    let space = P::build();
    assert_status(&space.add_area(AREA_ROOT, AREA_ROOT, "Root"), Status::InvalidArgument);
    assert_status(
        &space.add_area(AREA_ROOT, AREA_UNSPECIFIED, "Any"),
        Status::InvalidArgument,
    );
    assert_status(&space.add_area(AREA_ROOT, 20, "Bad.Name"), Status::InvalidArgument);
    assert_status(&space.add_area(999, 20, "Orphan"), Status::InvalidArgument);
}

#[test]
fn test_multi_area_sources() {
    let space = P::build();
    space.add_existing_source(P::PLANT, P::TANK1).assert_ok();
    assert_eq!(space.source(P::TANK1).unwrap().areas, vec![P::TANKS, P::PLANT]);
    // The home area still names the source.
    assert_eq!(space.source_name(P::TANK1).as_deref(), Some("Plant.Tanks.Tank1"));

    assert_status(
        &space.add_existing_source(P::TANKS, P::PUMP),
        Status::PreconditionFailed,
    );
    assert_status(
        &space.add_existing_source(P::PLANT, P::TANK1),
        Status::Conflict,
    );
}

#[test]
fn test_multi_state_condition_needs_two_sub_conditions() {
    let space = P::build();
    space
        .add_multi_state_condition_definition(P::LEVEL, 300, "Flow")
        .assert_ok();
    assert_status(&space.add_condition(P::PUMP, 300, 2000), Status::PreconditionFailed);

    space
        .add_sub_condition_definition(300, P::sub_condition(1, "FlowLo", 200, false))
        .assert_ok();
    assert_status(&space.add_condition(P::PUMP, 300, 2000), Status::PreconditionFailed);

    space
        .add_sub_condition_definition(300, P::sub_condition(2, "FlowHi", 400, false))
        .assert_ok();
    space.add_condition(P::PUMP, 300, 2000).assert_ok();
}

#[test]
fn test_sub_condition_rules() {
    let space = P::build();
    assert_status(
        &space.add_sub_condition_definition(P::LEVEL_DEF, P::sub_condition(0, "Zero", 100, false)),
        Status::InvalidArgument,
    );
    assert_status(
        &space.add_sub_condition_definition(P::HIGH, P::sub_condition(5, "Extra", 100, false)),
        Status::InvalidArgument,
    );
    assert_status(
        &space.add_sub_condition_definition(P::LEVEL_DEF, P::sub_condition(9, "Bad", 0, false)),
        Status::InvalidArgument,
    );
}

// =============================================================================
// Simple & Tracking Events
// =============================================================================

#[test]
fn test_simple_event_delivered() {
    let space = P::build();
    let subscription = space.subscribe(EventFilter::new());

    space
        .process_simple_event(system_event(500, vec![Value::Int32(36)]))
        .assert_ok();

    let events = subscription.drain();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.kind, EventKind::Simple);
    assert_eq!(event.category_id, P::SYSTEM);
    assert_eq!(event.source, "Plant.Pump");
    assert_eq!(event.severity, 500);
    assert_eq!(event.attribute_values, vec![Value::Int32(36)]);
    assert!(event.actor_id.is_none());
    assert!(event.condition.is_none());
}

#[test]
fn test_simple_event_keeps_timestamp() {
    let space = P::build();
    let subscription = space.subscribe(EventFilter::new());
    let timestamp = Utc::now() - chrono::Duration::seconds(30);

    let mut event = system_event(1, vec![Value::Int32(0)]);
    event.timestamp = Some(timestamp);
    space.process_simple_event(event).assert_ok();

    assert_eq!(subscription.drain()[0].time, timestamp);
}

#[test]
fn test_tracking_event_carries_actor() {
    let space = P::build();
    let subscription = space.subscribe(EventFilter::new());

    space.process_tracking_event(operator_event("operator-7")).assert_ok();

    let events = subscription.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Tracking);
    assert_eq!(events[0].actor_id.as_deref(), Some("operator-7"));
    assert_eq!(events[0].source, "Plant.Tanks.Tank1");
}

#[test]
fn test_invalid_events_rejected() {
    let space = P::build();
    let subscription = space.subscribe(EventFilter::new());

    let cases = vec![
        system_event(0, vec![Value::Int32(1)]),
        system_event(1001, vec![Value::Int32(1)]),
        system_event(500, Vec::new()),
        system_event(500, vec![Value::Int32(1), Value::Int32(2)]),
        SimpleEvent {
            category_id: 99,
            ..system_event(500, vec![Value::Int32(1)])
        },
        SimpleEvent {
            source_id: 999,
            ..system_event(500, vec![Value::Int32(1)])
        },
        // A tracking category does not accept simple events.
        SimpleEvent {
            category_id: P::OPERATOR,
            ..system_event(500, Vec::new())
        },
    ];
    let count = cases.len() as u64;
    for event in cases {
        assert_status(&space.process_simple_event(event), Status::InvalidArgument);
    }

    assert_eq!(subscription.pending(), 0);
    let stats = space.stats();
    assert_eq!(stats.events_rejected, count);
    assert_eq!(stats.events_generated, 0);
}

// =============================================================================
// Conditions
// =============================================================================

#[test]
fn test_single_state_condition_transitions() {
    let space = P::build();
    let subscription = space.subscribe(EventFilter::new().with_kinds(vec![EventKind::Condition]));

    let generated = space
        .process_condition_state_changes(&[ConditionStateChange::new(P::TANK1_HIGH, 0, true)])
        .assert_ok();
    assert_eq!(generated, 1);

    let status = space.condition(P::TANK1_HIGH).unwrap().status;
    assert!(status.active);
    assert_eq!(status.severity, 600);
    assert_eq!(status.message, "Level high");
    assert!(status.ack_required);
    assert!(!status.acknowledged);

    let events = subscription.drain();
    assert_eq!(events.len(), 1);
    let info = events[0].condition.as_ref().unwrap();
    assert_eq!(info.condition_name, "High");
    assert!(info.active);
    assert!(info.sub_condition_name.is_none());
    assert_eq!(events[0].source, "Plant.Tanks.Tank1");

    // Repeating the same state produces nothing.
    let generated = space
        .process_condition_state_changes(&[ConditionStateChange::new(P::TANK1_HIGH, 0, true)])
        .assert_ok();
    assert_eq!(generated, 0);
    assert_eq!(subscription.pending(), 0);

    // A quality change alone is a transition.
    let degraded = Quality::new(QualityBits::UncertainSensorNotAccurate, LimitBits::None, 0);
    let generated = space
        .process_condition_state_changes(&[
            ConditionStateChange::new(P::TANK1_HIGH, 0, true).with_quality(degraded)
        ])
        .assert_ok();
    assert_eq!(generated, 1);
    assert_eq!(space.condition(P::TANK1_HIGH).unwrap().status.quality, degraded);

    let generated = space
        .process_condition_state_changes(&[
            ConditionStateChange::new(P::TANK1_HIGH, 0, false).with_quality(degraded)
        ])
        .assert_ok();
    assert_eq!(generated, 1);
    assert!(!space.condition(P::TANK1_HIGH).unwrap().status.active);
}

#[test]
fn test_state_change_overrides() {
    let space = P::build();
    space
        .process_condition_state_changes(&[ConditionStateChange::new(P::TANK1_HIGH, 0, true)
            .with_message("Tank 1 at 95 %")
            .with_severity(900)
            .with_ack_required(false)])
        .assert_ok();

    let status = space.condition(P::TANK1_HIGH).unwrap().status;
    assert_eq!(status.message, "Tank 1 at 95 %");
    assert_eq!(status.severity, 900);
    assert!(!status.ack_required);
    assert!(status.acknowledged);
}

#[test]
fn test_acknowledge_condition() {
    let space = P::build();
    space
        .process_condition_state_changes(&[ConditionStateChange::new(P::TANK1_HIGH, 0, true)])
        .assert_ok();
    let subscription = space.subscribe(EventFilter::new());

    space.ack_condition(P::TANK1_HIGH, "seen by operator").assert_ok();
    let status = space.condition(P::TANK1_HIGH).unwrap().status;
    assert!(status.acknowledged);
    assert!(!status.ack_required);
    assert!(status.active);
    assert_eq!(status.ack_comment.as_deref(), Some("seen by operator"));

    let events = subscription.drain();
    assert_eq!(events.len(), 1);
    assert!(events[0].condition.as_ref().unwrap().acknowledged);

    // A second acknowledgement is a no-op.
    space.ack_condition(P::TANK1_HIGH, "again").assert_ok();
    assert_eq!(subscription.pending(), 0);
    assert_eq!(
        space.condition(P::TANK1_HIGH).unwrap().status.ack_comment.as_deref(),
        Some("seen by operator")
    );

    assert_status(&space.ack_condition(4242, "unknown"), Status::NotFound);
}

#[test]
fn test_multi_state_condition_defaults() {
    let space = P::build();
    let subscription = space.subscribe(EventFilter::new());

    space
        .process_condition_state_changes(&[ConditionStateChange::new(
            P::TANK1_LEVEL,
            P::SUB_HIGH_HIGH,
            true,
        )])
        .assert_ok();
    let status = space.condition(P::TANK1_LEVEL).unwrap().status;
    assert_eq!(status.sub_condition_id, P::SUB_HIGH_HIGH);
    assert_eq!(status.severity, 800);
    assert_eq!(status.message, "Level HiHi");
    assert!(status.ack_required);

    space
        .process_condition_state_changes(&[ConditionStateChange::new(
            P::TANK1_LEVEL,
            P::SUB_LOW,
            true,
        )])
        .assert_ok();
    let status = space.condition(P::TANK1_LEVEL).unwrap().status;
    assert_eq!(status.severity, 300);
    assert!(!status.ack_required);

    // Going inactive keeps the previous severity and uses the definition name.
    space
        .process_condition_state_changes(&[ConditionStateChange::new(P::TANK1_LEVEL, 0, false)])
        .assert_ok();
    let status = space.condition(P::TANK1_LEVEL).unwrap().status;
    assert!(!status.active);
    assert_eq!(status.sub_condition_id, 0);
    assert_eq!(status.severity, 300);
    assert_eq!(status.message, "Level");

    let names: Vec<_> = subscription
        .drain()
        .into_iter()
        .map(|e| e.condition.unwrap().sub_condition_name)
        .collect();
    assert_eq!(
        names,
        vec![Some("HiHi".to_string()), Some("Lo".to_string()), None]
    );
}

#[test]
fn test_invalid_batch_applies_nothing() {
    let space = P::build();
    let subscription = space.subscribe(EventFilter::new());

    let batch = [
        ConditionStateChange::new(P::TANK1_HIGH, 0, true),
        ConditionStateChange::new(P::TANK1_LEVEL, 77, true),
    ];
    assert_status(
        &space.process_condition_state_changes(&batch),
        Status::InvalidArgument,
    );
    assert!(!space.condition(P::TANK1_HIGH).unwrap().status.active);
    assert_eq!(subscription.pending(), 0);

    let batch = [
        ConditionStateChange::new(P::TANK1_HIGH, 0, true),
        ConditionStateChange::new(P::TANK1_HIGH, 3, true),
    ];
    assert_status(
        &space.process_condition_state_changes(&batch),
        Status::InvalidArgument,
    );

    let batch = [ConditionStateChange::new(P::TANK1_HIGH, 0, true).with_severity(2000)];
    assert_status(
        &space.process_condition_state_changes(&batch),
        Status::InvalidArgument,
    );

    let batch = [ConditionStateChange::new(P::TANK1_HIGH, 0, true)
        .with_attributes(vec![Value::Int32(1)])];
    assert_status(
        &space.process_condition_state_changes(&batch),
        Status::InvalidArgument,
    );

    let batch = [ConditionStateChange::new(9999, 0, true)];
    assert_status(&space.process_condition_state_changes(&batch), Status::NotFound);

    assert!(!space.condition(P::TANK1_HIGH).unwrap().status.active);
    assert_eq!(space.stats().events_generated, 0);
}

#[test]
fn test_batch_applied_in_order() {
    let space = P::build();
    let generated = space
        .process_condition_state_changes(&[
            ConditionStateChange::new(P::TANK1_LEVEL, P::SUB_LOW, true),
            ConditionStateChange::new(P::TANK1_LEVEL, P::SUB_HIGH_HIGH, true),
            ConditionStateChange::new(P::TANK1_HIGH, 0, true),
        ])
        .assert_ok();
    assert_eq!(generated, 3);
    assert_eq!(
        space.condition(P::TANK1_LEVEL).unwrap().status.sub_condition_id,
        P::SUB_HIGH_HIGH
    );
}

// =============================================================================
// Subscriptions
// =============================================================================

#[test]
fn test_subscription_filters() {
    let space = P::build();
    let by_kind = space.subscribe(EventFilter::new().with_kinds(vec![EventKind::Tracking]));
    let by_category = space.subscribe(EventFilter::new().with_categories(vec![P::SYSTEM]));
    let by_severity = space.subscribe(EventFilter::new().with_severity(400, 1000));
    let by_source =
        space.subscribe(EventFilter::new().with_sources(vec!["Plant.Tanks.Tank1".to_string()]));

    space
        .process_simple_event(system_event(500, vec![Value::Int32(1)]))
        .assert_ok();
    space.process_tracking_event(operator_event("op")).assert_ok();
    space
        .process_condition_state_changes(&[ConditionStateChange::new(P::TANK1_HIGH, 0, true)])
        .assert_ok();

    assert_eq!(by_kind.pending(), 1);
    assert_eq!(by_category.pending(), 1);
    // Simple (500) and condition (600) pass, tracking (100) does not.
    assert_eq!(by_severity.pending(), 2);
    // Tracking and condition events come from Tank1.
    assert_eq!(by_source.pending(), 2);
}

#[test]
fn test_bounded_queue_drops_oldest() {
    let space = P::build();
    let subscription = space.subscribe_with_capacity(EventFilter::new(), 3);

    for severity in 1..=5 {
        space
            .process_simple_event(system_event(severity, vec![Value::Int32(0)]))
            .assert_ok();
    }

    assert_eq!(subscription.dropped(), 2);
    let severities: Vec<_> = subscription.drain().into_iter().map(|e| e.severity).collect();
    assert_eq!(severities, vec![3, 4, 5]);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let space = P::build();
    let subscription = space.subscribe(EventFilter::new());
    assert!(space.unsubscribe(subscription.id()));
    assert!(!space.unsubscribe(subscription.id()));

    space.process_tracking_event(operator_event("op")).assert_ok();
    assert_eq!(subscription.pending(), 0);
    assert_eq!(space.stats().events_generated, 1);
}

// =============================================================================
// Host Gateway
// =============================================================================

#[test]
fn test_event_calls_through_host() {
    let host = opcsim_core::InMemoryHost::new('.');
    P::populate(host.events()).assert_ok();
    let subscription = host.events().subscribe(EventFilter::new());

    let callbacks: &dyn HostCallbacks = &host;
    callbacks
        .process_condition_state_changes(&[ConditionStateChange::new(P::TANK1_HIGH, 0, true)])
        .assert_ok();
    callbacks.ack_condition(P::TANK1_HIGH, "ok").assert_ok();
    assert_eq!(subscription.pending(), 2);
}

#[test]
fn test_data_access_only_host_rejects_events() {
    let host = RecordingHost::new().without_events();
    assert_status(
        &host.add_simple_event_category(P::SYSTEM, "System"),
        Status::NotSupported,
    );
    assert_eq!(host.count(|c| matches!(c, HostCall::Events(_))), 1);
    assert_eq!(host.inner().events().stats().categories, 0);
}

#[test]
fn test_fresh_event_space_is_empty() {
    let space = EventSpace::new('/');
    let stats = space.stats();
    assert_eq!(stats.categories, 0);
    assert_eq!(stats.events_generated, 0);
    assert!(space.condition(1).is_none());
}
