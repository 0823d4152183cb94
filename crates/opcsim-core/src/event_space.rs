// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Alarms and events space.
//!
//! The event space holds the alarm and event model registered through the
//! gateway and turns event requests into notifications for subscribers.
//!
//! # Construction Order
//!
//! ```text
//! categories ─▶ attributes ─▶ condition definitions ─▶ sub-conditions
//! areas ─▶ sources ─▶ existing-source attachments
//! sources + condition definitions ─▶ conditions
//! ```
//!
//! Every `add_*` call fails with `Conflict` when its id or name is already
//! taken and with `InvalidArgument` when a referenced parent does not exist.
//!
//! # Event Flow
//!
//! Simple and tracking events are validated against their category and
//! fanned out to every [`EventSubscription`] whose [`EventFilter`] accepts
//! them. Condition state changes update the live [`ConditionStatus`] and
//! generate one notification per changed condition.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{OpcError, OpcResult};
use crate::quality::Quality;
use crate::types::{CanonicalType, TypeKind, Value};

/// Identifier of an event category.
pub type CategoryId = u32;
/// Identifier of an event attribute within its category.
pub type AttributeId = u32;
/// Identifier of a condition definition.
pub type ConditionDefinitionId = u32;
/// Identifier of a sub-condition within its definition.
pub type SubConditionId = u32;
/// Identifier of an area.
pub type AreaId = u32;
/// Identifier of an event source.
pub type SourceId = u32;
/// Identifier of a condition instance.
pub type ConditionId = u32;

/// Parent id of top-level areas.
pub const AREA_ROOT: AreaId = 0xFFFF_FFFE;
/// Area id meaning "no particular area".
pub const AREA_UNSPECIFIED: AreaId = 0xFFFF_FFFD;

/// Attribute implicitly added to condition categories for ack comments.
pub const ATTRIBUTE_ACK_COMMENT: AttributeId = 0;
/// Attribute implicitly added to condition categories for area names.
pub const ATTRIBUTE_AREAS: AttributeId = 1;

/// Lowest valid severity.
pub const MIN_SEVERITY: u32 = 1;
/// Highest valid severity.
pub const MAX_SEVERITY: u32 = 1000;

// =============================================================================
// Model Types
// =============================================================================

/// Kind of an event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Stateless notification.
    Simple,
    /// Change initiated by an operator or client.
    Tracking,
    /// State change of a monitored condition.
    Condition,
}

/// An attribute reported with events of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    /// Attribute id, unique within the category.
    pub id: AttributeId,
    /// Description.
    pub description: String,
    /// Data type of the attribute value.
    pub data_type: CanonicalType,
    /// Whether the attribute was added implicitly.
    pub implicit: bool,
}

/// An event category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCategory {
    /// Category id, unique within the server.
    pub id: CategoryId,
    /// Category kind.
    pub kind: EventKind,
    /// Description.
    pub description: String,
    /// Attributes in registration order.
    pub attributes: Vec<EventAttribute>,
}

impl EventCategory {
    /// Returns the number of attribute values an event must carry.
    ///
    /// Implicit condition attributes are filled in by the event space and
    /// are not counted.
    pub fn attribute_count(&self) -> usize {
        self.attributes.iter().filter(|a| !a.implicit).count()
    }
}

/// A sub-state of a multi-state condition definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubConditionDefinition {
    /// Sub-condition id, unique within its definition; 0 is reserved.
    pub id: SubConditionId,
    /// Name.
    pub name: String,
    /// Condition expression text.
    pub condition: String,
    /// Default severity.
    pub severity: u32,
    /// Default description.
    pub description: String,
    /// Default acknowledgement requirement.
    pub ack_required: bool,
}

/// Single-state or multi-state body of a condition definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionDefinitionKind {
    /// One binary active state.
    SingleState {
        /// Condition expression text.
        condition: String,
        /// Default severity.
        severity: u32,
        /// Default description.
        description: String,
        /// Default acknowledgement requirement.
        ack_required: bool,
    },
    /// Several mutually exclusive sub-states.
    MultiState {
        /// Registered sub-states.
        sub_conditions: Vec<SubConditionDefinition>,
    },
}

/// A condition definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    /// Owning category.
    pub category_id: CategoryId,
    /// Definition id, unique within the server.
    pub id: ConditionDefinitionId,
    /// Name, unique within the server.
    pub name: String,
    /// State model.
    pub kind: ConditionDefinitionKind,
}

impl ConditionDefinition {
    /// Returns `true` if the definition can be bound to sources.
    pub fn is_usable(&self) -> bool {
        match &self.kind {
            ConditionDefinitionKind::SingleState { .. } => true,
            ConditionDefinitionKind::MultiState { sub_conditions } => sub_conditions.len() >= 2,
        }
    }

    fn sub_condition(&self, id: SubConditionId) -> Option<&SubConditionDefinition> {
        match &self.kind {
            ConditionDefinitionKind::MultiState { sub_conditions } => {
                sub_conditions.iter().find(|s| s.id == id)
            }
            ConditionDefinitionKind::SingleState { .. } => None,
        }
    }
}

/// Parameters of a single-state condition definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleStateDefinition {
    /// Owning category.
    pub category_id: CategoryId,
    /// Definition id.
    pub id: ConditionDefinitionId,
    /// Name.
    pub name: String,
    /// Condition expression text.
    pub condition: String,
    /// Default severity.
    pub severity: u32,
    /// Default description.
    pub description: String,
    /// Default acknowledgement requirement.
    pub ack_required: bool,
}

/// A node in the area tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    /// Area id.
    pub id: AreaId,
    /// Parent area id, or [`AREA_ROOT`].
    pub parent: AreaId,
    /// Single-segment name.
    pub name: String,
}

/// An object that raises events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Source id.
    pub id: SourceId,
    /// Single-segment name.
    pub name: String,
    /// Whether the source may belong to several areas.
    pub multi_source: bool,
    /// Areas the source belongs to, first one is its home area.
    pub areas: Vec<AreaId>,
}

/// Live state of a condition instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionStatus {
    /// Whether the condition is active.
    pub active: bool,
    /// Active sub-condition, 0 when none.
    pub sub_condition_id: SubConditionId,
    /// Quality of the underlying process value.
    pub quality: Quality,
    /// Whether the last transition has been acknowledged.
    pub acknowledged: bool,
    /// Whether the last transition needs acknowledgement.
    pub ack_required: bool,
    /// Severity of the last transition.
    pub severity: u32,
    /// Message of the last transition.
    pub message: String,
    /// Time of the last transition.
    pub last_change: Option<DateTime<Utc>>,
    /// Comment of the last acknowledgement.
    pub ack_comment: Option<String>,
    /// Attribute values of the last transition.
    pub attribute_values: Vec<Value>,
}

impl Default for ConditionStatus {
    fn default() -> Self {
        Self {
            active: false,
            sub_condition_id: 0,
            quality: Quality::GOOD,
            acknowledged: true,
            ack_required: false,
            severity: MIN_SEVERITY,
            message: String::new(),
            last_change: None,
            ack_comment: None,
            attribute_values: Vec::new(),
        }
    }
}

/// A condition definition bound to a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition id, unique within the server.
    pub id: ConditionId,
    /// Source raising the condition.
    pub source_id: SourceId,
    /// Definition of the condition.
    pub definition_id: ConditionDefinitionId,
    /// Live state.
    pub status: ConditionStatus,
}

// =============================================================================
// Event Requests
// =============================================================================

/// A simple event to distribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleEvent {
    /// Category of the event.
    pub category_id: CategoryId,
    /// Source of the event.
    pub source_id: SourceId,
    /// Message text.
    pub message: String,
    /// Severity.
    pub severity: u32,
    /// One value per registered category attribute.
    pub attribute_values: Vec<Value>,
    /// Event time; `None` means now.
    pub timestamp: Option<DateTime<Utc>>,
}

/// A tracking event to distribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Category of the event.
    pub category_id: CategoryId,
    /// Source of the event.
    pub source_id: SourceId,
    /// Message text.
    pub message: String,
    /// Severity.
    pub severity: u32,
    /// Operator or client that initiated the change.
    pub actor_id: String,
    /// One value per registered category attribute.
    pub attribute_values: Vec<Value>,
    /// Event time; `None` means now.
    pub timestamp: Option<DateTime<Utc>>,
}

/// A requested condition state change.
///
/// Unset optional fields default from the condition definition, or from the
/// active sub-condition of a multi-state definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionStateChange {
    /// Condition to change.
    pub condition_id: ConditionId,
    /// Sub-condition that becomes active; 0 for single-state conditions.
    pub sub_condition_id: SubConditionId,
    /// New active state.
    pub active: bool,
    /// Quality of the underlying process value.
    pub quality: Quality,
    /// One value per registered category attribute.
    #[serde(default)]
    pub attribute_values: Vec<Value>,
    /// Message override.
    #[serde(default)]
    pub message: Option<String>,
    /// Severity override.
    #[serde(default)]
    pub severity: Option<u32>,
    /// Acknowledgement requirement override.
    #[serde(default)]
    pub ack_required: Option<bool>,
    /// Transition time; `None` means now.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConditionStateChange {
    /// Creates a change that activates or deactivates a condition.
    pub fn new(condition_id: ConditionId, sub_condition_id: SubConditionId, active: bool) -> Self {
        Self {
            condition_id,
            sub_condition_id,
            active,
            quality: Quality::GOOD,
            attribute_values: Vec::new(),
            message: None,
            severity: None,
            ack_required: None,
            timestamp: None,
        }
    }

    /// Sets the attribute values.
    pub fn with_attributes(mut self, values: Vec<Value>) -> Self {
        self.attribute_values = values;
        self
    }

    /// Overrides the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Overrides the severity.
    pub fn with_severity(mut self, severity: u32) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Overrides the acknowledgement requirement.
    pub fn with_ack_required(mut self, ack_required: bool) -> Self {
        self.ack_required = Some(ack_required);
        self
    }

    /// Sets the quality.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }
}

// =============================================================================
// Notifications & Subscriptions
// =============================================================================

/// Condition part of a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionInfo {
    /// Condition instance id.
    pub condition_id: ConditionId,
    /// Condition definition name.
    pub condition_name: String,
    /// Active sub-condition name, if any.
    pub sub_condition_name: Option<String>,
    /// Whether the condition is active.
    pub active: bool,
    /// Whether the condition is acknowledged.
    pub acknowledged: bool,
    /// Whether acknowledgement is required.
    pub ack_required: bool,
    /// Quality of the underlying process value.
    pub quality: Quality,
}

/// An event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventNotification {
    /// Event kind.
    pub kind: EventKind,
    /// Category of the event.
    pub category_id: CategoryId,
    /// Fully qualified source name.
    pub source: String,
    /// Event time.
    pub time: DateTime<Utc>,
    /// Message text.
    pub message: String,
    /// Severity.
    pub severity: u32,
    /// Actor of a tracking event.
    pub actor_id: Option<String>,
    /// Attribute values.
    pub attribute_values: Vec<Value>,
    /// Condition details of a condition event.
    pub condition: Option<ConditionInfo>,
}

/// Selects which notifications a subscription receives.
///
/// Empty lists accept everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Accepted event kinds.
    #[serde(default)]
    pub kinds: Vec<EventKind>,
    /// Accepted categories.
    #[serde(default)]
    pub categories: Vec<CategoryId>,
    /// Lowest accepted severity.
    #[serde(default = "default_low_severity")]
    pub low_severity: u32,
    /// Highest accepted severity.
    #[serde(default = "default_high_severity")]
    pub high_severity: u32,
    /// Accepted fully qualified source names.
    #[serde(default)]
    pub sources: Vec<String>,
}

fn default_low_severity() -> u32 {
    MIN_SEVERITY
}

fn default_high_severity() -> u32 {
    MAX_SEVERITY
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            kinds: Vec::new(),
            categories: Vec::new(),
            low_severity: default_low_severity(),
            high_severity: default_high_severity(),
            sources: Vec::new(),
        }
    }
}

impl EventFilter {
    /// Creates a filter accepting every event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the accepted event kinds.
    pub fn with_kinds(mut self, kinds: Vec<EventKind>) -> Self {
        self.kinds = kinds;
        self
    }

    /// Restricts the accepted categories.
    pub fn with_categories(mut self, categories: Vec<CategoryId>) -> Self {
        self.categories = categories;
        self
    }

    /// Restricts the accepted severity range.
    pub fn with_severity(mut self, low: u32, high: u32) -> Self {
        self.low_severity = low;
        self.high_severity = high;
        self
    }

    /// Restricts the accepted sources.
    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    /// Returns `true` if the notification passes the filter.
    pub fn accepts(&self, event: &EventNotification) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&event.kind))
            && (self.categories.is_empty() || self.categories.contains(&event.category_id))
            && (self.low_severity..=self.high_severity).contains(&event.severity)
            && (self.sources.is_empty() || self.sources.iter().any(|s| *s == event.source))
    }
}

/// Identifier of an event subscription.
pub type SubscriptionId = u64;

/// A bounded queue of notifications accepted by a filter.
#[derive(Debug)]
pub struct EventSubscription {
    id: SubscriptionId,
    filter: EventFilter,
    capacity: usize,
    queue: Mutex<VecDeque<EventNotification>>,
    dropped: AtomicU64,
}

impl EventSubscription {
    /// Returns the subscription id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the filter.
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Removes and returns every queued notification.
    pub fn drain(&self) -> Vec<EventNotification> {
        self.queue.lock().drain(..).collect()
    }

    /// Returns the number of queued notifications.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns the number of notifications dropped on overflow.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn offer(&self, event: &EventNotification) -> bool {
        if !self.filter.accepts(event) {
            return false;
        }
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(event.clone());
        true
    }
}

// =============================================================================
// Event Space
// =============================================================================

#[derive(Debug, Default)]
struct Registry {
    categories: BTreeMap<CategoryId, EventCategory>,
    definitions: BTreeMap<ConditionDefinitionId, ConditionDefinition>,
    definition_names: HashMap<String, ConditionDefinitionId>,
    sub_condition_names: HashMap<String, (ConditionDefinitionId, SubConditionId)>,
    areas: BTreeMap<AreaId, Area>,
    sources: BTreeMap<SourceId, Source>,
    conditions: BTreeMap<ConditionId, Condition>,
}

impl Registry {
    fn category(&self, id: CategoryId) -> OpcResult<&EventCategory> {
        self.categories.get(&id).ok_or_else(|| {
            OpcError::invalid_argument("category_id", format!("unknown category {}", id))
        })
    }

    fn area_exists(&self, id: AreaId) -> bool {
        id == AREA_ROOT || self.areas.contains_key(&id)
    }

    fn area_path(&self, id: AreaId, delimiter: char) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = id;
        while current != AREA_ROOT {
            let area = self.areas.get(&current)?;
            segments.push(area.name.as_str());
            current = area.parent;
        }
        segments.reverse();
        Some(segments.join(&delimiter.to_string()))
    }

    fn source_path(&self, source: &Source, delimiter: char) -> String {
        let area = source.areas.first().copied().unwrap_or(AREA_ROOT);
        match self.area_path(area, delimiter) {
            Some(path) if !path.is_empty() => format!("{}{}{}", path, delimiter, source.name),
            _ => source.name.clone(),
        }
    }

    fn source(&self, id: SourceId) -> OpcResult<&Source> {
        self.sources
            .get(&id)
            .ok_or_else(|| OpcError::invalid_argument("source_id", format!("unknown source {}", id)))
    }
}

/// Counters of event space activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventSpaceStats {
    /// Registered categories.
    pub categories: usize,
    /// Registered condition definitions.
    pub condition_definitions: usize,
    /// Registered areas.
    pub areas: usize,
    /// Registered sources.
    pub sources: usize,
    /// Registered conditions.
    pub conditions: usize,
    /// Notifications generated.
    pub events_generated: u64,
    /// Event requests rejected.
    pub events_rejected: u64,
}

/// Registry of the alarms and events model.
#[derive(Debug)]
pub struct EventSpace {
    delimiter: char,
    registry: RwLock<Registry>,
    subscriptions: RwLock<Vec<Arc<EventSubscription>>>,
    next_subscription: AtomicU64,
    events_generated: AtomicU64,
    events_rejected: AtomicU64,
}

impl EventSpace {
    /// Default capacity of a subscription queue.
    pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

    /// Creates an empty event space.
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            registry: RwLock::new(Registry::default()),
            subscriptions: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            events_generated: AtomicU64::new(0),
            events_rejected: AtomicU64::new(0),
        }
    }

    // -------------------------------------------------------------------------
    // Categories & attributes
    // -------------------------------------------------------------------------

    /// Adds a simple event category.
    pub fn add_simple_event_category(
        &self,
        id: CategoryId,
        description: impl Into<String>,
    ) -> OpcResult<()> {
        self.add_category(id, EventKind::Simple, description.into())
    }

    /// Adds a tracking event category.
    pub fn add_tracking_event_category(
        &self,
        id: CategoryId,
        description: impl Into<String>,
    ) -> OpcResult<()> {
        self.add_category(id, EventKind::Tracking, description.into())
    }

    /// Adds a condition event category with its implicit `ACK COMMENT` and
    /// `AREAS` attributes.
    pub fn add_condition_event_category(
        &self,
        id: CategoryId,
        description: impl Into<String>,
    ) -> OpcResult<()> {
        self.add_category(id, EventKind::Condition, description.into())
    }

    fn add_category(&self, id: CategoryId, kind: EventKind, description: String) -> OpcResult<()> {
        let mut registry = self.registry.write();
        if registry.categories.contains_key(&id) {
            return Err(OpcError::conflict("category", id));
        }

        let attributes = if kind == EventKind::Condition {
            vec![
                EventAttribute {
                    id: ATTRIBUTE_ACK_COMMENT,
                    description: "ACK COMMENT".to_string(),
                    data_type: CanonicalType::scalar(TypeKind::String),
                    implicit: true,
                },
                EventAttribute {
                    id: ATTRIBUTE_AREAS,
                    description: "AREAS".to_string(),
                    data_type: CanonicalType::array(TypeKind::String),
                    implicit: true,
                },
            ]
        } else {
            Vec::new()
        };

        debug!(category_id = id, ?kind, description = %description, "Event category added");
        registry.categories.insert(
            id,
            EventCategory {
                id,
                kind,
                description,
                attributes,
            },
        );
        Ok(())
    }

    /// Adds an attribute to a category.
    pub fn add_event_attribute(
        &self,
        category_id: CategoryId,
        attribute_id: AttributeId,
        description: impl Into<String>,
        data_type: CanonicalType,
    ) -> OpcResult<()> {
        let mut registry = self.registry.write();
        let category = registry.categories.get_mut(&category_id).ok_or_else(|| {
            OpcError::invalid_argument("category_id", format!("unknown category {}", category_id))
        })?;
        if category.attributes.iter().any(|a| a.id == attribute_id) {
            return Err(OpcError::conflict("attribute", attribute_id));
        }
        category.attributes.push(EventAttribute {
            id: attribute_id,
            description: description.into(),
            data_type,
            implicit: false,
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Condition definitions
    // -------------------------------------------------------------------------

    /// Adds a single-state condition definition.
    pub fn add_single_state_condition_definition(
        &self,
        definition: SingleStateDefinition,
    ) -> OpcResult<()> {
        check_severity(definition.severity)?;
        let mut registry = self.registry.write();
        check_condition_category(&registry, definition.category_id)?;
        check_definition_unique(&registry, definition.id, &definition.name)?;

        registry
            .definition_names
            .insert(definition.name.clone(), definition.id);
        registry.definitions.insert(
            definition.id,
            ConditionDefinition {
                category_id: definition.category_id,
                id: definition.id,
                name: definition.name,
                kind: ConditionDefinitionKind::SingleState {
                    condition: definition.condition,
                    severity: definition.severity,
                    description: definition.description,
                    ack_required: definition.ack_required,
                },
            },
        );
        Ok(())
    }

    /// Adds a multi-state condition definition.
    ///
    /// The definition becomes usable once at least two sub-conditions are
    /// registered.
    pub fn add_multi_state_condition_definition(
        &self,
        category_id: CategoryId,
        id: ConditionDefinitionId,
        name: impl Into<String>,
    ) -> OpcResult<()> {
        let name = name.into();
        let mut registry = self.registry.write();
        check_condition_category(&registry, category_id)?;
        check_definition_unique(&registry, id, &name)?;

        registry.definition_names.insert(name.clone(), id);
        registry.definitions.insert(
            id,
            ConditionDefinition {
                category_id,
                id,
                name,
                kind: ConditionDefinitionKind::MultiState {
                    sub_conditions: Vec::new(),
                },
            },
        );
        Ok(())
    }

    /// Adds a sub-condition to a multi-state definition.
    pub fn add_sub_condition_definition(
        &self,
        definition_id: ConditionDefinitionId,
        sub_condition: SubConditionDefinition,
    ) -> OpcResult<()> {
        if sub_condition.id == 0 {
            return Err(OpcError::invalid_argument(
                "sub_condition_id",
                "sub-condition id 0 is reserved",
            ));
        }
        check_severity(sub_condition.severity)?;

        let mut registry = self.registry.write();
        if registry.sub_condition_names.contains_key(&sub_condition.name) {
            return Err(OpcError::conflict("sub-condition", &sub_condition.name));
        }
        let definition = registry.definitions.get_mut(&definition_id).ok_or_else(|| {
            OpcError::invalid_argument(
                "condition_id",
                format!("unknown condition definition {}", definition_id),
            )
        })?;
        let ConditionDefinitionKind::MultiState { sub_conditions } = &mut definition.kind else {
            return Err(OpcError::invalid_argument(
                "condition_id",
                format!("{} is a single-state definition", definition.name),
            ));
        };
        if sub_conditions.iter().any(|s| s.id == sub_condition.id) {
            return Err(OpcError::conflict("sub-condition", sub_condition.id));
        }

        let key = (definition_id, sub_condition.id);
        let name = sub_condition.name.clone();
        sub_conditions.push(sub_condition);
        registry.sub_condition_names.insert(name, key);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Areas, sources & conditions
    // -------------------------------------------------------------------------

    /// Adds an area below `parent` ([`AREA_ROOT`] for a top-level area).
    pub fn add_area(&self, parent: AreaId, id: AreaId, name: impl Into<String>) -> OpcResult<()> {
        let name = name.into();
        self.check_segment("name", &name)?;
        if id == AREA_ROOT || id == AREA_UNSPECIFIED {
            return Err(OpcError::invalid_argument("area_id", format!("{:#X} is reserved", id)));
        }

        let mut registry = self.registry.write();
        if !registry.area_exists(parent) {
            return Err(OpcError::invalid_argument(
                "parent_area_id",
                format!("unknown area {}", parent),
            ));
        }
        if registry.areas.contains_key(&id) {
            return Err(OpcError::conflict("area", id));
        }
        if registry
            .areas
            .values()
            .any(|a| a.parent == parent && a.name == name)
        {
            return Err(OpcError::conflict("area", &name));
        }
        registry.areas.insert(id, Area { id, parent, name });
        Ok(())
    }

    /// Adds a source to an area.
    pub fn add_source(
        &self,
        area_id: AreaId,
        id: SourceId,
        name: impl Into<String>,
        multi_source: bool,
    ) -> OpcResult<()> {
        let name = name.into();
        self.check_segment("source_name", &name)?;

        let mut registry = self.registry.write();
        if !registry.area_exists(area_id) {
            return Err(OpcError::invalid_argument(
                "area_id",
                format!("unknown area {}", area_id),
            ));
        }
        if registry.sources.contains_key(&id) {
            return Err(OpcError::conflict("source", id));
        }
        if registry
            .sources
            .values()
            .any(|s| s.name == name && s.areas.contains(&area_id))
        {
            return Err(OpcError::conflict("source", &name));
        }
        registry.sources.insert(
            id,
            Source {
                id,
                name,
                multi_source,
                areas: vec![area_id],
            },
        );
        Ok(())
    }

    /// Attaches an existing multi-area source to another area.
    pub fn add_existing_source(&self, area_id: AreaId, source_id: SourceId) -> OpcResult<()> {
        let mut registry = self.registry.write();
        if !registry.area_exists(area_id) {
            return Err(OpcError::invalid_argument(
                "area_id",
                format!("unknown area {}", area_id),
            ));
        }
        let source = registry.sources.get_mut(&source_id).ok_or_else(|| {
            OpcError::invalid_argument("source_id", format!("unknown source {}", source_id))
        })?;
        if !source.multi_source {
            return Err(OpcError::precondition_failed(format!(
                "source {} was not created as a multi-area source",
                source.name
            )));
        }
        if source.areas.contains(&area_id) {
            return Err(OpcError::conflict("source", format!("{} in area {}", source.name, area_id)));
        }
        source.areas.push(area_id);
        Ok(())
    }

    /// Binds a condition definition to a source.
    ///
    /// # Errors
    ///
    /// `PreconditionFailed` if the definition is multi-state with fewer than
    /// two sub-conditions.
    pub fn add_condition(
        &self,
        source_id: SourceId,
        definition_id: ConditionDefinitionId,
        condition_id: ConditionId,
    ) -> OpcResult<()> {
        let mut registry = self.registry.write();
        registry.source(source_id)?;
        let definition = registry.definitions.get(&definition_id).ok_or_else(|| {
            OpcError::invalid_argument(
                "condition_definition_id",
                format!("unknown condition definition {}", definition_id),
            )
        })?;
        if !definition.is_usable() {
            return Err(OpcError::precondition_failed(format!(
                "multi-state definition {} needs at least two sub-conditions",
                definition.name
            )));
        }
        if registry.conditions.contains_key(&condition_id) {
            return Err(OpcError::conflict("condition", condition_id));
        }
        registry.conditions.insert(
            condition_id,
            Condition {
                id: condition_id,
                source_id,
                definition_id,
                status: ConditionStatus::default(),
            },
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Event processing
    // -------------------------------------------------------------------------

    /// Distributes a simple event.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the category is unknown or not a simple
    /// category, the source is unknown, the severity is out of range, or the
    /// attribute count does not match the category. No event is emitted on
    /// error.
    pub fn process_simple_event(&self, event: SimpleEvent) -> OpcResult<()> {
        let notification = {
            let registry = self.registry.read();
            self.check_event(
                &registry,
                EventKind::Simple,
                event.category_id,
                event.source_id,
                event.severity,
                event.attribute_values.len(),
            )
            .map_err(|e| self.reject(e))?;
            EventNotification {
                kind: EventKind::Simple,
                category_id: event.category_id,
                source: registry.source_path(registry.source(event.source_id)?, self.delimiter),
                time: event.timestamp.unwrap_or_else(Utc::now),
                message: event.message,
                severity: event.severity,
                actor_id: None,
                attribute_values: event.attribute_values,
                condition: None,
            }
        };
        self.distribute(&notification);
        Ok(())
    }

    /// Distributes a tracking event.
    pub fn process_tracking_event(&self, event: TrackingEvent) -> OpcResult<()> {
        let notification = {
            let registry = self.registry.read();
            self.check_event(
                &registry,
                EventKind::Tracking,
                event.category_id,
                event.source_id,
                event.severity,
                event.attribute_values.len(),
            )
            .map_err(|e| self.reject(e))?;
            EventNotification {
                kind: EventKind::Tracking,
                category_id: event.category_id,
                source: registry.source_path(registry.source(event.source_id)?, self.delimiter),
                time: event.timestamp.unwrap_or_else(Utc::now),
                message: event.message,
                severity: event.severity,
                actor_id: Some(event.actor_id),
                attribute_values: event.attribute_values,
                condition: None,
            }
        };
        self.distribute(&notification);
        Ok(())
    }

    fn check_event(
        &self,
        registry: &Registry,
        kind: EventKind,
        category_id: CategoryId,
        source_id: SourceId,
        severity: u32,
        attribute_count: usize,
    ) -> OpcResult<()> {
        check_severity(severity)?;
        let category = registry.category(category_id)?;
        if category.kind != kind {
            return Err(OpcError::invalid_argument(
                "category_id",
                format!("category {} is not a {:?} category", category_id, kind),
            ));
        }
        registry.source(source_id)?;
        check_attribute_count(category, attribute_count)
    }

    fn reject(&self, error: OpcError) -> OpcError {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
        warn!(error = %error, "Event request rejected");
        error
    }

    /// Applies condition state changes in order.
    ///
    /// The whole batch is validated first; on error nothing is applied.
    /// Returns the number of notifications generated, one per condition whose
    /// active state, sub-condition or quality changed.
    pub fn process_condition_state_changes(
        &self,
        changes: &[ConditionStateChange],
    ) -> OpcResult<usize> {
        let notifications = {
            let mut registry = self.registry.write();
            for change in changes {
                validate_change(&registry, change).map_err(|e| self.reject(e))?;
            }

            let mut notifications = Vec::new();
            for change in changes {
                if let Some(notification) = self.apply_change(&mut registry, change) {
                    notifications.push(notification);
                }
            }
            notifications
        };

        for notification in &notifications {
            self.distribute(notification);
        }
        Ok(notifications.len())
    }

    fn apply_change(
        &self,
        registry: &mut Registry,
        change: &ConditionStateChange,
    ) -> Option<EventNotification> {
        let condition = registry.conditions.get(&change.condition_id)?;
        let definition = registry.definitions.get(&condition.definition_id)?;
        let sub_condition = definition.sub_condition(change.sub_condition_id);
        let previous = &condition.status;

        if previous.active == change.active
            && previous.sub_condition_id == change.sub_condition_id
            && previous.quality == change.quality
            && previous.last_change.is_some()
        {
            trace!(condition_id = change.condition_id, "Condition unchanged");
            return None;
        }

        let (default_severity, default_message, default_ack) =
            match (&definition.kind, sub_condition) {
                (_, Some(sub)) => (sub.severity, sub.description.clone(), sub.ack_required),
                (
                    ConditionDefinitionKind::SingleState {
                        severity,
                        description,
                        ack_required,
                        ..
                    },
                    None,
                ) => (*severity, description.clone(), *ack_required),
                (ConditionDefinitionKind::MultiState { .. }, None) => {
                    (previous.severity, definition.name.clone(), false)
                }
            };

        // Return to normal leaves an outstanding acknowledgement outstanding.
        let (acknowledged, ack_required) = match change.ack_required {
            Some(required) => (!required, required),
            None if previous.active && !change.active => {
                (previous.acknowledged, previous.ack_required)
            }
            None => (!default_ack, default_ack),
        };
        let status = ConditionStatus {
            active: change.active,
            sub_condition_id: change.sub_condition_id,
            quality: change.quality,
            acknowledged,
            ack_required,
            severity: change.severity.unwrap_or(default_severity),
            message: change.message.clone().unwrap_or(default_message),
            last_change: Some(change.timestamp.unwrap_or_else(Utc::now)),
            ack_comment: None,
            attribute_values: change.attribute_values.clone(),
        };

        let source = registry
            .sources
            .get(&condition.source_id)
            .map(|s| registry.source_path(s, self.delimiter))
            .unwrap_or_default();
        let notification = condition_notification(
            definition,
            condition.id,
            &status,
            source,
            sub_condition.map(|s| s.name.clone()),
        );

        if let Some(condition) = registry.conditions.get_mut(&change.condition_id) {
            condition.status = status;
        }
        Some(notification)
    }

    /// Acknowledges a condition on behalf of the server.
    ///
    /// Clears the outstanding acknowledgement requirement and emits an
    /// acknowledgement notification. Acknowledging an already acknowledged
    /// condition is a no-op.
    pub fn ack_condition(&self, condition_id: ConditionId, comment: impl Into<String>) -> OpcResult<()> {
        let notification = {
            let mut registry = self.registry.write();
            let condition = registry
                .conditions
                .get(&condition_id)
                .ok_or_else(|| OpcError::not_found("condition", condition_id))?;
            if condition.status.acknowledged {
                return Ok(());
            }

            let mut status = condition.status.clone();
            status.acknowledged = true;
            status.ack_required = false;
            status.ack_comment = Some(comment.into());

            let definition = registry
                .definitions
                .get(&condition.definition_id)
                .ok_or_else(|| OpcError::fatal("condition without definition"))?;
            let source = registry
                .sources
                .get(&condition.source_id)
                .map(|s| registry.source_path(s, self.delimiter))
                .unwrap_or_default();
            let sub_name = definition
                .sub_condition(status.sub_condition_id)
                .map(|s| s.name.clone());
            let mut notification =
                condition_notification(definition, condition_id, &status, source, sub_name);
            notification.time = Utc::now();

            if let Some(condition) = registry.conditions.get_mut(&condition_id) {
                condition.status = status;
            }
            notification
        };

        debug!(condition_id, "Condition acknowledged");
        self.distribute(&notification);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// Registers a subscription with the default queue capacity.
    pub fn subscribe(&self, filter: EventFilter) -> Arc<EventSubscription> {
        self.subscribe_with_capacity(filter, Self::DEFAULT_QUEUE_CAPACITY)
    }

    /// Registers a subscription with a bounded queue of `capacity` entries.
    pub fn subscribe_with_capacity(
        &self,
        filter: EventFilter,
        capacity: usize,
    ) -> Arc<EventSubscription> {
        let subscription = Arc::new(EventSubscription {
            id: self.next_subscription.fetch_add(1, Ordering::Relaxed),
            filter,
            capacity: capacity.max(1),
            queue: Mutex::new(VecDeque::new()),
            dropped: AtomicU64::new(0),
        });
        self.subscriptions.write().push(Arc::clone(&subscription));
        subscription
    }

    /// Removes a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    fn distribute(&self, notification: &EventNotification) {
        self.events_generated.fetch_add(1, Ordering::Relaxed);
        let delivered = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.offer(notification))
            .count();
        trace!(
            kind = ?notification.kind,
            source = %notification.source,
            severity = notification.severity,
            delivered,
            "Event distributed"
        );
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Returns a category.
    pub fn category(&self, id: CategoryId) -> Option<EventCategory> {
        self.registry.read().categories.get(&id).cloned()
    }

    /// Returns a condition definition.
    pub fn condition_definition(&self, id: ConditionDefinitionId) -> Option<ConditionDefinition> {
        self.registry.read().definitions.get(&id).cloned()
    }

    /// Returns a condition instance.
    pub fn condition(&self, id: ConditionId) -> Option<Condition> {
        self.registry.read().conditions.get(&id).cloned()
    }

    /// Returns a source.
    pub fn source(&self, id: SourceId) -> Option<Source> {
        self.registry.read().sources.get(&id).cloned()
    }

    /// Returns the fully qualified name of an area.
    pub fn area_name(&self, id: AreaId) -> Option<String> {
        self.registry.read().area_path(id, self.delimiter)
    }

    /// Returns the fully qualified name of a source.
    pub fn source_name(&self, id: SourceId) -> Option<String> {
        let registry = self.registry.read();
        registry
            .sources
            .get(&id)
            .map(|s| registry.source_path(s, self.delimiter))
    }

    /// Returns activity counters.
    pub fn stats(&self) -> EventSpaceStats {
        let registry = self.registry.read();
        EventSpaceStats {
            categories: registry.categories.len(),
            condition_definitions: registry.definitions.len(),
            areas: registry.areas.len(),
            sources: registry.sources.len(),
            conditions: registry.conditions.len(),
            events_generated: self.events_generated.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
        }
    }

    fn check_segment(&self, argument: &str, name: &str) -> OpcResult<()> {
        if name.is_empty() || name.contains(self.delimiter) {
            return Err(OpcError::invalid_argument(
                argument,
                format!("'{}' must be a non-empty single segment", name),
            ));
        }
        Ok(())
    }
}

fn check_severity(severity: u32) -> OpcResult<()> {
    if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&severity) {
        return Err(OpcError::invalid_argument(
            "severity",
            format!("{} is outside {}..={}", severity, MIN_SEVERITY, MAX_SEVERITY),
        ));
    }
    Ok(())
}

fn check_attribute_count(category: &EventCategory, count: usize) -> OpcResult<()> {
    let expected = category.attribute_count();
    if count != expected {
        return Err(OpcError::invalid_argument(
            "attribute_count",
            format!(
                "category {} expects {} attribute value(s), got {}",
                category.id, expected, count
            ),
        ));
    }
    Ok(())
}

fn check_condition_category(registry: &Registry, category_id: CategoryId) -> OpcResult<()> {
    let category = registry.category(category_id)?;
    if category.kind != EventKind::Condition {
        return Err(OpcError::invalid_argument(
            "category_id",
            format!("category {} is not a condition category", category_id),
        ));
    }
    Ok(())
}

fn check_definition_unique(
    registry: &Registry,
    id: ConditionDefinitionId,
    name: &str,
) -> OpcResult<()> {
    if registry.definitions.contains_key(&id) {
        return Err(OpcError::conflict("condition definition", id));
    }
    if registry.definition_names.contains_key(name) {
        return Err(OpcError::conflict("condition definition", name));
    }
    Ok(())
}

fn validate_change(registry: &Registry, change: &ConditionStateChange) -> OpcResult<()> {
    let condition = registry
        .conditions
        .get(&change.condition_id)
        .ok_or_else(|| OpcError::not_found("condition", change.condition_id))?;
    let definition = registry
        .definitions
        .get(&condition.definition_id)
        .ok_or_else(|| OpcError::fatal("condition without definition"))?;

    if let Some(severity) = change.severity {
        check_severity(severity)?;
    }
    check_attribute_count(registry.category(definition.category_id)?, change.attribute_values.len())?;

    match &definition.kind {
        ConditionDefinitionKind::SingleState { .. } if change.sub_condition_id != 0 => {
            Err(OpcError::invalid_argument(
                "sub_condition_id",
                format!("{} has no sub-conditions", definition.name),
            ))
        }
        ConditionDefinitionKind::MultiState { .. }
            if (change.active || change.sub_condition_id != 0)
                && definition.sub_condition(change.sub_condition_id).is_none() =>
        {
            Err(OpcError::invalid_argument(
                "sub_condition_id",
                format!(
                    "{} has no sub-condition {}",
                    definition.name, change.sub_condition_id
                ),
            ))
        }
        _ => Ok(()),
    }
}

fn condition_notification(
    definition: &ConditionDefinition,
    condition_id: ConditionId,
    status: &ConditionStatus,
    source: String,
    sub_condition_name: Option<String>,
) -> EventNotification {
    EventNotification {
        kind: EventKind::Condition,
        category_id: definition.category_id,
        source,
        time: status.last_change.unwrap_or_else(Utc::now),
        message: status.message.clone(),
        severity: status.severity,
        actor_id: None,
        attribute_values: status.attribute_values.clone(),
        condition: Some(ConditionInfo {
            condition_id,
            condition_name: definition.name.clone(),
            sub_condition_name,
            active: status.active,
            acknowledged: status.acknowledged,
            ack_required: status.ack_required,
            quality: status.quality,
        }),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;

    const SIMPLE: CategoryId = 1;
    const LEVEL: CategoryId = 2;
    const PLANT: AreaId = 10;
    const TANK: SourceId = 100;
    const HIGH_DEF: ConditionDefinitionId = 1000;
    const LEVEL_DEF: ConditionDefinitionId = 1001;

    fn single_state(id: ConditionDefinitionId, name: &str) -> SingleStateDefinition {
        SingleStateDefinition {
            category_id: LEVEL,
            id,
            name: name.to_string(),
            condition: "value > 90".to_string(),
            severity: 500,
            description: "Level high".to_string(),
            ack_required: true,
        }
    }

    fn sub(id: SubConditionId, name: &str, severity: u32) -> SubConditionDefinition {
        SubConditionDefinition {
            id,
            name: name.to_string(),
            condition: format!("{} condition", name),
            severity,
            description: format!("{} description", name),
            ack_required: severity > 300,
        }
    }

    fn space() -> EventSpace {
        let space = EventSpace::new('.');
        space.add_simple_event_category(SIMPLE, "System message").unwrap();
        space
            .add_event_attribute(SIMPLE, 10, "Operator", CanonicalType::scalar(TypeKind::String))
            .unwrap();
        space.add_condition_event_category(LEVEL, "Level").unwrap();
        space.add_area(AREA_ROOT, PLANT, "Plant").unwrap();
        space.add_source(PLANT, TANK, "Tank1", false).unwrap();
        space
            .add_single_state_condition_definition(single_state(HIGH_DEF, "HighLevel"))
            .unwrap();
        space
            .add_multi_state_condition_definition(LEVEL, LEVEL_DEF, "LevelLimits")
            .unwrap();
        space
    }

    fn simple_event(attrs: Vec<Value>) -> SimpleEvent {
        SimpleEvent {
            category_id: SIMPLE,
            source_id: TANK,
            message: "started".to_string(),
            severity: 100,
            attribute_values: attrs,
            timestamp: None,
        }
    }

    #[test]
    fn test_condition_category_has_implicit_attributes() {
        let space = space();
        let category = space.category(LEVEL).unwrap();
        let names: Vec<_> = category.attributes.iter().map(|a| a.description.as_str()).collect();
        assert_eq!(names, vec!["ACK COMMENT", "AREAS"]);
        assert_eq!(category.attribute_count(), 0);
    }

    #[test]
    fn test_duplicate_ids_conflict() {
        let space = space();
        assert_eq!(
            space.add_simple_event_category(SIMPLE, "again").unwrap_err().status(),
            Status::Conflict
        );
        assert_eq!(
            space
                .add_event_attribute(SIMPLE, 10, "again", CanonicalType::scalar(TypeKind::Int32))
                .unwrap_err()
                .status(),
            Status::Conflict
        );
        assert_eq!(
            space.add_area(AREA_ROOT, PLANT, "Other").unwrap_err().status(),
            Status::Conflict
        );
        assert_eq!(
            space.add_area(AREA_ROOT, 11, "Plant").unwrap_err().status(),
            Status::Conflict
        );
        let mut duplicate_name = single_state(2000, "HighLevel");
        duplicate_name.id = 2000;
        assert_eq!(
            space
                .add_single_state_condition_definition(duplicate_name)
                .unwrap_err()
                .status(),
            Status::Conflict
        );
    }

    #[test]
    fn test_missing_parents_are_invalid() {
        let space = space();
        assert_eq!(
            space
                .add_event_attribute(99, 1, "x", CanonicalType::scalar(TypeKind::Int32))
                .unwrap_err()
                .status(),
            Status::InvalidArgument
        );
        assert_eq!(
            space.add_area(42, 43, "Orphan").unwrap_err().status(),
            Status::InvalidArgument
        );
        assert_eq!(
            space.add_source(42, 200, "Pump", false).unwrap_err().status(),
            Status::InvalidArgument
        );
        assert_eq!(
            space.add_condition(999, HIGH_DEF, 1).unwrap_err().status(),
            Status::InvalidArgument
        );
        assert_eq!(
            space
                .add_sub_condition_definition(9999, sub(1, "Lo", 100))
                .unwrap_err()
                .status(),
            Status::InvalidArgument
        );
    }

    #[test]
    fn test_sub_condition_zero_is_reserved() {
        let space = space();
        let err = space
            .add_sub_condition_definition(LEVEL_DEF, sub(0, "Zero", 100))
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
    }

    #[test]
    fn test_multi_state_needs_two_sub_conditions() {
        let space = space();
        assert_eq!(
            space.add_condition(TANK, LEVEL_DEF, 1).unwrap_err().status(),
            Status::PreconditionFailed
        );
        space
            .add_sub_condition_definition(LEVEL_DEF, sub(1, "Lo", 200))
            .unwrap();
        assert_eq!(
            space.add_condition(TANK, LEVEL_DEF, 1).unwrap_err().status(),
            Status::PreconditionFailed
        );
        space
            .add_sub_condition_definition(LEVEL_DEF, sub(2, "HiHi", 800))
            .unwrap();
        space.add_condition(TANK, LEVEL_DEF, 1).unwrap();
    }

    #[test]
    fn test_existing_source_requires_multi_source() {
        let space = space();
        space.add_area(AREA_ROOT, 20, "Utilities").unwrap();
        assert_eq!(
            space.add_existing_source(20, TANK).unwrap_err().status(),
            Status::PreconditionFailed
        );

        space.add_source(PLANT, 101, "Pump", true).unwrap();
        space.add_existing_source(20, 101).unwrap();
        assert_eq!(space.source(101).unwrap().areas, vec![PLANT, 20]);
        assert_eq!(
            space.add_existing_source(20, 101).unwrap_err().status(),
            Status::Conflict
        );
    }

    #[test]
    fn test_area_and_source_names() {
        let space = space();
        space.add_area(PLANT, 11, "Line1").unwrap();
        space.add_source(11, 102, "Valve", false).unwrap();
        assert_eq!(space.area_name(11).unwrap(), "Plant.Line1");
        assert_eq!(space.source_name(102).unwrap(), "Plant.Line1.Valve");
        assert_eq!(space.source_name(TANK).unwrap(), "Plant.Tank1");
        assert!(space.add_area(PLANT, 12, "Bad.Name").is_err());
    }

    #[test]
    fn test_simple_event_attribute_cross_check() {
        let space = space();
        let subscription = space.subscribe(EventFilter::new());

        let err = space.process_simple_event(simple_event(vec![])).unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
        assert_eq!(subscription.pending(), 0);
        assert_eq!(space.stats().events_rejected, 1);

        space
            .process_simple_event(simple_event(vec![Value::from("op1")]))
            .unwrap();
        let events = subscription.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, "Plant.Tank1");
        assert_eq!(events[0].kind, EventKind::Simple);
    }

    #[test]
    fn test_tracking_event_requires_tracking_category() {
        let space = space();
        let event = TrackingEvent {
            category_id: SIMPLE,
            source_id: TANK,
            message: "setpoint changed".to_string(),
            severity: 200,
            actor_id: "operator".to_string(),
            attribute_values: vec![Value::from("op1")],
            timestamp: None,
        };
        assert!(space.process_tracking_event(event.clone()).is_err());

        space.add_tracking_event_category(3, "Operator action").unwrap();
        let subscription = space.subscribe(EventFilter::new().with_kinds(vec![EventKind::Tracking]));
        space
            .process_tracking_event(TrackingEvent {
                category_id: 3,
                attribute_values: vec![],
                ..event
            })
            .unwrap();
        let events = subscription.drain();
        assert_eq!(events[0].actor_id.as_deref(), Some("operator"));
    }

    #[test]
    fn test_filters_select_subscriptions() {
        let space = space();
        let high_only = space.subscribe(EventFilter::new().with_severity(500, 1000));
        let everything = space.subscribe(EventFilter::new());

        space
            .process_simple_event(simple_event(vec![Value::from("op1")]))
            .unwrap();
        assert_eq!(high_only.pending(), 0);
        assert_eq!(everything.pending(), 1);
        assert!(space.unsubscribe(high_only.id()));
    }

    #[test]
    fn test_condition_state_change_defaults_from_definition() {
        let space = space();
        space.add_condition(TANK, HIGH_DEF, 1).unwrap();
        let subscription = space.subscribe(EventFilter::new());

        let generated = space
            .process_condition_state_changes(&[ConditionStateChange::new(1, 0, true)])
            .unwrap();
        assert_eq!(generated, 1);

        let status = space.condition(1).unwrap().status;
        assert!(status.active);
        assert_eq!(status.severity, 500);
        assert_eq!(status.message, "Level high");
        assert!(status.ack_required);
        assert!(!status.acknowledged);

        let events = subscription.drain();
        let info = events[0].condition.as_ref().unwrap();
        assert_eq!(info.condition_name, "HighLevel");
        assert!(info.active);

        // repeating the same state generates nothing
        assert_eq!(
            space
                .process_condition_state_changes(&[ConditionStateChange::new(1, 0, true)])
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_condition_state_change_defaults_from_sub_condition() {
        let space = space();
        space
            .add_sub_condition_definition(LEVEL_DEF, sub(1, "Lo", 200))
            .unwrap();
        space
            .add_sub_condition_definition(LEVEL_DEF, sub(2, "HiHi", 800))
            .unwrap();
        space.add_condition(TANK, LEVEL_DEF, 7).unwrap();

        space
            .process_condition_state_changes(&[
                ConditionStateChange::new(7, 1, true),
                ConditionStateChange::new(7, 2, true).with_message("very high"),
            ])
            .unwrap();
        let status = space.condition(7).unwrap().status;
        assert_eq!(status.sub_condition_id, 2);
        assert_eq!(status.severity, 800);
        assert_eq!(status.message, "very high");

        let err = space
            .process_condition_state_changes(&[ConditionStateChange::new(7, 9, true)])
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
    }

    #[test]
    fn test_return_to_normal_keeps_ack_state() {
        let space = space();
        space.add_condition(TANK, HIGH_DEF, 1).unwrap();
        space.add_condition(TANK, HIGH_DEF, 2).unwrap();
        space
            .process_condition_state_changes(&[
                ConditionStateChange::new(1, 0, true),
                ConditionStateChange::new(2, 0, true),
            ])
            .unwrap();
        space.ack_condition(2, "seen").unwrap();

        space
            .process_condition_state_changes(&[
                ConditionStateChange::new(1, 0, false),
                ConditionStateChange::new(2, 0, false),
            ])
            .unwrap();

        let unacked = space.condition(1).unwrap().status;
        assert!(!unacked.active);
        assert!(unacked.ack_required);
        assert!(!unacked.acknowledged);

        let acked = space.condition(2).unwrap().status;
        assert!(!acked.active);
        assert!(!acked.ack_required);
        assert!(acked.acknowledged);
    }

    #[test]
    fn test_condition_batch_is_validated_first() {
        let space = space();
        space.add_condition(TANK, HIGH_DEF, 1).unwrap();
        let err = space
            .process_condition_state_changes(&[
                ConditionStateChange::new(1, 0, true),
                ConditionStateChange::new(404, 0, true),
            ])
            .unwrap_err();
        assert_eq!(err.status(), Status::NotFound);
        assert!(!space.condition(1).unwrap().status.active);
    }

    #[test]
    fn test_ack_condition() {
        let space = space();
        space.add_condition(TANK, HIGH_DEF, 1).unwrap();
        space
            .process_condition_state_changes(&[ConditionStateChange::new(1, 0, true)])
            .unwrap();
        let subscription = space.subscribe(EventFilter::new());

        space.ack_condition(1, "seen").unwrap();
        let status = space.condition(1).unwrap().status;
        assert!(status.acknowledged);
        assert!(!status.ack_required);
        assert_eq!(status.ack_comment.as_deref(), Some("seen"));
        assert_eq!(subscription.drain().len(), 1);

        // second ack is a no-op
        space.ack_condition(1, "again").unwrap();
        assert_eq!(subscription.pending(), 0);
        assert_eq!(
            space.ack_condition(5, "x").unwrap_err().status(),
            Status::NotFound
        );
    }

    #[test]
    fn test_subscription_queue_is_bounded() {
        let space = space();
        let subscription = space.subscribe_with_capacity(EventFilter::new(), 2);
        for _ in 0..3 {
            space
                .process_simple_event(simple_event(vec![Value::from("op")]))
                .unwrap();
        }
        assert_eq!(subscription.pending(), 2);
        assert_eq!(subscription.dropped(), 1);
    }
}
