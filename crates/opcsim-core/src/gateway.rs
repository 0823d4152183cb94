// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Callback gateway between the plugin and the generic server host.
//!
//! Two boundaries meet here:
//!
//! - [`HostCallbacks`] is what the plugin calls on the host: catalog
//!   population, cache updates, server state, client/group queries and the
//!   event space.
//! - [`NodeManager`] is what the host calls on the plugin: startup and
//!   shutdown, server definition, property queries, writes, refreshes,
//!   custom browsing and client lifecycle notifications.
//!
//! Both are object safe and injected as trait objects, so a host adapter,
//! an in-memory host and test doubles are interchangeable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::browse::{BrowseFilter, BrowseIter};
use crate::catalog::ItemDefinition;
use crate::error::{OpcError, OpcResult};
use crate::event_space::{
    AreaId, AttributeId, CategoryId, ConditionDefinitionId, ConditionId, ConditionStateChange,
    SimpleEvent, SingleStateDefinition, SourceId, SubConditionDefinition, SubConditionId,
    TrackingEvent,
};
use crate::quality::Quality;
use crate::types::{
    AccessRights, BrowseDirection, BrowseMode, CanonicalType, ClientId, GroupHandle, ItemHandle,
    LogLevel, PropertyId, ServerState, Value,
};

// =============================================================================
// Server Description
// =============================================================================

/// Kind of server a definition is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerKind {
    /// Data access server.
    DataAccess,
    /// Alarms and events server.
    AlarmsEvents,
}

/// Registration data of a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDefinition {
    /// Class registration id.
    pub registration_id: String,
    /// Application id.
    pub application_id: String,
    /// Version independent program id.
    pub prog_id: String,
    /// Versioned program id.
    pub prog_id_versioned: String,
    /// Version independent friendly name.
    pub friendly_name: String,
    /// Versioned friendly name.
    pub friendly_name_versioned: String,
    /// Vendor name.
    pub vendor_name: String,
}

impl ServerDefinition {
    /// Returns the data access definition of the sample server.
    pub fn sample_data_access() -> Self {
        Self {
            registration_id: "{8512632F-1031-4276-B5CA-A900AD7C7EAE}".to_string(),
            application_id: "{08DC3FC6-E60F-4cfe-AEA5-108877F90D74}".to_string(),
            prog_id: "OpcSim.DaSimpleSample".to_string(),
            prog_id_versioned: "OpcSim.DaSimpleSample.90".to_string(),
            friendly_name: "OPC Server SDK DLL DA Simple Sample Server".to_string(),
            friendly_name_versioned: "OPC Server SDK DLL DA Simple Sample Server V9.0".to_string(),
            vendor_name: "Technosoftware GmbH".to_string(),
        }
    }
}

/// General server parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerParameters {
    /// Cache update period in milliseconds.
    pub update_period_ms: u32,
    /// Delimiter between name segments.
    pub branch_delimiter: char,
    /// Who serves hierarchical browsing.
    pub browse_mode: BrowseMode,
}

impl Default for ServerParameters {
    fn default() -> Self {
        Self {
            update_period_ms: 200,
            branch_delimiter: '.',
            browse_mode: BrowseMode::Generic,
        }
    }
}

impl ServerParameters {
    /// Sets the update period.
    pub fn with_update_period_ms(mut self, period: u32) -> Self {
        self.update_period_ms = period;
        self
    }

    /// Sets the branch delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.branch_delimiter = delimiter;
        self
    }

    /// Sets the browse mode.
    pub fn with_browse_mode(mut self, mode: BrowseMode) -> Self {
        self.browse_mode = mode;
        self
    }
}

/// Selects which optional notifications the host sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationParameters {
    /// Forward requests for unknown items.
    pub use_on_request_items: bool,
    /// Forward client refreshes.
    pub use_on_refresh_items: bool,
    /// Forward item additions to groups.
    pub use_on_add_item: bool,
    /// Forward item removals from groups.
    pub use_on_remove_item: bool,
}

impl Default for OptimizationParameters {
    fn default() -> Self {
        Self {
            use_on_request_items: true,
            use_on_refresh_items: true,
            use_on_add_item: false,
            use_on_remove_item: false,
        }
    }
}

// =============================================================================
// Exchange Types
// =============================================================================

/// A connected client as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client id.
    pub id: ClientId,
    /// Client name.
    pub name: String,
    /// Connection time.
    pub connected_at: DateTime<Utc>,
}

/// A group owned by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Group handle.
    pub handle: GroupHandle,
    /// Owning client.
    pub client: ClientId,
    /// Group name.
    pub name: String,
}

/// Runtime state of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupState {
    /// Group name.
    pub name: String,
    /// Whether the group is active.
    pub active: bool,
    /// Requested update rate in milliseconds.
    pub update_rate_ms: u32,
    /// Percent deadband.
    pub deadband: f32,
    /// Number of items in the group.
    pub item_count: usize,
}

/// State of an item within a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStateInfo {
    /// Item handle.
    pub handle: ItemHandle,
    /// Whether the item is active in the group.
    pub active: bool,
    /// Access rights of the item.
    pub access_rights: AccessRights,
    /// Data type requested by the client.
    pub requested_type: Option<CanonicalType>,
}

/// A value written by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemWrite {
    /// Target item.
    pub handle: ItemHandle,
    /// Value to write.
    pub value: Value,
    /// Quality to write; `None` means good.
    pub quality: Option<Quality>,
    /// Timestamp to write; `None` means now.
    pub timestamp: Option<DateTime<Utc>>,
}

impl ItemWrite {
    /// Creates a write of a plain value.
    pub fn new(handle: ItemHandle, value: impl Into<Value>) -> Self {
        Self {
            handle,
            value: value.into(),
            quality: None,
            timestamp: None,
        }
    }
}

/// A client request for an item the catalog does not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    /// Fully qualified item name.
    pub name: String,
    /// Data type requested by the client.
    pub requested_type: Option<CanonicalType>,
}

/// Answer to an [`ItemRequest`] batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestOutcome {
    /// The items were added through the host callbacks.
    Accepted,
    /// The plugin does not serve dynamic items.
    Declined,
}

/// Answer to a client connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientDecision {
    /// Let the client connect.
    Accept,
    /// Refuse the client.
    Refuse,
}

/// Item that provides the value of an event attribute.
///
/// Empty strings mean "no mapping".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeItemMapping {
    /// Item id.
    pub item_id: String,
    /// Network node of the providing server.
    pub node_name: String,
    /// Registration id of the providing server.
    pub server_id: String,
}

impl AttributeItemMapping {
    /// Returns `true` if no item is mapped.
    pub fn is_empty(&self) -> bool {
        self.item_id.is_empty()
    }
}

// =============================================================================
// HostCallbacks
// =============================================================================

/// Calls the plugin makes into the generic server host.
///
/// Alarm and event calls default to `NotSupported` so a data access only
/// host needs to implement the item calls alone.
pub trait HostCallbacks: Send + Sync {
    /// Adds an item to the host catalog.
    fn add_item(&self, definition: ItemDefinition) -> OpcResult<ItemHandle>;

    /// Adds an analog item with a `[low, high]` engineering unit range.
    fn add_analog_item(
        &self,
        name: &str,
        access_rights: AccessRights,
        initial_value: Value,
        low: f64,
        high: f64,
    ) -> OpcResult<ItemHandle> {
        self.add_item(ItemDefinition::analog(name, access_rights, initial_value, low, high))
    }

    /// Soft removes an item.
    fn remove_item(&self, handle: ItemHandle) -> OpcResult<()>;

    /// Deletes an item that no group references.
    fn delete_item(&self, handle: ItemHandle) -> OpcResult<()> {
        let _ = handle;
        Err(OpcError::not_supported("delete_item"))
    }

    /// Returns `true` while `handle` still resolves, including a soft
    /// removed item that a group references. Hosts that cannot tell keep
    /// the default.
    fn is_item_resolvable(&self, handle: ItemHandle) -> bool {
        let _ = handle;
        true
    }

    /// Registers a vendor specific property.
    fn add_property(&self, id: PropertyId, description: &str, default_value: Value)
        -> OpcResult<()>;

    /// Updates the cached value, quality and timestamp of an item.
    fn set_item_value(
        &self,
        handle: ItemHandle,
        value: Option<Value>,
        quality: Quality,
        timestamp: DateTime<Utc>,
    ) -> OpcResult<()>;

    /// Publishes the server state.
    fn set_server_state(&self, state: ServerState) -> OpcResult<()>;

    /// Returns the items active in at least one group.
    fn get_active_items(&self) -> OpcResult<Vec<ItemHandle>>;

    /// Returns the connected clients.
    fn get_clients(&self) -> OpcResult<Vec<ClientInfo>>;

    /// Returns the groups of a client.
    fn get_groups(&self, client: ClientId) -> OpcResult<Vec<GroupInfo>>;

    /// Returns the state of a group.
    fn get_group_state(&self, group: GroupHandle) -> OpcResult<GroupState>;

    /// Returns the item states of a group.
    fn get_item_states(&self, group: GroupHandle) -> OpcResult<Vec<ItemStateInfo>>;

    /// Asks the host to shut the server down.
    fn fire_shutdown_request(&self, reason: &str) -> OpcResult<()>;

    /// Adds a simple event category.
    fn add_simple_event_category(&self, id: CategoryId, description: &str) -> OpcResult<()> {
        let _ = (id, description);
        Err(OpcError::not_supported("add_simple_event_category"))
    }

    /// Adds a tracking event category.
    fn add_tracking_event_category(&self, id: CategoryId, description: &str) -> OpcResult<()> {
        let _ = (id, description);
        Err(OpcError::not_supported("add_tracking_event_category"))
    }

    /// Adds a condition event category.
    fn add_condition_event_category(&self, id: CategoryId, description: &str) -> OpcResult<()> {
        let _ = (id, description);
        Err(OpcError::not_supported("add_condition_event_category"))
    }

    /// Adds an attribute to an event category.
    fn add_event_attribute(
        &self,
        category_id: CategoryId,
        attribute_id: AttributeId,
        description: &str,
        data_type: CanonicalType,
    ) -> OpcResult<()> {
        let _ = (category_id, attribute_id, description, data_type);
        Err(OpcError::not_supported("add_event_attribute"))
    }

    /// Adds a single-state condition definition.
    fn add_single_state_condition_definition(
        &self,
        definition: SingleStateDefinition,
    ) -> OpcResult<()> {
        let _ = definition;
        Err(OpcError::not_supported("add_single_state_condition_definition"))
    }

    /// Adds a multi-state condition definition.
    fn add_multi_state_condition_definition(
        &self,
        category_id: CategoryId,
        id: ConditionDefinitionId,
        name: &str,
    ) -> OpcResult<()> {
        let _ = (category_id, id, name);
        Err(OpcError::not_supported("add_multi_state_condition_definition"))
    }

    /// Adds a sub-condition to a multi-state definition.
    fn add_sub_condition_definition(
        &self,
        definition_id: ConditionDefinitionId,
        sub_condition: SubConditionDefinition,
    ) -> OpcResult<()> {
        let _ = (definition_id, sub_condition);
        Err(OpcError::not_supported("add_sub_condition_definition"))
    }

    /// Adds an area.
    fn add_area(&self, parent: AreaId, id: AreaId, name: &str) -> OpcResult<()> {
        let _ = (parent, id, name);
        Err(OpcError::not_supported("add_area"))
    }

    /// Adds a source to an area.
    fn add_source(&self, area: AreaId, id: SourceId, name: &str, multi_source: bool) -> OpcResult<()> {
        let _ = (area, id, name, multi_source);
        Err(OpcError::not_supported("add_source"))
    }

    /// Attaches an existing multi-area source to another area.
    fn add_existing_source(&self, area: AreaId, source: SourceId) -> OpcResult<()> {
        let _ = (area, source);
        Err(OpcError::not_supported("add_existing_source"))
    }

    /// Binds a condition definition to a source.
    fn add_condition(
        &self,
        source: SourceId,
        definition: ConditionDefinitionId,
        condition: ConditionId,
    ) -> OpcResult<()> {
        let _ = (source, definition, condition);
        Err(OpcError::not_supported("add_condition"))
    }

    /// Distributes a simple event.
    fn process_simple_event(&self, event: SimpleEvent) -> OpcResult<()> {
        let _ = event;
        Err(OpcError::not_supported("process_simple_event"))
    }

    /// Distributes a tracking event.
    fn process_tracking_event(&self, event: TrackingEvent) -> OpcResult<()> {
        let _ = event;
        Err(OpcError::not_supported("process_tracking_event"))
    }

    /// Applies condition state changes and returns the number of events.
    fn process_condition_state_changes(&self, changes: &[ConditionStateChange]) -> OpcResult<usize> {
        let _ = changes;
        Err(OpcError::not_supported("process_condition_state_changes"))
    }

    /// Acknowledges a condition on behalf of the server.
    fn ack_condition(&self, condition: ConditionId, comment: &str) -> OpcResult<()> {
        let _ = (condition, comment);
        Err(OpcError::not_supported("ack_condition"))
    }
}

// =============================================================================
// NodeManager
// =============================================================================

/// Entry points the host invokes on the plugin.
///
/// Optional entry points have defaults matching a plugin that does not use
/// them.
pub trait NodeManager: Send + Sync {
    /// Populates the catalog; called once at first use.
    fn on_create_server_items(&self) -> OpcResult<()>;

    /// Returns the registration data of a server kind, or `None` if the
    /// plugin does not provide that kind.
    fn on_get_server_definition(&self, kind: ServerKind) -> Option<ServerDefinition>;

    /// Returns the general server parameters.
    fn on_get_server_parameters(&self) -> ServerParameters;

    /// Returns which optional notifications the plugin wants.
    fn on_get_optimization_parameters(&self) -> OptimizationParameters {
        OptimizationParameters::default()
    }

    /// Called when the host process starts.
    fn on_startup_signal(&self, command_line: &str) -> OpcResult<()> {
        let _ = command_line;
        Ok(())
    }

    /// Called when the host process shuts down.
    fn on_shutdown_signal(&self) -> OpcResult<()>;

    /// Returns the ids of the custom properties of an item.
    ///
    /// `NotApplicable` if the item has none.
    fn on_query_properties(&self, handle: ItemHandle) -> OpcResult<Vec<PropertyId>>;

    /// Returns the value of a custom property of an item.
    ///
    /// `NotApplicable` if the property is unknown for the item.
    fn on_get_property_value(&self, handle: ItemHandle, id: PropertyId) -> OpcResult<Value>;

    /// Writes client values, returning one result per write.
    fn on_write_items(&self, writes: &[ItemWrite]) -> Vec<OpcResult<()>>;

    /// Refreshes the cache for the given items.
    fn on_refresh_items(&self, handles: &[ItemHandle]) -> OpcResult<()>;

    /// Moves the browse position of a client (custom browse mode).
    fn on_browse_change_position(
        &self,
        client: ClientId,
        direction: BrowseDirection,
        target: Option<&str>,
    ) -> OpcResult<String> {
        let _ = (client, direction, target);
        Err(OpcError::not_supported("browse_change_position"))
    }

    /// Lists names at the browse position of a client (custom browse mode).
    fn on_browse_list_ids(&self, client: ClientId, filter: &BrowseFilter) -> OpcResult<BrowseIter> {
        let _ = (client, filter);
        Err(OpcError::not_supported("browse_list_ids"))
    }

    /// Resolves a local name against the browse position of a client
    /// (custom browse mode).
    fn on_browse_resolve_full_id(&self, client: ClientId, local: &str) -> OpcResult<String> {
        let _ = (client, local);
        Err(OpcError::not_supported("browse_resolve_full_id"))
    }

    /// Called when a client connects.
    fn on_client_connect(&self, client: ClientId) -> ClientDecision {
        let _ = client;
        ClientDecision::Accept
    }

    /// Called when a client disconnects.
    fn on_client_disconnect(&self, client: ClientId) {
        let _ = client;
    }

    /// Called when a client adds an item to a group.
    fn on_add_item(&self, handle: ItemHandle) -> OpcResult<()> {
        let _ = handle;
        Ok(())
    }

    /// Called when a client removes an item from a group.
    fn on_remove_item(&self, handle: ItemHandle) -> OpcResult<()> {
        let _ = handle;
        Ok(())
    }

    /// Called when a client acknowledges a condition.
    fn on_ack_notification(&self, condition: ConditionId, sub_condition: SubConditionId) {
        let _ = (condition, sub_condition);
    }

    /// Returns the item providing an event attribute.
    fn on_translate_attribute_to_item(
        &self,
        condition: ConditionId,
        sub_condition: SubConditionId,
        attribute: AttributeId,
    ) -> AttributeItemMapping {
        let _ = (condition, sub_condition, attribute);
        AttributeItemMapping::default()
    }

    /// Returns the log level the host should use.
    fn on_get_log_level(&self) -> LogLevel {
        LogLevel::Info
    }

    /// Returns the log directory; empty means the host default.
    fn on_get_log_path(&self) -> String {
        String::new()
    }

    /// Handles client requests for unknown items.
    fn on_request_items(&self, requests: &[ItemRequest]) -> RequestOutcome {
        let _ = requests;
        RequestOutcome::Declined
    }
}
