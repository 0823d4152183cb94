// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! A host that records every call the plugin makes and can be told to fail.
//!
//! ## Design Principles
//!
//! - Data access calls are delegated to an [`InMemoryHost`]
//! - Alarm and event support can be switched off to model a data access
//!   only host
//! - Failure injection for item creation and state publication

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use opcsim_core::event_space::{
    AreaId, AttributeId, CategoryId, ConditionDefinitionId, ConditionId, SourceId,
};
use opcsim_core::{
    CanonicalType, ClientId, ClientInfo, ConditionStateChange, GroupHandle, GroupInfo, GroupState,
    HostCallbacks, InMemoryHost, ItemDefinition, ItemHandle, ItemStateInfo, OpcError, OpcResult,
    PropertyId, Quality, ServerState, SimpleEvent, SingleStateDefinition, SubConditionDefinition,
    TrackingEvent, Value,
};

// =============================================================================
// HostCall
// =============================================================================

/// A call received by the [`RecordingHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    /// `add_item` with the item name.
    AddItem(String),
    /// `remove_item`.
    RemoveItem(ItemHandle),
    /// `add_property`.
    AddProperty(PropertyId),
    /// `set_item_value`.
    SetItemValue(ItemHandle),
    /// `set_server_state`.
    SetServerState(ServerState),
    /// `fire_shutdown_request` with the reason.
    ShutdownRequest(String),
    /// Any alarm and event call, by operation name.
    Events(&'static str),
}

// =============================================================================
// RecordingHost
// =============================================================================

/// A [`HostCallbacks`] implementation that records calls.
#[derive(Debug)]
pub struct RecordingHost {
    inner: Arc<InMemoryHost>,
    calls: Mutex<Vec<HostCall>>,
    events_supported: AtomicBool,
    item_limit: AtomicUsize,
    items_accepted: AtomicUsize,
    reject_states: Mutex<Vec<ServerState>>,
}

impl RecordingHost {
    /// Creates a recording host with full alarm and event support.
    pub fn new() -> Self {
        Self {
            inner: InMemoryHost::shared('.'),
            calls: Mutex::new(Vec::new()),
            events_supported: AtomicBool::new(true),
            item_limit: AtomicUsize::new(usize::MAX),
            items_accepted: AtomicUsize::new(0),
            reject_states: Mutex::new(Vec::new()),
        }
    }

    /// Creates a shared recording host.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Answers every alarm and event call with `NotSupported`.
    pub fn without_events(self) -> Self {
        self.events_supported.store(false, Ordering::SeqCst);
        self
    }

    /// Fails `add_item` with `ResourceExhausted` once `limit` items exist.
    pub fn with_item_limit(self, limit: usize) -> Self {
        self.item_limit.store(limit, Ordering::SeqCst);
        self
    }

    /// Fails `set_server_state` for `state`.
    pub fn rejecting_state(self, state: ServerState) -> Self {
        self.reject_states.lock().push(state);
        self
    }

    /// Returns the in-memory host the calls are delegated to.
    pub fn inner(&self) -> &Arc<InMemoryHost> {
        &self.inner
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    /// Returns the published server states in order.
    pub fn states(&self) -> Vec<ServerState> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                HostCall::SetServerState(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().push(call);
    }

    fn events(&self, operation: &'static str) -> OpcResult<()> {
        self.record(HostCall::Events(operation));
        if self.events_supported.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(OpcError::not_supported(operation))
        }
    }
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostCallbacks for RecordingHost {
    fn add_item(&self, definition: ItemDefinition) -> OpcResult<ItemHandle> {
        self.record(HostCall::AddItem(definition.name.clone()));
        if self.items_accepted.load(Ordering::SeqCst) >= self.item_limit.load(Ordering::SeqCst) {
            return Err(OpcError::resource_exhausted("item limit reached"));
        }
        let handle = self.inner.add_item(definition)?;
        self.items_accepted.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    fn remove_item(&self, handle: ItemHandle) -> OpcResult<()> {
        self.record(HostCall::RemoveItem(handle));
        self.inner.remove_item(handle)
    }

    fn delete_item(&self, handle: ItemHandle) -> OpcResult<()> {
        self.inner.delete_item(handle)
    }

    fn is_item_resolvable(&self, handle: ItemHandle) -> bool {
        self.inner.is_item_resolvable(handle)
    }

    fn add_property(&self, id: PropertyId, description: &str, default_value: Value) -> OpcResult<()> {
        self.record(HostCall::AddProperty(id));
        self.inner.add_property(id, description, default_value)
    }

    fn set_item_value(
        &self,
        handle: ItemHandle,
        value: Option<Value>,
        quality: Quality,
        timestamp: DateTime<Utc>,
    ) -> OpcResult<()> {
        self.record(HostCall::SetItemValue(handle));
        self.inner.set_item_value(handle, value, quality, timestamp)
    }

    fn set_server_state(&self, state: ServerState) -> OpcResult<()> {
        self.record(HostCall::SetServerState(state));
        if self.reject_states.lock().contains(&state) {
            return Err(OpcError::fail(format!("state {} rejected", state)));
        }
        self.inner.set_server_state(state)
    }

    fn get_active_items(&self) -> OpcResult<Vec<ItemHandle>> {
        self.inner.get_active_items()
    }

    fn get_clients(&self) -> OpcResult<Vec<ClientInfo>> {
        self.inner.get_clients()
    }

    fn get_groups(&self, client: ClientId) -> OpcResult<Vec<GroupInfo>> {
        self.inner.get_groups(client)
    }

    fn get_group_state(&self, group: GroupHandle) -> OpcResult<GroupState> {
        self.inner.get_group_state(group)
    }

    fn get_item_states(&self, group: GroupHandle) -> OpcResult<Vec<ItemStateInfo>> {
        self.inner.get_item_states(group)
    }

    fn fire_shutdown_request(&self, reason: &str) -> OpcResult<()> {
        self.record(HostCall::ShutdownRequest(reason.to_string()));
        self.inner.fire_shutdown_request(reason)
    }

    fn add_simple_event_category(&self, id: CategoryId, description: &str) -> OpcResult<()> {
        self.events("add_simple_event_category")?;
        self.inner.add_simple_event_category(id, description)
    }

    fn add_tracking_event_category(&self, id: CategoryId, description: &str) -> OpcResult<()> {
        self.events("add_tracking_event_category")?;
        self.inner.add_tracking_event_category(id, description)
    }

    fn add_condition_event_category(&self, id: CategoryId, description: &str) -> OpcResult<()> {
        self.events("add_condition_event_category")?;
        self.inner.add_condition_event_category(id, description)
    }

    fn add_event_attribute(
        &self,
        category_id: CategoryId,
        attribute_id: AttributeId,
        description: &str,
        data_type: CanonicalType,
    ) -> OpcResult<()> {
        self.events("add_event_attribute")?;
        self.inner
            .add_event_attribute(category_id, attribute_id, description, data_type)
    }

    fn add_single_state_condition_definition(
        &self,
        definition: SingleStateDefinition,
    ) -> OpcResult<()> {
        self.events("add_single_state_condition_definition")?;
        self.inner.add_single_state_condition_definition(definition)
    }

    fn add_multi_state_condition_definition(
        &self,
        category_id: CategoryId,
        id: ConditionDefinitionId,
        name: &str,
    ) -> OpcResult<()> {
        self.events("add_multi_state_condition_definition")?;
        self.inner
            .add_multi_state_condition_definition(category_id, id, name)
    }

    fn add_sub_condition_definition(
        &self,
        definition_id: ConditionDefinitionId,
        sub_condition: SubConditionDefinition,
    ) -> OpcResult<()> {
        self.events("add_sub_condition_definition")?;
        self.inner
            .add_sub_condition_definition(definition_id, sub_condition)
    }

    fn add_area(&self, parent: AreaId, id: AreaId, name: &str) -> OpcResult<()> {
        self.events("add_area")?;
        self.inner.add_area(parent, id, name)
    }

    fn add_source(&self, area: AreaId, id: SourceId, name: &str, multi_source: bool) -> OpcResult<()> {
        self.events("add_source")?;
        self.inner.add_source(area, id, name, multi_source)
    }

    fn add_existing_source(&self, area: AreaId, source: SourceId) -> OpcResult<()> {
        self.events("add_existing_source")?;
        self.inner.add_existing_source(area, source)
    }

    fn add_condition(
        &self,
        source: SourceId,
        definition: ConditionDefinitionId,
        condition: ConditionId,
    ) -> OpcResult<()> {
        self.events("add_condition")?;
        self.inner.add_condition(source, definition, condition)
    }

    fn process_simple_event(&self, event: SimpleEvent) -> OpcResult<()> {
        self.events("process_simple_event")?;
        self.inner.process_simple_event(event)
    }

    fn process_tracking_event(&self, event: TrackingEvent) -> OpcResult<()> {
        self.events("process_tracking_event")?;
        self.inner.process_tracking_event(event)
    }

    fn process_condition_state_changes(&self, changes: &[ConditionStateChange]) -> OpcResult<usize> {
        self.events("process_condition_state_changes")?;
        self.inner.process_condition_state_changes(changes)
    }

    fn ack_condition(&self, condition: ConditionId, comment: &str) -> OpcResult<()> {
        self.events("ack_condition")?;
        self.inner.ack_condition(condition, comment)
    }
}
