// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-process reference host.
//!
//! [`InMemoryHost`] implements [`HostCallbacks`] on top of an
//! [`ItemCatalog`] and an [`EventSpace`], together with a small client and
//! group registry. It stands in for the generic server process when the
//! plugin runs standalone and in tests.
//!
//! Generic browse mode is served here from the catalog namespace.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::browse::{BrowseFilter, BrowseIter, BrowseSessions};
use crate::catalog::{ItemCatalog, ItemDefinition};
use crate::error::{OpcError, OpcResult};
use crate::event_space::{
    AreaId, AttributeId, CategoryId, ConditionDefinitionId, ConditionId, ConditionStateChange,
    EventSpace, SimpleEvent, SingleStateDefinition, SourceId, SubConditionDefinition,
    TrackingEvent,
};
use crate::gateway::{ClientInfo, GroupInfo, GroupState, HostCallbacks, ItemStateInfo};
use crate::quality::Quality;
use crate::types::{
    BrowseDirection, CanonicalType, ClientId, GroupHandle, ItemHandle, PropertyId, ServerState,
    Value,
};

/// Callback invoked when the plugin requests a shutdown.
pub type ShutdownHandler = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Debug)]
struct GroupRecord {
    info: GroupInfo,
    active: bool,
    update_rate_ms: u32,
    items: Vec<ItemHandle>,
}

/// Reference implementation of the host side of the gateway.
pub struct InMemoryHost {
    catalog: ItemCatalog,
    events: EventSpace,
    state: RwLock<ServerState>,
    state_history: Mutex<Vec<ServerState>>,
    clients: DashMap<ClientId, ClientInfo>,
    groups: DashMap<GroupHandle, GroupRecord>,
    next_group: AtomicU64,
    sessions: BrowseSessions,
    shutdown_requests: Mutex<Vec<String>>,
    shutdown_handler: RwLock<Option<ShutdownHandler>>,
}

impl std::fmt::Debug for InMemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryHost")
            .field("items", &self.catalog.len())
            .field("state", &*self.state.read())
            .field("clients", &self.clients.len())
            .field("groups", &self.groups.len())
            .finish()
    }
}

impl InMemoryHost {
    /// Creates an empty host.
    pub fn new(delimiter: char) -> Self {
        Self {
            catalog: ItemCatalog::new(delimiter),
            events: EventSpace::new(delimiter),
            state: RwLock::new(ServerState::Unknown),
            state_history: Mutex::new(Vec::new()),
            clients: DashMap::new(),
            groups: DashMap::new(),
            next_group: AtomicU64::new(1),
            sessions: BrowseSessions::new(delimiter),
            shutdown_requests: Mutex::new(Vec::new()),
            shutdown_handler: RwLock::new(None),
        }
    }

    /// Creates a shared host.
    pub fn shared(delimiter: char) -> Arc<Self> {
        Arc::new(Self::new(delimiter))
    }

    /// Returns the item catalog.
    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    /// Returns the event space.
    pub fn events(&self) -> &EventSpace {
        &self.events
    }

    /// Returns the current server state.
    pub fn server_state(&self) -> ServerState {
        *self.state.read()
    }

    /// Returns every state published so far, oldest first.
    pub fn state_history(&self) -> Vec<ServerState> {
        self.state_history.lock().clone()
    }

    /// Installs the callback run on shutdown requests.
    pub fn set_shutdown_handler<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.shutdown_handler.write() = Some(Box::new(handler));
    }

    /// Returns the reasons of every shutdown request received.
    pub fn shutdown_requests(&self) -> Vec<String> {
        self.shutdown_requests.lock().clone()
    }

    // =========================================================================
    // Clients & groups
    // =========================================================================

    /// Registers a connected client.
    pub fn connect_client(&self, name: impl Into<String>) -> ClientId {
        let id = ClientId::new();
        let name = name.into();
        debug!(client = %id, name = %name, "Client connected");
        self.clients.insert(
            id,
            ClientInfo {
                id,
                name,
                connected_at: Utc::now(),
            },
        );
        id
    }

    /// Unregisters a client and drops its groups.
    pub fn disconnect_client(&self, client: ClientId) -> OpcResult<()> {
        self.clients
            .remove(&client)
            .ok_or_else(|| OpcError::not_found("client", client))?;

        let owned: Vec<GroupHandle> = self
            .groups
            .iter()
            .filter(|entry| entry.value().info.client == client)
            .map(|entry| *entry.key())
            .collect();
        for group in owned {
            self.remove_group(group)?;
        }
        self.sessions.remove(&client);
        debug!(%client, "Client disconnected");
        Ok(())
    }

    /// Creates a group for a client.
    pub fn add_group(
        &self,
        client: ClientId,
        name: impl Into<String>,
        update_rate_ms: u32,
    ) -> OpcResult<GroupHandle> {
        if !self.clients.contains_key(&client) {
            return Err(OpcError::not_found("client", client));
        }
        let handle = GroupHandle::new(self.next_group.fetch_add(1, Ordering::Relaxed));
        self.groups.insert(
            handle,
            GroupRecord {
                info: GroupInfo {
                    handle,
                    client,
                    name: name.into(),
                },
                active: true,
                update_rate_ms,
                items: Vec::new(),
            },
        );
        Ok(handle)
    }

    /// Adds an item to a group, taking a catalog reference on it.
    pub fn add_group_item(&self, group: GroupHandle, item: ItemHandle) -> OpcResult<()> {
        let mut record = self
            .groups
            .get_mut(&group)
            .ok_or_else(|| OpcError::not_found("group", group))?;
        if record.items.contains(&item) {
            return Err(OpcError::conflict("group item", item));
        }
        self.catalog.add_group_reference(item)?;
        record.items.push(item);
        Ok(())
    }

    /// Removes a group and releases its item references.
    pub fn remove_group(&self, group: GroupHandle) -> OpcResult<()> {
        let (_, record) = self
            .groups
            .remove(&group)
            .ok_or_else(|| OpcError::not_found("group", group))?;
        for item in record.items {
            if let Err(e) = self.catalog.release_group_reference(item) {
                warn!(%group, %item, error = %e, "Failed to release group reference");
            }
        }
        Ok(())
    }

    // =========================================================================
    // Generic browsing
    // =========================================================================

    /// Moves the browse position of a client over the catalog namespace.
    pub fn browse_change_position(
        &self,
        client: ClientId,
        direction: BrowseDirection,
        target: Option<&str>,
    ) -> OpcResult<String> {
        let navigator = self.sessions.navigator(client);
        let namespace = self.catalog.namespace();
        let mut navigator = navigator.lock();
        navigator.change_position(&namespace, direction, target)
    }

    /// Lists names at the browse position of a client.
    pub fn browse_list_ids(&self, client: ClientId, filter: &BrowseFilter) -> BrowseIter {
        let navigator = self.sessions.navigator(client);
        let namespace = self.catalog.namespace();
        let iter = navigator.lock().list_ids(&namespace, filter);
        iter
    }

    /// Resolves a local name against the browse position of a client.
    pub fn browse_resolve_full_id(&self, client: ClientId, local: &str) -> OpcResult<String> {
        let navigator = self.sessions.navigator(client);
        let full_id = navigator.lock().resolve_full_id(local);
        full_id
    }
}

impl HostCallbacks for InMemoryHost {
    fn add_item(&self, definition: ItemDefinition) -> OpcResult<ItemHandle> {
        self.catalog.add_item(definition)
    }

    fn remove_item(&self, handle: ItemHandle) -> OpcResult<()> {
        self.catalog.remove_item(handle)
    }

    fn delete_item(&self, handle: ItemHandle) -> OpcResult<()> {
        self.catalog.delete_item(handle)
    }

    fn is_item_resolvable(&self, handle: ItemHandle) -> bool {
        self.catalog.get(handle).is_ok()
    }

    fn add_property(
        &self,
        id: PropertyId,
        description: &str,
        default_value: Value,
    ) -> OpcResult<()> {
        self.catalog.add_property(id, description, default_value)
    }

    fn set_item_value(
        &self,
        handle: ItemHandle,
        value: Option<Value>,
        quality: Quality,
        timestamp: DateTime<Utc>,
    ) -> OpcResult<()> {
        self.catalog.set_item_value(handle, value, quality, timestamp)
    }

    fn set_server_state(&self, state: ServerState) -> OpcResult<()> {
        *self.state.write() = state;
        self.state_history.lock().push(state);
        Ok(())
    }

    fn get_active_items(&self) -> OpcResult<Vec<ItemHandle>> {
        let mut handles: Vec<ItemHandle> = self
            .groups
            .iter()
            .filter(|entry| entry.value().active)
            .flat_map(|entry| entry.value().items.clone())
            .collect();
        handles.sort();
        handles.dedup();
        Ok(handles)
    }

    fn get_clients(&self) -> OpcResult<Vec<ClientInfo>> {
        let mut clients: Vec<ClientInfo> = self.clients.iter().map(|e| e.value().clone()).collect();
        clients.sort_by_key(|c| c.connected_at);
        Ok(clients)
    }

    fn get_groups(&self, client: ClientId) -> OpcResult<Vec<GroupInfo>> {
        if !self.clients.contains_key(&client) {
            return Err(OpcError::not_found("client", client));
        }
        let mut groups: Vec<GroupInfo> = self
            .groups
            .iter()
            .filter(|entry| entry.value().info.client == client)
            .map(|entry| entry.value().info.clone())
            .collect();
        groups.sort_by_key(|g| g.handle);
        Ok(groups)
    }

    fn get_group_state(&self, group: GroupHandle) -> OpcResult<GroupState> {
        let record = self
            .groups
            .get(&group)
            .ok_or_else(|| OpcError::not_found("group", group))?;
        Ok(GroupState {
            name: record.info.name.clone(),
            active: record.active,
            update_rate_ms: record.update_rate_ms,
            deadband: 0.0,
            item_count: record.items.len(),
        })
    }

    fn get_item_states(&self, group: GroupHandle) -> OpcResult<Vec<ItemStateInfo>> {
        let record = self
            .groups
            .get(&group)
            .ok_or_else(|| OpcError::not_found("group", group))?;
        record
            .items
            .iter()
            .map(|handle| {
                let item = self.catalog.get(*handle)?;
                Ok(ItemStateInfo {
                    handle: *handle,
                    active: record.active,
                    access_rights: item.access_rights(),
                    requested_type: None,
                })
            })
            .collect()
    }

    fn fire_shutdown_request(&self, reason: &str) -> OpcResult<()> {
        info!(reason = %reason, "Shutdown requested by plugin");
        self.shutdown_requests.lock().push(reason.to_string());
        if let Some(handler) = self.shutdown_handler.read().as_ref() {
            handler(reason);
        }
        Ok(())
    }

    fn add_simple_event_category(&self, id: CategoryId, description: &str) -> OpcResult<()> {
        self.events.add_simple_event_category(id, description)
    }

    fn add_tracking_event_category(&self, id: CategoryId, description: &str) -> OpcResult<()> {
        self.events.add_tracking_event_category(id, description)
    }

    fn add_condition_event_category(&self, id: CategoryId, description: &str) -> OpcResult<()> {
        self.events.add_condition_event_category(id, description)
    }

    fn add_event_attribute(
        &self,
        category_id: CategoryId,
        attribute_id: AttributeId,
        description: &str,
        data_type: CanonicalType,
    ) -> OpcResult<()> {
        self.events
            .add_event_attribute(category_id, attribute_id, description, data_type)
    }

    fn add_single_state_condition_definition(
        &self,
        definition: SingleStateDefinition,
    ) -> OpcResult<()> {
        self.events.add_single_state_condition_definition(definition)
    }

    fn add_multi_state_condition_definition(
        &self,
        category_id: CategoryId,
        id: ConditionDefinitionId,
        name: &str,
    ) -> OpcResult<()> {
        self.events
            .add_multi_state_condition_definition(category_id, id, name)
    }

    fn add_sub_condition_definition(
        &self,
        definition_id: ConditionDefinitionId,
        sub_condition: SubConditionDefinition,
    ) -> OpcResult<()> {
        self.events
            .add_sub_condition_definition(definition_id, sub_condition)
    }

    fn add_area(&self, parent: AreaId, id: AreaId, name: &str) -> OpcResult<()> {
        self.events.add_area(parent, id, name)
    }

    fn add_source(&self, area: AreaId, id: SourceId, name: &str, multi_source: bool) -> OpcResult<()> {
        self.events.add_source(area, id, name, multi_source)
    }

    fn add_existing_source(&self, area: AreaId, source: SourceId) -> OpcResult<()> {
        self.events.add_existing_source(area, source)
    }

    fn add_condition(
        &self,
        source: SourceId,
        definition: ConditionDefinitionId,
        condition: ConditionId,
    ) -> OpcResult<()> {
        self.events.add_condition(source, definition, condition)
    }

    fn process_simple_event(&self, event: SimpleEvent) -> OpcResult<()> {
        self.events.process_simple_event(event)
    }

    fn process_tracking_event(&self, event: TrackingEvent) -> OpcResult<()> {
        self.events.process_tracking_event(event)
    }

    fn process_condition_state_changes(&self, changes: &[ConditionStateChange]) -> OpcResult<usize> {
        self.events.process_condition_state_changes(changes)
    }

    fn ack_condition(&self, condition: ConditionId, comment: &str) -> OpcResult<()> {
        self.events.ack_condition(condition, comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use crate::types::{AccessRights, BrowseType};
    use std::sync::atomic::AtomicUsize;

    fn host_with_item() -> (InMemoryHost, ItemHandle) {
        let host = InMemoryHost::new('.');
        let handle = host
            .add_item(ItemDefinition::new(
                "Plant.Tank.Level",
                AccessRights::Readable,
                Value::Float64(1.0),
            ))
            .unwrap();
        (host, handle)
    }

    #[test]
    fn test_group_reference_blocks_delete() {
        let (host, handle) = host_with_item();
        let client = host.connect_client("test");
        let group = host.add_group(client, "g1", 1000).unwrap();
        host.add_group_item(group, handle).unwrap();

        assert_eq!(host.delete_item(handle).unwrap_err().status(), Status::PreconditionFailed);
        assert_eq!(host.get_active_items().unwrap(), vec![handle]);

        host.remove_item(handle).unwrap();
        assert!(host.catalog().read(handle).unwrap().removed);

        host.disconnect_client(client).unwrap();
        assert!(host.catalog().read(handle).is_err());
    }

    #[test]
    fn test_group_queries() {
        let (host, handle) = host_with_item();
        let client = host.connect_client("test");
        let group = host.add_group(client, "g1", 500).unwrap();
        host.add_group_item(group, handle).unwrap();

        let groups = host.get_groups(client).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "g1");

        let state = host.get_group_state(group).unwrap();
        assert_eq!(state.item_count, 1);
        assert_eq!(state.update_rate_ms, 500);

        let items = host.get_item_states(group).unwrap();
        assert_eq!(items[0].access_rights, AccessRights::Readable);
        assert_eq!(host.get_clients().unwrap().len(), 1);
        assert!(host.get_groups(ClientId::new()).is_err());
    }

    #[test]
    fn test_shutdown_request_runs_handler() {
        let host = InMemoryHost::new('.');
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        host.set_shutdown_handler(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        host.fire_shutdown_request("client asked").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(host.shutdown_requests(), vec!["client asked".to_string()]);
    }

    #[test]
    fn test_generic_browse() {
        let (host, _) = host_with_item();
        let client = host.connect_client("browser");
        host.browse_change_position(client, BrowseDirection::To, Some("Plant.Tank"))
            .unwrap();
        let leaves: Vec<String> = host
            .browse_list_ids(client, &BrowseFilter::new(BrowseType::Leaf))
            .collect();
        assert_eq!(leaves, vec!["Level".to_string()]);
        assert_eq!(
            host.browse_resolve_full_id(client, "Level").unwrap(),
            "Plant.Tank.Level"
        );
    }

    #[test]
    fn test_state_history() {
        let host = InMemoryHost::new('.');
        host.set_server_state(ServerState::NoConfig).unwrap();
        host.set_server_state(ServerState::Running).unwrap();
        assert_eq!(host.server_state(), ServerState::Running);
        assert_eq!(
            host.state_history(),
            vec![ServerState::NoConfig, ServerState::Running]
        );
    }
}
