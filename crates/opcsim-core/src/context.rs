// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Explicit server context shared by the workers and host entry points.
//!
//! The context owns the injected [`HostCallbacks`], the server parameters,
//! a mirror of the published server state and a plugin-side index of the
//! items the plugin added. The index answers custom browse requests and
//! property queries without a round trip to the host.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::browse::{BrowseFilter, BrowseIter, BrowseSessions, LeafInfo, Namespace};
use crate::catalog::{ItemDefinition, PropertySet};
use crate::error::{OpcError, OpcResult};
use crate::gateway::{HostCallbacks, ServerParameters};
use crate::quality::Quality;
use crate::types::{
    AccessRights, BrowseDirection, BrowseMode, ClientId, ItemHandle, PropertyId, ServerState,
    Value,
};

#[derive(Debug)]
struct IndexedItem {
    name: String,
    access_rights: AccessRights,
    properties: PropertySet,
    // Soft removed but still resolvable by handle on the host.
    retained: bool,
}

/// State shared by every part of the plugin.
pub struct ServerContext {
    host: Arc<dyn HostCallbacks>,
    parameters: ServerParameters,
    state: RwLock<ServerState>,
    namespace: RwLock<Namespace>,
    items: DashMap<ItemHandle, IndexedItem>,
    sessions: BrowseSessions,
    items_added: AtomicU64,
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("parameters", &self.parameters)
            .field("state", &*self.state.read())
            .field("items", &self.items.len())
            .finish()
    }
}

impl ServerContext {
    /// Creates a context around an injected host.
    pub fn new(host: Arc<dyn HostCallbacks>, parameters: ServerParameters) -> Self {
        let delimiter = parameters.branch_delimiter;
        Self {
            host,
            parameters,
            state: RwLock::new(ServerState::Unknown),
            namespace: RwLock::new(Namespace::new(delimiter)),
            items: DashMap::new(),
            sessions: BrowseSessions::new(delimiter),
            items_added: AtomicU64::new(0),
        }
    }

    /// Returns the host callbacks.
    pub fn host(&self) -> &Arc<dyn HostCallbacks> {
        &self.host
    }

    /// Returns the server parameters.
    pub fn parameters(&self) -> &ServerParameters {
        &self.parameters
    }

    /// Returns the branch delimiter.
    pub fn delimiter(&self) -> char {
        self.parameters.branch_delimiter
    }

    // =========================================================================
    // Server state
    // =========================================================================

    /// Returns the last published server state.
    pub fn server_state(&self) -> ServerState {
        *self.state.read()
    }

    /// Publishes a new server state to the host.
    ///
    /// The local mirror is updated only if the host accepts the state.
    pub fn set_server_state(&self, state: ServerState) -> OpcResult<()> {
        self.host.set_server_state(state)?;
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            info!(from = %previous, to = %state, "Server state changed");
        }
        Ok(())
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Adds an item through the host and indexes it.
    pub fn add_item(&self, definition: ItemDefinition) -> OpcResult<ItemHandle> {
        let canonical_type = definition.validate(self.delimiter())?;
        let name = definition.name.clone();
        let access_rights = definition.access_rights;
        let properties = PropertySet::from_definition(&definition);

        let handle = self.host.add_item(definition)?;

        if let Err(e) = self
            .namespace
            .write()
            .insert(&name, LeafInfo::new(handle, canonical_type, access_rights))
        {
            warn!(%handle, name = %name, error = %e, "Item not indexed for browsing");
        }
        self.items.insert(
            handle,
            IndexedItem {
                name,
                access_rights,
                properties,
                retained: false,
            },
        );
        self.items_added.fetch_add(1, Ordering::Relaxed);
        Ok(handle)
    }

    /// Adds an analog item through the host and indexes it.
    pub fn add_analog_item(
        &self,
        name: &str,
        access_rights: AccessRights,
        initial_value: Value,
        low: f64,
        high: f64,
    ) -> OpcResult<ItemHandle> {
        self.add_item(ItemDefinition::analog(name, access_rights, initial_value, low, high))
    }

    /// Soft removes an item through the host.
    ///
    /// The name leaves the browse namespace at once. Properties stay
    /// queryable for as long as the host still resolves the handle, which
    /// is until the last group reference goes away.
    pub fn remove_item(&self, handle: ItemHandle) -> OpcResult<()> {
        self.host.remove_item(handle)?;
        if let Some(mut item) = self.items.get_mut(&handle) {
            item.retained = true;
            self.namespace.write().remove(&item.name);
            debug!(%handle, name = %item.name, "Item removed");
        }
        Ok(())
    }

    fn with_properties<R>(&self, handle: ItemHandle, f: impl FnOnce(&PropertySet) -> R) -> Option<R> {
        let retained = self.items.get(&handle).map(|item| item.retained)?;
        if retained && !self.host.is_item_resolvable(handle) {
            self.items.remove(&handle);
            debug!(%handle, "Removed item released by host");
            return None;
        }
        self.items.get(&handle).map(|item| f(&item.properties))
    }

    /// Pushes a value into the host cache.
    pub fn set_item_value(
        &self,
        handle: ItemHandle,
        value: Option<Value>,
        quality: Quality,
        timestamp: DateTime<Utc>,
    ) -> OpcResult<()> {
        self.host.set_item_value(handle, value, quality, timestamp)
    }

    /// Returns the number of items added through this context.
    pub fn items_added(&self) -> u64 {
        self.items_added.load(Ordering::Relaxed)
    }

    /// Returns the number of indexed items that have not been removed.
    pub fn item_count(&self) -> usize {
        self.items.iter().filter(|item| !item.retained).count()
    }

    /// Returns the name of an indexed item that has not been removed.
    pub fn item_name(&self, handle: ItemHandle) -> Option<String> {
        self.items
            .get(&handle)
            .filter(|item| !item.retained)
            .map(|item| item.name.clone())
    }

    /// Returns the access rights of an indexed item that has not been removed.
    pub fn item_access_rights(&self, handle: ItemHandle) -> Option<AccessRights> {
        self.items
            .get(&handle)
            .filter(|item| !item.retained)
            .map(|item| item.access_rights)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns the custom property ids of an item.
    ///
    /// # Errors
    ///
    /// `NotApplicable` if the item is unknown or has no custom properties.
    pub fn query_properties(&self, handle: ItemHandle) -> OpcResult<Vec<PropertyId>> {
        let ids = self
            .with_properties(handle, PropertySet::ids)
            .unwrap_or_default();
        if ids.is_empty() {
            return Err(OpcError::not_applicable(format!(
                "{} has no custom properties",
                handle
            )));
        }
        Ok(ids)
    }

    /// Returns the value of a custom property of an item.
    ///
    /// # Errors
    ///
    /// `NotApplicable` if the property is unknown for the item.
    pub fn get_property_value(&self, handle: ItemHandle, id: PropertyId) -> OpcResult<Value> {
        self.with_properties(handle, |properties| properties.value(id))
            .flatten()
            .ok_or_else(|| {
                OpcError::not_applicable(format!("{} has no property {}", handle, id))
            })
    }

    // =========================================================================
    // Custom browsing
    // =========================================================================

    fn require_custom_browse(&self, operation: &str) -> OpcResult<()> {
        if self.parameters.browse_mode != BrowseMode::Custom {
            return Err(OpcError::not_supported(format!(
                "{} requires custom browse mode",
                operation
            )));
        }
        Ok(())
    }

    /// Moves the browse position of a client.
    pub fn browse_change_position(
        &self,
        client: ClientId,
        direction: BrowseDirection,
        target: Option<&str>,
    ) -> OpcResult<String> {
        self.require_custom_browse("browse_change_position")?;
        let navigator = self.sessions.navigator(client);
        let namespace = self.namespace.read();
        let mut navigator = navigator.lock();
        navigator.change_position(&namespace, direction, target)
    }

    /// Lists names at the browse position of a client.
    pub fn browse_list_ids(&self, client: ClientId, filter: &BrowseFilter) -> OpcResult<BrowseIter> {
        self.require_custom_browse("browse_list_ids")?;
        let navigator = self.sessions.navigator(client);
        let namespace = self.namespace.read();
        let iter = navigator.lock().list_ids(&namespace, filter);
        Ok(iter)
    }

    /// Resolves a local name against the browse position of a client.
    pub fn browse_resolve_full_id(&self, client: ClientId, local: &str) -> OpcResult<String> {
        self.require_custom_browse("browse_resolve_full_id")?;
        let navigator = self.sessions.navigator(client);
        let full_id = navigator.lock().resolve_full_id(local);
        full_id
    }

    /// Drops the browse state of a disconnected client.
    pub fn forget_client(&self, client: &ClientId) {
        self.sessions.remove(client);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use crate::host::InMemoryHost;
    use crate::types::BrowseType;

    fn context(mode: BrowseMode) -> (Arc<InMemoryHost>, ServerContext) {
        let host = InMemoryHost::shared('.');
        let params = ServerParameters::default().with_browse_mode(mode);
        (host.clone(), ServerContext::new(host, params))
    }

    #[test]
    fn test_state_mirrors_host() {
        let (host, ctx) = context(BrowseMode::Generic);
        assert_eq!(ctx.server_state(), ServerState::Unknown);
        ctx.set_server_state(ServerState::NoConfig).unwrap();
        ctx.set_server_state(ServerState::Running).unwrap();
        assert_eq!(ctx.server_state(), ServerState::Running);
        assert_eq!(host.server_state(), ServerState::Running);
    }

    #[test]
    fn test_add_and_remove_item() {
        let (host, ctx) = context(BrowseMode::Custom);
        let handle = ctx
            .add_item(ItemDefinition::new("Plant.Tank.Level", AccessRights::Readable, Value::Int32(3)))
            .unwrap();
        assert_eq!(ctx.item_count(), 1);
        assert_eq!(ctx.item_name(handle).as_deref(), Some("Plant.Tank.Level"));
        assert_eq!(host.catalog().find("Plant.Tank.Level"), Some(handle));

        ctx.remove_item(handle).unwrap();
        assert_eq!(ctx.item_count(), 0);
        assert_eq!(ctx.items_added(), 1);
        assert!(ctx.item_name(handle).is_none());
    }

    #[test]
    fn test_soft_removed_item_keeps_properties_while_referenced() {
        let (host, ctx) = context(BrowseMode::Custom);
        let handle = ctx
            .add_analog_item("Tank.Level", AccessRights::ReadWritable, Value::UInt8(5), 1.0, 9.5)
            .unwrap();
        let client = host.connect_client("hmi");
        let group = host.add_group(client, "fast", 100).unwrap();
        host.add_group_item(group, handle).unwrap();

        ctx.remove_item(handle).unwrap();
        assert_eq!(ctx.item_count(), 0);
        assert!(ctx.item_name(handle).is_none());
        assert!(host.catalog().read(handle).is_ok());
        assert_eq!(
            ctx.query_properties(handle).unwrap(),
            vec![PropertyId::HIGH_EU, PropertyId::LOW_EU]
        );
        assert_eq!(
            ctx.get_property_value(handle, PropertyId::LOW_EU).unwrap(),
            Value::Float64(1.0)
        );

        host.remove_group(group).unwrap();
        let err = ctx.query_properties(handle).unwrap_err();
        assert_eq!(err.status(), Status::NotApplicable);
        assert!(ctx
            .get_property_value(handle, PropertyId::LOW_EU)
            .is_err());
    }

    #[test]
    fn test_invalid_item_not_sent_to_host() {
        let (host, ctx) = context(BrowseMode::Generic);
        let err = ctx
            .add_item(ItemDefinition::new("Bad..Name", AccessRights::Readable, Value::Int32(0)))
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
        assert!(host.catalog().is_empty());
    }

    #[test]
    fn test_analog_properties() {
        let (_host, ctx) = context(BrowseMode::Generic);
        let handle = ctx
            .add_analog_item("Tank.Level", AccessRights::ReadWritable, Value::UInt8(5), 1.0, 9.5)
            .unwrap();
        assert_eq!(
            ctx.query_properties(handle).unwrap(),
            vec![PropertyId::HIGH_EU, PropertyId::LOW_EU]
        );
        assert_eq!(
            ctx.get_property_value(handle, PropertyId::HIGH_EU).unwrap(),
            Value::Float64(9.5)
        );
        assert_eq!(
            ctx.get_property_value(handle, PropertyId::new(6000))
                .unwrap_err()
                .status(),
            Status::NotApplicable
        );
    }

    #[test]
    fn test_custom_browse_session() {
        let (_host, ctx) = context(BrowseMode::Custom);
        for name in ["A.B.x", "A.B.y", "A.C"] {
            ctx.add_item(ItemDefinition::new(name, AccessRights::Readable, Value::Bool(true)))
                .unwrap();
        }
        let client = ClientId::new();
        assert_eq!(
            ctx.browse_change_position(client, BrowseDirection::Down, Some("A"))
                .unwrap(),
            "A"
        );
        let branches: Vec<String> = ctx
            .browse_list_ids(client, &BrowseFilter::new(BrowseType::Branch))
            .unwrap()
            .collect();
        assert_eq!(branches, vec!["B".to_string()]);
        assert_eq!(ctx.browse_resolve_full_id(client, "C").unwrap(), "A.C");

        ctx.forget_client(&client);
        assert_eq!(ctx.browse_resolve_full_id(client, "A").unwrap(), "A");
    }

    #[test]
    fn test_generic_mode_rejects_custom_browse() {
        let (_host, ctx) = context(BrowseMode::Generic);
        let err = ctx
            .browse_list_ids(ClientId::new(), &BrowseFilter::new(BrowseType::Flat))
            .unwrap_err();
        assert_eq!(err.status(), Status::NotSupported);
    }
}
