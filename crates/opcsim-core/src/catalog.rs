// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Device item catalog and value cache.
//!
//! The catalog owns every device item registered through the gateway. Items
//! are addressed by an opaque [`ItemHandle`] and indexed by their fully
//! qualified name. Each item keeps its cached `(value, quality, timestamp)`
//! triple behind its own lock so a reader never observes a half-applied
//! update.
//!
//! # Removal
//!
//! - [`ItemCatalog::remove_item`] is a soft remove: the name leaves the
//!   namespace, but the record stays resolvable by handle while a client
//!   group still references it.
//! - [`ItemCatalog::delete_item`] frees the record and is refused while any
//!   group references it.
//!
//! # Examples
//!
//! ```
//! use chrono::Utc;
//! use opcsim_core::catalog::{ItemCatalog, ItemDefinition};
//! use opcsim_core::quality::Quality;
//! use opcsim_core::types::{AccessRights, Value};
//!
//! let catalog = ItemCatalog::new('.');
//! let handle = catalog
//!     .add_item(ItemDefinition::new("Plant.Temp", AccessRights::Readable, Value::Float64(20.0)))
//!     .unwrap();
//!
//! catalog
//!     .set_item_value(handle, Some(Value::Float64(21.5)), Quality::GOOD, Utc::now())
//!     .unwrap();
//! assert_eq!(catalog.read(handle).unwrap().value, Value::Float64(21.5));
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::browse::{split_name, LeafInfo, Namespace};
use crate::error::{OpcError, OpcResult};
use crate::quality::Quality;
use crate::types::{
    AccessRights, CanonicalType, EuInfo, HandleAllocator, ItemHandle, PropertyId, Value,
};

// =============================================================================
// Item Definition
// =============================================================================

/// Everything needed to create a device item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Fully qualified name.
    pub name: String,
    /// Client access rights.
    pub access_rights: AccessRights,
    /// Initial value; fixes the canonical type.
    pub initial_value: Value,
    /// Whether the item is active.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Engineering unit information.
    #[serde(default)]
    pub eu_info: EuInfo,
    /// Custom property values attached to the item.
    #[serde(default)]
    pub properties: Vec<(PropertyId, Value)>,
}

fn default_active() -> bool {
    true
}

impl ItemDefinition {
    /// Creates an active item definition without engineering units.
    pub fn new(name: impl Into<String>, access_rights: AccessRights, initial_value: Value) -> Self {
        Self {
            name: name.into(),
            access_rights,
            initial_value,
            active: true,
            eu_info: EuInfo::None,
            properties: Vec::new(),
        }
    }

    /// Creates an analog item definition with a `[low, high]` range.
    pub fn analog(
        name: impl Into<String>,
        access_rights: AccessRights,
        initial_value: Value,
        low: f64,
        high: f64,
    ) -> Self {
        Self::new(name, access_rights, initial_value).with_eu_info(EuInfo::Analog { low, high })
    }

    /// Sets the engineering unit information.
    pub fn with_eu_info(mut self, eu_info: EuInfo) -> Self {
        self.eu_info = eu_info;
        self
    }

    /// Sets the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Attaches a custom property value.
    pub fn with_property(mut self, id: PropertyId, value: impl Into<Value>) -> Self {
        self.properties.push((id, value.into()));
        self
    }

    /// Validates the definition and returns its canonical type.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty or malformed name, a value
    /// without a canonical type, or an inverted analog range.
    pub fn validate(&self, delimiter: char) -> OpcResult<CanonicalType> {
        split_name(&self.name, delimiter)?;
        let canonical_type = self.initial_value.canonical_type().ok_or_else(|| {
            OpcError::invalid_argument(
                "initial_value",
                format!("'{}' has no canonical type", self.initial_value),
            )
        })?;
        if let EuInfo::Analog { low, high } = self.eu_info {
            if !(low <= high) {
                return Err(OpcError::invalid_argument(
                    "eu_info",
                    format!("low limit {} exceeds high limit {}", low, high),
                ));
            }
        }
        Ok(canonical_type)
    }
}

// =============================================================================
// Properties
// =============================================================================

/// Definition of a vendor specific property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Property id (5000 and above).
    pub id: PropertyId,
    /// Human readable description.
    pub description: String,
    /// Default value; fixes the property's data type.
    pub default_value: Value,
}

/// Properties of one item that are answered outside the standard set.
///
/// This covers the analog limits and any custom property values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySet {
    eu_info: EuInfo,
    custom: BTreeMap<PropertyId, Value>,
}

impl PropertySet {
    /// Builds the property set of an item definition.
    pub fn from_definition(definition: &ItemDefinition) -> Self {
        Self {
            eu_info: definition.eu_info.clone(),
            custom: definition.properties.iter().cloned().collect(),
        }
    }

    /// Returns the property ids, analog limits first.
    pub fn ids(&self) -> Vec<PropertyId> {
        let mut ids = Vec::with_capacity(self.custom.len() + 2);
        if matches!(self.eu_info, EuInfo::Analog { .. }) {
            ids.push(PropertyId::HIGH_EU);
            ids.push(PropertyId::LOW_EU);
        }
        ids.extend(self.custom.keys().copied());
        ids
    }

    /// Returns the value of a property in the set.
    pub fn value(&self, id: PropertyId) -> Option<Value> {
        match (&self.eu_info, id) {
            (EuInfo::Analog { high, .. }, PropertyId::HIGH_EU) => Some(Value::Float64(*high)),
            (EuInfo::Analog { low, .. }, PropertyId::LOW_EU) => Some(Value::Float64(*low)),
            _ => self.custom.get(&id).cloned(),
        }
    }

    /// Returns `true` if the set has no properties.
    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }
}

// =============================================================================
// Device Item
// =============================================================================

/// Cached value, quality and timestamp of an item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemState {
    /// Current value.
    pub value: Value,
    /// Current quality.
    pub quality: Quality,
    /// Time of the last update.
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ItemLinks {
    group_refs: usize,
    removed: bool,
}

/// A device item record.
#[derive(Debug)]
pub struct DeviceItem {
    handle: ItemHandle,
    name: String,
    access_rights: AccessRights,
    canonical_type: CanonicalType,
    active: bool,
    properties: PropertySet,
    state: RwLock<ItemState>,
    links: Mutex<ItemLinks>,
}

impl DeviceItem {
    /// Returns the item handle.
    pub fn handle(&self) -> ItemHandle {
        self.handle
    }

    /// Returns the fully qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the access rights.
    pub fn access_rights(&self) -> AccessRights {
        self.access_rights
    }

    /// Returns the canonical type.
    pub fn canonical_type(&self) -> CanonicalType {
        self.canonical_type
    }

    /// Returns the engineering unit information.
    pub fn eu_info(&self) -> &EuInfo {
        &self.properties.eu_info
    }

    /// Returns a consistent copy of the cached state.
    pub fn state(&self) -> ItemState {
        self.state.read().clone()
    }

    /// Returns `true` once the item has been soft removed.
    pub fn is_removed(&self) -> bool {
        self.links.lock().removed
    }

    /// Returns the number of groups referencing the item.
    pub fn group_refs(&self) -> usize {
        self.links.lock().group_refs
    }

    fn leaf_info(&self) -> LeafInfo {
        LeafInfo::new(self.handle, self.canonical_type, self.access_rights)
    }
}

/// Point-in-time view of an item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSnapshot {
    /// Item handle.
    pub handle: ItemHandle,
    /// Fully qualified name.
    pub name: String,
    /// Access rights.
    pub access_rights: AccessRights,
    /// Canonical type.
    pub canonical_type: CanonicalType,
    /// Engineering unit information.
    pub eu_info: EuInfo,
    /// Whether the item is active.
    pub active: bool,
    /// Whether the item has been soft removed.
    pub removed: bool,
    /// Cached value.
    pub value: Value,
    /// Cached quality.
    pub quality: Quality,
    /// Cached timestamp.
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Catalog Metrics
// =============================================================================

/// Counters of catalog activity.
#[derive(Debug, Default)]
pub struct CatalogMetrics {
    items_added: AtomicU64,
    items_removed: AtomicU64,
    items_deleted: AtomicU64,
    updates_applied: AtomicU64,
    updates_rejected: AtomicU64,
}

impl CatalogMetrics {
    /// Returns a snapshot of the counters.
    pub fn snapshot(&self) -> CatalogMetricsSnapshot {
        CatalogMetricsSnapshot {
            items_added: self.items_added.load(Ordering::Relaxed),
            items_removed: self.items_removed.load(Ordering::Relaxed),
            items_deleted: self.items_deleted.load(Ordering::Relaxed),
            updates_applied: self.updates_applied.load(Ordering::Relaxed),
            updates_rejected: self.updates_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`CatalogMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogMetricsSnapshot {
    /// Items created.
    pub items_added: u64,
    /// Items soft removed.
    pub items_removed: u64,
    /// Items freed.
    pub items_deleted: u64,
    /// Accepted value updates.
    pub updates_applied: u64,
    /// Rejected value updates.
    pub updates_rejected: u64,
}

// =============================================================================
// Item Catalog
// =============================================================================

/// Registry of device items and custom property definitions.
#[derive(Debug)]
pub struct ItemCatalog {
    delimiter: char,
    handles: HandleAllocator,
    items: DashMap<ItemHandle, Arc<DeviceItem>>,
    names: DashMap<String, ItemHandle>,
    namespace: RwLock<Namespace>,
    properties: RwLock<BTreeMap<PropertyId, PropertyDefinition>>,
    metrics: CatalogMetrics,
}

impl ItemCatalog {
    /// Creates an empty catalog using `delimiter` between name segments.
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            handles: HandleAllocator::new(),
            items: DashMap::new(),
            names: DashMap::new(),
            namespace: RwLock::new(Namespace::new(delimiter)),
            properties: RwLock::new(BTreeMap::new()),
            metrics: CatalogMetrics::default(),
        }
    }

    /// Returns the branch delimiter.
    #[inline]
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Adds an item and returns its handle.
    ///
    /// The initial value is cached with uncertain quality until the first
    /// update.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the definition is malformed or references an
    ///   unregistered property, or a property value has the wrong type
    /// - `Conflict` if a live item already has the same name
    pub fn add_item(&self, definition: ItemDefinition) -> OpcResult<ItemHandle> {
        let canonical_type = definition.validate(self.delimiter)?;
        self.check_item_properties(&definition)?;

        let handle = match self.names.entry(definition.name.clone()) {
            Entry::Occupied(_) => return Err(OpcError::conflict("item", &definition.name)),
            Entry::Vacant(slot) => {
                let handle = self.handles.allocate();
                let item = Arc::new(DeviceItem {
                    handle,
                    name: definition.name.clone(),
                    access_rights: definition.access_rights,
                    canonical_type,
                    active: definition.active,
                    properties: PropertySet::from_definition(&definition),
                    state: RwLock::new(ItemState {
                        value: definition.initial_value,
                        quality: Quality::UNCERTAIN,
                        timestamp: Utc::now(),
                    }),
                    links: Mutex::new(ItemLinks::default()),
                });
                self.namespace.write().insert(&item.name, item.leaf_info())?;
                self.items.insert(handle, item);
                slot.insert(handle);
                handle
            }
        };

        self.metrics.items_added.fetch_add(1, Ordering::Relaxed);
        trace!(%handle, name = %definition.name, %canonical_type, "Item added");
        Ok(handle)
    }

    /// Adds an analog item with a `[low, high]` engineering unit range.
    pub fn add_analog_item(
        &self,
        name: impl Into<String>,
        access_rights: AccessRights,
        initial_value: Value,
        low: f64,
        high: f64,
    ) -> OpcResult<ItemHandle> {
        self.add_item(ItemDefinition::analog(name, access_rights, initial_value, low, high))
    }

    fn check_item_properties(&self, definition: &ItemDefinition) -> OpcResult<()> {
        let registered = self.properties.read();
        for (id, value) in &definition.properties {
            let property = registered.get(id).ok_or_else(|| {
                OpcError::invalid_argument("property", format!("property {} is not registered", id))
            })?;
            if value.canonical_type() != property.default_value.canonical_type() {
                return Err(OpcError::invalid_argument(
                    "property",
                    format!("value of property {} has the wrong type", id),
                ));
            }
        }
        Ok(())
    }

    /// Soft removes an item.
    ///
    /// The item leaves the namespace immediately. If no group references it,
    /// the record is freed as well; otherwise it stays resolvable by handle
    /// until the last group reference is released.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown or already removed handle.
    pub fn remove_item(&self, handle: ItemHandle) -> OpcResult<()> {
        let item = self.get(handle)?;
        let free_now = {
            let mut links = item.links.lock();
            if links.removed {
                return Err(OpcError::not_found("item", handle));
            }
            links.removed = true;
            links.group_refs == 0
        };

        self.unlink_name(&item);
        if free_now {
            self.items.remove(&handle);
        }
        self.metrics.items_removed.fetch_add(1, Ordering::Relaxed);
        debug!(%handle, name = %item.name, retained = !free_now, "Item removed");
        Ok(())
    }

    /// Frees an item.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown handle
    /// - `PreconditionFailed` while a group still references the item
    pub fn delete_item(&self, handle: ItemHandle) -> OpcResult<()> {
        let item = self.get(handle)?;
        {
            let mut links = item.links.lock();
            if links.group_refs > 0 {
                return Err(OpcError::precondition_failed(format!(
                    "{} is referenced by {} group(s)",
                    item.name, links.group_refs
                )));
            }
            links.removed = true;
        }

        self.unlink_name(&item);
        self.items.remove(&handle);
        self.metrics.items_deleted.fetch_add(1, Ordering::Relaxed);
        debug!(%handle, name = %item.name, "Item deleted");
        Ok(())
    }

    fn unlink_name(&self, item: &DeviceItem) {
        self.names
            .remove_if(&item.name, |_, registered| *registered == item.handle);
        let mut namespace = self.namespace.write();
        if namespace.leaf(&item.name).map(|l| l.handle) == Some(item.handle) {
            namespace.remove(&item.name);
        }
    }

    /// Records that a client group references an item.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown or removed handle.
    pub fn add_group_reference(&self, handle: ItemHandle) -> OpcResult<()> {
        let item = self.get(handle)?;
        let mut links = item.links.lock();
        if links.removed {
            return Err(OpcError::not_found("item", handle));
        }
        links.group_refs += 1;
        Ok(())
    }

    /// Releases a group reference; frees a removed item on the last release.
    pub fn release_group_reference(&self, handle: ItemHandle) -> OpcResult<()> {
        let item = self.get(handle)?;
        let free_now = {
            let mut links = item.links.lock();
            if links.group_refs == 0 {
                return Err(OpcError::precondition_failed(format!(
                    "{} has no group references",
                    item.name
                )));
            }
            links.group_refs -= 1;
            links.removed && links.group_refs == 0
        };
        if free_now {
            self.items.remove(&handle);
            trace!(%handle, "Removed item released by its last group");
        }
        Ok(())
    }

    /// Registers a vendor specific property.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for ids in the reserved range `0..=4999` or a
    ///   default value without a canonical type
    /// - `Conflict` if the id is already registered
    pub fn add_property(
        &self,
        id: PropertyId,
        description: impl Into<String>,
        default_value: Value,
    ) -> OpcResult<()> {
        if id.is_reserved() {
            return Err(OpcError::invalid_argument(
                "property_id",
                format!("{} is reserved for standard properties", id),
            ));
        }
        if default_value.canonical_type().is_none() {
            return Err(OpcError::invalid_argument(
                "default_value",
                "property value has no canonical type",
            ));
        }

        let mut properties = self.properties.write();
        if properties.contains_key(&id) {
            return Err(OpcError::conflict("property", id));
        }
        let description = description.into();
        debug!(property_id = %id, description = %description, "Property registered");
        properties.insert(
            id,
            PropertyDefinition {
                id,
                description,
                default_value,
            },
        );
        Ok(())
    }

    /// Returns the definition of a registered property.
    pub fn property_definition(&self, id: PropertyId) -> Option<PropertyDefinition> {
        self.properties.read().get(&id).cloned()
    }

    /// Updates the cached value, quality and timestamp of an item.
    ///
    /// Passing `None` as value keeps the cached value and updates only the
    /// quality and timestamp. The three fields change as one unit.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown handle
    /// - `InvalidArgument` if the value does not match the canonical type
    pub fn set_item_value(
        &self,
        handle: ItemHandle,
        value: Option<Value>,
        quality: Quality,
        timestamp: DateTime<Utc>,
    ) -> OpcResult<()> {
        let item = self.get(handle)?;
        if let Some(value) = &value {
            if !value.conforms_to(item.canonical_type) {
                self.metrics.updates_rejected.fetch_add(1, Ordering::Relaxed);
                return Err(OpcError::invalid_argument(
                    "value",
                    format!(
                        "{} expects {}, got {:?}",
                        item.name,
                        item.canonical_type,
                        value.canonical_type()
                    ),
                ));
            }
        }

        {
            let mut state = item.state.write();
            if let Some(value) = value {
                state.value = value;
            }
            state.quality = quality;
            state.timestamp = timestamp;
        }
        self.metrics.updates_applied.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the item record for a handle.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown handle.
    pub fn get(&self, handle: ItemHandle) -> OpcResult<Arc<DeviceItem>> {
        self.items
            .get(&handle)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| OpcError::not_found("item", handle))
    }

    /// Returns a consistent snapshot of an item.
    pub fn read(&self, handle: ItemHandle) -> OpcResult<ItemSnapshot> {
        let item = self.get(handle)?;
        let state = item.state();
        Ok(ItemSnapshot {
            handle,
            name: item.name.clone(),
            access_rights: item.access_rights,
            canonical_type: item.canonical_type,
            eu_info: item.properties.eu_info.clone(),
            active: item.active,
            removed: item.is_removed(),
            value: state.value,
            quality: state.quality,
            timestamp: state.timestamp,
        })
    }

    /// Looks up a live item by its fully qualified name.
    pub fn find(&self, name: &str) -> Option<ItemHandle> {
        self.names.get(name).map(|entry| *entry.value())
    }

    /// Returns the handles of live, active items.
    pub fn active_items(&self) -> Vec<ItemHandle> {
        let mut handles: Vec<ItemHandle> = self
            .items
            .iter()
            .filter(|entry| entry.value().active && !entry.value().is_removed())
            .map(|entry| *entry.key())
            .collect();
        handles.sort();
        handles
    }

    /// Returns the number of live items.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if there are no live items.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the ids of the properties answered for an item beyond the
    /// standard set.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown handle
    /// - `NotApplicable` if the item has no such properties
    pub fn query_properties(&self, handle: ItemHandle) -> OpcResult<Vec<PropertyId>> {
        let item = self.get(handle)?;
        let ids = item.properties.ids();
        if ids.is_empty() {
            return Err(OpcError::not_applicable(format!(
                "{} has no custom properties",
                item.name
            )));
        }
        Ok(ids)
    }

    /// Returns the value of a property of an item.
    ///
    /// Standard properties 1 to 5, 7 and 8 are derived from the item record;
    /// analog limits and custom properties come from the item's property set.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown handle
    /// - `NotApplicable` if the id does not apply to the item
    pub fn get_property_value(&self, handle: ItemHandle, id: PropertyId) -> OpcResult<Value> {
        let item = self.get(handle)?;
        let value = match id {
            PropertyId::CANONICAL_TYPE => Some(Value::Int16(item.canonical_type.variant_code() as i16)),
            PropertyId::VALUE => Some(item.state.read().value.clone()),
            PropertyId::QUALITY => Some(Value::Int16(item.state.read().quality.encode() as i16)),
            PropertyId::TIMESTAMP => Some(Value::Date(item.state.read().timestamp)),
            PropertyId::ACCESS_RIGHTS => Some(Value::Int32(i32::from(item.access_rights.bits()))),
            PropertyId::EU_TYPE => Some(Value::Int32(item.properties.eu_info.eu_type() as i32)),
            PropertyId::EU_INFO => match &item.properties.eu_info {
                EuInfo::Enumerated { labels } => Some(Value::from(labels.clone())),
                _ => None,
            },
            other => item.properties.value(other),
        };
        value.ok_or_else(|| {
            OpcError::not_applicable(format!("property {} does not apply to {}", id, item.name))
        })
    }

    /// Returns a read guard on the catalog's namespace.
    pub fn namespace(&self) -> RwLockReadGuard<'_, Namespace> {
        self.namespace.read()
    }

    /// Returns the catalog metrics.
    pub fn metrics(&self) -> &CatalogMetrics {
        &self.metrics
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use crate::quality::{LimitBits, QualityBits};
    use crate::types::TypeKind;

    fn catalog_with(name: &str, value: Value) -> (ItemCatalog, ItemHandle) {
        let catalog = ItemCatalog::new('.');
        let handle = catalog
            .add_item(ItemDefinition::new(name, AccessRights::ReadWritable, value))
            .unwrap();
        (catalog, handle)
    }

    #[test]
    fn test_add_item_then_read_returns_initial_value() {
        let (catalog, handle) = catalog_with("CTT.SimpleTypes.In.Integer", Value::Int32(20196));
        let snapshot = catalog.read(handle).unwrap();
        assert_eq!(snapshot.value, Value::Int32(20196));
        assert_eq!(snapshot.quality, Quality::UNCERTAIN);
        assert_eq!(snapshot.canonical_type, CanonicalType::scalar(TypeKind::Int32));
        assert_eq!(catalog.find("CTT.SimpleTypes.In.Integer"), Some(handle));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_add_item_rejects_bad_names() {
        let catalog = ItemCatalog::new('.');
        let err = catalog
            .add_item(ItemDefinition::new("", AccessRights::Readable, Value::Bool(true)))
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);

        let err = catalog
            .add_item(ItemDefinition::new("A..B", AccessRights::Readable, Value::Bool(true)))
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
    }

    #[test]
    fn test_add_item_rejects_duplicates() {
        let (catalog, _) = catalog_with("A.B", Value::Bool(true));
        let err = catalog
            .add_item(ItemDefinition::new("A.B", AccessRights::Readable, Value::Bool(false)))
            .unwrap_err();
        assert_eq!(err.status(), Status::Conflict);
    }

    #[test]
    fn test_add_analog_item_validates_range() {
        let catalog = ItemCatalog::new('.');
        let handle = catalog
            .add_analog_item("EU", AccessRights::ReadWritable, Value::UInt8(89), 40.86, 92.67)
            .unwrap();
        assert_eq!(
            catalog.read(handle).unwrap().eu_info,
            EuInfo::Analog {
                low: 40.86,
                high: 92.67
            }
        );
        assert_eq!(
            catalog.query_properties(handle).unwrap(),
            vec![PropertyId::HIGH_EU, PropertyId::LOW_EU]
        );
        assert_eq!(
            catalog.get_property_value(handle, PropertyId::LOW_EU).unwrap(),
            Value::Float64(40.86)
        );

        let err = catalog
            .add_analog_item("EU2", AccessRights::Readable, Value::UInt8(1), 5.0, 1.0)
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
    }

    #[test]
    fn test_set_item_value_is_whole_record() {
        let (catalog, handle) = catalog_with("Sim.Ramp", Value::Int32(0));
        let t1 = Utc::now();
        catalog
            .set_item_value(handle, Some(Value::Int32(5)), Quality::GOOD, t1)
            .unwrap();
        let bad = Quality::new(QualityBits::BadCommFailure, LimitBits::None, 0);
        let t2 = Utc::now();
        catalog.set_item_value(handle, None, bad, t2).unwrap();

        let snapshot = catalog.read(handle).unwrap();
        assert_eq!(snapshot.value, Value::Int32(5));
        assert_eq!(snapshot.quality, bad);
        assert!(snapshot.timestamp >= t1);
    }

    #[test]
    fn test_set_item_value_rejects_wrong_type() {
        let (catalog, handle) = catalog_with("Sim.Ramp", Value::Int32(0));
        let err = catalog
            .set_item_value(handle, Some(Value::Float64(1.0)), Quality::GOOD, Utc::now())
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
        assert_eq!(catalog.metrics().snapshot().updates_rejected, 1);
        assert_eq!(catalog.read(handle).unwrap().value, Value::Int32(0));
    }

    #[test]
    fn test_delete_referenced_item_fails() {
        let (catalog, handle) = catalog_with("A.B", Value::Bool(true));
        catalog.add_group_reference(handle).unwrap();
        let err = catalog.delete_item(handle).unwrap_err();
        assert_eq!(err.status(), Status::PreconditionFailed);

        catalog.release_group_reference(handle).unwrap();
        catalog.delete_item(handle).unwrap();
        assert!(catalog.get(handle).is_err());
    }

    #[test]
    fn test_remove_referenced_item_stays_resolvable() {
        let (catalog, handle) = catalog_with("A.B", Value::Bool(true));
        catalog.add_group_reference(handle).unwrap();
        catalog.remove_item(handle).unwrap();

        assert!(catalog.find("A.B").is_none());
        assert!(catalog.namespace().leaf("A.B").is_none());
        let snapshot = catalog.read(handle).unwrap();
        assert!(snapshot.removed);

        // the name can be reused by a new item
        let fresh = catalog
            .add_item(ItemDefinition::new("A.B", AccessRights::Readable, Value::Bool(false)))
            .unwrap();
        assert_ne!(fresh, handle);

        catalog.release_group_reference(handle).unwrap();
        assert!(catalog.get(handle).is_err());
        assert!(catalog.get(fresh).is_ok());
    }

    #[test]
    fn test_remove_unreferenced_item_frees_it() {
        let (catalog, handle) = catalog_with("A.B", Value::Bool(true));
        catalog.remove_item(handle).unwrap();
        assert!(catalog.get(handle).is_err());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_add_property_rejects_reserved_and_duplicate() {
        let catalog = ItemCatalog::new('.');
        let err = catalog
            .add_property(PropertyId::new(4999), "x", Value::Float64(0.0))
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);

        catalog
            .add_property(PropertyId::new(5650), "Casing Material", Value::from("Aluminum"))
            .unwrap();
        let err = catalog
            .add_property(PropertyId::new(5650), "again", Value::from("x"))
            .unwrap_err();
        assert_eq!(err.status(), Status::Conflict);
    }

    #[test]
    fn test_custom_properties() {
        let catalog = ItemCatalog::new('.');
        let material = PropertyId::new(5650);
        catalog
            .add_property(material, "Casing Material", Value::from("Aluminum"))
            .unwrap();

        let handle = catalog
            .add_item(
                ItemDefinition::new("Special", AccessRights::ReadWritable, Value::UInt8(111))
                    .with_property(material, "Steel"),
            )
            .unwrap();
        assert_eq!(catalog.query_properties(handle).unwrap(), vec![material]);
        assert_eq!(
            catalog.get_property_value(handle, material).unwrap(),
            Value::from("Steel")
        );

        let err = catalog
            .get_property_value(handle, PropertyId::new(5651))
            .unwrap_err();
        assert_eq!(err.status(), Status::NotApplicable);

        let unregistered = catalog
            .add_item(
                ItemDefinition::new("Other", AccessRights::Readable, Value::UInt8(1))
                    .with_property(PropertyId::new(6000), 1u8),
            )
            .unwrap_err();
        assert_eq!(unregistered.status(), Status::InvalidArgument);
    }

    #[test]
    fn test_query_properties_without_custom_is_not_applicable() {
        let (catalog, handle) = catalog_with("A", Value::Bool(true));
        let err = catalog.query_properties(handle).unwrap_err();
        assert_eq!(err.status(), Status::NotApplicable);
    }

    #[test]
    fn test_standard_properties() {
        let (catalog, handle) = catalog_with("A", Value::Int32(3));
        assert_eq!(
            catalog
                .get_property_value(handle, PropertyId::CANONICAL_TYPE)
                .unwrap(),
            Value::Int16(3)
        );
        assert_eq!(
            catalog.get_property_value(handle, PropertyId::VALUE).unwrap(),
            Value::Int32(3)
        );
        assert_eq!(
            catalog
                .get_property_value(handle, PropertyId::ACCESS_RIGHTS)
                .unwrap(),
            Value::Int32(3)
        );
    }

    #[test]
    fn test_active_items() {
        let catalog = ItemCatalog::new('.');
        let a = catalog
            .add_item(ItemDefinition::new("A", AccessRights::Readable, Value::Bool(true)))
            .unwrap();
        catalog
            .add_item(
                ItemDefinition::new("B", AccessRights::Readable, Value::Bool(true))
                    .with_active(false),
            )
            .unwrap();
        assert_eq!(catalog.active_items(), vec![a]);
    }

    #[test]
    fn test_concurrent_updates_are_consistent() {
        use std::thread;

        let (catalog, handle) = catalog_with("Sim.Value", Value::Int32(0));
        let catalog = Arc::new(catalog);

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let catalog = Arc::clone(&catalog);
                thread::spawn(move || {
                    for i in 0..500 {
                        // the vendor byte mirrors the value so readers can check pairing
                        let v = (w * 1000 + i) as i32;
                        let q = Quality::GOOD.with_vendor((v % 256) as u8);
                        catalog
                            .set_item_value(handle, Some(Value::Int32(v)), q, Utc::now())
                            .unwrap();
                    }
                })
            })
            .collect();

        for _ in 0..2000 {
            let snapshot = catalog.read(handle).unwrap();
            let v = snapshot.value.as_i64().unwrap();
            if v != 0 {
                assert_eq!(i64::from(snapshot.quality.vendor), v % 256);
            }
        }
        for writer in writers {
            writer.join().unwrap();
        }
    }
}
