// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for the server plugin.
//!
//! This module provides the identifiers, the closed value type and the small
//! enumerations shared by the catalog, the event space and the gateway.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque handle of a device item.
///
/// Handles are allocated by the item catalog and never reused for the
/// lifetime of the server.
///
/// # Examples
///
/// ```
/// use opcsim_core::types::ItemHandle;
///
/// let handle = ItemHandle::new(42);
/// assert_eq!(handle.get(), 42);
/// assert_eq!(handle.to_string(), "item#42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemHandle(u64);

impl ItemHandle {
    /// Creates a handle from its raw value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[inline]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Monotonic allocator for item handles.
#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU64,
}

impl HandleAllocator {
    /// Creates an allocator whose first handle is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocates the next handle.
    #[inline]
    pub fn allocate(&self) -> ItemHandle {
        ItemHandle(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of an item property.
///
/// Ids `0..=4999` are reserved for standard properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(u32);

impl PropertyId {
    /// Canonical data type of the item.
    pub const CANONICAL_TYPE: PropertyId = PropertyId(1);
    /// Current value.
    pub const VALUE: PropertyId = PropertyId(2);
    /// Current quality.
    pub const QUALITY: PropertyId = PropertyId(3);
    /// Timestamp of the current value.
    pub const TIMESTAMP: PropertyId = PropertyId(4);
    /// Access rights.
    pub const ACCESS_RIGHTS: PropertyId = PropertyId(5);
    /// Engineering unit type.
    pub const EU_TYPE: PropertyId = PropertyId(7);
    /// Engineering unit information (enumeration labels).
    pub const EU_INFO: PropertyId = PropertyId(8);
    /// Upper limit of an analog item.
    pub const HIGH_EU: PropertyId = PropertyId(102);
    /// Lower limit of an analog item.
    pub const LOW_EU: PropertyId = PropertyId(103);

    /// Highest id reserved for standard properties.
    pub const LAST_RESERVED: u32 = 4999;

    /// Creates a property id.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns `true` if the id lies in the reserved range.
    #[inline]
    pub const fn is_reserved(&self) -> bool {
        self.0 <= Self::LAST_RESERVED
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a connected client, assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Creates a random client id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[inline]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ClientId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Handle of a client group, assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupHandle(u64);

impl GroupHandle {
    /// Creates a group handle.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[inline]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GroupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

// =============================================================================
// Canonical Types
// =============================================================================

/// Scalar kind of a canonical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// No value.
    Empty,
    /// Boolean.
    Bool,
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// Fixed point currency.
    Currency,
    /// Date and time.
    Date,
    /// UTF-8 string.
    String,
}

impl TypeKind {
    /// Returns the type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Empty => "empty",
            TypeKind::Bool => "bool",
            TypeKind::Int8 => "int8",
            TypeKind::UInt8 => "uint8",
            TypeKind::Int16 => "int16",
            TypeKind::UInt16 => "uint16",
            TypeKind::Int32 => "int32",
            TypeKind::UInt32 => "uint32",
            TypeKind::Int64 => "int64",
            TypeKind::UInt64 => "uint64",
            TypeKind::Float32 => "float32",
            TypeKind::Float64 => "float64",
            TypeKind::Currency => "currency",
            TypeKind::Date => "date",
            TypeKind::String => "string",
        }
    }

    /// Returns the VARIANT type code of this kind.
    pub fn variant_code(&self) -> u16 {
        match self {
            TypeKind::Empty => 0,
            TypeKind::Int16 => 2,
            TypeKind::Int32 => 3,
            TypeKind::Float32 => 4,
            TypeKind::Float64 => 5,
            TypeKind::Currency => 6,
            TypeKind::Date => 7,
            TypeKind::String => 8,
            TypeKind::Bool => 11,
            TypeKind::Int8 => 16,
            TypeKind::UInt8 => 17,
            TypeKind::UInt16 => 18,
            TypeKind::UInt32 => 19,
            TypeKind::Int64 => 20,
            TypeKind::UInt64 => 21,
        }
    }
}

/// The data type an item is stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalType {
    /// Element kind.
    pub kind: TypeKind,
    /// Whether the item holds a one-dimensional array of `kind`.
    pub is_array: bool,
}

impl CanonicalType {
    /// VARIANT flag marking an array type.
    pub const ARRAY_FLAG: u16 = 0x2000;

    /// Creates a scalar type.
    #[inline]
    pub const fn scalar(kind: TypeKind) -> Self {
        Self {
            kind,
            is_array: false,
        }
    }

    /// Creates an array type.
    #[inline]
    pub const fn array(kind: TypeKind) -> Self {
        Self {
            kind,
            is_array: true,
        }
    }

    /// Returns the VARIANT type code, including the array flag.
    pub fn variant_code(&self) -> u16 {
        let code = self.kind.variant_code();
        if self.is_array {
            code | Self::ARRAY_FLAG
        } else {
            code
        }
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array {
            write!(f, "{}[]", self.kind.as_str())
        } else {
            write!(f, "{}", self.kind.as_str())
        }
    }
}

// =============================================================================
// Value Types
// =============================================================================

/// A typed item value.
///
/// The set of variants is closed; every item's canonical type is derived
/// from one of them.
///
/// # Examples
///
/// ```
/// use opcsim_core::types::{CanonicalType, TypeKind, Value};
///
/// let value = Value::Int32(20196);
/// assert_eq!(value.canonical_type(), Some(CanonicalType::scalar(TypeKind::Int32)));
///
/// let array = Value::Array(vec![Value::Bool(false), Value::Bool(true)]);
/// assert_eq!(array.canonical_type(), Some(CanonicalType::array(TypeKind::Bool)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// No value
    Empty,

    /// Boolean value
    Bool(bool),

    /// Signed 8-bit integer
    Int8(i8),

    /// Unsigned 8-bit integer
    UInt8(u8),

    /// Signed 16-bit integer
    Int16(i16),

    /// Unsigned 16-bit integer
    UInt16(u16),

    /// Signed 32-bit integer
    Int32(i32),

    /// Unsigned 32-bit integer
    UInt32(u32),

    /// Signed 64-bit integer
    Int64(i64),

    /// Unsigned 64-bit integer
    UInt64(u64),

    /// 32-bit floating point
    Float32(f32),

    /// 64-bit floating point
    Float64(f64),

    /// Currency in ten-thousandths of a unit
    Currency(i64),

    /// Date and time
    Date(DateTime<Utc>),

    /// UTF-8 string
    String(String),

    /// One-dimensional homogeneous array
    Array(Vec<Value>),
}

impl Value {
    /// Returns the scalar kind of this value, or `None` for arrays.
    pub fn kind(&self) -> Option<TypeKind> {
        let kind = match self {
            Value::Empty => TypeKind::Empty,
            Value::Bool(_) => TypeKind::Bool,
            Value::Int8(_) => TypeKind::Int8,
            Value::UInt8(_) => TypeKind::UInt8,
            Value::Int16(_) => TypeKind::Int16,
            Value::UInt16(_) => TypeKind::UInt16,
            Value::Int32(_) => TypeKind::Int32,
            Value::UInt32(_) => TypeKind::UInt32,
            Value::Int64(_) => TypeKind::Int64,
            Value::UInt64(_) => TypeKind::UInt64,
            Value::Float32(_) => TypeKind::Float32,
            Value::Float64(_) => TypeKind::Float64,
            Value::Currency(_) => TypeKind::Currency,
            Value::Date(_) => TypeKind::Date,
            Value::String(_) => TypeKind::String,
            Value::Array(_) => return None,
        };
        Some(kind)
    }

    /// Returns the canonical type of this value.
    ///
    /// Arrays must be non-empty, homogeneous and flat; anything else has no
    /// canonical type.
    pub fn canonical_type(&self) -> Option<CanonicalType> {
        match self {
            Value::Array(elements) => {
                let kind = elements.first()?.kind()?;
                if kind == TypeKind::Empty {
                    return None;
                }
                elements
                    .iter()
                    .all(|e| e.kind() == Some(kind))
                    .then_some(CanonicalType::array(kind))
            }
            scalar => scalar.kind().map(CanonicalType::scalar),
        }
    }

    /// Returns `true` if this value can be stored in an item of type `ty`.
    pub fn conforms_to(&self, ty: CanonicalType) -> bool {
        self.canonical_type() == Some(ty)
    }

    /// Returns `true` for [`Value::Empty`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Attempts to convert this value to a boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(v) => Some(i64::from(*v)),
            Value::Int8(v) => Some(i64::from(*v)),
            Value::UInt8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::UInt16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::UInt32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            Value::Float32(v) => Some(*v as i64),
            Value::Float64(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Attempts to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Int8(v) => Some(f64::from(*v)),
            Value::UInt8(v) => Some(f64::from(*v)),
            Value::Int16(v) => Some(f64::from(*v)),
            Value::UInt16(v) => Some(f64::from(*v)),
            Value::Int32(v) => Some(f64::from(*v)),
            Value::UInt32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::UInt64(v) => Some(*v as f64),
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            Value::Currency(v) => Some(*v as f64 / 10_000.0),
            _ => None,
        }
    }

    /// Attempts to get this value as a string reference.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Attempts to get this value as an array reference.
    #[inline]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Converts an OLE automation date (days since 1899-12-30) to a value.
    ///
    /// ```
    /// use opcsim_core::types::Value;
    ///
    /// // 2.5 is noon, January 1, 1900
    /// let value = Value::from_ole_date(2.5);
    /// assert_eq!(value.to_string(), "1900-01-01T12:00:00+00:00");
    /// ```
    pub fn from_ole_date(days: f64) -> Self {
        let epoch = Utc
            .with_ymd_and_hms(1899, 12, 30, 0, 0, 0)
            .single()
            .unwrap_or_default();
        let millis = (days * 86_400_000.0).round() as i64;
        Value::Date(epoch + Duration::milliseconds(millis))
    }

    /// Converts this value to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Empty => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Int8(v) => serde_json::json!(*v),
            Value::UInt8(v) => serde_json::json!(*v),
            Value::Int16(v) => serde_json::json!(*v),
            Value::UInt16(v) => serde_json::json!(*v),
            Value::Int32(v) => serde_json::json!(*v),
            Value::UInt32(v) => serde_json::json!(*v),
            Value::Int64(v) => serde_json::json!(*v),
            Value::UInt64(v) => serde_json::json!(*v),
            Value::Float32(v) => serde_json::json!(*v),
            Value::Float64(v) => serde_json::json!(*v),
            Value::Currency(v) => serde_json::json!(*v as f64 / 10_000.0),
            Value::Date(v) => serde_json::json!(v.to_rfc3339()),
            Value::String(v) => serde_json::Value::String(v.clone()),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(|v| v.to_json()).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => write!(f, "empty"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Currency(v) => write!(f, "{:.4}", *v as f64 / 10_000.0),
            Value::Date(v) => write!(f, "{}", v.to_rfc3339()),
            Value::String(v) => write!(f, "{}", v),
            Value::Array(v) => write!(f, "[{} elements]", v.len()),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Empty
    }
}

// Implement From for common types
macro_rules! impl_from_for_value {
    ($variant:ident, $type:ty) => {
        impl From<$type> for Value {
            fn from(v: $type) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_from_for_value!(Bool, bool);
impl_from_for_value!(Int8, i8);
impl_from_for_value!(UInt8, u8);
impl_from_for_value!(Int16, i16);
impl_from_for_value!(UInt16, u16);
impl_from_for_value!(Int32, i32);
impl_from_for_value!(UInt32, u32);
impl_from_for_value!(Int64, i64);
impl_from_for_value!(UInt64, u64);
impl_from_for_value!(Float32, f32);
impl_from_for_value!(Float64, f64);
impl_from_for_value!(String, String);
impl_from_for_value!(Date, DateTime<Utc>);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Item Attributes
// =============================================================================

/// Access rights of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AccessRights {
    /// Access is not known.
    #[default]
    NotKnown = 0,
    /// Clients may read.
    Readable = 1,
    /// Clients may write.
    Writable = 2,
    /// Clients may read and write.
    ReadWritable = 3,
}

impl AccessRights {
    /// Returns the raw bits.
    #[inline]
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Returns `true` if clients may read.
    #[inline]
    pub fn is_readable(self) -> bool {
        self.bits() & 1 != 0
    }

    /// Returns `true` if clients may write.
    #[inline]
    pub fn is_writable(self) -> bool {
        self.bits() & 2 != 0
    }

    /// Returns `true` if every right in `required` is granted.
    ///
    /// `NotKnown` as a requirement matches anything.
    #[inline]
    pub fn satisfies(self, required: AccessRights) -> bool {
        self.bits() & required.bits() == required.bits()
    }
}

/// Engineering unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EuType {
    /// No engineering unit information.
    #[default]
    NoEnum = 0,
    /// Analog range.
    Analog = 1,
    /// Enumerated labels.
    Enumerated = 2,
}

/// Engineering unit information of an item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EuInfo {
    /// No engineering unit information.
    #[default]
    None,
    /// Analog item with an expected range.
    Analog {
        /// Lower limit.
        low: f64,
        /// Upper limit.
        high: f64,
    },
    /// Enumerated item with one label per ordinal.
    Enumerated {
        /// Labels indexed by value.
        labels: Vec<String>,
    },
}

impl EuInfo {
    /// Returns the engineering unit type.
    pub fn eu_type(&self) -> EuType {
        match self {
            EuInfo::None => EuType::NoEnum,
            EuInfo::Analog { .. } => EuType::Analog,
            EuInfo::Enumerated { .. } => EuType::Enumerated,
        }
    }
}

// =============================================================================
// Server Enumerations
// =============================================================================

/// Host-visible server status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    /// State has not been set.
    #[default]
    Unknown,
    /// Server is running normally.
    Running,
    /// Server failed and needs a restart.
    Failed,
    /// Configuration has not been loaded yet.
    NoConfig,
    /// Server is suspended.
    Suspended,
    /// Server is in test mode.
    Test,
    /// Server lost communication with its devices.
    CommFault,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServerState::Unknown => "unknown",
            ServerState::Running => "running",
            ServerState::Failed => "failed",
            ServerState::NoConfig => "no_config",
            ServerState::Suspended => "suspended",
            ServerState::Test => "test",
            ServerState::CommFault => "comm_fault",
        };
        write!(f, "{}", s)
    }
}

/// Log level requested by the host for its own diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warning,
    /// Error level.
    Error,
    /// Alarm level.
    Alarm,
    /// Fatal level.
    Fatal,
    /// Logging disabled.
    Disabled,
}

/// How hierarchical browsing is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowseMode {
    /// The host walks its own item catalog.
    #[default]
    Generic,
    /// Browse calls are delegated to the plugin.
    Custom,
}

/// What a browse listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowseType {
    /// Child branches of the position.
    Branch,
    /// Child leaves of the position.
    Leaf,
    /// All leaves below the position.
    Flat,
}

/// Direction of a browse position change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowseDirection {
    /// Move to the parent branch.
    Up,
    /// Move into a child branch.
    Down,
    /// Jump to an absolute position.
    To,
}

// =============================================================================
// Tests
// =============================================================================
