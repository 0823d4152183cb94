// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Sample node manager with a simulated address space.
//!
//! # Address Space
//!
//! ```text
//! CTT.SimpleTypes.{In,Out,InOut}.<Type>         scalar sample values
//! CTT.Arrays.{In,Out,InOut}.<Type>[]            4-element arrays
//! CTT.SpecialItems.WithAnalogEUInfo[2]          analog engineering units
//! CTT.SpecialItems.WithVendorSpecificProperties casing properties 5650..5652
//! SimulatedData.{NumberItems,Ramp,Sine,Random}  refreshed every tick
//! Commands.RequestShutdown                      write to request shutdown
//! MassItems.{SimpleTypes,Arrays}[n]...          bulk items
//! ```
//!
//! When the host supports alarms and events, a small event space is built
//! as well and the simulated ramp and sine drive two conditions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::browse::{BrowseFilter, BrowseIter};
use crate::cancel::CancellationSignal;
use crate::catalog::ItemDefinition;
use crate::context::ServerContext;
use crate::error::{OpcError, OpcResult, Status};
use crate::event_space::{
    ConditionStateChange, SimpleEvent, SingleStateDefinition, SubConditionDefinition, AREA_ROOT,
};
use crate::gateway::{
    ClientDecision, ItemRequest, ItemWrite, NodeManager, RequestOutcome, ServerDefinition,
    ServerKind, ServerParameters,
};
use crate::lifecycle::{LifecycleConfig, LifecycleController, ShutdownReport, Workload};
use crate::quality::Quality;
use crate::simulation::{SimulationEngine, SimulationSample};
use crate::types::{
    AccessRights, BrowseDirection, CanonicalType, ClientId, ItemHandle, LogLevel, PropertyId,
    ServerState, TypeKind, Value,
};

// =============================================================================
// Item names & ids
// =============================================================================

/// Item reporting the number of items added.
pub const ITEM_NUMBER_ITEMS: &str = "SimulatedData.NumberItems";
/// Simulated ramp item.
pub const ITEM_RAMP: &str = "SimulatedData.Ramp";
/// Simulated sine item.
pub const ITEM_SINE: &str = "SimulatedData.Sine";
/// Simulated random item.
pub const ITEM_RANDOM: &str = "SimulatedData.Random";
/// Item whose writes request a server shutdown.
pub const ITEM_REQUEST_SHUTDOWN: &str = "Commands.RequestShutdown";
/// Analog item with a 40.86..92.67 range.
pub const ITEM_SPECIAL_EU: &str = "CTT.SpecialItems.WithAnalogEUInfo";
/// Analog item with a 12.50..27.90 range.
pub const ITEM_SPECIAL_EU2: &str = "CTT.SpecialItems.WithAnalogEUInfo2";
/// Item carrying the casing properties.
pub const ITEM_SPECIAL_PROPERTIES: &str = "CTT.SpecialItems.WithVendorSpecificProperties";

/// Casing material property.
pub const PROPERTY_CASING_MATERIAL: PropertyId = PropertyId::new(5650);
/// Casing height property.
pub const PROPERTY_CASING_HEIGHT: PropertyId = PropertyId::new(5651);
/// Casing manufacturer property.
pub const PROPERTY_CASING_MANUFACTURER: PropertyId = PropertyId::new(5652);

const IO_BRANCHES: [(&str, AccessRights); 3] = [
    ("In", AccessRights::Readable),
    ("Out", AccessRights::Writable),
    ("InOut", AccessRights::ReadWritable),
];

const ITEM_TYPES: [(&str, TypeKind); 12] = [
    ("Boolean", TypeKind::Bool),
    ("Short", TypeKind::Int16),
    ("Integer", TypeKind::Int32),
    ("SingleFloat", TypeKind::Float32),
    ("DoubleFloat", TypeKind::Float64),
    ("Date", TypeKind::Date),
    ("String", TypeKind::String),
    ("Byte", TypeKind::UInt8),
    ("Character", TypeKind::Int8),
    ("Word", TypeKind::UInt16),
    ("DoubleWord", TypeKind::UInt32),
    ("Currency", TypeKind::Currency),
];

const ARRAY_LEN: usize = 4;
const MAX_SAMPLE_DATE: i32 = 73050;

// event space ids
const CATEGORY_SYSTEM: u32 = 1;
const CATEGORY_OPERATOR: u32 = 2;
const CATEGORY_LEVEL: u32 = 3;
const AREA_PLANT: u32 = 1;
const AREA_UTILITIES: u32 = 2;
const SOURCE_SIMULATION: u32 = 1;
const DEFINITION_RAMP_HIGH: u32 = 100;
const DEFINITION_SINE_LEVEL: u32 = 101;
const SUB_SINE_LOW: u32 = 1;
const SUB_SINE_HIGH: u32 = 2;
const CONDITION_RAMP_HIGH: u32 = 1000;
const CONDITION_SINE_LEVEL: u32 = 1001;

// =============================================================================
// Sample values
// =============================================================================

/// Returns the scalar sample value of a type.
pub fn sample_scalar(kind: TypeKind) -> Value {
    match kind {
        TypeKind::Empty => Value::Empty,
        TypeKind::Bool => Value::Bool(false),
        TypeKind::Int8 => Value::Int8(76),
        TypeKind::UInt8 => Value::UInt8(23),
        TypeKind::Int16 => Value::Int16(345),
        TypeKind::UInt16 => Value::UInt16(39874),
        TypeKind::Int32 => Value::Int32(20196),
        TypeKind::UInt32 => Value::UInt32(4230498),
        TypeKind::Int64 => Value::Int64(20196),
        TypeKind::UInt64 => Value::UInt64(4230498),
        TypeKind::Float32 => Value::Float32(8.123242),
        TypeKind::Float64 => Value::Float64(83289.48243),
        TypeKind::Currency => Value::Currency(198000),
        TypeKind::Date => Value::from_ole_date(2.5),
        TypeKind::String => Value::from("-- It's a nice day --"),
    }
}

/// Returns a four-element sample array of a type.
pub fn sample_array<R: Rng>(kind: TypeKind, rng: &mut R) -> Value {
    let elements = (0..ARRAY_LEN)
        .map(|i| {
            let r: i32 = rng.gen_range(0..=32767);
            match kind {
                TypeKind::Bool => Value::Bool(i & 1 == 1),
                TypeKind::Int8 => Value::Int8((r % 128) as i8),
                TypeKind::UInt8 => Value::UInt8((r % 256) as u8),
                TypeKind::Int16 => Value::Int16(r as i16),
                TypeKind::UInt16 => Value::UInt16(r as u16),
                TypeKind::Int32 => Value::Int32(r),
                TypeKind::UInt32 => Value::UInt32(r as u32),
                TypeKind::Int64 => Value::Int64(r.into()),
                TypeKind::UInt64 => Value::UInt64(r as u64),
                TypeKind::Float32 => Value::Float32(r as f32),
                TypeKind::Float64 => Value::Float64(r.into()),
                TypeKind::Currency => Value::Currency(r.into()),
                TypeKind::Date => Value::from_ole_date(f64::from(r & MAX_SAMPLE_DATE)),
                TypeKind::String => Value::String(format!("This is string #{}", i + 1)),
                TypeKind::Empty => Value::Empty,
            }
        })
        .collect();
    Value::Array(elements)
}

/// Rewrites a sample name written with `.` for the delimiter of `ctx`.
fn localize(ctx: &ServerContext, name: &str) -> String {
    match ctx.delimiter() {
        '.' => name.to_string(),
        delimiter => name.replace('.', &delimiter.to_string()),
    }
}

// =============================================================================
// SampleConfig
// =============================================================================

/// Options of the sample address space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Number of `MassItems` blocks; 0 disables them.
    pub mass_item_groups: usize,
    /// Pause after each block, during which cancellation is observed.
    pub mass_item_delay: Duration,
    /// Whether to build the sample event space.
    pub event_space: bool,
    /// Random seed of the simulation; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Log level reported to the host.
    pub log_level: LogLevel,
    /// Log directory reported to the host.
    pub log_path: String,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            mass_item_groups: 100,
            mass_item_delay: Duration::from_millis(10),
            event_space: true,
            seed: None,
            log_level: LogLevel::Info,
            log_path: String::new(),
        }
    }
}

// =============================================================================
// SampleWorkload
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
struct SampleHandles {
    number_items: Option<ItemHandle>,
    ramp: Option<ItemHandle>,
    sine: Option<ItemHandle>,
    random: Option<ItemHandle>,
    request_shutdown: Option<ItemHandle>,
}

/// Population and refresh logic of the sample server.
#[derive(Debug)]
pub struct SampleWorkload {
    config: SampleConfig,
    engine: Mutex<SimulationEngine>,
    handles: RwLock<SampleHandles>,
    events_enabled: AtomicBool,
}

impl SampleWorkload {
    /// Creates the workload for a refresher tick length.
    pub fn new(config: SampleConfig, tick: Duration) -> OpcResult<Self> {
        let engine = match config.seed {
            Some(seed) => SimulationEngine::with_seed(tick, seed)?,
            None => SimulationEngine::new(tick)?,
        };
        Ok(Self {
            config,
            engine: Mutex::new(engine),
            handles: RwLock::new(SampleHandles::default()),
            events_enabled: AtomicBool::new(false),
        })
    }

    /// Returns the options.
    pub fn config(&self) -> &SampleConfig {
        &self.config
    }

    /// Returns the handle of the shutdown command item once populated.
    pub fn request_shutdown_handle(&self) -> Option<ItemHandle> {
        self.handles.read().request_shutdown
    }

    /// Returns `true` if the sample event space was built.
    pub fn events_enabled(&self) -> bool {
        self.events_enabled.load(Ordering::Relaxed)
    }

    fn add_sample_item(
        &self,
        ctx: &ServerContext,
        mut definition: ItemDefinition,
    ) -> OpcResult<ItemHandle> {
        definition.name = localize(ctx, &definition.name);
        let value = definition.initial_value.clone();
        let handle = ctx.add_item(definition)?;
        ctx.set_item_value(handle, Some(value), Quality::GOOD, Utc::now())?;
        Ok(handle)
    }

    fn populate_typed_items(&self, ctx: &ServerContext, prefix: &str, arrays: bool) -> OpcResult<()> {
        let mut rng = rand::thread_rng();
        for (branch, access) in IO_BRANCHES {
            for (type_name, kind) in ITEM_TYPES {
                let (name, value) = if arrays {
                    (
                        format!("{}.{}.{}[]", prefix, branch, type_name),
                        sample_array(kind, &mut rng),
                    )
                } else {
                    (format!("{}.{}.{}", prefix, branch, type_name), sample_scalar(kind))
                };
                self.add_sample_item(ctx, ItemDefinition::new(name, access, value))?;
            }
        }
        Ok(())
    }

    fn populate_special_items(&self, ctx: &ServerContext) -> OpcResult<()> {
        self.add_sample_item(
            ctx,
            ItemDefinition::analog(
                ITEM_SPECIAL_EU,
                AccessRights::ReadWritable,
                Value::UInt8(89),
                40.86,
                92.67,
            ),
        )?;
        self.add_sample_item(
            ctx,
            ItemDefinition::analog(
                ITEM_SPECIAL_EU2,
                AccessRights::ReadWritable,
                Value::UInt8(21),
                12.50,
                27.90,
            ),
        )?;

        let host = ctx.host();
        host.add_property(PROPERTY_CASING_HEIGHT, "Casing Height", Value::Float64(25.34))?;
        host.add_property(PROPERTY_CASING_MATERIAL, "Casing Material", Value::from("Aluminum"))?;
        host.add_property(PROPERTY_CASING_MANUFACTURER, "Casing Manufacturer", Value::from("CBM"))?;

        self.add_sample_item(
            ctx,
            ItemDefinition::new(
                ITEM_SPECIAL_PROPERTIES,
                AccessRights::ReadWritable,
                Value::UInt8(111),
            )
            .with_property(PROPERTY_CASING_MATERIAL, "Aluminum")
            .with_property(PROPERTY_CASING_HEIGHT, 25.45)
            .with_property(PROPERTY_CASING_MANUFACTURER, "CBM"),
        )?;
        Ok(())
    }

    fn populate_simulated_items(&self, ctx: &ServerContext) -> OpcResult<()> {
        let readable = |name: &str, value: Value| {
            ItemDefinition::new(localize(ctx, name), AccessRights::Readable, value)
        };

        let handles = SampleHandles {
            number_items: Some(ctx.add_item(readable(ITEM_NUMBER_ITEMS, Value::Int32(0)))?),
            ramp: Some(ctx.add_item(readable(ITEM_RAMP, Value::Int32(0)))?),
            sine: Some(ctx.add_item(readable(ITEM_SINE, Value::Float64(0.0)))?),
            random: Some(ctx.add_item(readable(ITEM_RANDOM, Value::Int32(0)))?),
            request_shutdown: Some(ctx.add_item(ItemDefinition::new(
                localize(ctx, ITEM_REQUEST_SHUTDOWN),
                AccessRights::ReadWritable,
                Value::from(""),
            ))?),
        };
        *self.handles.write() = handles;
        Ok(())
    }

    /// Adds the mass items; returns `false` if cancelled part way.
    fn populate_mass_items(
        &self,
        ctx: &ServerContext,
        cancel: &CancellationSignal,
        arrays: bool,
    ) -> OpcResult<bool> {
        let groups = self.config.mass_item_groups;
        let kind = if arrays { "Arrays" } else { "SimpleTypes" };
        for y in 0..groups {
            let prefix = if groups == 1 {
                format!("MassItems.{}", kind)
            } else {
                format!("MassItems.{}[{}]", kind, y)
            };
            self.populate_typed_items(ctx, &prefix, arrays)?;
            if cancel.wait_timeout(self.config.mass_item_delay) {
                debug!(block = y, kind, "Mass item population cancelled");
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn populate_event_space(&self, ctx: &ServerContext) -> OpcResult<()> {
        let host = ctx.host();
        host.add_simple_event_category(CATEGORY_SYSTEM, "System message")?;
        host.add_event_attribute(
            CATEGORY_SYSTEM,
            1,
            "Item count",
            CanonicalType::scalar(TypeKind::Int32),
        )?;
        host.add_tracking_event_category(CATEGORY_OPERATOR, "Operator action")?;
        host.add_condition_event_category(CATEGORY_LEVEL, "Level")?;

        host.add_single_state_condition_definition(SingleStateDefinition {
            category_id: CATEGORY_LEVEL,
            id: DEFINITION_RAMP_HIGH,
            name: "RampHigh".to_string(),
            condition: "Ramp > 90".to_string(),
            severity: 500,
            description: "Ramp is high".to_string(),
            ack_required: true,
        })?;
        host.add_multi_state_condition_definition(CATEGORY_LEVEL, DEFINITION_SINE_LEVEL, "SineLevel")?;
        host.add_sub_condition_definition(
            DEFINITION_SINE_LEVEL,
            SubConditionDefinition {
                id: SUB_SINE_LOW,
                name: "SineLow".to_string(),
                condition: "Sine < -0.9".to_string(),
                severity: 300,
                description: "Sine is low".to_string(),
                ack_required: false,
            },
        )?;
        host.add_sub_condition_definition(
            DEFINITION_SINE_LEVEL,
            SubConditionDefinition {
                id: SUB_SINE_HIGH,
                name: "SineHigh".to_string(),
                condition: "Sine > 0.9".to_string(),
                severity: 600,
                description: "Sine is high".to_string(),
                ack_required: true,
            },
        )?;

        host.add_area(AREA_ROOT, AREA_PLANT, "Plant")?;
        host.add_area(AREA_ROOT, AREA_UTILITIES, "Utilities")?;
        host.add_source(AREA_PLANT, SOURCE_SIMULATION, "Simulation", true)?;
        host.add_existing_source(AREA_UTILITIES, SOURCE_SIMULATION)?;
        host.add_condition(SOURCE_SIMULATION, DEFINITION_RAMP_HIGH, CONDITION_RAMP_HIGH)?;
        host.add_condition(SOURCE_SIMULATION, DEFINITION_SINE_LEVEL, CONDITION_SINE_LEVEL)?;
        Ok(())
    }

    fn update_conditions(&self, ctx: &ServerContext, sample: &SimulationSample) -> OpcResult<usize> {
        let (sine_sub, sine_active) = if sample.sine > 0.9 {
            (SUB_SINE_HIGH, true)
        } else if sample.sine < -0.9 {
            (SUB_SINE_LOW, true)
        } else {
            (0, false)
        };
        ctx.host().process_condition_state_changes(&[
            ConditionStateChange::new(CONDITION_RAMP_HIGH, 0, sample.ramp > 90),
            ConditionStateChange::new(CONDITION_SINE_LEVEL, sine_sub, sine_active),
        ])
    }

    fn push_simulation(&self, ctx: &ServerContext, handles: &SampleHandles) -> OpcResult<usize> {
        let sample = self.engine.lock().tick();
        let mut pushed = 0;
        for (handle, value) in [
            (handles.ramp, Value::Int32(sample.ramp)),
            (handles.sine, Value::Float64(sample.sine)),
            (handles.random, Value::Int32(sample.random)),
        ] {
            if let Some(handle) = handle {
                ctx.set_item_value(handle, Some(value), Quality::GOOD, sample.timestamp)?;
                pushed += 1;
            }
        }

        if sample.recomputed && self.events_enabled() {
            if let Err(e) = self.update_conditions(ctx, &sample) {
                warn!(error = %e, "Condition update failed");
            }
        }
        Ok(pushed)
    }
}

impl Workload for SampleWorkload {
    fn populate(&self, ctx: &ServerContext, cancel: &CancellationSignal) -> OpcResult<()> {
        self.populate_typed_items(ctx, "CTT.SimpleTypes", false)?;
        self.populate_typed_items(ctx, "CTT.Arrays", true)?;
        self.populate_special_items(ctx)?;
        self.populate_simulated_items(ctx)?;

        if !self.populate_mass_items(ctx, cancel, false)?
            || !self.populate_mass_items(ctx, cancel, true)?
        {
            return Ok(());
        }

        if self.config.event_space {
            match self.populate_event_space(ctx) {
                Ok(()) => {
                    self.events_enabled.store(true, Ordering::Relaxed);
                    let count = i32::try_from(ctx.item_count()).unwrap_or(i32::MAX);
                    ctx.host().process_simple_event(SimpleEvent {
                        category_id: CATEGORY_SYSTEM,
                        source_id: SOURCE_SIMULATION,
                        message: "Address space created".to_string(),
                        severity: 100,
                        attribute_values: vec![Value::Int32(count)],
                        timestamp: None,
                    })?;
                }
                Err(e) if e.status() == Status::NotSupported => {
                    info!("Host has no alarms and events support, skipping event space");
                }
                Err(e) => return Err(e),
            }
        }

        info!(items = ctx.item_count(), "Sample address space created");
        Ok(())
    }

    fn tick(&self, ctx: &ServerContext, running: bool) -> OpcResult<usize> {
        let handles = *self.handles.read();
        let mut pushed = 0;

        if let Some(handle) = handles.number_items {
            let count = i32::try_from(ctx.items_added()).unwrap_or(i32::MAX);
            ctx.set_item_value(handle, Some(Value::Int32(count)), Quality::GOOD, Utc::now())?;
            pushed += 1;
        }
        if running {
            pushed += self.push_simulation(ctx, &handles)?;
        }
        Ok(pushed)
    }
}

// =============================================================================
// SampleNodeManager
// =============================================================================

/// Node manager of the sample server.
#[derive(Debug)]
pub struct SampleNodeManager {
    ctx: Arc<ServerContext>,
    lifecycle: LifecycleController,
    workload: Arc<SampleWorkload>,
    last_shutdown: Mutex<Option<ShutdownReport>>,
}

impl SampleNodeManager {
    /// Creates the node manager.
    pub fn new(
        ctx: Arc<ServerContext>,
        lifecycle: LifecycleConfig,
        sample: SampleConfig,
    ) -> OpcResult<Self> {
        let workload = Arc::new(SampleWorkload::new(sample, lifecycle.tick)?);
        Ok(Self {
            lifecycle: LifecycleController::new(Arc::clone(&ctx), lifecycle),
            ctx,
            workload,
            last_shutdown: Mutex::new(None),
        })
    }

    /// Returns the server context.
    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    /// Returns the lifecycle controller.
    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }

    /// Returns the workload.
    pub fn workload(&self) -> &Arc<SampleWorkload> {
        &self.workload
    }

    /// Returns the report of the last shutdown.
    pub fn last_shutdown(&self) -> Option<ShutdownReport> {
        *self.last_shutdown.lock()
    }

    fn write_item(&self, write: &ItemWrite) -> OpcResult<()> {
        let access = self
            .ctx
            .item_access_rights(write.handle)
            .ok_or_else(|| OpcError::not_found("item", write.handle))?;
        if !access.is_writable() {
            return Err(OpcError::invalid_argument(
                write.handle.to_string(),
                "item is not writable",
            ));
        }

        self.ctx.set_item_value(
            write.handle,
            Some(write.value.clone()),
            write.quality.unwrap_or(Quality::GOOD),
            write.timestamp.unwrap_or_else(Utc::now),
        )?;

        if Some(write.handle) == self.workload.request_shutdown_handle() {
            info!("Shutdown requested through command item");
            self.ctx.host().fire_shutdown_request("Shutdown requested by client")?;
        }
        Ok(())
    }
}

impl NodeManager for SampleNodeManager {
    fn on_create_server_items(&self) -> OpcResult<()> {
        let workload: Arc<dyn Workload> = self.workload.clone();
        self.lifecycle.start(workload)
    }

    fn on_get_server_definition(&self, kind: ServerKind) -> Option<ServerDefinition> {
        match kind {
            ServerKind::DataAccess => Some(ServerDefinition::sample_data_access()),
            ServerKind::AlarmsEvents => None,
        }
    }

    fn on_get_server_parameters(&self) -> ServerParameters {
        *self.ctx.parameters()
    }

    fn on_startup_signal(&self, command_line: &str) -> OpcResult<()> {
        debug!(command_line = %command_line, "Startup signal");
        Ok(())
    }

    fn on_shutdown_signal(&self) -> OpcResult<()> {
        let report = self.lifecycle.shutdown();
        *self.last_shutdown.lock() = Some(report);
        Ok(())
    }

    fn on_query_properties(&self, handle: ItemHandle) -> OpcResult<Vec<PropertyId>> {
        self.ctx.query_properties(handle)
    }

    fn on_get_property_value(&self, handle: ItemHandle, id: PropertyId) -> OpcResult<Value> {
        self.ctx.get_property_value(handle, id)
    }

    fn on_write_items(&self, writes: &[ItemWrite]) -> Vec<OpcResult<()>> {
        writes.iter().map(|write| self.write_item(write)).collect()
    }

    fn on_refresh_items(&self, handles: &[ItemHandle]) -> OpcResult<()> {
        debug!(items = handles.len(), "Refresh requested");
        let running = self.ctx.server_state() == ServerState::Running;
        self.workload.tick(&self.ctx, running).map(|_| ())
    }

    fn on_browse_change_position(
        &self,
        client: ClientId,
        direction: BrowseDirection,
        target: Option<&str>,
    ) -> OpcResult<String> {
        self.ctx.browse_change_position(client, direction, target)
    }

    fn on_browse_list_ids(&self, client: ClientId, filter: &BrowseFilter) -> OpcResult<BrowseIter> {
        self.ctx.browse_list_ids(client, filter)
    }

    fn on_browse_resolve_full_id(&self, client: ClientId, local: &str) -> OpcResult<String> {
        self.ctx.browse_resolve_full_id(client, local)
    }

    fn on_client_connect(&self, client: ClientId) -> ClientDecision {
        debug!(%client, "Client connect accepted");
        ClientDecision::Accept
    }

    fn on_client_disconnect(&self, client: ClientId) {
        self.ctx.forget_client(&client);
        debug!(%client, "Client disconnected");
    }

    fn on_ack_notification(&self, condition: u32, sub_condition: u32) {
        debug!(condition, sub_condition, "Condition acknowledged by client");
    }

    fn on_get_log_level(&self) -> LogLevel {
        self.workload.config().log_level
    }

    fn on_get_log_path(&self) -> String {
        self.workload.config().log_path.clone()
    }

    fn on_request_items(&self, requests: &[ItemRequest]) -> RequestOutcome {
        debug!(requests = requests.len(), "Dynamic item request declined");
        RequestOutcome::Declined
    }
}
