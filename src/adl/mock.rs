//! Scripted in-memory [`ControlInterface`] used by the tests.
//!
//! Every call is recorded, per entry point failures can be injected and
//! written level tables are kept so that later reads observe them.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use super::{AdapterInfo, AdlResult, AdlStatus, ControlInterface, ffi};
use crate::performance::{ParameterRange, PerformanceLevel, PerformanceRange};

// ADL entry points, used to inject failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entry {
    Create,
    Destroy,
    NumberOfAdapters,
    AdapterInfo,
    AdapterActive,
    OdParameters,
    OdPerformanceLevels,
    SetOdPerformanceLevels,
}

// A recorded call with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { active_only: bool },
    Destroy,
    NumberOfAdapters,
    AdapterInfo { count: usize },
    AdapterActive { position: i32 },
    OdParameters { adapter_index: i32 },
    OdPerformanceLevels { adapter_index: i32, count: usize },
    SetOdPerformanceLevels { adapter_index: i32, levels: Vec<PerformanceLevel> },
}

impl Call {
    pub fn entry(&self) -> Entry {
        match self {
            Call::Create { .. } => Entry::Create,
            Call::Destroy => Entry::Destroy,
            Call::NumberOfAdapters => Entry::NumberOfAdapters,
            Call::AdapterInfo { .. } => Entry::AdapterInfo,
            Call::AdapterActive { .. } => Entry::AdapterActive,
            Call::OdParameters { .. } => Entry::OdParameters,
            Call::OdPerformanceLevels { .. } => Entry::OdPerformanceLevels,
            Call::SetOdPerformanceLevels { .. } => Entry::SetOdPerformanceLevels,
        }
    }
}

// One adapter as the fake driver reports it
#[derive(Debug, Clone)]
pub struct MockAdapter {
    pub info: AdapterInfo,
    pub active: bool,
    pub range: PerformanceRange,
    pub levels: Vec<PerformanceLevel>,
}

impl MockAdapter {
    // Active adapter with three levels going from 150 to 850 MHz
    pub fn new(adapter_index: i32, name: &str) -> Self {
        let levels = vec![
            PerformanceLevel { engine_clock: 15000, memory_clock: 30000, core_voltage: 900 },
            PerformanceLevel { engine_clock: 50000, memory_clock: 100000, core_voltage: 1000 },
            PerformanceLevel { engine_clock: 85000, memory_clock: 120000, core_voltage: 1150 },
        ];

        Self {
            info: AdapterInfo {
                adapter_index,
                adapter_name: name.to_string(),
                display_name: format!(":0.{adapter_index}"),
            },
            active: true,
            range: PerformanceRange {
                engine_clock: ParameterRange { min: 15000, max: 110000, step: 500 },
                memory_clock: ParameterRange { min: 30000, max: 150000, step: 500 },
                voltage: ParameterRange { min: 900, max: 1300, step: 5 },
                supports_discrete_levels: true,
                level_count: levels.len() as i32,
            },
            levels,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn without_discrete_levels(mut self) -> Self {
        self.range.supports_discrete_levels = false;
        self
    }

    // Override the reported level count without touching the table
    pub fn with_level_count(mut self, level_count: i32) -> Self {
        self.range.level_count = level_count;
        self
    }

    pub fn with_levels(mut self, levels: Vec<PerformanceLevel>) -> Self {
        self.range.level_count = levels.len() as i32;
        self.levels = levels;
        self
    }
}

#[derive(Debug, Default)]
pub struct MockInterface {
    adapters: RefCell<Vec<MockAdapter>>,
    failures: HashMap<Entry, AdlStatus>,
    calls: RefCell<Vec<Call>>,
    created: Cell<bool>,
    // Adapter count reported instead of the number of adapters
    reported_count: Option<i32>,
}

impl MockInterface {
    pub fn new() -> Self {
        Self::default()
    }

    // Adapters are reported in insertion order
    pub fn with_adapter(self, adapter: MockAdapter) -> Self {
        self.adapters.borrow_mut().push(adapter);
        self
    }

    // Make every call to `entry` fail with `status`
    pub fn fail_on(mut self, entry: Entry, status: AdlStatus) -> Self {
        self.failures.insert(entry, status);
        self
    }

    // Report `count` from ADL_Adapter_NumberOfAdapters_Get
    pub fn with_reported_count(mut self, count: i32) -> Self {
        self.reported_count = Some(count);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, entry: Entry) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.entry() == entry)
            .count()
    }

    // Level tables submitted through ADL_Overdrive5_ODPerformanceLevels_Set
    pub fn writes(&self) -> Vec<(i32, Vec<PerformanceLevel>)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::SetOdPerformanceLevels { adapter_index, levels } => {
                    Some((*adapter_index, levels.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn levels(&self, adapter_index: i32) -> Option<Vec<PerformanceLevel>> {
        self.adapters
            .borrow()
            .iter()
            .find(|adapter| adapter.info.adapter_index == adapter_index)
            .map(|adapter| adapter.levels.clone())
    }

    // Record the call and apply injected failures and session state
    fn record(&self, call: Call) -> AdlResult<()> {
        let entry = call.entry();
        self.calls.borrow_mut().push(call);

        if let Some(status) = self.failures.get(&entry) {
            return Err(*status);
        }

        match entry {
            Entry::Create | Entry::Destroy => Ok(()),
            _ if !self.created.get() => Err(AdlStatus(ffi::ADL_ERR_NOT_INIT)),
            _ => Ok(()),
        }
    }

    fn with_adapter_index<T>(
        &self,
        adapter_index: i32,
        f: impl FnOnce(&mut MockAdapter) -> T,
    ) -> AdlResult<T> {
        self.adapters
            .borrow_mut()
            .iter_mut()
            .find(|adapter| adapter.info.adapter_index == adapter_index)
            .map(f)
            .ok_or(AdlStatus(ffi::ADL_ERR_INVALID_ADL_IDX))
    }
}

impl ControlInterface for MockInterface {
    fn main_control_create(&self, active_only: bool) -> AdlResult<()> {
        self.record(Call::Create { active_only })?;
        self.created.set(true);
        Ok(())
    }

    fn main_control_destroy(&self) -> AdlResult<()> {
        self.record(Call::Destroy)?;
        self.created.set(false);
        Ok(())
    }

    fn number_of_adapters(&self) -> AdlResult<i32> {
        self.record(Call::NumberOfAdapters)?;
        Ok(self
            .reported_count
            .unwrap_or_else(|| self.adapters.borrow().len() as i32))
    }

    fn adapter_info(&self, count: usize) -> AdlResult<Vec<AdapterInfo>> {
        self.record(Call::AdapterInfo { count })?;

        let adapters = self.adapters.borrow();
        if count > adapters.len() {
            return Err(AdlStatus(ffi::ADL_ERR_INVALID_PARAM_SIZE));
        }

        Ok(adapters[..count].iter().map(|a| a.info.clone()).collect())
    }

    fn adapter_active(&self, position: i32) -> AdlResult<bool> {
        self.record(Call::AdapterActive { position })?;

        usize::try_from(position)
            .ok()
            .and_then(|position| {
                self.adapters.borrow().get(position).map(|a| a.active)
            })
            .ok_or(AdlStatus(ffi::ADL_ERR_INVALID_ADL_IDX))
    }

    fn od_parameters(&self, adapter_index: i32) -> AdlResult<PerformanceRange> {
        self.record(Call::OdParameters { adapter_index })?;
        self.with_adapter_index(adapter_index, |adapter| adapter.range)
    }

    fn od_performance_levels(
        &self,
        adapter_index: i32,
        count: usize,
    ) -> AdlResult<Vec<PerformanceLevel>> {
        self.record(Call::OdPerformanceLevels { adapter_index, count })?;
        self.with_adapter_index(adapter_index, |adapter| {
            adapter.levels.iter().copied().take(count).collect()
        })
    }

    fn set_od_performance_levels(
        &self,
        adapter_index: i32,
        levels: &[PerformanceLevel],
    ) -> AdlResult<()> {
        self.record(Call::SetOdPerformanceLevels {
            adapter_index,
            levels: levels.to_vec(),
        })?;
        self.with_adapter_index(adapter_index, |adapter| {
            adapter.levels = levels.to_vec();
        })
    }
}
