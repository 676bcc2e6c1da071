use std::ffi::{c_int, c_void};
use std::mem::size_of;

use libloading::{Library, Symbol};
use tracing::{debug, trace};

use super::{
    AdapterInfo, AdlResult, AdlStatus, ControlInterface,
    ffi::{self, AdapterInfoRaw, PerformanceLevelsBuffer},
};
use crate::{
    errors::{AtitweakError, Result},
    performance::{ParameterRange, PerformanceLevel, PerformanceRange},
};

#[cfg(windows)]
pub const DEFAULT_LIBRARY_PATHS: &[&str] = &["atiadlxx.dll", "atiadlxy.dll"];
#[cfg(not(windows))]
pub const DEFAULT_LIBRARY_PATHS: &[&str] = &["libatiadlxx.so"];

// Allocation callback handed to ADL_Main_Control_Create
unsafe extern "C" fn adl_main_memory_alloc(size: c_int) -> *mut c_void {
    unsafe { libc::malloc(size.max(0) as usize) }
}

// The dynamically loaded ADL library and the entry points this tool uses
pub struct Adl {
    // Keeps the entry points below valid
    _library: Library,

    main_control_create: ffi::ADL_Main_Control_Create,
    main_control_destroy: ffi::ADL_Main_Control_Destroy,
    number_of_adapters_get: ffi::ADL_Adapter_NumberOfAdapters_Get,
    adapter_info_get: ffi::ADL_Adapter_AdapterInfo_Get,
    adapter_active_get: ffi::ADL_Adapter_Active_Get,
    od_parameters_get: ffi::ADL_Overdrive5_ODParameters_Get,
    od_performance_levels_get: ffi::ADL_Overdrive5_ODPerformanceLevels_Get,
    od_performance_levels_set: ffi::ADL_Overdrive5_ODPerformanceLevels_Set,
}

impl Adl {
    // Load the first usable library, trying `extra_paths` before the
    // platform default names
    pub fn load(extra_paths: &[String]) -> Result<Self> {
        let candidates: Vec<&str> = extra_paths
            .iter()
            .map(String::as_str)
            .chain(DEFAULT_LIBRARY_PATHS.iter().copied())
            .collect();

        for path in &candidates {
            match Self::load_from(path) {
                Ok(adl) => {
                    debug!("Loaded ADL from \"{path}\"");
                    return Ok(adl);
                }
                Err(err) => debug!("Failed to load ADL from \"{path}\": {err}"),
            }
        }

        Err(AtitweakError::session(format!(
            "Couldn't load the ADL library (tried {}).",
            candidates.join(", ")
        )))
    }

    pub fn load_from(path: &str) -> std::result::Result<Self, libloading::Error> {
        // SAFETY: loading the vendor library runs its initializers, the
        // symbol types match the ADL SDK declarations
        unsafe {
            let library = Library::new(path)?;

            let main_control_create = {
                let symbol: Symbol<ffi::ADL_Main_Control_Create> =
                    library.get(b"ADL_Main_Control_Create\0")?;
                *symbol
            };
            let main_control_destroy = {
                let symbol: Symbol<ffi::ADL_Main_Control_Destroy> =
                    library.get(b"ADL_Main_Control_Destroy\0")?;
                *symbol
            };
            let number_of_adapters_get = {
                let symbol: Symbol<ffi::ADL_Adapter_NumberOfAdapters_Get> =
                    library.get(b"ADL_Adapter_NumberOfAdapters_Get\0")?;
                *symbol
            };
            let adapter_info_get = {
                let symbol: Symbol<ffi::ADL_Adapter_AdapterInfo_Get> =
                    library.get(b"ADL_Adapter_AdapterInfo_Get\0")?;
                *symbol
            };
            let adapter_active_get = {
                let symbol: Symbol<ffi::ADL_Adapter_Active_Get> =
                    library.get(b"ADL_Adapter_Active_Get\0")?;
                *symbol
            };
            let od_parameters_get = {
                let symbol: Symbol<ffi::ADL_Overdrive5_ODParameters_Get> =
                    library.get(b"ADL_Overdrive5_ODParameters_Get\0")?;
                *symbol
            };
            let od_performance_levels_get = {
                let symbol: Symbol<ffi::ADL_Overdrive5_ODPerformanceLevels_Get> =
                    library.get(b"ADL_Overdrive5_ODPerformanceLevels_Get\0")?;
                *symbol
            };
            let od_performance_levels_set = {
                let symbol: Symbol<ffi::ADL_Overdrive5_ODPerformanceLevels_Set> =
                    library.get(b"ADL_Overdrive5_ODPerformanceLevels_Set\0")?;
                *symbol
            };

            Ok(Self {
                _library: library,
                main_control_create,
                main_control_destroy,
                number_of_adapters_get,
                adapter_info_get,
                adapter_active_get,
                od_parameters_get,
                od_performance_levels_get,
                od_performance_levels_set,
            })
        }
    }
}

impl ControlInterface for Adl {
    fn main_control_create(&self, active_only: bool) -> AdlResult<()> {
        trace!("ADL_Main_Control_Create(active_only = {active_only})");

        AdlStatus::check(unsafe {
            (self.main_control_create)(adl_main_memory_alloc, c_int::from(active_only))
        })
    }

    fn main_control_destroy(&self) -> AdlResult<()> {
        trace!("ADL_Main_Control_Destroy");

        AdlStatus::check(unsafe { (self.main_control_destroy)() })
    }

    fn number_of_adapters(&self) -> AdlResult<i32> {
        trace!("ADL_Adapter_NumberOfAdapters_Get");

        let mut count: c_int = -1;
        AdlStatus::check(unsafe { (self.number_of_adapters_get)(&mut count) })?;

        Ok(count)
    }

    fn adapter_info(&self, count: usize) -> AdlResult<Vec<AdapterInfo>> {
        trace!("ADL_Adapter_AdapterInfo_Get(count = {count})");

        if count == 0 {
            return Ok(Vec::new());
        }

        let mut table = vec![AdapterInfoRaw::zeroed(); count];
        for entry in table.iter_mut() {
            entry.iSize = size_of::<AdapterInfoRaw>() as c_int;
        }

        let byte_size = c_int::try_from(count * size_of::<AdapterInfoRaw>())
            .map_err(|_| AdlStatus(ffi::ADL_ERR_INVALID_PARAM_SIZE))?;

        AdlStatus::check(unsafe { (self.adapter_info_get)(table.as_mut_ptr(), byte_size) })?;

        Ok(table
            .iter()
            .map(|raw| AdapterInfo {
                adapter_index: raw.iAdapterIndex,
                adapter_name: ffi::fixed_c_string(&raw.strAdapterName),
                display_name: ffi::fixed_c_string(&raw.strDisplayName),
            })
            .collect())
    }

    fn adapter_active(&self, position: i32) -> AdlResult<bool> {
        trace!("ADL_Adapter_Active_Get({position})");

        let mut status: c_int = -1;
        AdlStatus::check(unsafe { (self.adapter_active_get)(position, &mut status) })?;

        Ok(status == ffi::ADL_TRUE)
    }

    fn od_parameters(&self, adapter_index: i32) -> AdlResult<PerformanceRange> {
        trace!("ADL_Overdrive5_ODParameters_Get({adapter_index})");

        let mut parameters = ffi::ADLODParameters::sized();
        AdlStatus::check(unsafe { (self.od_parameters_get)(adapter_index, &mut parameters) })?;

        Ok(parameters.into())
    }

    fn od_performance_levels(
        &self,
        adapter_index: i32,
        count: usize,
    ) -> AdlResult<Vec<PerformanceLevel>> {
        trace!("ADL_Overdrive5_ODPerformanceLevels_Get({adapter_index}, count = {count})");

        let mut buffer = PerformanceLevelsBuffer::new(count);
        AdlStatus::check(unsafe {
            (self.od_performance_levels_get)(adapter_index, 0, buffer.as_mut_ptr())
        })?;

        Ok(buffer.levels().into_iter().map(Into::into).collect())
    }

    fn set_od_performance_levels(
        &self,
        adapter_index: i32,
        levels: &[PerformanceLevel],
    ) -> AdlResult<()> {
        trace!(
            "ADL_Overdrive5_ODPerformanceLevels_Set({adapter_index}, count = {})",
            levels.len()
        );

        let raw: Vec<ffi::ADLODPerformanceLevel> =
            levels.iter().copied().map(Into::into).collect();
        let mut buffer = PerformanceLevelsBuffer::from_levels(&raw);

        AdlStatus::check(unsafe {
            (self.od_performance_levels_set)(adapter_index, buffer.as_mut_ptr())
        })
    }
}

impl From<ffi::ADLODParameterRange> for ParameterRange {
    fn from(range: ffi::ADLODParameterRange) -> Self {
        Self {
            min: range.iMin,
            max: range.iMax,
            step: range.iStep,
        }
    }
}

impl From<ffi::ADLODParameters> for PerformanceRange {
    fn from(parameters: ffi::ADLODParameters) -> Self {
        Self {
            engine_clock: parameters.sEngineClock.into(),
            memory_clock: parameters.sMemoryClock.into(),
            voltage: parameters.sVddc.into(),
            supports_discrete_levels: parameters.iDiscretePerformanceLevels != 0,
            level_count: parameters.iNumberOfPerformanceLevels,
        }
    }
}

impl From<ffi::ADLODPerformanceLevel> for PerformanceLevel {
    fn from(level: ffi::ADLODPerformanceLevel) -> Self {
        Self {
            engine_clock: level.iEngineClock,
            memory_clock: level.iMemoryClock,
            core_voltage: level.iVddc,
        }
    }
}

impl From<PerformanceLevel> for ffi::ADLODPerformanceLevel {
    fn from(level: PerformanceLevel) -> Self {
        Self {
            iEngineClock: level.engine_clock,
            iMemoryClock: level.memory_clock,
            iVddc: level.core_voltage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_library_is_session_error() {
        let err = Adl::load(&["/nonexistent/libatiadlxx.so".to_string()])
            .err()
            .unwrap();

        assert!(matches!(err, AtitweakError::Session { .. }));
        assert!(err.to_string().contains("/nonexistent/libatiadlxx.so"));
    }

    #[test]
    fn od_parameters_conversion() {
        let parameters = ffi::ADLODParameters {
            iNumberOfPerformanceLevels: 3,
            iDiscretePerformanceLevels: 1,
            sEngineClock: ffi::ADLODParameterRange { iMin: 15000, iMax: 110000, iStep: 500 },
            sVddc: ffi::ADLODParameterRange { iMin: 900, iMax: 1300, iStep: 5 },
            ..ffi::ADLODParameters::sized()
        };

        let range = PerformanceRange::from(parameters);

        assert!(range.supports_discrete_levels);
        assert_eq!(range.level_count, 3);
        assert_eq!(range.engine_clock, ParameterRange { min: 15000, max: 110000, step: 500 });
        assert_eq!(range.voltage.max, 1300);
    }
}
