use std::fmt;

use crate::performance::{PerformanceLevel, PerformanceRange};

pub mod ffi;
pub mod library;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use library::Adl;

// Return code of an ADL entry point, anything but ADL_OK is a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdlStatus(pub i32);

pub type AdlResult<T> = std::result::Result<T, AdlStatus>;

impl AdlStatus {
    // Map a raw return code to a result
    pub fn check(code: i32) -> AdlResult<()> {
        if code == ffi::ADL_OK {
            Ok(())
        } else {
            Err(AdlStatus(code))
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        let name = match self.0 {
            ffi::ADL_OK_WAIT => "ADL_OK_WAIT",
            ffi::ADL_OK_RESTART => "ADL_OK_RESTART",
            ffi::ADL_OK_MODE_CHANGE => "ADL_OK_MODE_CHANGE",
            ffi::ADL_OK_WARNING => "ADL_OK_WARNING",
            ffi::ADL_OK => "ADL_OK",
            ffi::ADL_ERR => "ADL_ERR",
            ffi::ADL_ERR_NOT_INIT => "ADL_ERR_NOT_INIT",
            ffi::ADL_ERR_INVALID_PARAM => "ADL_ERR_INVALID_PARAM",
            ffi::ADL_ERR_INVALID_PARAM_SIZE => "ADL_ERR_INVALID_PARAM_SIZE",
            ffi::ADL_ERR_INVALID_ADL_IDX => "ADL_ERR_INVALID_ADL_IDX",
            ffi::ADL_ERR_INVALID_CONTROLLER_IDX => "ADL_ERR_INVALID_CONTROLLER_IDX",
            ffi::ADL_ERR_INVALID_DIPLAY_IDX => "ADL_ERR_INVALID_DIPLAY_IDX",
            ffi::ADL_ERR_NOT_SUPPORTED => "ADL_ERR_NOT_SUPPORTED",
            ffi::ADL_ERR_NULL_POINTER => "ADL_ERR_NULL_POINTER",
            ffi::ADL_ERR_DISABLED_ADAPTER => "ADL_ERR_DISABLED_ADAPTER",
            ffi::ADL_ERR_INVALID_CALLBACK => "ADL_ERR_INVALID_CALLBACK",
            ffi::ADL_ERR_RESOURCE_CONFLICT => "ADL_ERR_RESOURCE_CONFLICT",
            _ => return None,
        };

        Some(name)
    }
}

impl fmt::Display for AdlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "ADL status {}", self.0),
        }
    }
}

// One entry of the native adapter table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    // Native ADL adapter index, used for every per adapter call
    pub adapter_index: i32,
    pub adapter_name: String,
    pub display_name: String,
}

/// The subset of the ADL API used to enumerate adapters and tune their
/// Overdrive 5 performance levels.
///
/// Every method is a single blocking native call. Implementations must not
/// retry or reinterpret failures, they only translate the records to and
/// from Rust types.
pub trait ControlInterface {
    // ADL_Main_Control_Create, restricted to active adapters when asked
    fn main_control_create(&self, active_only: bool) -> AdlResult<()>;
    // ADL_Main_Control_Destroy
    fn main_control_destroy(&self) -> AdlResult<()>;

    // ADL_Adapter_NumberOfAdapters_Get
    fn number_of_adapters(&self) -> AdlResult<i32>;
    // ADL_Adapter_AdapterInfo_Get for a table of `count` entries
    fn adapter_info(&self, count: usize) -> AdlResult<Vec<AdapterInfo>>;
    // ADL_Adapter_Active_Get, `position` is the position in the adapter table
    fn adapter_active(&self, position: i32) -> AdlResult<bool>;

    // ADL_Overdrive5_ODParameters_Get
    fn od_parameters(&self, adapter_index: i32) -> AdlResult<PerformanceRange>;
    // ADL_Overdrive5_ODPerformanceLevels_Get with the current (non default) values
    fn od_performance_levels(
        &self,
        adapter_index: i32,
        count: usize,
    ) -> AdlResult<Vec<PerformanceLevel>>;
    // ADL_Overdrive5_ODPerformanceLevels_Set with the whole table
    fn set_od_performance_levels(
        &self,
        adapter_index: i32,
        levels: &[PerformanceLevel],
    ) -> AdlResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_adl_ok_is_success() {
        assert_eq!(AdlStatus::check(ffi::ADL_OK), Ok(()));
        assert_eq!(
            AdlStatus::check(ffi::ADL_OK_WARNING),
            Err(AdlStatus(ffi::ADL_OK_WARNING))
        );
        assert_eq!(AdlStatus::check(ffi::ADL_ERR), Err(AdlStatus(ffi::ADL_ERR)));
    }

    #[test]
    fn unknown_status_display() {
        assert_eq!(AdlStatus(ffi::ADL_ERR_NOT_INIT).to_string(), "ADL_ERR_NOT_INIT");
        assert_eq!(AdlStatus(-42).to_string(), "ADL status -42");
    }
}
