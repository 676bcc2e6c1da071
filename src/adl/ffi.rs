// Raw ADL records and entry point signatures, laid out as in the ADL SDK headers
#![allow(non_snake_case, non_camel_case_types)]

use std::ffi::{c_char, c_int, c_void};
use std::mem::size_of;

pub const ADL_MAX_PATH: usize = 256;

pub const ADL_TRUE: c_int = 1;

pub const ADL_OK_WAIT: c_int = 4;
pub const ADL_OK_RESTART: c_int = 3;
pub const ADL_OK_MODE_CHANGE: c_int = 2;
pub const ADL_OK_WARNING: c_int = 1;
pub const ADL_OK: c_int = 0;
pub const ADL_ERR: c_int = -1;
pub const ADL_ERR_NOT_INIT: c_int = -2;
pub const ADL_ERR_INVALID_PARAM: c_int = -3;
pub const ADL_ERR_INVALID_PARAM_SIZE: c_int = -4;
pub const ADL_ERR_INVALID_ADL_IDX: c_int = -5;
pub const ADL_ERR_INVALID_CONTROLLER_IDX: c_int = -6;
pub const ADL_ERR_INVALID_DIPLAY_IDX: c_int = -7;
pub const ADL_ERR_NOT_SUPPORTED: c_int = -8;
pub const ADL_ERR_NULL_POINTER: c_int = -9;
pub const ADL_ERR_DISABLED_ADAPTER: c_int = -10;
pub const ADL_ERR_INVALID_CALLBACK: c_int = -11;
pub const ADL_ERR_RESOURCE_CONFLICT: c_int = -12;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct AdapterInfoRaw {
    pub iSize: c_int,
    pub iAdapterIndex: c_int,
    pub strUDID: [c_char; ADL_MAX_PATH],
    pub iBusNumber: c_int,
    pub iDeviceNumber: c_int,
    pub iFunctionNumber: c_int,
    pub iVendorID: c_int,
    pub strAdapterName: [c_char; ADL_MAX_PATH],
    pub strDisplayName: [c_char; ADL_MAX_PATH],
    pub iPresent: c_int,
    #[cfg(windows)]
    pub iExist: c_int,
    #[cfg(windows)]
    pub strDriverPath: [c_char; ADL_MAX_PATH],
    #[cfg(windows)]
    pub strDriverPathExt: [c_char; ADL_MAX_PATH],
    #[cfg(windows)]
    pub strPNPString: [c_char; ADL_MAX_PATH],
    #[cfg(windows)]
    pub iOSDisplayIndex: c_int,
    #[cfg(not(windows))]
    pub iXScreenNum: c_int,
    #[cfg(not(windows))]
    pub iDrvIndex: c_int,
    #[cfg(not(windows))]
    pub strXScreenConfigName: [c_char; ADL_MAX_PATH],
}

impl AdapterInfoRaw {
    pub fn zeroed() -> Self {
        // SAFETY: the record only holds integers and byte arrays
        unsafe { std::mem::zeroed() }
    }
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ADLODParameterRange {
    pub iMin: c_int,
    pub iMax: c_int,
    pub iStep: c_int,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ADLODParameters {
    pub iSize: c_int,
    pub iNumberOfPerformanceLevels: c_int,
    pub iActivityReportingSupported: c_int,
    pub iDiscretePerformanceLevels: c_int,
    pub iReserved: c_int,
    pub sEngineClock: ADLODParameterRange,
    pub sMemoryClock: ADLODParameterRange,
    pub sVddc: ADLODParameterRange,
}

impl ADLODParameters {
    pub fn sized() -> Self {
        Self {
            iSize: size_of::<Self>() as c_int,
            ..Default::default()
        }
    }
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ADLODPerformanceLevel {
    pub iEngineClock: c_int,
    pub iMemoryClock: c_int,
    pub iVddc: c_int,
}

// Header of the variable length level table, `aLevels` continues past the
// single declared element
#[repr(C)]
pub struct ADLODPerformanceLevels {
    pub iSize: c_int,
    pub iReserved: c_int,
    pub aLevels: [ADLODPerformanceLevel; 1],
}

const HEADER_WORDS: usize = 2;
const LEVEL_WORDS: usize = size_of::<ADLODPerformanceLevel>() / size_of::<c_int>();

// Owned `ADLODPerformanceLevels` table holding exactly `count` levels.
//
// The storage is a vector of `c_int`, which has the alignment of the C
// record, and `iSize` is derived from the level count when the buffer is built.
pub struct PerformanceLevelsBuffer {
    words: Vec<c_int>,
}

impl PerformanceLevelsBuffer {
    // Zeroed table for `count` levels, `count` must be at least one
    pub fn new(count: usize) -> Self {
        let count = count.max(1);
        let mut words = vec![0; HEADER_WORDS + LEVEL_WORDS * count];
        words[0] = (words.len() * size_of::<c_int>()) as c_int;

        Self { words }
    }

    pub fn from_levels(levels: &[ADLODPerformanceLevel]) -> Self {
        let mut buffer = Self::new(levels.len());
        for (chunk, level) in buffer.words[HEADER_WORDS..]
            .chunks_exact_mut(LEVEL_WORDS)
            .zip(levels)
        {
            chunk.copy_from_slice(&[
                level.iEngineClock,
                level.iMemoryClock,
                level.iVddc,
            ]);
        }

        buffer
    }

    pub fn levels(&self) -> Vec<ADLODPerformanceLevel> {
        self.words[HEADER_WORDS..]
            .chunks_exact(LEVEL_WORDS)
            .map(|chunk| ADLODPerformanceLevel {
                iEngineClock: chunk[0],
                iMemoryClock: chunk[1],
                iVddc: chunk[2],
            })
            .collect()
    }

    pub fn as_mut_ptr(&mut self) -> *mut ADLODPerformanceLevels {
        self.words.as_mut_ptr().cast()
    }
}

pub type ADL_MAIN_MALLOC_CALLBACK = unsafe extern "C" fn(c_int) -> *mut c_void;

pub type ADL_Main_Control_Create =
    unsafe extern "C" fn(ADL_MAIN_MALLOC_CALLBACK, c_int) -> c_int;
pub type ADL_Main_Control_Destroy = unsafe extern "C" fn() -> c_int;
pub type ADL_Adapter_NumberOfAdapters_Get = unsafe extern "C" fn(*mut c_int) -> c_int;
pub type ADL_Adapter_AdapterInfo_Get =
    unsafe extern "C" fn(*mut AdapterInfoRaw, c_int) -> c_int;
pub type ADL_Adapter_Active_Get = unsafe extern "C" fn(c_int, *mut c_int) -> c_int;
pub type ADL_Overdrive5_ODParameters_Get =
    unsafe extern "C" fn(c_int, *mut ADLODParameters) -> c_int;
pub type ADL_Overdrive5_ODPerformanceLevels_Get =
    unsafe extern "C" fn(c_int, c_int, *mut ADLODPerformanceLevels) -> c_int;
pub type ADL_Overdrive5_ODPerformanceLevels_Set =
    unsafe extern "C" fn(c_int, *mut ADLODPerformanceLevels) -> c_int;

// Read a NUL terminated fixed size C string
pub fn fixed_c_string(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .map(|&c| c as u8)
        .take_while(|&b| b != 0)
        .collect();

    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn levels_buffer_size_matches_c_layout() {
        let buffer = PerformanceLevelsBuffer::new(3);

        assert_eq!(buffer.levels().len(), 3);
        assert_eq!(
            buffer.words[0] as usize,
            size_of::<ADLODPerformanceLevels>() + 2 * size_of::<ADLODPerformanceLevel>()
        );
    }

    #[test]
    fn levels_buffer_keeps_order() {
        let levels = [
            ADLODPerformanceLevel { iEngineClock: 15000, iMemoryClock: 30000, iVddc: 900 },
            ADLODPerformanceLevel { iEngineClock: 50000, iMemoryClock: 100000, iVddc: 1000 },
        ];
        let buffer = PerformanceLevelsBuffer::from_levels(&levels);

        assert_eq!(buffer.levels(), levels.to_vec());
    }

    #[test]
    fn fixed_c_string_stops_at_nul() {
        let mut raw = [0 as c_char; 16];
        for (i, b) in b"Radeon".iter().enumerate() {
            raw[i] = *b as c_char;
        }

        assert_eq!(fixed_c_string(&raw), "Radeon");
        assert_eq!(fixed_c_string(&[0; 4]), "");
    }
}
