use tracing::{debug, trace};

use crate::{
    errors::{AtitweakError, Result},
    session::Session,
};

// Clocks are stored in hundredths of MHz and voltages in millivolts
pub const CLOCK_SCALE: f64 = 100.0;
pub const VOLTAGE_SCALE: f64 = 1000.0;

// Upper bound on the level count accepted from the native interface
pub const MAX_PERFORMANCE_LEVELS: usize = 64;

// Convert a clock in MHz to the stored hundredths of MHz
pub fn store_clock(mhz: f64) -> i32 {
    (mhz * CLOCK_SCALE).round() as i32
}

// Convert a voltage in VDC to the stored millivolts
pub fn store_voltage(volts: f64) -> i32 {
    (volts * VOLTAGE_SCALE).round() as i32
}

pub fn display_clock(stored: i32) -> f64 {
    stored as f64 / CLOCK_SCALE
}

pub fn display_voltage(stored: i32) -> f64 {
    stored as f64 / VOLTAGE_SCALE
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParameterRange {
    pub min: i32,
    pub max: i32,
    pub step: i32,
}

// Tunable range of an adapter, clocks in hundredths of MHz, voltage in mV
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceRange {
    pub engine_clock: ParameterRange,
    pub memory_clock: ParameterRange,
    pub voltage: ParameterRange,

    pub supports_discrete_levels: bool,
    pub level_count: i32,
}

// One discrete operating point of an adapter
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceLevel {
    pub engine_clock: i32,
    pub memory_clock: i32,
    pub core_voltage: i32,
}

// Fields to overwrite on the selected performance levels, already scaled
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LevelSettings {
    pub engine_clock: Option<i32>,
    pub memory_clock: Option<i32>,
    pub core_voltage: Option<i32>,
}

impl LevelSettings {
    // Build the settings from user facing values (MHz, MHz, VDC)
    pub fn from_user_values(
        engine_clock: Option<f64>,
        memory_clock: Option<f64>,
        core_voltage: Option<f64>,
    ) -> Result<Self> {
        Ok(Self {
            engine_clock: engine_clock
                .map(|v| scale_checked("engine clock", v, CLOCK_SCALE, store_clock))
                .transpose()?,
            memory_clock: memory_clock
                .map(|v| scale_checked("memory clock", v, CLOCK_SCALE, store_clock))
                .transpose()?,
            core_voltage: core_voltage
                .map(|v| scale_checked("core voltage", v, VOLTAGE_SCALE, store_voltage))
                .transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.engine_clock.is_none()
            && self.memory_clock.is_none()
            && self.core_voltage.is_none()
    }

    // Fill the fields missing in `self` from `fallback`
    pub fn or(self, fallback: LevelSettings) -> Self {
        Self {
            engine_clock: self.engine_clock.or(fallback.engine_clock),
            memory_clock: self.memory_clock.or(fallback.memory_clock),
            core_voltage: self.core_voltage.or(fallback.core_voltage),
        }
    }

    // Overwrite the supplied fields, the others are left untouched
    pub fn apply(&self, level: &mut PerformanceLevel) {
        if let Some(engine_clock) = self.engine_clock {
            level.engine_clock = engine_clock;
        }
        if let Some(memory_clock) = self.memory_clock {
            level.memory_clock = memory_clock;
        }
        if let Some(core_voltage) = self.core_voltage {
            level.core_voltage = core_voltage;
        }
    }

    // Human readable list of the fields this changes
    pub fn describe(&self) -> String {
        let mut message = Vec::new();

        if let Some(engine_clock) = self.engine_clock {
            message.push(format!("engine clock {}MHz", display_clock(engine_clock)));
        }
        if let Some(memory_clock) = self.memory_clock {
            message.push(format!("memory clock {}MHz", display_clock(memory_clock)));
        }
        if let Some(core_voltage) = self.core_voltage {
            message.push(format!("core voltage {}VDC", display_voltage(core_voltage)));
        }

        message.join(", ")
    }
}

// Validate a user value against `scale` before converting it with `store`
fn scale_checked(
    what: &'static str,
    value: f64,
    scale: f64,
    store: fn(f64) -> i32,
) -> Result<i32> {
    let scaled = (value * scale).round();

    if !scaled.is_finite() || scaled < 0.0 || scaled > i32::MAX as f64 {
        return Err(AtitweakError::invalid_argument(
            what,
            value.to_string(),
            "expected a finite, non-negative value",
        ));
    }

    Ok(store(value))
}

// Fetch the tunable range of an adapter and, when the adapter supports
// discrete performance levels, its whole level table
pub fn read_performance(
    session: &Session,
    adapter_index: i32,
) -> Result<(PerformanceRange, Vec<PerformanceLevel>)> {
    let range = session
        .control()
        .od_parameters(adapter_index)
        .map_err(|status| {
            AtitweakError::query("ADL_Overdrive5_ODParameters_Get", status)
        })?;

    trace!("Adapter {adapter_index} range: {range:?}");

    if !range.supports_discrete_levels {
        debug!("Adapter {adapter_index} has no discrete performance levels");

        return Ok((range, Vec::new()));
    }

    let count = checked_level_count(range.level_count)?;

    let levels = session
        .control()
        .od_performance_levels(adapter_index, count)
        .map_err(|status| {
            AtitweakError::query("ADL_Overdrive5_ODPerformanceLevels_Get", status)
        })?;

    if levels.len() != count {
        return Err(AtitweakError::Query {
            reason: format!(
                "ADL_Overdrive5_ODPerformanceLevels_Get returned {} levels, expected {count}.",
                levels.len()
            ),
        });
    }

    Ok((range, levels))
}

// Submit the whole level table of an adapter in one call
pub fn write_performance(
    session: &Session,
    adapter_index: i32,
    levels: &[PerformanceLevel],
) -> Result<()> {
    trace!("Writing {} levels to adapter {adapter_index}", levels.len());

    session
        .control()
        .set_od_performance_levels(adapter_index, levels)
        .map_err(|status| {
            AtitweakError::write("ADL_Overdrive5_ODPerformanceLevels_Set", status)
        })
}

fn checked_level_count(level_count: i32) -> Result<usize> {
    match usize::try_from(level_count) {
        Ok(count) if (1..=MAX_PERFORMANCE_LEVELS).contains(&count) => Ok(count),
        _ => Err(AtitweakError::Query {
            reason: format!(
                "ADL_Overdrive5_ODParameters_Get reported {level_count} performance levels."
            ),
        }),
    }
}
