use std::io::Write;

use tracing::warn;

use crate::{
    adapters::{AdapterRecord, list_active_adapters},
    errors::Result,
    performance::{
        LevelSettings, PerformanceRange, display_clock, display_voltage, read_performance,
        write_performance,
    },
    selection::Selection,
    session::Session,
};

// What a run of the tool does once the session is open
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Print the selected adapters with their ranges and levels
    List,
    // Overwrite fields of the selected levels on the selected adapters
    Set(LevelSettings),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub action: Action,
    pub adapters: Selection,
    pub levels: Selection,
}

pub fn execute(session: &Session, command: &Command, out: &mut dyn Write) -> Result<()> {
    match &command.action {
        Action::List => list_adapters(session, &command.adapters, out),
        Action::Set(settings) => {
            set_levels(session, &command.adapters, &command.levels, settings, out)
        }
    }
}

pub fn list_adapters(
    session: &Session,
    selection: &Selection,
    out: &mut dyn Write,
) -> Result<()> {
    let adapters = selected_adapters(session, selection)?;

    for adapter in adapters {
        writeln!(
            out,
            "{}. {} ({})",
            adapter.index, adapter.name, adapter.display_name
        )?;

        let (range, levels) = read_performance(session, adapter.adapter_index)?;
        write_range(&range, out)?;

        for (index, level) in levels.iter().enumerate() {
            writeln!(
                out,
                "    performance level {index}: engine clock {}MHz, memory clock {}MHz, core voltage {}VDC",
                display_clock(level.engine_clock),
                display_clock(level.memory_clock),
                display_voltage(level.core_voltage)
            )?;
        }
    }

    Ok(())
}

fn write_range(range: &PerformanceRange, out: &mut dyn Write) -> Result<()> {
    writeln!(
        out,
        "    engine clock range is {} - {}MHz",
        display_clock(range.engine_clock.min),
        display_clock(range.engine_clock.max)
    )?;
    writeln!(
        out,
        "    memory clock range is {} - {}MHz",
        display_clock(range.memory_clock.min),
        display_clock(range.memory_clock.max)
    )?;
    writeln!(
        out,
        "    core voltage range is {} - {}VDC",
        display_voltage(range.voltage.min),
        display_voltage(range.voltage.max)
    )?;

    Ok(())
}

// Read-modify-write the level table of every selected adapter
pub fn set_levels(
    session: &Session,
    adapter_selection: &Selection,
    level_selection: &Selection,
    settings: &LevelSettings,
    out: &mut dyn Write,
) -> Result<()> {
    let adapters = selected_adapters(session, adapter_selection)?;

    for adapter in adapters {
        let (range, mut levels) = read_performance(session, adapter.adapter_index)?;

        if !range.supports_discrete_levels {
            writeln!(
                out,
                "Adapter {} does not support discrete performance levels.",
                adapter.index
            )?;

            continue;
        }

        for index in level_selection.out_of_range(levels.len()) {
            warn!("Adapter {} has no performance level {index}", adapter.index);
        }

        for (index, level) in levels.iter_mut().enumerate() {
            if !level_selection.contains(index) {
                continue;
            }

            settings.apply(level);
            writeln!(
                out,
                "Setting performance level {index} on adapter {}: {}",
                adapter.index,
                settings.describe()
            )?;
        }

        write_performance(session, adapter.adapter_index, &levels)?;
    }

    Ok(())
}

fn selected_adapters(session: &Session, selection: &Selection) -> Result<Vec<AdapterRecord>> {
    let adapters = list_active_adapters(session)?;

    for index in selection.out_of_range(adapters.len()) {
        warn!("No active adapter with index {index}");
    }

    Ok(adapters
        .into_iter()
        .filter(|adapter| selection.contains(adapter.index))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adl::{
            AdlStatus, ffi,
            mock::{Entry, MockAdapter, MockInterface},
        },
        errors::AtitweakError,
        performance::PerformanceLevel,
    };
    use pretty_assertions::assert_eq;

    fn run(mock: &MockInterface, command: &Command) -> (Result<()>, String) {
        let mut out = Vec::new();
        let result = Session::initialize(mock)
            .and_then(|session| execute(&session, command, &mut out));

        (result, String::from_utf8(out).unwrap())
    }

    fn set(settings: LevelSettings, adapters: &str, levels: &str) -> Command {
        Command {
            action: Action::Set(settings),
            adapters: Selection::parse("adapter list", adapters).unwrap(),
            levels: Selection::parse("performance level list", levels).unwrap(),
        }
    }

    #[test]
    fn list_prints_range_and_levels() {
        let mock = MockInterface::new().with_adapter(MockAdapter::new(4, "AMD Radeon HD 6900 Series"));
        let command = Command {
            action: Action::List,
            adapters: Selection::All,
            levels: Selection::All,
        };

        let (result, output) = run(&mock, &command);

        assert_eq!(result, Ok(()));
        assert_eq!(
            output,
            "0. AMD Radeon HD 6900 Series (:0.4)\n\
             \x20   engine clock range is 150 - 1100MHz\n\
             \x20   memory clock range is 300 - 1500MHz\n\
             \x20   core voltage range is 0.9 - 1.3VDC\n\
             \x20   performance level 0: engine clock 150MHz, memory clock 300MHz, core voltage 0.9VDC\n\
             \x20   performance level 1: engine clock 500MHz, memory clock 1000MHz, core voltage 1VDC\n\
             \x20   performance level 2: engine clock 850MHz, memory clock 1200MHz, core voltage 1.15VDC\n"
        );
    }

    #[test]
    fn list_without_discrete_levels_prints_only_range() {
        let mock = MockInterface::new()
            .with_adapter(MockAdapter::new(0, "Radeon").without_discrete_levels());
        let command = Command {
            action: Action::List,
            adapters: Selection::All,
            levels: Selection::All,
        };

        let (result, output) = run(&mock, &command);

        assert_eq!(result, Ok(()));
        assert_eq!(output.lines().count(), 4);
        assert!(!output.contains("performance level"));
    }

    #[test]
    fn list_respects_adapter_selection() {
        let mock = MockInterface::new()
            .with_adapter(MockAdapter::new(0, "Radeon A"))
            .with_adapter(MockAdapter::new(1, "Radeon B"));
        let command = Command {
            action: Action::List,
            adapters: Selection::parse("adapter list", "1,7").unwrap(),
            levels: Selection::All,
        };

        let (_, output) = run(&mock, &command);

        assert!(output.starts_with("1. Radeon B"));
        assert!(!output.contains("Radeon A"));
        assert_eq!(mock.count(Entry::OdParameters), 1);
    }

    #[test]
    fn set_modifies_selected_levels_and_writes_whole_table() {
        let mock = MockInterface::new().with_adapter(MockAdapter::new(0, "Radeon"));
        let before = mock.levels(0).unwrap();
        let settings = LevelSettings::from_user_values(Some(900.0), Some(1250.5), None).unwrap();

        let (result, output) = run(&mock, &set(settings, "all", "1,2"));

        assert_eq!(result, Ok(()));
        assert_eq!(
            output,
            "Setting performance level 1 on adapter 0: engine clock 900MHz, memory clock 1250.5MHz\n\
             Setting performance level 2 on adapter 0: engine clock 900MHz, memory clock 1250.5MHz\n"
        );

        let writes = mock.writes();
        assert_eq!(writes.len(), 1);
        let (adapter_index, levels) = &writes[0];
        assert_eq!(*adapter_index, 0);
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0], before[0]);
        assert_eq!(
            levels[2],
            PerformanceLevel {
                engine_clock: 90000,
                memory_clock: 125050,
                core_voltage: before[2].core_voltage,
            }
        );
    }

    #[test]
    fn set_skips_adapters_without_discrete_levels() {
        let mock = MockInterface::new()
            .with_adapter(MockAdapter::new(0, "Radeon A").without_discrete_levels())
            .with_adapter(MockAdapter::new(1, "Radeon B"));
        let settings = LevelSettings::from_user_values(None, None, Some(1.2)).unwrap();

        let (result, output) = run(&mock, &set(settings, "all", "0"));

        assert_eq!(result, Ok(()));
        assert_eq!(
            output,
            "Adapter 0 does not support discrete performance levels.\n\
             Setting performance level 0 on adapter 1: core voltage 1.2VDC\n"
        );
        assert_eq!(mock.writes().len(), 1);
        assert_eq!(mock.writes()[0].0, 1);
    }

    #[test]
    fn set_on_unsupported_adapter_issues_no_write() {
        let mock = MockInterface::new()
            .with_adapter(MockAdapter::new(0, "Radeon").without_discrete_levels());
        let settings = LevelSettings::from_user_values(Some(800.0), None, None).unwrap();

        let (result, output) = run(&mock, &set(settings, "0", "all"));

        assert_eq!(result, Ok(()));
        assert_eq!(output, "Adapter 0 does not support discrete performance levels.\n");
        assert_eq!(mock.count(Entry::SetOdPerformanceLevels), 0);
    }

    #[test]
    fn set_stops_at_first_write_failure() {
        let mock = MockInterface::new()
            .with_adapter(MockAdapter::new(0, "Radeon A"))
            .with_adapter(MockAdapter::new(1, "Radeon B"))
            .fail_on(Entry::SetOdPerformanceLevels, AdlStatus(ffi::ADL_ERR));
        let settings = LevelSettings::from_user_values(Some(800.0), None, None).unwrap();

        let (result, _) = run(&mock, &set(settings, "all", "all"));

        assert!(matches!(result, Err(AtitweakError::Write { .. })));
        assert_eq!(mock.count(Entry::SetOdPerformanceLevels), 1);
        assert_eq!(mock.count(Entry::OdParameters), 1);
    }
}
