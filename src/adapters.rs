use tracing::{debug, trace};

use crate::{
    errors::{AtitweakError, Result},
    session::Session,
};

// An active adapter as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterRecord {
    // Position among the active adapters, what `--adapter` refers to
    pub index: usize,
    // Native ADL adapter index, used for every per adapter call
    pub adapter_index: i32,

    pub name: String,
    pub display_name: String,
    pub active: bool,
}

// Enumerate the adapters and keep the active ones, renumbered from 0 in
// native table order
pub fn list_active_adapters(session: &Session) -> Result<Vec<AdapterRecord>> {
    let control = session.control();

    let count = control.number_of_adapters().map_err(|status| {
        AtitweakError::query("ADL_Adapter_NumberOfAdapters_Get", status)
    })?;

    let count = usize::try_from(count).map_err(|_| AtitweakError::Query {
        reason: format!("ADL_Adapter_NumberOfAdapters_Get reported {count} adapters."),
    })?;

    debug!("ADL reports {count} adapters");

    let table = control
        .adapter_info(count)
        .map_err(|status| AtitweakError::query("ADL_Adapter_AdapterInfo_Get", status))?;

    let mut adapters = Vec::new();
    for (position, info) in table.into_iter().enumerate() {
        let active = control
            .adapter_active(position as i32)
            .map_err(|status| AtitweakError::query("ADL_Adapter_Active_Get", status))?;

        trace!(
            "Adapter {position} ({}): {}",
            info.adapter_index,
            if active { "active" } else { "inactive" }
        );

        if active {
            adapters.push(AdapterRecord {
                index: adapters.len(),
                adapter_index: info.adapter_index,
                name: info.adapter_name,
                display_name: info.display_name,
                active,
            });
        }
    }

    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adl::{
        AdlStatus, ffi,
        mock::{Call, Entry, MockAdapter, MockInterface},
    };
    use pretty_assertions::assert_eq;

    fn list(mock: &MockInterface) -> Result<Vec<AdapterRecord>> {
        let session = Session::initialize(mock)?;
        list_active_adapters(&session)
    }

    #[test]
    fn active_adapters_are_renumbered_in_order() {
        let mock = MockInterface::new()
            .with_adapter(MockAdapter::new(0, "Radeon A").inactive())
            .with_adapter(MockAdapter::new(1, "Radeon B"))
            .with_adapter(MockAdapter::new(2, "Radeon C").inactive())
            .with_adapter(MockAdapter::new(3, "Radeon D"));

        let adapters = list(&mock).unwrap();

        let summary: Vec<(usize, i32, &str)> = adapters
            .iter()
            .map(|a| (a.index, a.adapter_index, a.name.as_str()))
            .collect();
        assert_eq!(summary, vec![(0, 1, "Radeon B"), (1, 3, "Radeon D")]);
        assert!(adapters.iter().all(|a| a.active));
    }

    #[test]
    fn status_is_queried_per_entry() {
        let mock = MockInterface::new()
            .with_adapter(MockAdapter::new(10, "Radeon A"))
            .with_adapter(MockAdapter::new(11, "Radeon B"));

        list(&mock).unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                Call::Create { active_only: true },
                Call::NumberOfAdapters,
                Call::AdapterInfo { count: 2 },
                Call::AdapterActive { position: 0 },
                Call::AdapterActive { position: 1 },
            ]
        );
    }

    #[test]
    fn no_adapters() {
        let mock = MockInterface::new();

        assert_eq!(list(&mock).unwrap(), vec![]);
    }

    #[test]
    fn count_failure() {
        let mock = MockInterface::new()
            .fail_on(Entry::NumberOfAdapters, AdlStatus(ffi::ADL_ERR));

        assert_eq!(
            list(&mock),
            Err(AtitweakError::Query {
                reason: "ADL_Adapter_NumberOfAdapters_Get failed (ADL_ERR).".to_string()
            })
        );
        assert_eq!(mock.count(Entry::AdapterInfo), 0);
    }

    #[test]
    fn negative_adapter_count_is_query_error() {
        let mock = MockInterface::new()
            .with_adapter(MockAdapter::new(0, "Radeon"))
            .with_reported_count(-1);

        assert_eq!(
            list(&mock),
            Err(AtitweakError::Query {
                reason: "ADL_Adapter_NumberOfAdapters_Get reported -1 adapters.".to_string()
            })
        );
        assert_eq!(mock.count(Entry::AdapterInfo), 0);
    }

    #[test]
    fn status_failure_aborts_enumeration() {
        let mock = MockInterface::new()
            .with_adapter(MockAdapter::new(0, "Radeon A"))
            .with_adapter(MockAdapter::new(1, "Radeon B"))
            .fail_on(Entry::AdapterActive, AdlStatus(ffi::ADL_ERR_INVALID_ADL_IDX));

        assert!(matches!(list(&mock), Err(AtitweakError::Query { .. })));
        assert_eq!(mock.count(Entry::AdapterActive), 1);
    }
}
