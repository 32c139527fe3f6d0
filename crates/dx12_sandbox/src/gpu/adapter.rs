/// What adapter enumeration learned about one adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterInfo {
    pub name: String,
    /// Software rasterizers such as WARP.
    pub is_software: bool,
    /// Whether a device can be created at feature level 11.0.
    pub meets_minimum_feature_level: bool,
}

/// Picks the first hardware adapter that meets the minimum feature level.
pub fn select_hardware_adapter(adapters: &[AdapterInfo]) -> Option<usize> {
    adapters
        .iter()
        .position(|adapter| !adapter.is_software && adapter.meets_minimum_feature_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(name: &str, is_software: bool, meets: bool) -> AdapterInfo {
        AdapterInfo {
            name: name.into(),
            is_software,
            meets_minimum_feature_level: meets,
        }
    }

    #[test]
    fn software_adapters_are_skipped() {
        let adapters = [
            adapter("Microsoft Basic Render Driver", true, true),
            adapter("Discrete GPU", false, true),
        ];
        assert_eq!(select_hardware_adapter(&adapters), Some(1));
    }

    #[test]
    fn adapters_below_the_feature_level_are_skipped() {
        let adapters = [
            adapter("Old GPU", false, false),
            adapter("Integrated GPU", false, true),
            adapter("Discrete GPU", false, true),
        ];
        assert_eq!(select_hardware_adapter(&adapters), Some(1));
    }

    #[test]
    fn nothing_is_selected_without_a_capable_hardware_adapter() {
        let adapters = [adapter("WARP", true, true), adapter("Old GPU", false, false)];
        assert_eq!(select_hardware_adapter(&adapters), None);
        assert_eq!(select_hardware_adapter(&[]), None);
    }
}
