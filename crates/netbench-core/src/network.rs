use serde::Serialize;

use crate::config::SpeedRangeConfig;

/// Bytes per second in one "megabit" as the harness has always counted it
/// (binary mega). Prior result sets were produced with this constant.
const BYTES_PER_SEC_PER_MBPS: f64 = 1_048_576.0 / 8.0;

/// Parameters handed to the browser's network emulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConditions {
    pub offline: bool,
    /// Bytes per second.
    pub download_throughput: f64,
    /// Bytes per second.
    pub upload_throughput: f64,
    /// Milliseconds.
    pub latency: f64,
}

/// A named synthetic network condition.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkProfile {
    pub label: String,
    pub speed_mbps: u32,
    pub conditions: NetworkConditions,
}

impl NetworkProfile {
    fn new(speed_mbps: u32, range: &SpeedRangeConfig) -> Self {
        let throughput = speed_mbps as f64 * BYTES_PER_SEC_PER_MBPS;
        let latency = range.base_latency_ms
            + range.max_mbps.saturating_sub(speed_mbps) as f64 / range.step_mbps.max(1) as f64;
        Self {
            label: format!("{speed_mbps} Mbps"),
            speed_mbps,
            conditions: NetworkConditions {
                offline: false,
                download_throughput: throughput,
                upload_throughput: throughput,
                latency,
            },
        }
    }
}

/// Ordered, immutable set of profiles, fastest first.
#[derive(Debug, Clone)]
pub struct ProfileCatalog {
    profiles: Vec<NetworkProfile>,
}

impl ProfileCatalog {
    /// Step from `max_mbps` down to `min_mbps`, then append `min_mbps`
    /// if the stepping skipped past it.
    ///
    /// A zero step yields only the two endpoints. A minimum above the maximum
    /// yields the minimum alone.
    pub fn generate(range: &SpeedRangeConfig) -> Self {
        let mut profiles = Vec::new();
        let mut speed = Some(range.max_mbps);
        while let Some(s) = speed.filter(|s| *s >= range.min_mbps) {
            profiles.push(NetworkProfile::new(s, range));
            speed = match range.step_mbps {
                0 => None,
                step => s.checked_sub(step),
            };
        }

        if profiles.last().map(|p| p.speed_mbps) != Some(range.min_mbps) {
            profiles.push(NetworkProfile::new(range.min_mbps, range));
        }

        tracing::debug!(count = profiles.len(), "generated network profiles");
        Self { profiles }
    }

    pub fn get(&self, label: &str) -> Option<&NetworkProfile> {
        self.profiles.iter().find(|p| p.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkProfile> {
        self.profiles.iter()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl FromIterator<NetworkProfile> for ProfileCatalog {
    fn from_iter<I: IntoIterator<Item = NetworkProfile>>(iter: I) -> Self {
        Self {
            profiles: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(max: u32, min: u32, step: u32) -> SpeedRangeConfig {
        SpeedRangeConfig {
            max_mbps: max,
            min_mbps: min,
            step_mbps: step,
            base_latency_ms: 20.0,
        }
    }

    #[test]
    fn test_default_range_includes_minimum() {
        let catalog = ProfileCatalog::generate(&range(500, 10, 50));
        assert_eq!(
            catalog.labels(),
            vec![
                "500 Mbps", "450 Mbps", "400 Mbps", "350 Mbps", "300 Mbps", "250 Mbps",
                "200 Mbps", "150 Mbps", "100 Mbps", "50 Mbps", "10 Mbps",
            ]
        );
    }

    #[test]
    fn test_minimum_not_duplicated_when_step_lands_on_it() {
        let catalog = ProfileCatalog::generate(&range(100, 20, 40));
        assert_eq!(catalog.labels(), vec!["100 Mbps", "60 Mbps", "20 Mbps"]);
    }

    #[test]
    fn test_single_speed_range() {
        let catalog = ProfileCatalog::generate(&range(10, 10, 50));
        assert_eq!(catalog.labels(), vec!["10 Mbps"]);
    }

    #[test]
    fn test_zero_step_yields_endpoints() {
        let catalog = ProfileCatalog::generate(&range(100, 10, 0));
        assert_eq!(catalog.labels(), vec!["100 Mbps", "10 Mbps"]);
        assert_eq!(catalog.get("10 Mbps").unwrap().conditions.latency, 110.0);
    }

    #[test]
    fn test_minimum_above_maximum_yields_minimum_only() {
        let catalog = ProfileCatalog::generate(&range(500, 600, 50));
        assert_eq!(catalog.labels(), vec!["600 Mbps"]);
        assert_eq!(catalog.get("600 Mbps").unwrap().conditions.latency, 20.0);
    }

    #[test]
    fn test_throughput_uses_binary_mega() {
        let catalog = ProfileCatalog::generate(&range(500, 10, 50));
        for profile in catalog.iter() {
            let expected = profile.speed_mbps as f64 * 1_048_576.0 / 8.0;
            let c = profile.conditions;
            assert!((c.download_throughput - expected).abs() < 1e-9);
            assert!((c.upload_throughput - expected).abs() < 1e-9);
            assert!(!c.offline);
        }
        let fastest = catalog.get("500 Mbps").unwrap();
        assert_eq!(fastest.conditions.download_throughput, 65_536_000.0);
    }

    #[test]
    fn test_latency_grows_as_speed_drops() {
        let catalog = ProfileCatalog::generate(&range(500, 10, 50));
        assert_eq!(catalog.get("500 Mbps").unwrap().conditions.latency, 20.0);
        assert_eq!(catalog.get("50 Mbps").unwrap().conditions.latency, 29.0);
        assert!((catalog.get("10 Mbps").unwrap().conditions.latency - 29.8).abs() < 1e-9);

        let latencies: Vec<f64> = catalog.iter().map(|p| p.conditions.latency).collect();
        assert!(latencies.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_conditions_serialize_as_cdp_fields() {
        let catalog = ProfileCatalog::generate(&range(500, 10, 50));
        let json = serde_json::to_value(catalog.get("500 Mbps").unwrap().conditions).unwrap();
        assert_eq!(json["offline"], false);
        assert_eq!(json["downloadThroughput"], 65_536_000.0);
        assert_eq!(json["uploadThroughput"], 65_536_000.0);
        assert_eq!(json["latency"], 20.0);
    }
}
