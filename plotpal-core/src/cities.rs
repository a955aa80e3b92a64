//! Registry of the 36 cities covered by the vacant-land dataset.

/// City code to display name, in the dataset's own ordering.
const CITIES: &[(&str, &str)] = &[
    ("BJ", "Beijing"),
    ("SH", "Shanghai"),
    ("GZ", "Guangzhou"),
    ("SZ", "Shenzhen"),
    ("CD", "Chengdu"),
    ("CQ", "Chongqing"),
    ("TJ", "Tianjin"),
    ("WH", "Wuhan"),
    ("NJ", "Nanjing"),
    ("HZ", "Hangzhou"),
    ("CC", "Changchun"),
    ("CS", "Changsha"),
    ("DL", "Dalian"),
    ("FZ", "Fuzhou"),
    ("HF", "Hefei"),
    ("HK", "Haikou"),
    ("HR", "Harbin"),
    ("JN", "Jinan"),
    ("KM", "Kunming"),
    ("LZ", "Lanzhou"),
    ("NN", "Nanning"),
    ("NC", "Nanchang"),
    ("QD", "Qingdao"),
    ("SJZ", "Shijiazhuang"),
    ("SY", "Shenyang"),
    ("TY", "Taiyuan"),
    ("TS", "Tangshan"),
    ("WZ", "Wenzhou"),
    ("XA", "Xian"),
    ("XM", "Xiamen"),
    ("XN", "Xining"),
    ("YC", "Yinchuan"),
    ("ZZ", "Zhengzhou"),
    ("ZB", "Zibo"),
    ("ZS", "Zhongshan"),
    ("ZH", "Zhuhai"),
];

/// Static lookup from city code to display name.
#[derive(Debug, Clone, Copy, Default)]
pub struct CityRegistry;

impl CityRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Display name for a code. Codes are case-sensitive (`"BJ"`, not `"bj"`).
    pub fn name(&self, code: &str) -> Option<&'static str> {
        CITIES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.name(code).is_some()
    }

    pub fn codes(&self) -> impl Iterator<Item = &'static str> {
        CITIES.iter().map(|(code, _)| *code)
    }

    pub fn len(&self) -> usize {
        CITIES.len()
    }

    pub fn is_empty(&self) -> bool {
        CITIES.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_lookup() {
        let registry = CityRegistry::new();
        assert_eq!(registry.name("CC"), Some("Changchun"));
        assert_eq!(registry.name("SJZ"), Some("Shijiazhuang"));
        assert_eq!(registry.name("cc"), None);
        assert!(!registry.contains("XX"));
    }

    #[test]
    fn test_registry_has_36_unique_codes() {
        let registry = CityRegistry::new();
        let codes: HashSet<_> = registry.codes().collect();
        assert_eq!(registry.len(), 36);
        assert_eq!(codes.len(), 36);
    }
}
