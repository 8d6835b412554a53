//! Province/city resolution from free-text article titles.
//!
//! The index is built once at startup from a two-column reference CSV
//! (`province,city`, one row per pair) and passed by reference into the
//! crawl. Matching is substring-based over regex alternations of the
//! known names: the leftmost match wins per category, and a title that
//! names a city without its province is completed from the reference
//! table. Substring matching is knowingly ambiguous for names contained
//! in unrelated words; the tie-break is fixed, not confidence-ranked.

use crate::error::LocationError;
use itertools::Itertools;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Lookup index over all known province and city names.
#[derive(Debug)]
pub struct LocationIndex {
    provinces: Vec<String>,
    cities: Vec<String>,
    city_to_province: HashMap<String, String>,
    province_matcher: Option<Regex>,
    city_matcher: Option<Regex>,
}

impl LocationIndex {
    /// Build an index from (province, city) pairs.
    ///
    /// Pairs are taken in order; duplicate names are dropped while
    /// preserving first-seen order, and a city seen under two provinces
    /// keeps its first pairing. Pairs with an empty side are skipped.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut provinces = Vec::new();
        let mut cities = Vec::new();
        let mut city_to_province = HashMap::new();

        for (province, city) in pairs {
            let province = province.trim().to_string();
            let city = city.trim().to_string();
            if province.is_empty() || city.is_empty() {
                continue;
            }
            provinces.push(province.clone());
            cities.push(city.clone());
            city_to_province.entry(city).or_insert(province);
        }

        let provinces: Vec<String> = provinces.into_iter().unique().collect();
        let cities: Vec<String> = cities.into_iter().unique().collect();
        let province_matcher = build_matcher(&provinces);
        let city_matcher = build_matcher(&cities);

        Self {
            provinces,
            cities,
            city_to_province,
            province_matcher,
            city_matcher,
        }
    }

    /// Load the index from the reference CSV.
    ///
    /// The first line is a header and skipped. Rows without a comma or
    /// with an empty province or city are logged and dropped; only a
    /// missing or unreadable file is an error.
    pub async fn from_csv_path(path: &str) -> Result<Self, LocationError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LocationError::Io {
                path: path.to_string(),
                source,
            })?;

        let mut pairs = Vec::new();
        for (line_no, line) in raw.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.split_once(',') {
                Some((province, city))
                    if !province.trim().is_empty() && !city.trim().is_empty() =>
                {
                    pairs.push((province.trim().to_string(), city.trim().to_string()));
                }
                _ => warn!(path, line = line_no + 1, "skipping malformed reference row"),
            }
        }
        debug!(path, rows = pairs.len(), "reference table loaded");
        Ok(Self::from_pairs(pairs))
    }

    /// Resolve a title to a best-effort (province, city) pair.
    ///
    /// Each category is scanned independently and only the first match is
    /// kept. When a city matches but no province does, the province is
    /// filled from the reference table. A title naming neither returns
    /// `(None, None)`.
    pub fn resolve(&self, title: &str) -> (Option<String>, Option<String>) {
        let province = self
            .province_matcher
            .as_ref()
            .and_then(|re| re.find(title))
            .map(|m| m.as_str().to_string());
        let city = self
            .city_matcher
            .as_ref()
            .and_then(|re| re.find(title))
            .map(|m| m.as_str().to_string());

        let province = province.or_else(|| {
            city.as_deref()
                .and_then(|c| self.province_of(c).map(str::to_string))
        });

        (province, city)
    }

    /// The province a known city belongs to.
    pub fn province_of(&self, city: &str) -> Option<&str> {
        self.city_to_province.get(city).map(String::as_str)
    }

    pub fn province_count(&self) -> usize {
        self.provinces.len()
    }

    pub fn city_count(&self) -> usize {
        self.cities.len()
    }
}

/// Compile an alternation matcher over literal names. An empty name list
/// yields no matcher at all; an empty alternation pattern would match at
/// every position.
fn build_matcher(names: &[String]) -> Option<Regex> {
    if names.is_empty() {
        return None;
    }
    let pattern = names.iter().map(|name| regex::escape(name)).join("|");
    Some(Regex::new(&pattern).expect("alternation of escaped literals compiles"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> LocationIndex {
        LocationIndex::from_pairs(vec![
            ("广东".to_string(), "深圳".to_string()),
            ("广东".to_string(), "广州".to_string()),
            ("北京".to_string(), "北京".to_string()),
            ("江苏".to_string(), "南京".to_string()),
        ])
    }

    #[test]
    fn test_city_only_title_fills_province_from_table() {
        let index = sample_index();
        let (province, city) = index.resolve("深圳发布新能源政策");
        assert_eq!(province.as_deref(), Some("广东"));
        assert_eq!(city.as_deref(), Some("深圳"));
    }

    #[test]
    fn test_explicit_province_and_city_both_kept() {
        let index = sample_index();
        let (province, city) = index.resolve("广东深圳加快充电桩建设");
        assert_eq!(province.as_deref(), Some("广东"));
        assert_eq!(city.as_deref(), Some("深圳"));
    }

    #[test]
    fn test_first_match_wins_per_category() {
        let index = sample_index();
        let (province, city) = index.resolve("南京、广州联合印发实施细则");
        // Leftmost city wins; its province backfills the missing one.
        assert_eq!(city.as_deref(), Some("南京"));
        assert_eq!(province.as_deref(), Some("江苏"));
    }

    #[test]
    fn test_no_known_name_yields_empty_result() {
        let index = sample_index();
        assert_eq!(index.resolve("国家能源局发布季度统计"), (None, None));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let index = sample_index();
        let title = "广州深圳两地同步启动试点";
        assert_eq!(index.resolve(title), index.resolve(title));
    }

    #[test]
    fn test_province_of_unknown_city_is_none() {
        let index = sample_index();
        assert_eq!(index.province_of("杭州"), None);
        assert_eq!(index.province_of("南京"), Some("江苏"));
    }

    #[test]
    fn test_empty_index_matches_nothing() {
        let index = LocationIndex::from_pairs(Vec::new());
        assert_eq!(index.resolve("深圳发布新能源政策"), (None, None));
        assert_eq!(index.province_count(), 0);
    }

    #[test]
    fn test_duplicate_pairs_are_deduped_in_order() {
        let index = LocationIndex::from_pairs(vec![
            ("广东".to_string(), "深圳".to_string()),
            ("广东".to_string(), "深圳".to_string()),
            ("广东".to_string(), "珠海".to_string()),
        ]);
        assert_eq!(index.province_count(), 1);
        assert_eq!(index.city_count(), 2);
    }

    #[test]
    fn test_city_under_two_provinces_keeps_first_pairing() {
        let index = LocationIndex::from_pairs(vec![
            ("吉林".to_string(), "白山".to_string()),
            ("黑龙江".to_string(), "白山".to_string()),
        ]);
        assert_eq!(index.province_of("白山"), Some("吉林"));
    }

    #[test]
    fn test_blank_sides_are_skipped() {
        let index = LocationIndex::from_pairs(vec![
            ("".to_string(), "深圳".to_string()),
            ("广东".to_string(), "  ".to_string()),
            ("广东".to_string(), "深圳".to_string()),
        ]);
        assert_eq!(index.province_count(), 1);
        assert_eq!(index.city_count(), 1);
    }
}
