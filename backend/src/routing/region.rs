//! Local region-bucket optimizer
//!
//! Groups deliveries by the administrative prefix of their address (city or
//! county, then district or township). The start stop's region comes first,
//! other regions follow in order of first appearance, and stops keep their
//! relative order inside a region. No coordinates, no network.

use super::RouteOptimizer;
use crate::error::AppError;
use crate::state::Stop;
use async_trait::async_trait;

const CITY_SUFFIXES: [char; 2] = ['市', '縣'];
const DISTRICT_SUFFIXES: [char; 4] = ['區', '鄉', '鎮', '市'];

/// Heuristic optimizer that clusters deliveries by region
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionBucketOptimizer;

#[async_trait]
impl RouteOptimizer for RegionBucketOptimizer {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn propose_order(
        &self,
        start: &Stop,
        deliveries: &[Stop],
    ) -> Result<Vec<String>, AppError> {
        Ok(bucket_order(start, deliveries))
    }
}

/// Administrative region of an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// City or county, e.g. `新北市`
    pub city: String,
    /// District or township inside the city, e.g. `鶯歌區`
    pub district: String,
}

/// Derive the region of an address
///
/// Taiwanese addresses are read by their `市/縣` and `區/鄉/鎮/市` suffixes.
/// Other addresses fall back to their last comma-separated component as the
/// city with no district.
pub fn region_of(address: &str) -> Region {
    let address = address.trim();
    // Postal codes sometimes lead the address
    let address = address.trim_start_matches(|c: char| c.is_ascii_digit() || c.is_whitespace());

    if let Some(city_end) = suffix_end(address, &CITY_SUFFIXES, 0) {
        let city = &address[..city_end];
        let district = suffix_end(address, &DISTRICT_SUFFIXES, city_end)
            .map(|end| &address[city_end..end])
            .unwrap_or("");
        return Region {
            city: city.to_string(),
            district: district.to_string(),
        };
    }

    let city = address
        .rsplit(',')
        .map(str::trim)
        .find(|part| !part.is_empty())
        .unwrap_or(address);
    Region {
        city: city.to_lowercase(),
        district: String::new(),
    }
}

/// Byte offset just past the first suffix char found within a short window
fn suffix_end(address: &str, suffixes: &[char], from: usize) -> Option<usize> {
    // Region names are at most a few characters long
    const WINDOW_CHARS: usize = 4;
    address[from..]
        .char_indices()
        .take(WINDOW_CHARS)
        .skip(1)
        .find(|(_, c)| suffixes.contains(c))
        .map(|(offset, c)| from + offset + c.len_utf8())
}

fn bucket_order(start: &Stop, deliveries: &[Stop]) -> Vec<String> {
    let start_region = region_of(&start.address);
    let regions: Vec<Region> = deliveries.iter().map(|s| region_of(&s.address)).collect();

    let mut cities: Vec<&str> = vec![start_region.city.as_str()];
    let mut districts: Vec<(&str, &str)> =
        vec![(start_region.city.as_str(), start_region.district.as_str())];
    for region in &regions {
        if !cities.contains(&region.city.as_str()) {
            cities.push(&region.city);
        }
        let key = (region.city.as_str(), region.district.as_str());
        if !districts.contains(&key) {
            districts.push(key);
        }
    }

    let rank = |region: &Region| {
        let city_rank = cities.iter().position(|c| *c == region.city);
        let district_rank = districts
            .iter()
            .position(|(c, d)| *c == region.city && *d == region.district);
        (city_rank, district_rank)
    };

    let mut indexed: Vec<(usize, &Stop)> = deliveries.iter().enumerate().collect();
    // Stable sort keeps the original order inside a bucket
    indexed.sort_by_key(|(i, _)| rank(&regions[*i]));
    indexed.into_iter().map(|(_, s)| s.id.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_of_taiwanese_addresses() {
        assert_eq!(
            region_of("新北市鶯歌區高職西街118巷42-51號"),
            Region {
                city: "新北市".to_string(),
                district: "鶯歌區".to_string()
            }
        );
        assert_eq!(
            region_of("302 新竹縣竹北市新溪街18號"),
            Region {
                city: "新竹縣".to_string(),
                district: "竹北市".to_string()
            }
        );
    }

    #[test]
    fn test_region_of_other_addresses() {
        let region = region_of("12 Main St, Springfield");
        assert_eq!(region.city, "springfield");
        assert_eq!(region.district, "");
    }

    #[tokio::test]
    async fn test_bucket_order_groups_regions() {
        let start = Stop::start("新北市板橋區金門街215巷78-5號", "TilePark 本社", "");
        let taichung = Stop::delivery("台中市南屯區大墩十二街122號", "威麟磁藝", "");
        let yingge = Stop::delivery("新北市鶯歌區高職西街118巷42-51號", "棨新陶瓷", "");
        let hsinchu = Stop::delivery("新竹縣竹北市新溪街18號", "鼎晨磁磚", "");
        let banqiao = Stop::delivery("新北市板橋區文化路一段1號", "板橋客戶", "");
        let taichung2 = Stop::delivery("台中市南屯區公益路二段2號", "南屯客戶", "");
        let deliveries = vec![
            taichung.clone(),
            yingge.clone(),
            hsinchu.clone(),
            banqiao.clone(),
            taichung2.clone(),
        ];

        let order = RegionBucketOptimizer
            .propose_order(&start, &deliveries)
            .await
            .unwrap();

        let expected: Vec<String> = [&banqiao, &yingge, &taichung, &taichung2, &hsinchu]
            .iter()
            .map(|s| s.id.to_string())
            .collect();
        assert_eq!(order, expected);
    }
}
