use serde::Deserialize;
use std::fmt;

use crate::error::LookupFailure;

/// 找到店铺但响应中没有电话字段时使用的占位值
pub const PHONE_NOT_AVAILABLE: &str = "Phone number not available";

/// 没有找到店铺时在表格中显示的文本
pub const NO_RESULTS_FOUND: &str = "No results found";

/// 一次查询：店铺名 + 地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub name: String,
    pub address: String,
}

impl LookupQuery {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Places API 的 `textQuery` 参数
    pub fn text_query(&self) -> String {
        format!("{}, {}", self.name, self.address)
    }
}

impl fmt::Display for LookupQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text_query())
    }
}

/// 单个查询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    PhoneFound(String),
    NotFound,
    Error(LookupFailure),
}

impl LookupResult {
    pub fn phone_number(&self) -> Option<&str> {
        match self {
            LookupResult::PhoneFound(phone) => Some(phone),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LookupResult::Error(_))
    }

    /// 在表格或日志里展示的文本
    pub fn display_text(&self) -> String {
        match self {
            LookupResult::PhoneFound(phone) => phone.clone(),
            LookupResult::NotFound => NO_RESULTS_FOUND.to_string(),
            LookupResult::Error(failure) => format!("Error: {}", failure),
        }
    }
}

impl fmt::Display for LookupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

/// 查询生命周期中的阶段，只用于日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPhase {
    Init,
    RateLimited,
    InFlight(u32),
    RetryWait(u32),
    Success,
    Exhausted,
}

impl fmt::Display for LookupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupPhase::Init => write!(f, "INIT"),
            LookupPhase::RateLimited => write!(f, "RATE_LIMITED"),
            LookupPhase::InFlight(n) => write!(f, "IN_FLIGHT({})", n),
            LookupPhase::RetryWait(n) => write!(f, "RETRY_WAIT({})", n),
            LookupPhase::Success => write!(f, "SUCCESS"),
            LookupPhase::Exhausted => write!(f, "EXHAUSTED"),
        }
    }
}

/// 一批查询的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: usize,
    pub found: usize,
    pub not_found: usize,
    pub errors: usize,
}

impl BatchReport {
    pub fn from_results(results: &[LookupResult]) -> Self {
        let mut report = BatchReport {
            attempted: results.len(),
            ..Default::default()
        };
        for result in results {
            match result {
                LookupResult::PhoneFound(_) => report.found += 1,
                LookupResult::NotFound => report.not_found += 1,
                LookupResult::Error(_) => report.errors += 1,
            }
        }
        report
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "共 {} 个: 找到电话 {} / 未找到 {} / 失败 {}",
            self.attempted, self.found, self.not_found, self.errors
        )
    }
}

/// `places:searchText` 的响应体（只请求了电话字段）
#[derive(Debug, Deserialize, Default)]
pub struct PlacesResponse {
    #[serde(default)]
    pub places: Vec<PlaceEntry>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceEntry {
    #[serde(rename = "internationalPhoneNumber")]
    pub international_phone_number: Option<String>,
}

impl PlacesResponse {
    /// 取第一个结果的电话，字段缺失时返回占位值
    pub fn into_result(self) -> LookupResult {
        match self.places.into_iter().next() {
            Some(place) => LookupResult::PhoneFound(
                place
                    .international_phone_number
                    .unwrap_or_else(|| PHONE_NOT_AVAILABLE.to_string()),
            ),
            None => LookupResult::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> LookupResult {
        serde_json::from_str::<PlacesResponse>(body)
            .unwrap()
            .into_result()
    }

    #[test]
    fn test_first_place_phone() {
        let result = parse(
            r#"{"places":[{"internationalPhoneNumber":"+1-555-0100"},{"internationalPhoneNumber":"+1-555-0199"}]}"#,
        );
        assert_eq!(result, LookupResult::PhoneFound("+1-555-0100".to_string()));
    }

    #[test]
    fn test_missing_phone_field_uses_sentinel() {
        let result = parse(r#"{"places":[{}]}"#);
        assert_eq!(
            result,
            LookupResult::PhoneFound(PHONE_NOT_AVAILABLE.to_string())
        );
    }

    #[test]
    fn test_empty_or_absent_places_is_not_found() {
        assert_eq!(parse(r#"{"places":[]}"#), LookupResult::NotFound);
        assert_eq!(parse("{}"), LookupResult::NotFound);
    }

    #[test]
    fn test_text_query_format() {
        let query = LookupQuery::new("Grill bites", "195 Hollyhedge Rd");
        assert_eq!(query.text_query(), "Grill bites, 195 Hollyhedge Rd");
    }

    #[test]
    fn test_batch_report_counts() {
        let results = vec![
            LookupResult::PhoneFound("1".to_string()),
            LookupResult::PhoneFound("2".to_string()),
            LookupResult::NotFound,
            LookupResult::Error(LookupFailure::TaskAborted("x".to_string())),
        ];
        let report = BatchReport::from_results(&results);
        assert_eq!(
            report,
            BatchReport {
                attempted: 4,
                found: 2,
                not_found: 1,
                errors: 1
            }
        );
    }

    #[test]
    fn test_display_text() {
        assert_eq!(LookupResult::NotFound.display_text(), NO_RESULTS_FOUND);
        let err = LookupResult::Error(LookupFailure::Fatal {
            status: Some(500),
            reason: "HTTP 500".to_string(),
        });
        assert!(err.display_text().starts_with("Error: "));
    }
}
