use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CongestionLevel {
    Low,
    Moderate,
    High,
    Full,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityArea {
    pub name: String,
    pub current_occupancy: u32,
    pub max_capacity: u32,
    pub occupancy_percentage: u32,
    pub congestion_level: CongestionLevel,
    pub last_updated: String,
    pub is_closed: bool,
}

/// Progress bar styling the feed marks a facility with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressMarks {
    pub value: Option<u32>,
    pub full: bool,
    pub mid: bool,
}

pub fn classify(is_closed: bool, marks: ProgressMarks) -> CongestionLevel {
    if is_closed {
        return CongestionLevel::Closed;
    }
    if marks.full {
        return CongestionLevel::Full;
    }
    if marks.mid {
        return CongestionLevel::Moderate;
    }
    match marks.value {
        Some(v) if v > 80 => CongestionLevel::High,
        Some(v) if v > 50 => CongestionLevel::Moderate,
        _ => CongestionLevel::Low,
    }
}

lazy_static! {
    static ref CAPACITY_RE: Regex = Regex::new(r"Capacity:\s*(\d+)\s*/\s*(\d+)\s*//\s*(\d+)%").unwrap();
}

/// `(current, max, percent)` from text like `"Capacity: 12/40 // 30%"`.
pub fn parse_capacity(text: &str) -> Option<(u32, u32, u32)> {
    let caps = CAPACITY_RE.captures(text)?;
    Some((
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    ))
}

pub fn closed_area(name: String, last_updated: String) -> FacilityArea {
    FacilityArea {
        name,
        current_occupancy: 0,
        max_capacity: 0,
        occupancy_percentage: 0,
        congestion_level: CongestionLevel::Closed,
        last_updated,
        is_closed: true,
    }
}

/// Builds an open area; `None` when the capacity text is unreadable.
pub fn open_area(
    name: String,
    capacity_text: &str,
    last_updated: String,
    marks: ProgressMarks,
) -> Option<FacilityArea> {
    let (current, max, percent) = parse_capacity(capacity_text)?;
    Some(FacilityArea {
        name,
        current_occupancy: current,
        max_capacity: max,
        occupancy_percentage: percent,
        congestion_level: classify(false, marks),
        last_updated,
        is_closed: false,
    })
}
