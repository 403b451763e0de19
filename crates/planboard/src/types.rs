use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar;

/// A plan summary as returned by the list endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Plan {
    pub id: i64,

    pub title: String,

    #[serde(default)]
    pub code: String,

    /// First day, `YYYY-MM-DD`
    pub start: NaiveDate,

    /// Last day; a missing end means a single-day plan
    #[serde(default)]
    pub end: Option<NaiveDate>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub capacity: Option<u32>,
}

impl Plan {
    /// End date, falling back to the start date
    pub fn end_date(&self) -> NaiveDate {
        match self.end {
            Some(end) if end >= self.start => end,
            _ => self.start,
        }
    }

    pub fn start_iso_year(&self) -> i32 {
        calendar::iso_year(self.start)
    }

    pub fn end_iso_year(&self) -> i32 {
        calendar::iso_year(self.end_date())
    }

    /// Whether the plan's ISO-year interval touches `year`
    pub fn overlaps_iso_year(&self, year: i32) -> bool {
        !(self.end_iso_year() < year || self.start_iso_year() > year)
    }

    /// Location for display, `None` when blank
    pub fn location_label(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    /// Capacity for display; the API reports an unset capacity as 0
    pub fn capacity_label(&self) -> Option<u32> {
        self.capacity.filter(|c| *c > 0)
    }

    /// `start – end • location • Capacity: n`, with `—` for missing values
    pub fn summary_line(&self) -> String {
        format!(
            "{} – {} • {} • Capacity: {}",
            self.start,
            self.end_date(),
            self.location_label().unwrap_or("—"),
            self.capacity_label()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "—".to_string())
        )
    }
}

/// An attendee entry of the detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Attendee {
    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub username: Option<String>,
}

impl Attendee {
    /// Full name when present, otherwise the username
    pub fn display_name(&self) -> Option<&str> {
        [&self.full_name, &self.username]
            .into_iter()
            .filter_map(|s| s.as_deref().map(str::trim))
            .find(|s| !s.is_empty())
    }
}

/// Full plan detail, including who attends
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: Plan,

    #[serde(default)]
    pub attendees: Vec<Attendee>,

    #[serde(default)]
    pub participants: Vec<String>,
}

impl PlanDetail {
    /// Attendee names, preferring structured attendees over plain participants
    pub fn attendee_names(&self) -> Vec<String> {
        let names: Vec<String> = self
            .attendees
            .iter()
            .filter_map(Attendee::display_name)
            .map(str::to_string)
            .collect();

        if !names.is_empty() {
            return names;
        }

        self.participants
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// The list endpoint answers with either a bare array or a paged object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlanList<T> {
    Bare(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> PlanList<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            PlanList::Paged { results } => results,
            PlanList::Bare(items) => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_plan(start: &str, end: Option<&str>) -> Plan {
        Plan {
            id: 1,
            title: "Fire Safety".to_string(),
            code: "FS-01".to_string(),
            start: start.parse().unwrap(),
            end: end.map(|e| e.parse().unwrap()),
            location: None,
            capacity: None,
        }
    }

    #[test]
    fn test_plan_deserialization_minimal() {
        let json = r#"{"id":7,"title":"First Aid","start":"2024-03-04"}"#;
        let plan: Plan = serde_json::from_str(json).unwrap();

        assert_eq!(plan.id, 7);
        assert_eq!(plan.code, "");
        assert_eq!(plan.end, None);
        assert_eq!(plan.end_date(), plan.start);
    }

    #[test]
    fn test_plan_deserialization_full() {
        let json = r#"{"id":3,"title":"Forklift","code":"FK","start":"2024-01-01","end":"2024-01-14","location":"Hall B","capacity":12}"#;
        let plan: Plan = serde_json::from_str(json).unwrap();

        assert_eq!(plan.end_date(), NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        assert_eq!(plan.location_label(), Some("Hall B"));
        assert_eq!(plan.capacity_label(), Some(12));
    }

    #[test]
    fn test_plan_rejects_malformed_date() {
        let json = r#"{"id":3,"title":"Forklift","start":"04/03/2024"}"#;
        assert!(serde_json::from_str::<Plan>(json).is_err());
    }

    #[test]
    fn test_end_before_start_is_treated_as_start() {
        let plan = make_plan("2024-05-10", Some("2024-05-01"));
        assert_eq!(plan.end_date(), plan.start);
    }

    #[test]
    fn test_overlaps_iso_year() {
        let plan = make_plan("2023-12-20", Some("2024-01-10"));
        assert!(plan.overlaps_iso_year(2023));
        assert!(plan.overlaps_iso_year(2024));
        assert!(!plan.overlaps_iso_year(2022));
        assert!(!plan.overlaps_iso_year(2025));
    }

    #[test]
    fn test_overlaps_uses_iso_year_not_calendar_year() {
        // 2024-12-30 is in 2025-W01
        let plan = make_plan("2024-12-30", Some("2024-12-31"));
        assert!(!plan.overlaps_iso_year(2024));
        assert!(plan.overlaps_iso_year(2025));
    }

    #[test]
    fn test_summary_line_with_missing_values() {
        let mut plan = make_plan("2024-01-01", Some("2024-01-14"));
        plan.location = Some("   ".to_string());
        plan.capacity = Some(0);

        assert_eq!(
            plan.summary_line(),
            "2024-01-01 – 2024-01-14 • — • Capacity: —"
        );
    }

    #[test]
    fn test_summary_line_with_values() {
        let mut plan = make_plan("2024-01-01", None);
        plan.location = Some("Room 4".to_string());
        plan.capacity = Some(20);

        assert_eq!(
            plan.summary_line(),
            "2024-01-01 – 2024-01-01 • Room 4 • Capacity: 20"
        );
    }

    #[test]
    fn test_attendee_display_name_fallback() {
        let full = Attendee {
            full_name: Some("Ada Lovelace".to_string()),
            username: Some("ada".to_string()),
        };
        let blank_full = Attendee {
            full_name: Some(String::new()),
            username: Some("grace".to_string()),
        };
        let nothing = Attendee::default();

        assert_eq!(full.display_name(), Some("Ada Lovelace"));
        assert_eq!(blank_full.display_name(), Some("grace"));
        assert_eq!(nothing.display_name(), None);
    }

    #[test]
    fn test_detail_with_attendees() {
        let json = r#"{"id":1,"title":"T","start":"2024-01-01","attendees":[{"full_name":"Ada Lovelace"},{"username":"grace"}]}"#;
        let detail: PlanDetail = serde_json::from_str(json).unwrap();

        assert_eq!(detail.plan.id, 1);
        assert_eq!(detail.attendee_names(), vec!["Ada Lovelace", "grace"]);
    }

    #[test]
    fn test_detail_with_participants() {
        let json = r#"{"id":1,"title":"T","start":"2024-01-01","participants":["Ada","  ","Grace"]}"#;
        let detail: PlanDetail = serde_json::from_str(json).unwrap();

        assert_eq!(detail.attendee_names(), vec!["Ada", "Grace"]);
    }

    #[test]
    fn test_detail_without_attendees() {
        let json = r#"{"id":1,"title":"T","start":"2024-01-01"}"#;
        let detail: PlanDetail = serde_json::from_str(json).unwrap();

        assert!(detail.attendee_names().is_empty());
    }

    #[test]
    fn test_plan_list_shapes() {
        let paged = r#"{"results":[{"id":1,"title":"A","start":"2024-01-01"}]}"#;
        let bare = r#"[{"id":1,"title":"A","start":"2024-01-01"},{"id":2,"title":"B","start":"2024-02-01"}]"#;

        let paged: PlanList<Plan> = serde_json::from_str(paged).unwrap();
        let bare: PlanList<Plan> = serde_json::from_str(bare).unwrap();

        assert_eq!(paged.into_vec().len(), 1);
        assert_eq!(bare.into_vec().len(), 2);
    }
}
