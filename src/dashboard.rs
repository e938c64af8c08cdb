//! Screen navigation and the date scopes used by the reporting views.

use chrono::{Datelike, NaiveDate};
use std::str::FromStr;

use crate::error::PosError;
use crate::settings::Role;

/// First year offered by the year pickers.
pub const FIRST_REPORT_YEAR: i32 = 2024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    SalesEntry,
    DailyView,
    MonthlyView,
    YearlyView,
    StaffPerformanceView,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::SalesEntry,
        Tab::DailyView,
        Tab::MonthlyView,
        Tab::YearlyView,
        Tab::StaffPerformanceView,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Tab::SalesEntry => "sales-entry",
            Tab::DailyView => "daily-view",
            Tab::MonthlyView => "monthly-view",
            Tab::YearlyView => "yearly-view",
            Tab::StaffPerformanceView => "staff-performance-view",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tab::SalesEntry => "Menu & Sales",
            Tab::DailyView => "Daily Stats",
            Tab::MonthlyView => "Business Health",
            Tab::YearlyView => "Annual Growth",
            Tab::StaffPerformanceView => "Team Rankings",
        }
    }

    /// Reporting tabs are restricted to admin sessions.
    pub fn requires_admin(self) -> bool {
        !matches!(self, Tab::SalesEntry)
    }

    pub fn initial_for(role: Role) -> Tab {
        match role {
            Role::Admin => Tab::DailyView,
            Role::Staff => Tab::SalesEntry,
        }
    }
}

impl FromStr for Tab {
    type Err = PosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Tab::ALL
            .into_iter()
            .find(|tab| {
                tab.id() == wanted || tab.id().trim_end_matches("-view") == wanted
            })
            .ok_or_else(|| PosError::Validation(format!("Unknown tab: {s}")))
    }
}

/// Which slice of sales a dashboard summary covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardScope {
    Daily { date: NaiveDate },
    Monthly { month: u32, year: i32 },
    Yearly { year: Option<i32> },
}

impl DashboardScope {
    pub fn path(&self) -> &'static str {
        match self {
            DashboardScope::Daily { .. } => "/api/daily-dashboard",
            DashboardScope::Monthly { .. } => "/api/monthly-dashboard",
            DashboardScope::Yearly { .. } => "/api/yearly-dashboard",
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            DashboardScope::Daily { date } => vec![("date", date.format("%Y-%m-%d").to_string())],
            DashboardScope::Monthly { month, year } => {
                vec![("month", format!("{month:02}")), ("year", year.to_string())]
            }
            DashboardScope::Yearly { year: Some(year) } => vec![("year", year.to_string())],
            DashboardScope::Yearly { year: None } => Vec::new(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DashboardScope::Daily { .. } => Tab::DailyView.title(),
            DashboardScope::Monthly { .. } => Tab::MonthlyView.title(),
            DashboardScope::Yearly { .. } => Tab::YearlyView.title(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            DashboardScope::Daily { date } => date.format("%a, %d %b %Y").to_string(),
            DashboardScope::Monthly { month, year } => NaiveDate::from_ymd_opt(*year, *month, 1)
                .map(|d| d.format("%B %Y").to_string())
                .unwrap_or_else(|| format!("{month:02}/{year}")),
            DashboardScope::Yearly { year: Some(year) } => year.to_string(),
            DashboardScope::Yearly { year: None } => "This year".to_string(),
        }
    }
}

/// Optional scoping of the staff ranking. Empty means all time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaffFilter {
    pub date: Option<NaiveDate>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl StaffFilter {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.month.is_none() && self.year.is_none()
    }

    /// Only the parameters that are set are sent.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(date) = self.date {
            pairs.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(month) = self.month {
            pairs.push(("month", format!("{month:02}")));
        }
        if let Some(year) = self.year {
            pairs.push(("year", year.to_string()));
        }
        pairs
    }
}

/// Filter inputs of the reporting screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardFilters {
    pub daily_date: NaiveDate,
    pub month: u32,
    pub year: i32,
    pub staff: StaffFilter,
}

impl DashboardFilters {
    pub fn for_today(today: NaiveDate) -> Self {
        Self {
            daily_date: today,
            month: today.month(),
            year: today.year(),
            staff: StaffFilter::default(),
        }
    }

    pub fn daily_scope(&self) -> DashboardScope {
        DashboardScope::Daily {
            date: self.daily_date,
        }
    }

    pub fn monthly_scope(&self) -> DashboardScope {
        DashboardScope::Monthly {
            month: self.month,
            year: self.year,
        }
    }

    pub fn yearly_scope(&self) -> DashboardScope {
        DashboardScope::Yearly { year: None }
    }
}

/// Years offered by the pickers: two years ahead down to the first report year.
pub fn year_options(current_year: i32) -> Vec<i32> {
    (FIRST_REPORT_YEAR..=current_year + 2).rev().collect()
}

/// Reject a report year the pickers would not offer.
pub fn check_report_year(year: i32, current_year: i32) -> Result<i32, PosError> {
    let options = year_options(current_year);
    if options.contains(&year) {
        return Ok(year);
    }
    let (newest, oldest) = (current_year + 2, FIRST_REPORT_YEAR);
    Err(PosError::Validation(format!(
        "Year must be between {oldest} and {newest}"
    )))
}

pub fn parse_month(raw: &str) -> Result<u32, PosError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| PosError::Validation(format!("Invalid month: {raw}")))
}

pub fn parse_year(raw: &str) -> Result<i32, PosError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|y| (2000..=9999).contains(y))
        .ok_or_else(|| PosError::Validation(format!("Invalid year: {raw}")))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, PosError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| PosError::Validation(format!("Invalid date (expected YYYY-MM-DD): {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn initial_tab_depends_on_role() {
        assert_eq!(Tab::initial_for(Role::Admin), Tab::DailyView);
        assert_eq!(Tab::initial_for(Role::Staff), Tab::SalesEntry);
    }

    #[test]
    fn tab_parses_full_and_short_ids() {
        assert_eq!("daily-view".parse::<Tab>(), Ok(Tab::DailyView));
        assert_eq!("staff-performance".parse::<Tab>(), Ok(Tab::StaffPerformanceView));
        assert_eq!("sales-entry".parse::<Tab>(), Ok(Tab::SalesEntry));
        assert!("reports".parse::<Tab>().is_err());
    }

    #[test]
    fn monthly_scope_pads_month() {
        let scope = DashboardScope::Monthly { month: 3, year: 2025 };
        assert_eq!(scope.path(), "/api/monthly-dashboard");
        assert_eq!(
            scope.query_pairs(),
            vec![("month", "03".to_string()), ("year", "2025".to_string())]
        );
        assert_eq!(scope.label(), "March 2025");
    }

    #[test]
    fn yearly_scope_without_year_sends_no_params() {
        assert!(DashboardScope::Yearly { year: None }.query_pairs().is_empty());
    }

    #[test]
    fn staff_filter_sends_only_set_params() {
        let filter = StaffFilter {
            date: None,
            month: Some(7),
            year: Some(2025),
        };
        assert_eq!(
            filter.query_pairs(),
            vec![("month", "07".to_string()), ("year", "2025".to_string())]
        );
        assert!(StaffFilter::default().query_pairs().is_empty());
        assert!(StaffFilter::default().is_empty());
    }

    #[test]
    fn filters_default_to_today() {
        let filters = DashboardFilters::for_today(date(2025, 11, 4));
        assert_eq!(filters.month, 11);
        assert_eq!(filters.year, 2025);
        assert_eq!(
            filters.daily_scope().query_pairs(),
            vec![("date", "2025-11-04".to_string())]
        );
    }

    #[test]
    fn year_options_run_two_years_ahead_down_to_first_year() {
        assert_eq!(year_options(2025), vec![2027, 2026, 2025, 2024]);
    }

    #[test]
    fn report_year_must_be_offered() {
        assert_eq!(check_report_year(2026, 2025), Ok(2026));
        assert!(check_report_year(2023, 2025).is_err());
        assert!(check_report_year(2028, 2025).is_err());
    }

    #[test]
    fn parse_helpers_reject_out_of_range() {
        assert!(parse_month("13").is_err());
        assert_eq!(parse_month("02"), Ok(2));
        assert!(parse_year("99").is_err());
        assert!(parse_date("2025-02-30").is_err());
    }
}
