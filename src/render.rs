//! Pure mapping from domain records to view models.
//!
//! Nothing here touches the network or the client state. Every list is
//! rendered once per element in input order, and an empty list always
//! yields an explicit empty state.

use serde::Serialize;

use crate::dashboard::DashboardScope;
use crate::models::{BreakdownRow, CartLine, DashboardSummary, MenuItem, StaffPerformance, TrendPoint};
use crate::settings::Role;
use crate::store::FilterState;

pub const CURRENCY: &str = "₹";
pub const FALLBACK_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1572490122747-3968b75cc699?auto=format&fit=crop&q=80&w=400&h=300";
const PLACEHOLDER_IMAGE_BASE: &str = "https://via.placeholder.com/400x300?text=";
const CARD_STAGGER_MS: u32 = 50;

pub fn format_amount(amount: f64, decimals: usize) -> String {
    format!("{CURRENCY}{amount:.decimals$}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyState {
    pub title: String,
    pub hint: String,
}

impl EmptyState {
    fn new(title: &str, hint: &str) -> Self {
        Self {
            title: title.to_string(),
            hint: hint.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Menu
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuCard {
    pub item_id: String,
    pub name: String,
    pub price_label: String,
    /// Struck-through price shown for offers.
    pub original_price_label: Option<String>,
    pub image_url: String,
    pub placeholder_url: String,
    pub show_admin_controls: bool,
    pub animation_delay_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MenuView {
    Empty(EmptyState),
    Cards(Vec<MenuCard>),
}

/// Client-side narrowing of a fetched list. Category must match unless it
/// is `All`; the search text matches name or category, case-insensitively.
pub fn filter_items(items: &[MenuItem], filter: &FilterState) -> Vec<MenuItem> {
    let needle = filter.active_search_query.to_lowercase();
    items
        .iter()
        .filter(|item| {
            filter.is_all_categories()
                || item.category.eq_ignore_ascii_case(&filter.active_category)
        })
        .filter(|item| {
            needle.is_empty()
                || item.name.to_lowercase().contains(&needle)
                || item.category.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

fn percent_encode_text(text: &str) -> String {
    text.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

pub fn render_menu(items: &[MenuItem], role: Role) -> MenuView {
    let is_admin = role.is_admin();
    let cards: Vec<MenuCard> = items
        .iter()
        .filter(|item| is_admin || item.is_visible)
        .enumerate()
        .map(|(index, item)| {
            let name = if item.name.trim().is_empty() {
                "Item".to_string()
            } else {
                item.name.clone()
            };
            MenuCard {
                item_id: item.id.clone(),
                price_label: format_amount(item.unit_price, 0),
                original_price_label: item
                    .is_on_offer
                    .then(|| format_amount(item.original_price, 0)),
                image_url: item
                    .image_url
                    .clone()
                    .filter(|url| !url.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_IMAGE_URL.to_string()),
                placeholder_url: format!("{PLACEHOLDER_IMAGE_BASE}{}", percent_encode_text(&name)),
                name,
                show_admin_controls: is_admin,
                animation_delay_ms: u32::try_from(index)
                    .unwrap_or(u32::MAX)
                    .saturating_mul(CARD_STAGGER_MS),
            }
        })
        .collect();

    if cards.is_empty() {
        return MenuView::Empty(EmptyState::new(
            "No items found",
            "Try a different search term or category.",
        ));
    }
    MenuView::Cards(cards)
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLineView {
    pub item_id: String,
    pub name: String,
    pub unit_price_label: String,
    pub quantity: u32,
    pub line_total_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CartBody {
    Empty(EmptyState),
    Lines(Vec<CartLineView>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartView {
    pub badge_count: u64,
    pub total_label: String,
    pub body: CartBody,
}

pub fn render_cart(lines: &[CartLine]) -> CartView {
    // Zero-quantity lines never reach the view.
    let visible: Vec<&CartLine> = lines.iter().filter(|l| l.quantity > 0).collect();
    let badge_count = visible.iter().map(|l| u64::from(l.quantity)).sum();
    let total = visible.iter().fold(0.0, |acc, l| acc + l.line_total());

    let body = if visible.is_empty() {
        CartBody::Empty(EmptyState::new("Your cart is empty", "Add items from the menu."))
    } else {
        CartBody::Lines(
            visible
                .iter()
                .map(|line| CartLineView {
                    item_id: line.item_id.clone(),
                    name: line.name.clone(),
                    unit_price_label: format!("{} each", format_amount(line.unit_price, 2)),
                    quantity: line.quantity,
                    line_total_label: format_amount(line.line_total(), 2),
                })
                .collect(),
        )
    };

    CartView {
        badge_count,
        total_label: format_amount(total, 2),
        body,
    }
}

// ---------------------------------------------------------------------------
// Dashboards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRowView {
    pub label: String,
    pub count: u64,
    pub revenue_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SectionBody {
    Empty(EmptyState),
    Rows(Vec<BreakdownRowView>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSection {
    pub heading: String,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub title: String,
    pub scope_label: String,
    pub revenue_label: String,
    pub profit_label: String,
    pub orders_label: String,
    pub avg_order_label: Option<String>,
    pub phonepe_label: String,
    pub cash_label: String,
    pub sections: Vec<DashboardSection>,
    pub chart: Option<ChartSeries>,
}

/// Running revenue total, in server order.
pub fn cumulative_series(points: &[TrendPoint]) -> ChartSeries {
    let mut running = 0.0;
    let values = points
        .iter()
        .map(|p| {
            running += p.revenue;
            running
        })
        .collect();
    ChartSeries {
        labels: points.iter().map(|p| p.label.clone()).collect(),
        values,
    }
}

fn month_label(raw: &str) -> String {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    raw.trim()
        .parse::<usize>()
        .ok()
        .and_then(|m| m.checked_sub(1))
        .and_then(|idx| MONTHS.get(idx))
        .map(|m| m.to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn section(heading: &str, rows: &[BreakdownRow], label: impl Fn(&str) -> String) -> DashboardSection {
    let body = if rows.is_empty() {
        SectionBody::Empty(EmptyState::new("No sales found", "Nothing recorded for this period."))
    } else {
        SectionBody::Rows(
            rows.iter()
                .map(|row| BreakdownRowView {
                    label: label(&row.label),
                    count: row.count,
                    revenue_label: format_amount(row.revenue, 2),
                })
                .collect(),
        )
    };
    DashboardSection {
        heading: heading.to_string(),
        body,
    }
}

pub fn render_dashboard(summary: &DashboardSummary) -> DashboardView {
    let totals = &summary.totals;
    let (sections, chart) = match summary.scope {
        DashboardScope::Daily { .. } => (
            vec![
                section("By category", &summary.categories, str::to_string),
                section("By time of day", &summary.time_slots, str::to_string),
            ],
            None,
        ),
        DashboardScope::Monthly { .. } => (Vec::new(), Some(cumulative_series(&summary.trend))),
        DashboardScope::Yearly { .. } => {
            let chart = ChartSeries {
                labels: summary
                    .monthly_breakdown
                    .iter()
                    .map(|row| month_label(&row.label))
                    .collect(),
                values: summary.monthly_breakdown.iter().map(|row| row.revenue).collect(),
            };
            (
                vec![section("By month", &summary.monthly_breakdown, month_label)],
                Some(chart),
            )
        }
    };

    DashboardView {
        title: summary.scope.title().to_string(),
        scope_label: summary.scope.label(),
        revenue_label: format_amount(totals.total_revenue, 2),
        profit_label: format_amount(totals.total_profit, 2),
        orders_label: totals.order_count.to_string(),
        avg_order_label: totals.avg_order_value.map(|v| format_amount(v, 2)),
        phonepe_label: format_amount(totals.phonepe_amount, 2),
        cash_label: format_amount(totals.cash_amount, 2),
        sections,
        chart,
    }
}

// ---------------------------------------------------------------------------
// Staff ranking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RankBadge {
    Winner,
    Star,
    Reliable,
}

impl RankBadge {
    fn for_index(index: usize) -> Self {
        match index {
            0 => RankBadge::Winner,
            1 => RankBadge::Star,
            _ => RankBadge::Reliable,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RankBadge::Winner => "Winner",
            RankBadge::Star => "Star",
            RankBadge::Reliable => "Reliable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffRow {
    pub rank: usize,
    pub initials: String,
    pub name: String,
    pub total_sales: u64,
    pub revenue_label: String,
    pub badge: RankBadge,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StaffRankingView {
    Empty(EmptyState),
    Rows(Vec<StaffRow>),
}

pub fn render_staff_ranking(ranking: &[StaffPerformance]) -> StaffRankingView {
    if ranking.is_empty() {
        return StaffRankingView::Empty(EmptyState::new(
            "No sales found",
            "Try a different date, month or year.",
        ));
    }
    StaffRankingView::Rows(
        ranking
            .iter()
            .enumerate()
            .map(|(index, staff)| StaffRow {
                rank: index + 1,
                initials: staff.id.chars().take(2).collect::<String>().to_uppercase(),
                name: staff.id.clone(),
                total_sales: staff.total_sales,
                revenue_label: format_amount(staff.total_revenue, 2),
                badge: RankBadge::for_index(index),
            })
            .collect(),
    )
}
