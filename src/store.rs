//! Client state: menu filters, the in-memory cart, the pending modal
//! selection and the reporting filters.
//!
//! Mutators only change state; deciding whether a change needs a fetch is
//! the synchronizer's job.

use chrono::NaiveDate;

use crate::dashboard::{DashboardFilters, Tab};
use crate::models::{CartLine, ItemId, MenuItem};

/// Category sentinel meaning "no category filter".
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub active_category: String,
    pub active_search_query: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            active_category: ALL_CATEGORIES.to_string(),
            active_search_query: String::new(),
        }
    }
}

impl FilterState {
    pub fn is_all_categories(&self) -> bool {
        self.active_category == ALL_CATEGORIES
    }

    /// True when the full menu is being shown.
    pub fn is_unfiltered(&self) -> bool {
        self.is_all_categories() && self.active_search_query.is_empty()
    }
}

/// Which modal workflow owns the pending selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    PriceEdit,
    Payment,
    ItemEdit,
    ImageUpload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    pub item_id: ItemId,
    pub kind: ModalKind,
}

#[derive(Debug, Clone)]
pub struct ClientStateStore {
    filter: FilterState,
    cart: Vec<CartLine>,
    pending: Option<PendingSelection>,
    catalog: Vec<MenuItem>,
    active_tab: Tab,
    dashboard_filters: DashboardFilters,
}

impl ClientStateStore {
    pub fn new(initial_tab: Tab, today: NaiveDate) -> Self {
        Self {
            filter: FilterState::default(),
            cart: Vec::new(),
            pending: None,
            catalog: Vec::new(),
            active_tab: initial_tab,
            dashboard_filters: DashboardFilters::for_today(today),
        }
    }

    // -- Filters ------------------------------------------------------------

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn set_category(&mut self, category: &str) -> FilterState {
        let category = category.trim();
        self.filter.active_category = if category.is_empty() {
            ALL_CATEGORIES.to_string()
        } else {
            category.to_string()
        };
        self.filter.clone()
    }

    pub fn set_search(&mut self, query: &str) -> FilterState {
        self.filter.active_search_query = query.trim().to_string();
        self.filter.clone()
    }

    // -- Cart ---------------------------------------------------------------

    pub fn cart(&self) -> &[CartLine] {
        &self.cart
    }

    pub fn add_to_cart(&mut self, item: &MenuItem) {
        if let Some(line) = self.cart.iter_mut().find(|l| l.item_id == item.id) {
            line.quantity = line.quantity.saturating_add(1);
            return;
        }
        self.cart.push(CartLine {
            item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.unit_price,
            quantity: 1,
        });
    }

    /// Apply `delta` to a line; the line is removed once its quantity
    /// reaches zero or below. Unknown ids are ignored.
    pub fn adjust_quantity(&mut self, item_id: &str, delta: i64) {
        let Some(pos) = self.cart.iter().position(|l| l.item_id == item_id) else {
            return;
        };
        let next = i64::from(self.cart[pos].quantity).saturating_add(delta);
        if next <= 0 {
            self.cart.remove(pos);
        } else {
            self.cart[pos].quantity = u32::try_from(next).unwrap_or(u32::MAX);
        }
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    pub fn cart_count(&self) -> u64 {
        self.cart.iter().map(|l| u64::from(l.quantity)).sum()
    }

    pub fn cart_total(&self) -> f64 {
        self.cart.iter().fold(0.0, |acc, l| acc + l.line_total())
    }

    // -- Pending selection --------------------------------------------------

    pub fn pending_selection(&self) -> Option<&PendingSelection> {
        self.pending.as_ref()
    }

    /// Replace the single pending slot. `None` clears it.
    pub fn set_pending_selection(&mut self, selection: Option<PendingSelection>) {
        self.pending = selection;
    }

    /// Clear the slot and return what it held.
    pub fn clear_pending_selection(&mut self) -> Option<PendingSelection> {
        self.pending.take()
    }

    // -- Catalog snapshot ---------------------------------------------------

    pub fn catalog(&self) -> &[MenuItem] {
        &self.catalog
    }

    pub fn replace_catalog(&mut self, items: Vec<MenuItem>) {
        self.catalog = items;
    }

    pub fn find_item(&self, item_id: &str) -> Option<&MenuItem> {
        self.catalog.iter().find(|item| item.id == item_id)
    }

    // -- Navigation / reporting ---------------------------------------------

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn set_active_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    pub fn dashboard_filters(&self) -> &DashboardFilters {
        &self.dashboard_filters
    }

    pub fn dashboard_filters_mut(&mut self) -> &mut DashboardFilters {
        &mut self.dashboard_filters
    }
}
