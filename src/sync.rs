//! View synchronizer.
//!
//! Turns user intents into state mutations and decides, per intent, whether
//! the network is involved:
//! - category changes fetch immediately
//! - search changes are debounced (last call in the quiet window wins)
//! - cart changes re-render from memory only
//!
//! Fetches are spawned and never cancelled or fenced. Two overlapping menu
//! fetches render in completion order, so an older response can replace a
//! newer one.

use chrono::{Datelike, NaiveDate};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::Gateway;
use crate::dashboard::{check_report_year, DashboardScope, StaffFilter, Tab};
use crate::error::PosError;
use crate::models::{ImageFile, ItemDraft, ItemId, MenuItem, PaymentMethod, PriceUpdate};
use crate::notify::Toast;
use crate::render::{
    filter_items, render_cart, render_dashboard, render_menu, render_staff_ranking, CartView,
    DashboardView, MenuView, StaffRankingView,
};
use crate::settings::Role;
use crate::store::{ClientStateStore, FilterState, ModalKind, PendingSelection};

/// Quiet window for search input.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

const ADMIN_REQUIRED: &str = "Admin access required";

/// Where rendered view models and toasts go.
pub trait ViewSink: Send + Sync {
    /// A menu fetch has started; show the skeleton.
    fn menu_loading(&self) {}
    fn show_menu(&self, view: MenuView);
    fn show_cart(&self, view: CartView);
    fn show_dashboard(&self, view: DashboardView);
    fn show_staff_ranking(&self, view: StaffRankingView);
    fn show_tab(&self, _tab: Tab) {}
    fn notify(&self, toast: Toast);
}

/// Last-call-wins debounce on a generation counter.
///
/// `arm` must be called synchronously when the triggering event happens;
/// `settle` then reports whether that call is still the latest once the
/// window has passed.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    generation: AtomicU64,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generation: AtomicU64::new(0),
        }
    }

    pub fn arm(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Invalidate any armed call.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn settle(&self, ticket: u64) -> bool {
        tokio::time::sleep(self.window).await;
        self.generation.load(Ordering::SeqCst) == ticket
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub units_recorded: u32,
    /// Units the server answered with an error status.
    pub units_rejected: u32,
    pub total: f64,
    pub method: PaymentMethod,
}

struct Inner {
    gateway: Arc<dyn Gateway>,
    view: Arc<dyn ViewSink>,
    state: Mutex<ClientStateStore>,
    role: Role,
    today: NaiveDate,
    search: Debouncer,
}

#[derive(Clone)]
pub struct ViewSynchronizer {
    inner: Arc<Inner>,
}

impl ViewSynchronizer {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        view: Arc<dyn ViewSink>,
        role: Role,
        today: NaiveDate,
    ) -> Self {
        Self::with_debounce(gateway, view, role, today, SEARCH_DEBOUNCE)
    }

    pub fn with_debounce(
        gateway: Arc<dyn Gateway>,
        view: Arc<dyn ViewSink>,
        role: Role,
        today: NaiveDate,
        window: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                view,
                state: Mutex::new(ClientStateStore::new(Tab::initial_for(role), today)),
                role,
                today,
                search: Debouncer::new(window),
            }),
        }
    }

    pub fn role(&self) -> Role {
        self.inner.role
    }

    fn lock(&self) -> MutexGuard<'_, ClientStateStore> {
        // State mutations never panic midway, so a poisoned lock still holds
        // consistent data.
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read-only access to the client state.
    pub fn with_state<R>(&self, f: impl FnOnce(&ClientStateStore) -> R) -> R {
        f(&self.lock())
    }

    fn notify(&self, toast: Toast) {
        debug!(severity = toast.severity.as_str(), message = %toast.message, "toast");
        self.inner.view.notify(toast);
    }

    fn require_admin(&self) -> Result<(), PosError> {
        if self.inner.role.is_admin() {
            return Ok(());
        }
        let err = PosError::Forbidden(ADMIN_REQUIRED.to_string());
        self.notify(Toast::warning(ADMIN_REQUIRED));
        Err(err)
    }

    // -----------------------------------------------------------------------
    // Menu
    // -----------------------------------------------------------------------

    /// Category selection is discrete: fetch right away.
    pub fn select_category(&self, category: &str) -> JoinHandle<()> {
        let filter = self.lock().set_category(category);
        info!(category = %filter.active_category, "category selected");
        self.spawn_menu_fetch(filter)
    }

    /// Record the search text and fetch once input has been quiet for the
    /// debounce window. Only the latest text is fetched.
    pub fn search(&self, query: &str) -> JoinHandle<()> {
        self.lock().set_search(query);
        let ticket = self.inner.search.arm();
        let this = self.clone();
        tokio::spawn(async move {
            if !this.inner.search.settle(ticket).await {
                debug!(ticket, "search superseded");
                return;
            }
            let filter = this.lock().filter().clone();
            this.load_menu(filter).await;
        })
    }

    pub fn clear_search(&self) -> JoinHandle<()> {
        let filter = self.lock().set_search("");
        self.inner.search.cancel();
        self.spawn_menu_fetch(filter)
    }

    pub fn refresh_menu(&self) -> JoinHandle<()> {
        let filter = self.lock().filter().clone();
        self.spawn_menu_fetch(filter)
    }

    fn spawn_menu_fetch(&self, filter: FilterState) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.load_menu(filter).await })
    }

    /// Fetch and render the menu for `filter`. Whatever completes last is
    /// what stays on screen.
    pub async fn load_menu(&self, filter: FilterState) {
        self.inner.view.menu_loading();
        match self.inner.gateway.list_menu_items(&filter).await {
            Ok(items) => {
                let visible = filter_items(&items, &filter);
                debug!(
                    category = %filter.active_category,
                    search = %filter.active_search_query,
                    fetched = items.len(),
                    shown = visible.len(),
                    "menu loaded"
                );
                if filter.is_unfiltered() {
                    self.lock().replace_catalog(items);
                }
                self.inner
                    .view
                    .show_menu(render_menu(&visible, self.inner.role));
            }
            Err(e) => {
                warn!(error = %e, "menu fetch failed");
                self.notify(Toast::danger("Error loading menu items"));
            }
        }
    }

    async fn reload_current_menu(&self) {
        let filter = self.lock().filter().clone();
        self.load_menu(filter).await;
    }

    // -----------------------------------------------------------------------
    // Cart
    // -----------------------------------------------------------------------

    pub fn add_to_cart(&self, item: &MenuItem) {
        let view = {
            let mut state = self.lock();
            state.add_to_cart(item);
            render_cart(state.cart())
        };
        self.inner.view.show_cart(view);
        self.notify(Toast::success(format!("{} added!", item.name)));
    }

    /// Add an item from the last full menu fetch.
    pub fn add_item_by_id(&self, item_id: &str) -> Result<(), PosError> {
        let item = self
            .lock()
            .find_item(item_id)
            .cloned()
            .ok_or_else(|| PosError::Validation(format!("Unknown item: {item_id}")))?;
        self.add_to_cart(&item);
        Ok(())
    }

    pub fn adjust_quantity(&self, item_id: &str, delta: i64) {
        let view = {
            let mut state = self.lock();
            state.adjust_quantity(item_id, delta);
            render_cart(state.cart())
        };
        self.inner.view.show_cart(view);
    }

    pub fn show_cart(&self) {
        let view = render_cart(self.lock().cart());
        self.inner.view.show_cart(view);
    }

    /// Record every unit in the cart, one request per unit, in cart order.
    ///
    /// A unit the server answers with an error status is logged and skipped.
    /// A transport failure stops the loop: units already recorded stay
    /// recorded and the cart is left as it was.
    pub async fn complete_sale(&self, method: PaymentMethod) -> Result<CheckoutReceipt, PosError> {
        let lines = self.lock().cart().to_vec();
        if lines.is_empty() {
            self.notify(Toast::warning("Cart is empty!"));
            return Err(PosError::Validation("Cart is empty!".to_string()));
        }

        self.notify(Toast::info("Processing sale..."));

        let mut recorded: u32 = 0;
        let mut rejected: u32 = 0;
        for line in &lines {
            for _ in 0..line.quantity {
                match self.inner.gateway.record_sale(&line.item_id, method).await {
                    Ok(()) => recorded += 1,
                    Err(e @ PosError::Network(_)) => {
                        warn!(
                            item_id = %line.item_id,
                            units_recorded = recorded,
                            units_rejected = rejected,
                            error = %e,
                            "checkout stopped; recorded units are not rolled back"
                        );
                        self.notify(Toast::danger("Error processing order"));
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(item_id = %line.item_id, error = %e, "sale unit rejected by server");
                        rejected += 1;
                    }
                }
            }
        }

        let total = lines.iter().fold(0.0, |acc, l| acc + l.line_total());
        let view = {
            let mut state = self.lock();
            state.clear_cart();
            render_cart(state.cart())
        };
        self.inner.view.show_cart(view);
        self.notify(Toast::success("Order completed successfully!"));
        info!(units = recorded, rejected, total, method = %method, "sale completed");

        Ok(CheckoutReceipt {
            units_recorded: recorded,
            units_rejected: rejected,
            total,
            method,
        })
    }

    // -----------------------------------------------------------------------
    // Modal workflows
    // -----------------------------------------------------------------------

    fn open_modal(&self, item_id: &str, kind: ModalKind) -> Result<Option<MenuItem>, PosError> {
        if kind != ModalKind::Payment {
            self.require_admin()?;
        }
        let mut state = self.lock();
        state.set_pending_selection(Some(PendingSelection {
            item_id: item_id.to_string(),
            kind,
        }));
        debug!(item_id, ?kind, "modal opened");
        let item = state.find_item(item_id).cloned();
        Ok(item)
    }

    /// Empty the slot and return its item id when it belongs to `kind`.
    /// The slot is cleared whatever it held.
    fn take_pending(&self, kind: ModalKind) -> Result<ItemId, PosError> {
        match self.lock().clear_pending_selection() {
            Some(selection) if selection.kind == kind => Ok(selection.item_id),
            Some(selection) => {
                debug!(held = ?selection.kind, wanted = ?kind, "pending selection mismatch");
                Err(PosError::Validation("No item selected".to_string()))
            }
            None => Err(PosError::Validation("No item selected".to_string())),
        }
    }

    pub fn pending_selection(&self) -> Option<PendingSelection> {
        self.lock().pending_selection().cloned()
    }

    pub fn cancel_modal(&self) {
        self.lock().clear_pending_selection();
    }

    /// Returns the catalog entry, when known, to prefill the editor.
    pub fn open_price_editor(&self, item_id: &str) -> Result<Option<MenuItem>, PosError> {
        self.open_modal(item_id, ModalKind::PriceEdit)
    }

    pub async fn save_new_price(&self, update: PriceUpdate) -> Result<(), PosError> {
        let item_id = self.take_pending(ModalKind::PriceEdit)?;
        if let Err(e) = update.validate() {
            self.notify(Toast::from_error(&e, "Failed to update price", "Server error"));
            return Err(e);
        }

        match self.inner.gateway.update_price(&item_id, &update).await {
            Ok(()) => {
                info!(item_id = %item_id, price = update.price, is_offer = update.is_offer, "price updated");
                self.notify(Toast::success("Price updated successfully!"));
                self.reload_current_menu().await;
                Ok(())
            }
            Err(e) => {
                warn!(item_id = %item_id, error = %e, "price update failed");
                self.notify(Toast::from_error(&e, "Failed to update price", "Server error"));
                Err(e)
            }
        }
    }

    pub fn open_payment(&self, item_id: &str) -> Result<Option<MenuItem>, PosError> {
        self.open_modal(item_id, ModalKind::Payment)
    }

    /// Record a single unit for the item selected in the payment modal.
    pub async fn confirm_payment(&self, method: PaymentMethod) -> Result<(), PosError> {
        let item_id = self.take_pending(ModalKind::Payment)?;
        match self.inner.gateway.record_sale(&item_id, method).await {
            Ok(()) => {
                info!(item_id = %item_id, method = %method, "single sale recorded");
                self.notify(Toast::success("Sale recorded!"));
                Ok(())
            }
            Err(e) => {
                warn!(item_id = %item_id, error = %e, "single sale failed");
                self.notify(Toast::from_error(
                    &e,
                    "Error processing order",
                    "Error processing order",
                ));
                Err(e)
            }
        }
    }

    pub fn open_item_editor(&self, item_id: &str) -> Result<Option<MenuItem>, PosError> {
        self.open_modal(item_id, ModalKind::ItemEdit)
    }

    pub async fn save_item(&self, draft: ItemDraft) -> Result<(), PosError> {
        let item_id = self.take_pending(ModalKind::ItemEdit)?;
        if let Err(e) = draft.validate() {
            self.notify(Toast::from_error(&e, "Failed to update item", "Server error"));
            return Err(e);
        }
        match self.inner.gateway.update_item(&item_id, &draft).await {
            Ok(()) => {
                self.notify(Toast::success("Item updated!"));
                self.reload_current_menu().await;
                Ok(())
            }
            Err(e) => {
                warn!(item_id = %item_id, error = %e, "item update failed");
                self.notify(Toast::from_error(&e, "Failed to update item", "Server error"));
                Err(e)
            }
        }
    }

    pub fn begin_image_upload(&self, item_id: &str) -> Result<(), PosError> {
        self.open_modal(item_id, ModalKind::ImageUpload).map(|_| ())
    }

    pub async fn finish_image_upload(&self, file: ImageFile) -> Result<String, PosError> {
        let item_id = self.take_pending(ModalKind::ImageUpload)?;
        if file.bytes.is_empty() {
            let err = PosError::Validation("Please choose an image".to_string());
            self.notify(Toast::from_error(&err, "Upload failed", "Upload error"));
            return Err(err);
        }

        self.notify(Toast::info("Uploading..."));
        match self.inner.gateway.upload_image(&item_id, &file).await {
            Ok(url) => {
                info!(item_id = %item_id, image_url = %url, "image uploaded");
                self.notify(Toast::success("Uploaded!"));
                self.reload_current_menu().await;
                Ok(url)
            }
            Err(e) => {
                warn!(item_id = %item_id, error = %e, "image upload failed");
                self.notify(Toast::from_error(&e, "Upload failed", "Upload error"));
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Admin item management
    // -----------------------------------------------------------------------

    pub async fn create_item(&self, draft: ItemDraft) -> Result<(), PosError> {
        self.require_admin()?;
        if let Err(e) = draft.validate() {
            self.notify(Toast::from_error(&e, "Failed to create item", "Server error"));
            return Err(e);
        }
        self.admin_mutation(
            self.inner.gateway.create_item(&draft).await,
            "Item created!",
            "Failed to create item",
        )
        .await
    }

    pub async fn set_item_visibility(&self, item_id: &str, visible: bool) -> Result<(), PosError> {
        self.require_admin()?;
        let done = if visible { "Item is now visible" } else { "Item hidden" };
        self.admin_mutation(
            self.inner.gateway.set_item_visibility(item_id, visible).await,
            done,
            "Failed to update item",
        )
        .await
    }

    pub async fn delete_item(&self, item_id: &str) -> Result<(), PosError> {
        self.require_admin()?;
        self.admin_mutation(
            self.inner.gateway.delete_item(item_id).await,
            "Item deleted",
            "Failed to delete item",
        )
        .await
    }

    async fn admin_mutation(
        &self,
        result: Result<(), PosError>,
        success: &str,
        failure: &str,
    ) -> Result<(), PosError> {
        match result {
            Ok(()) => {
                self.notify(Toast::success(success));
                self.reload_current_menu().await;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "{failure}");
                self.notify(Toast::from_error(&e, failure, "Server error"));
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Navigation and reporting
    // -----------------------------------------------------------------------

    /// Switch screens. Reporting screens fetch their data on arrival.
    pub fn navigate_to(&self, tab: Tab) -> Result<Option<JoinHandle<()>>, PosError> {
        if tab.requires_admin() {
            self.require_admin()?;
        }
        let filters = {
            let mut state = self.lock();
            state.set_active_tab(tab);
            state.dashboard_filters().clone()
        };
        info!(tab = tab.id(), "navigated");
        self.inner.view.show_tab(tab);

        Ok(match tab {
            Tab::SalesEntry => None,
            Tab::DailyView => Some(self.spawn_dashboard(filters.daily_scope())),
            Tab::MonthlyView => Some(self.spawn_dashboard(filters.monthly_scope())),
            Tab::YearlyView => Some(self.spawn_dashboard(filters.yearly_scope())),
            Tab::StaffPerformanceView => Some(self.spawn_staff(filters.staff)),
        })
    }

    pub fn set_daily_date(&self, date: NaiveDate) -> Result<JoinHandle<()>, PosError> {
        self.require_admin()?;
        let scope = {
            let mut state = self.lock();
            state.dashboard_filters_mut().daily_date = date;
            state.dashboard_filters().daily_scope()
        };
        Ok(self.spawn_dashboard(scope))
    }

    fn check_year(&self, year: Option<i32>) -> Result<(), PosError> {
        let Some(year) = year else {
            return Ok(());
        };
        if let Err(e) = check_report_year(year, self.inner.today.year()) {
            self.notify(Toast::from_error(&e, "Invalid year", "Invalid year"));
            return Err(e);
        }
        Ok(())
    }

    pub fn set_month(&self, month: u32, year: i32) -> Result<JoinHandle<()>, PosError> {
        self.require_admin()?;
        self.check_year(Some(year))?;
        let scope = {
            let mut state = self.lock();
            let filters = state.dashboard_filters_mut();
            filters.month = month;
            filters.year = year;
            filters.monthly_scope()
        };
        Ok(self.spawn_dashboard(scope))
    }

    pub fn load_yearly(&self, year: Option<i32>) -> Result<JoinHandle<()>, PosError> {
        self.require_admin()?;
        self.check_year(year)?;
        Ok(self.spawn_dashboard(DashboardScope::Yearly { year }))
    }

    pub fn set_staff_filter(&self, filter: StaffFilter) -> Result<JoinHandle<()>, PosError> {
        self.require_admin()?;
        self.check_year(filter.year)?;
        self.lock().dashboard_filters_mut().staff = filter.clone();
        Ok(self.spawn_staff(filter))
    }

    pub fn reset_staff_filters(&self) -> Result<JoinHandle<()>, PosError> {
        self.set_staff_filter(StaffFilter::default())
    }

    fn spawn_dashboard(&self, scope: DashboardScope) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.load_dashboard(scope).await })
    }

    fn spawn_staff(&self, filter: StaffFilter) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.load_staff_performance(filter).await })
    }

    pub async fn load_dashboard(&self, scope: DashboardScope) {
        match self.inner.gateway.fetch_dashboard(&scope).await {
            Ok(summary) => self.inner.view.show_dashboard(render_dashboard(&summary)),
            Err(e) => {
                warn!(path = scope.path(), error = %e, "dashboard fetch failed");
                self.notify(Toast::danger("Error loading dashboard"));
            }
        }
    }

    pub async fn load_staff_performance(&self, filter: StaffFilter) {
        match self.inner.gateway.fetch_staff_performance(&filter).await {
            Ok(ranking) => self
                .inner
                .view
                .show_staff_ranking(render_staff_ranking(&ranking)),
            Err(e) => {
                warn!(error = %e, "staff performance fetch failed");
                self.notify(Toast::danger("Error loading performance"));
            }
        }
    }
}
