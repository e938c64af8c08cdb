//! In-memory gateway and view used by the synchronizer and console tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

use crate::api::Gateway;
use crate::dashboard::{DashboardScope, StaffFilter, Tab};
use crate::error::PosError;
use crate::models::{
    DashboardSummary, ImageFile, ItemDraft, MenuItem, PaymentMethod, PriceUpdate,
    StaffPerformance,
};
use crate::notify::{Severity, Toast};
use crate::render::{CartView, DashboardView, MenuView, StaffRankingView};
use crate::store::FilterState;
use crate::sync::ViewSink;

pub fn menu_item(id: &str, name: &str, category: &str, price: f64) -> MenuItem {
    MenuItem {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        unit_price: price,
        is_on_offer: false,
        original_price: price,
        image_url: None,
        is_visible: true,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListMenu(FilterState),
    RecordSale(String, PaymentMethod),
    Dashboard(DashboardScope),
    Staff(StaffFilter),
    UpdatePrice(String, PriceUpdate),
    CreateItem(ItemDraft),
    UpdateItem(String, ItemDraft),
    SetVisibility(String, bool),
    DeleteItem(String),
    UploadImage(String, String),
}

type HeldMenu = (FilterState, oneshot::Sender<Result<Vec<MenuItem>, PosError>>);

#[derive(Default)]
pub struct MockGateway {
    calls: Mutex<Vec<Call>>,
    menu: Mutex<Vec<MenuItem>>,
    hold_menu: AtomicBool,
    held: Mutex<Vec<Option<HeldMenu>>>,
    sale_attempts: AtomicUsize,
    fail_sale_at: Mutex<Option<(usize, PosError)>>,
    next_error: Mutex<Option<PosError>>,
}

impl MockGateway {
    pub fn with_menu(items: Vec<MenuItem>) -> Self {
        let gateway = Self::default();
        *gateway.menu.lock().unwrap() = items;
        gateway
    }

    /// Park menu requests until `release` is called for them.
    pub fn hold_menu_responses(&self) {
        self.hold_menu.store(true, Ordering::SeqCst);
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().unwrap().len()
    }

    /// Resolve the `index`-th held menu request (in arrival order).
    pub fn release(&self, index: usize, result: Result<Vec<MenuItem>, PosError>) {
        let (_, tx) = self.held.lock().unwrap()[index]
            .take()
            .expect("menu request already released");
        let _ = tx.send(result);
    }

    /// Fail the `attempt`-th sale request (1-based).
    pub fn fail_sale_at(&self, attempt: usize, err: PosError) {
        *self.fail_sale_at.lock().unwrap() = Some((attempt, err));
    }

    /// Fail the next non-menu, non-sale request.
    pub fn fail_next(&self, err: PosError) {
        *self.next_error.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn menu_calls(&self) -> Vec<FilterState> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ListMenu(filter) => Some(filter),
                _ => None,
            })
            .collect()
    }

    pub fn sale_item_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::RecordSale(id, _) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn take_error(&self) -> Result<(), PosError> {
        match self.next_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn list_menu_items(&self, filter: &FilterState) -> Result<Vec<MenuItem>, PosError> {
        self.record(Call::ListMenu(filter.clone()));
        if !self.hold_menu.load(Ordering::SeqCst) {
            return Ok(self.menu.lock().unwrap().clone());
        }
        let (tx, rx) = oneshot::channel();
        self.held.lock().unwrap().push(Some((filter.clone(), tx)));
        rx.await
            .unwrap_or_else(|_| Err(PosError::Network("request dropped".into())))
    }

    async fn record_sale(&self, item_id: &str, method: PaymentMethod) -> Result<(), PosError> {
        self.record(Call::RecordSale(item_id.to_string(), method));
        let attempt = self.sale_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match self.fail_sale_at.lock().unwrap().as_ref() {
            Some((n, err)) if *n == attempt => Err(err.clone()),
            _ => Ok(()),
        }
    }

    async fn fetch_dashboard(&self, scope: &DashboardScope) -> Result<DashboardSummary, PosError> {
        self.record(Call::Dashboard(scope.clone()));
        self.take_error()?;
        DashboardSummary::from_value(
            scope.clone(),
            serde_json::json!({
                "summary": { "total_revenue": 1200.0, "total_profit": 400.0, "order_count": 12 },
                "categories": [{ "_id": "Coffee", "count": 10, "revenue": 1000.0 }],
            }),
        )
    }

    async fn fetch_staff_performance(
        &self,
        filter: &StaffFilter,
    ) -> Result<Vec<StaffPerformance>, PosError> {
        self.record(Call::Staff(filter.clone()));
        self.take_error()?;
        Ok(vec![StaffPerformance {
            id: "Asha".into(),
            total_sales: 40,
            total_revenue: 5200.0,
        }])
    }

    async fn update_price(&self, item_id: &str, update: &PriceUpdate) -> Result<(), PosError> {
        self.record(Call::UpdatePrice(item_id.to_string(), update.clone()));
        self.take_error()
    }

    async fn create_item(&self, draft: &ItemDraft) -> Result<(), PosError> {
        self.record(Call::CreateItem(draft.clone()));
        self.take_error()
    }

    async fn update_item(&self, item_id: &str, draft: &ItemDraft) -> Result<(), PosError> {
        self.record(Call::UpdateItem(item_id.to_string(), draft.clone()));
        self.take_error()
    }

    async fn set_item_visibility(&self, item_id: &str, visible: bool) -> Result<(), PosError> {
        self.record(Call::SetVisibility(item_id.to_string(), visible));
        self.take_error()
    }

    async fn delete_item(&self, item_id: &str) -> Result<(), PosError> {
        self.record(Call::DeleteItem(item_id.to_string()));
        self.take_error()
    }

    async fn upload_image(&self, item_id: &str, file: &ImageFile) -> Result<String, PosError> {
        self.record(Call::UploadImage(
            item_id.to_string(),
            file.file_name.clone(),
        ));
        self.take_error()?;
        Ok(format!("/static/uploads/{item_id}.png"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    MenuLoading,
    Menu(MenuView),
    Cart(CartView),
    Dashboard(DashboardView),
    Staff(StaffRankingView),
    Tab(Tab),
    Toast(Severity, String),
}

#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn last_matching<T>(&self, pick: impl Fn(ViewEvent) -> Option<T>) -> Option<T> {
        self.events().into_iter().rev().find_map(pick)
    }

    pub fn last_menu(&self) -> Option<MenuView> {
        self.last_matching(|e| match e {
            ViewEvent::Menu(view) => Some(view),
            _ => None,
        })
    }

    pub fn last_cart(&self) -> Option<CartView> {
        self.last_matching(|e| match e {
            ViewEvent::Cart(view) => Some(view),
            _ => None,
        })
    }

    pub fn last_dashboard(&self) -> Option<DashboardView> {
        self.last_matching(|e| match e {
            ViewEvent::Dashboard(view) => Some(view),
            _ => None,
        })
    }

    pub fn last_staff(&self) -> Option<StaffRankingView> {
        self.last_matching(|e| match e {
            ViewEvent::Staff(view) => Some(view),
            _ => None,
        })
    }

    pub fn toasts(&self) -> Vec<(Severity, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Toast(severity, message) => Some((severity, message)),
                _ => None,
            })
            .collect()
    }

    pub fn last_toast(&self) -> Option<(Severity, String)> {
        self.toasts().pop()
    }
}

impl ViewSink for RecordingView {
    fn menu_loading(&self) {
        self.push(ViewEvent::MenuLoading);
    }

    fn show_menu(&self, view: MenuView) {
        self.push(ViewEvent::Menu(view));
    }

    fn show_cart(&self, view: CartView) {
        self.push(ViewEvent::Cart(view));
    }

    fn show_dashboard(&self, view: DashboardView) {
        self.push(ViewEvent::Dashboard(view));
    }

    fn show_staff_ranking(&self, view: StaffRankingView) {
        self.push(ViewEvent::Staff(view));
    }

    fn show_tab(&self, tab: Tab) {
        self.push(ViewEvent::Tab(tab));
    }

    fn notify(&self, toast: Toast) {
        self.push(ViewEvent::Toast(toast.severity, toast.message));
    }
}
