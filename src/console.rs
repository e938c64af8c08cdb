//! Line-oriented front-end.
//!
//! Each input line is parsed into a [`Command`] and dispatched to the
//! synchronizer. Fetches it starts run in the background; their results are
//! printed by [`ConsoleView`] whenever they arrive.

use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::dashboard::{parse_date, parse_month, parse_year, StaffFilter, Tab};
use crate::db::DbState;
use crate::diagnostics;
use crate::error::PosError;
use crate::models::{ImageFile, ItemDraft, PaymentMethod, PriceUpdate};
use crate::notify::Toast;
use crate::render::{
    CartBody, CartView, DashboardView, MenuView, SectionBody, StaffRankingView,
};
use crate::settings::{self, Role, Theme};
use crate::sync::{ViewSink, ViewSynchronizer};

pub const HELP: &str = "\
Commands:
  menu                              reload the menu
  category <name>                   filter by category (All for everything)
  search <text>                     search the menu
  clear-search                      drop the search text
  add <item_id>                     add one unit to the cart
  qty <item_id> <delta>             change a cart quantity
  cart                              show the cart
  checkout <cash|phonepe>           record the cart as a sale
  pay <item_id> <cash|phonepe>      record a single unit
  tab <sales-entry|daily|monthly|yearly|staff-performance>
  daily <YYYY-MM-DD>                daily stats for a date
  monthly <MM> <YYYY>               monthly stats
  yearly [YYYY]                     yearly stats
  staff [date=..] [month=..] [year=..]
  staff-reset                       all-time staff ranking
  price <item_id> <price> [offer] [reason...]
  create <price> <cost> <category> <name...>
  edit <item_id> <price> <cost> <category> <name...>
  upload <item_id> <path>
  hide <item_id> | show <item_id> | delete <item_id>
  role <admin|staff>                applies from the next session
  api-url <url|default>             applies from the next session
  theme | about | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Empty,
    Help,
    Menu,
    Category(String),
    Search(String),
    ClearSearch,
    Add(String),
    Qty { item_id: String, delta: i64 },
    Cart,
    Checkout(PaymentMethod),
    Pay { item_id: String, method: PaymentMethod },
    Tab(Tab),
    Daily(NaiveDate),
    Monthly { month: u32, year: i32 },
    Yearly(Option<i32>),
    Staff(StaffFilter),
    StaffReset,
    Price { item_id: String, update: PriceUpdate },
    Create(ItemDraft),
    Edit { item_id: String, draft: ItemDraft },
    Upload { item_id: String, path: PathBuf },
    Hide(String),
    Show(String),
    Delete(String),
    Role(Role),
    /// `None` restores the default.
    ApiUrl(Option<String>),
    Theme,
    About,
    Quit,
}

fn usage(text: &str) -> String {
    format!("usage: {text}")
}

fn one_arg(args: &[&str], text: &str) -> Result<String, String> {
    match args {
        [value] => Ok((*value).to_string()),
        _ => Err(usage(text)),
    }
}

fn parse_amount(raw: &str, text: &str) -> Result<f64, String> {
    raw.parse::<f64>().map_err(|_| usage(text))
}

fn parse_draft(args: &[&str], text: &str) -> Result<ItemDraft, String> {
    let [price, cost, category, name @ ..] = args else {
        return Err(usage(text));
    };
    if name.is_empty() {
        return Err(usage(text));
    }
    Ok(ItemDraft {
        name: name.join(" "),
        category: (*category).to_string(),
        price: parse_amount(price, text)?,
        cost: parse_amount(cost, text)?,
        image_url: None,
        is_visible: true,
    })
}

fn parse_staff_filter(args: &[&str]) -> Result<StaffFilter, String> {
    let mut filter = StaffFilter::default();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| usage("staff [date=YYYY-MM-DD] [month=MM] [year=YYYY]"))?;
        match key {
            "date" => filter.date = Some(parse_date(value).map_err(|e| e.to_string())?),
            "month" => filter.month = Some(parse_month(value).map_err(|e| e.to_string())?),
            "year" => filter.year = Some(parse_year(value).map_err(|e| e.to_string())?),
            other => return Err(format!("unknown staff filter: {other}")),
        }
    }
    Ok(filter)
}

/// Parse one input line. Errors are usage messages for the operator.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Command::Empty);
    };
    let args: Vec<&str> = words.collect();
    let rest = args.join(" ");

    let command = match head.to_ascii_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "menu" => Command::Menu,
        "category" => Command::Category(if rest.is_empty() {
            crate::store::ALL_CATEGORIES.to_string()
        } else {
            rest
        }),
        "search" => Command::Search(rest),
        "clear-search" => Command::ClearSearch,
        "add" => Command::Add(one_arg(&args, "add <item_id>")?),
        "qty" => match args.as_slice() {
            [item_id, delta] => Command::Qty {
                item_id: (*item_id).to_string(),
                delta: delta
                    .parse()
                    .map_err(|_| usage("qty <item_id> <delta>"))?,
            },
            _ => return Err(usage("qty <item_id> <delta>")),
        },
        "cart" => Command::Cart,
        "checkout" => {
            let method = one_arg(&args, "checkout <cash|phonepe>")?;
            Command::Checkout(method.parse().map_err(|e: PosError| e.to_string())?)
        }
        "pay" => match args.as_slice() {
            [item_id, method] => Command::Pay {
                item_id: (*item_id).to_string(),
                method: method.parse().map_err(|e: PosError| e.to_string())?,
            },
            _ => return Err(usage("pay <item_id> <cash|phonepe>")),
        },
        "tab" => {
            let raw = one_arg(&args, "tab <id>")?;
            Command::Tab(raw.parse().map_err(|e: PosError| e.to_string())?)
        }
        "daily" => {
            let raw = one_arg(&args, "daily <YYYY-MM-DD>")?;
            Command::Daily(parse_date(&raw).map_err(|e| e.to_string())?)
        }
        "monthly" => match args.as_slice() {
            [month, year] => Command::Monthly {
                month: parse_month(month).map_err(|e| e.to_string())?,
                year: parse_year(year).map_err(|e| e.to_string())?,
            },
            _ => return Err(usage("monthly <MM> <YYYY>")),
        },
        "yearly" => match args.as_slice() {
            [] => Command::Yearly(None),
            [year] => Command::Yearly(Some(parse_year(year).map_err(|e| e.to_string())?)),
            _ => return Err(usage("yearly [YYYY]")),
        },
        "staff" => Command::Staff(parse_staff_filter(&args)?),
        "staff-reset" => Command::StaffReset,
        "price" => {
            let text = "price <item_id> <price> [offer] [reason...]";
            let [item_id, price, tail @ ..] = args.as_slice() else {
                return Err(usage(text));
            };
            let (is_offer, reason) = match tail {
                [flag, reason @ ..] if flag.eq_ignore_ascii_case("offer") => (true, reason),
                reason => (false, reason),
            };
            Command::Price {
                item_id: (*item_id).to_string(),
                update: PriceUpdate {
                    price: parse_amount(price, text)?,
                    is_offer,
                    reason: reason.join(" "),
                },
            }
        }
        "create" => Command::Create(parse_draft(
            &args,
            "create <price> <cost> <category> <name...>",
        )?),
        "edit" => {
            let text = "edit <item_id> <price> <cost> <category> <name...>";
            let [item_id, draft @ ..] = args.as_slice() else {
                return Err(usage(text));
            };
            Command::Edit {
                item_id: (*item_id).to_string(),
                draft: parse_draft(draft, text)?,
            }
        }
        "upload" => match args.as_slice() {
            [item_id, path] => Command::Upload {
                item_id: (*item_id).to_string(),
                path: PathBuf::from(path),
            },
            _ => return Err(usage("upload <item_id> <path>")),
        },
        "hide" => Command::Hide(one_arg(&args, "hide <item_id>")?),
        "show" => Command::Show(one_arg(&args, "show <item_id>")?),
        "delete" => Command::Delete(one_arg(&args, "delete <item_id>")?),
        "role" => {
            let raw = one_arg(&args, "role <admin|staff>")?;
            Command::Role(raw.parse().map_err(|e: PosError| e.to_string())?)
        }
        "api-url" => {
            let raw = one_arg(&args, "api-url <url|default>")?;
            Command::ApiUrl((!raw.eq_ignore_ascii_case("default")).then_some(raw))
        }
        "theme" => Command::Theme,
        "about" => Command::About,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(command)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

pub fn format_menu(view: &MenuView) -> String {
    match view {
        MenuView::Empty(state) => format!("{}\n  {}", state.title, state.hint),
        MenuView::Cards(cards) => cards
            .iter()
            .map(|card| {
                let mut line = format!("  [{}] {:<28} {}", card.item_id, card.name, card.price_label);
                if let Some(original) = &card.original_price_label {
                    line.push_str(&format!(" (was {original})"));
                }
                if card.show_admin_controls {
                    line.push_str("  [price|edit|upload|hide|delete]");
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn format_cart(view: &CartView) -> String {
    let header = format!("Cart ({}) total {}", view.badge_count, view.total_label);
    match &view.body {
        CartBody::Empty(state) => format!("{header}\n  {}", state.title),
        CartBody::Lines(lines) => {
            let body = lines
                .iter()
                .map(|l| {
                    format!(
                        "  [{}] {} x{} ({}) = {}",
                        l.item_id, l.name, l.quantity, l.unit_price_label, l.line_total_label
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("{header}\n{body}")
        }
    }
}

pub fn format_dashboard(view: &DashboardView) -> String {
    let mut out = vec![
        format!("{} - {}", view.title, view.scope_label),
        format!(
            "  revenue {}  profit {}  orders {}",
            view.revenue_label, view.profit_label, view.orders_label
        ),
        format!("  phonepe {}  cash {}", view.phonepe_label, view.cash_label),
    ];
    if let Some(avg) = &view.avg_order_label {
        out.push(format!("  avg order {avg}"));
    }
    for section in &view.sections {
        out.push(format!("  {}", section.heading));
        match &section.body {
            SectionBody::Empty(state) => out.push(format!("    {}", state.title)),
            SectionBody::Rows(rows) => out.extend(
                rows.iter()
                    .map(|r| format!("    {:<16} {:>5}  {}", r.label, r.count, r.revenue_label)),
            ),
        }
    }
    if let Some(chart) = &view.chart {
        let points: Vec<String> = chart
            .labels
            .iter()
            .zip(&chart.values)
            .map(|(label, value)| format!("{label}={value:.0}"))
            .collect();
        out.push(format!("  chart {}", points.join(" ")));
    }
    out.join("\n")
}

pub fn format_staff(view: &StaffRankingView) -> String {
    match view {
        StaffRankingView::Empty(state) => format!("Team Rankings\n  {}", state.title),
        StaffRankingView::Rows(rows) => {
            let body = rows
                .iter()
                .map(|r| {
                    format!(
                        "  #{} ({}) {:<20} {:>4} sales  {}  {}",
                        r.rank,
                        r.initials,
                        r.name,
                        r.total_sales,
                        r.revenue_label,
                        r.badge.label()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("Team Rankings\n{body}")
        }
    }
}

/// Prints every view model and toast to stdout.
#[derive(Debug, Default)]
pub struct ConsoleView;

impl ViewSink for ConsoleView {
    fn menu_loading(&self) {
        println!("Loading menu...");
    }

    fn show_menu(&self, view: MenuView) {
        println!("{}", format_menu(&view));
    }

    fn show_cart(&self, view: CartView) {
        println!("{}", format_cart(&view));
    }

    fn show_dashboard(&self, view: DashboardView) {
        println!("{}", format_dashboard(&view));
    }

    fn show_staff_ranking(&self, view: StaffRankingView) {
        println!("{}", format_staff(&view));
    }

    fn show_tab(&self, tab: Tab) {
        println!("== {} ==", tab.title());
    }

    fn notify(&self, toast: Toast) {
        println!("[{}] {}", toast.severity.as_str().to_uppercase(), toast.message);
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console {
    sync: ViewSynchronizer,
    db: Arc<DbState>,
    theme: Theme,
}

impl Console {
    pub fn new(sync: ViewSynchronizer, db: Arc<DbState>) -> Self {
        Self {
            sync,
            db,
            theme: Theme::default(),
        }
    }

    /// Theme loaded at start-up, shown in the banner.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn banner(&self) -> String {
        format!(
            "Signed in as {} ({} theme). Type `help` for commands.",
            self.sync.role(),
            self.theme.as_str()
        )
    }

    /// Run one command. Fetches it starts are left running in the background.
    /// Failures have already been shown as toasts, so they only reach the log.
    pub async fn execute(&self, command: Command) -> Flow {
        if command == Command::Quit {
            return Flow::Quit;
        }
        if let Err(e) = self.dispatch(command).await {
            debug!(error = %e, "command failed");
        }
        Flow::Continue
    }

    async fn dispatch(&self, command: Command) -> Result<(), PosError> {
        let sync = &self.sync;
        match command {
            Command::Empty | Command::Quit => {}
            Command::Help => println!("{HELP}"),
            Command::Menu => {
                sync.refresh_menu();
            }
            Command::Category(name) => {
                sync.select_category(&name);
            }
            Command::Search(text) => {
                sync.search(&text);
            }
            Command::ClearSearch => {
                sync.clear_search();
            }
            Command::Add(item_id) => {
                if let Err(e) = sync.add_item_by_id(&item_id) {
                    println!("{e} (run `menu` first)");
                    return Err(e);
                }
            }
            Command::Qty { item_id, delta } => sync.adjust_quantity(&item_id, delta),
            Command::Cart => sync.show_cart(),
            Command::Checkout(method) => {
                sync.complete_sale(method).await?;
            }
            Command::Pay { item_id, method } => {
                sync.open_payment(&item_id)?;
                sync.confirm_payment(method).await?;
            }
            Command::Tab(tab) => {
                sync.navigate_to(tab)?;
            }
            Command::Daily(date) => {
                sync.set_daily_date(date)?;
            }
            Command::Monthly { month, year } => {
                sync.set_month(month, year)?;
            }
            Command::Yearly(year) => {
                sync.load_yearly(year)?;
            }
            Command::Staff(filter) => {
                sync.set_staff_filter(filter)?;
            }
            Command::StaffReset => {
                sync.reset_staff_filters()?;
            }
            Command::Price { item_id, update } => {
                sync.open_price_editor(&item_id)?;
                sync.save_new_price(update).await?;
            }
            Command::Create(draft) => sync.create_item(draft).await?,
            Command::Edit { item_id, draft } => {
                sync.open_item_editor(&item_id)?;
                sync.save_item(draft).await?;
            }
            Command::Upload { item_id, path } => {
                sync.begin_image_upload(&item_id)?;
                let bytes = match tokio::fs::read(&path).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        sync.cancel_modal();
                        warn!(path = %path.display(), error = %e, "cannot read upload file");
                        println!("Cannot read {}: {e}", path.display());
                        return Err(PosError::Validation(e.to_string()));
                    }
                };
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload".to_string());
                sync.finish_image_upload(ImageFile { file_name, bytes }).await?;
            }
            Command::Hide(item_id) => sync.set_item_visibility(&item_id, false).await?,
            Command::Show(item_id) => sync.set_item_visibility(&item_id, true).await?,
            Command::Delete(item_id) => sync.delete_item(&item_id).await?,
            Command::Role(role) => {
                settings::set_role(&self.db, role)?;
                println!("Role set to {role}; restart to apply.");
            }
            Command::ApiUrl(Some(url)) => {
                let stored = settings::set_api_base_url(&self.db, &url)?;
                println!("API URL set to {stored}; restart to apply.");
            }
            Command::ApiUrl(None) => {
                settings::reset_api_base_url(&self.db)?;
                println!("API URL reset to default; restart to apply.");
            }
            Command::Theme => {
                let theme = settings::toggle_theme(&self.db)?;
                println!("Theme: {}", theme.as_str());
            }
            Command::About => println!("{}", diagnostics::get_about_info()),
        }
        Ok(())
    }

    /// Read commands from stdin until `quit` or end of input.
    pub async fn run(self) -> std::io::Result<()> {
        println!("{}", self.banner());
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_command(&line) {
                Ok(command) => {
                    if self.execute(command).await == Flow::Quit {
                        break;
                    }
                }
                Err(message) => println!("{message}"),
            }
        }
        info!("console closed");
        Ok(())
    }
}
