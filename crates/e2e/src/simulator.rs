//! In-process storefront that honours the cart page contract
//!
//! Used to dry-run scenarios (`--simulate`) and to exercise the harness in
//! tests without a browser. It understands exactly the locators built from
//! its [`CartSelectors`]: cart lines matched by name substring, a remove
//! control and quantity input per line, a confirmation modal, the total
//! label and the checkout button.

use async_trait::async_trait;
use tracing::debug;

use crate::cart::{CartItem, Money};
use crate::driver::{join_url, BrowserDriver, Locator, SessionFactory, WaitState};
use crate::error::{E2eError, E2eResult};
use crate::page::CartSelectors;
use crate::spec::TestSpec;

#[derive(Debug, Clone)]
struct Line {
    item: CartItem,
    /// Raw text of the quantity input
    input: String,
}

impl Line {
    fn new(item: CartItem) -> Self {
        let input = item.quantity.to_string();
        Self { item, input }
    }

    fn quantity(&self) -> u32 {
        self.input.trim().parse().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Element {
    Checkout,
    Total,
    Modal,
    Confirm,
    Item(String),
    Remove(String),
    Quantity(String),
}

/// Simulated cart page
#[derive(Debug, Clone)]
pub struct SimulatedStorefront {
    selectors: CartSelectors,
    catalog: Vec<CartItem>,
    lines: Vec<Line>,
    url: Option<String>,
    pending_removal: Option<String>,
    surcharge: Money,
    render_amount: bool,
    history: Vec<String>,
}

impl SimulatedStorefront {
    /// A storefront whose cart holds `items` on every page load.
    pub fn from_items(items: Vec<CartItem>, selectors: CartSelectors) -> Self {
        Self {
            selectors,
            catalog: items,
            lines: Vec::new(),
            url: None,
            pending_removal: None,
            surcharge: Money::ZERO,
            render_amount: true,
            history: Vec::new(),
        }
    }

    /// Render totals off by `surcharge`, as a broken pricing rule would.
    pub fn with_surcharge(mut self, surcharge: Money) -> Self {
        self.surcharge = surcharge;
        self
    }

    /// Render the total label without a dollar amount.
    pub fn without_total_amount(mut self) -> Self {
        self.render_amount = false;
        self
    }

    /// Names of the lines currently shown
    pub fn line_names(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.item.name.as_str()).collect()
    }

    pub fn modal_open(&self) -> bool {
        self.pending_removal.is_some()
    }

    /// Every command received, in order
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn total(&self) -> Money {
        self.lines
            .iter()
            .filter(|l| l.item.in_stock)
            .fold(Money::ZERO, |acc, l| acc.saturating_add(l.item.price.times(l.quantity())))
    }

    pub fn checkout_enabled(&self) -> bool {
        let blocked = self.lines.iter().any(|l| !l.item.in_stock);
        let units: u64 = self
            .lines
            .iter()
            .filter(|l| l.item.in_stock)
            .map(|l| u64::from(l.quantity()))
            .sum();
        !blocked && units > 0
    }

    fn total_label(&self) -> String {
        if self.render_amount {
            format!("Total: ${}", self.total().saturating_add(self.surcharge))
        } else {
            "Total: --".to_string()
        }
    }

    fn record(&mut self, op: &str, locator: Option<&Locator>) {
        let entry = match locator {
            Some(l) => format!("{}:{}", op, l),
            None => op.to_string(),
        };
        debug!("[sim] {}", entry);
        self.history.push(entry);
    }

    fn ensure_loaded(&self) -> E2eResult<()> {
        if self.url.is_none() {
            return Err(E2eError::Playwright("page has not been navigated".to_string()));
        }
        Ok(())
    }

    fn resolve(&self, locator: &Locator) -> E2eResult<Element> {
        let s = &self.selectors;
        let unknown = || E2eError::StepFailed {
            step: locator.to_string(),
            reason: "selector is not part of the cart page".to_string(),
        };

        let element = match locator.segments() {
            [one] if *one == s.checkout_button => Element::Checkout,
            [one] if *one == s.cart_total => Element::Total,
            [one] if *one == s.confirm_modal => Element::Modal,
            [modal, confirm] if *modal == s.confirm_modal && *confirm == s.confirm_button => {
                Element::Confirm
            }
            [item] => Element::Item(s.item_name(item).ok_or_else(unknown)?),
            [item, control] => {
                let name = s.item_name(item).ok_or_else(unknown)?;
                if *control == s.remove_button {
                    Element::Remove(name)
                } else if *control == s.quantity_input {
                    Element::Quantity(name)
                } else {
                    return Err(unknown());
                }
            }
            _ => return Err(unknown()),
        };
        Ok(element)
    }

    /// Index of the first line whose name contains `text`, like `:has-text`.
    fn find_line(&self, text: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.item.name.contains(text))
    }

    fn visible(&self, element: &Element) -> bool {
        match element {
            Element::Checkout | Element::Total => true,
            Element::Modal | Element::Confirm => self.pending_removal.is_some(),
            Element::Item(name) | Element::Remove(name) | Element::Quantity(name) => {
                self.find_line(name).is_some()
            }
        }
    }

    fn not_found(locator: &Locator) -> E2eError {
        E2eError::Timeout(format!("{} to be visible", locator))
    }

    fn line_for(&mut self, name: &str, locator: &Locator) -> E2eResult<&mut Line> {
        let index = self.find_line(name).ok_or_else(|| Self::not_found(locator))?;
        Ok(&mut self.lines[index])
    }
}

#[async_trait]
impl BrowserDriver for SimulatedStorefront {
    async fn navigate(&mut self, url: &str) -> E2eResult<()> {
        self.record("navigate", None);
        self.url = Some(url.to_string());
        self.lines = self.catalog.iter().cloned().map(Line::new).collect();
        self.pending_removal = None;
        Ok(())
    }

    async fn click(&mut self, locator: &Locator) -> E2eResult<()> {
        self.ensure_loaded()?;
        self.record("click", Some(locator));
        match self.resolve(locator)? {
            Element::Remove(name) => {
                let index = self.find_line(&name).ok_or_else(|| Self::not_found(locator))?;
                self.pending_removal = Some(self.lines[index].item.name.clone());
            }
            Element::Confirm => {
                let name = self
                    .pending_removal
                    .take()
                    .ok_or_else(|| Self::not_found(locator))?;
                self.lines.retain(|l| l.item.name != name);
            }
            element if self.visible(&element) => {}
            _ => return Err(Self::not_found(locator)),
        }
        Ok(())
    }

    async fn fill(&mut self, locator: &Locator, text: &str) -> E2eResult<()> {
        self.ensure_loaded()?;
        self.record("fill", Some(locator));
        match self.resolve(locator)? {
            Element::Quantity(name) => {
                self.line_for(&name, locator)?.input = text.to_string();
                Ok(())
            }
            _ => Err(E2eError::StepFailed {
                step: format!("fill:{}", locator),
                reason: "element is not an input".to_string(),
            }),
        }
    }

    async fn clear(&mut self, locator: &Locator) -> E2eResult<()> {
        self.ensure_loaded()?;
        self.record("clear", Some(locator));
        match self.resolve(locator)? {
            Element::Quantity(name) => {
                self.line_for(&name, locator)?.input.clear();
                Ok(())
            }
            _ => Err(E2eError::StepFailed {
                step: format!("clear:{}", locator),
                reason: "element is not an input".to_string(),
            }),
        }
    }

    async fn read_text(&mut self, locator: &Locator) -> E2eResult<Option<String>> {
        self.ensure_loaded()?;
        self.record("text", Some(locator));
        let element = self.resolve(locator)?;
        if !self.visible(&element) {
            return Err(Self::not_found(locator));
        }
        let text = match element {
            Element::Total => Some(self.total_label()),
            Element::Checkout => Some("Checkout".to_string()),
            Element::Item(name) => self
                .find_line(&name)
                .map(|i| self.lines[i].item.name.clone()),
            Element::Confirm => Some("Yes".to_string()),
            Element::Modal => Some("Remove this item? Yes No".to_string()),
            Element::Remove(_) | Element::Quantity(_) => None,
        };
        Ok(text)
    }

    async fn wait_for(&mut self, locator: &Locator, state: WaitState) -> E2eResult<()> {
        self.ensure_loaded()?;
        self.record(&format!("wait_{}", state.as_str()), Some(locator));
        let visible = self.visible(&self.resolve(locator)?);
        let wanted = matches!(state, WaitState::Visible | WaitState::Attached);
        if visible == wanted {
            Ok(())
        } else {
            Err(E2eError::Timeout(format!("{} to be {}", locator, state.as_str())))
        }
    }

    async fn expect_enabled(&mut self, locator: &Locator, enabled: bool) -> E2eResult<()> {
        self.ensure_loaded()?;
        self.record(if enabled { "expect_enabled" } else { "expect_disabled" }, Some(locator));
        let actual = match self.resolve(locator)? {
            Element::Checkout => self.checkout_enabled(),
            element if self.visible(&element) => true,
            _ => return Err(Self::not_found(locator)),
        };
        if actual != enabled {
            return Err(E2eError::AssertionFailed(format!(
                "expected {} to be {}",
                locator,
                if enabled { "enabled" } else { "disabled" }
            )));
        }
        Ok(())
    }
}

/// Opens a fresh [`SimulatedStorefront`] seeded with each scenario's items
#[derive(Debug, Clone)]
pub struct SimulatedSessionFactory {
    base_url: String,
    selectors: CartSelectors,
}

impl SimulatedSessionFactory {
    pub fn new(base_url: impl Into<String>, selectors: CartSelectors) -> Self {
        Self {
            base_url: base_url.into(),
            selectors,
        }
    }
}

#[async_trait]
impl SessionFactory for SimulatedSessionFactory {
    type Driver = SimulatedStorefront;

    async fn open_session(&self, spec: &TestSpec) -> E2eResult<Self::Driver> {
        Ok(SimulatedStorefront::from_items(spec.items.clone(), self.selectors.clone()))
    }

    fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storefront() -> SimulatedStorefront {
        SimulatedStorefront::from_items(
            vec![
                CartItem::new("Bluetooth Headphones", Money::from_cents(8500), 1),
                CartItem::new("Travel Mug", Money::from_cents(1250), 1).out_of_stock(),
            ],
            CartSelectors::default(),
        )
    }

    fn item(name: &str) -> Locator {
        Locator::new(CartSelectors::default().item_selector(name))
    }

    #[tokio::test]
    async fn test_requires_navigation() {
        let mut sim = storefront();
        let total = Locator::new("#cartTotal");
        assert!(sim.read_text(&total).await.is_err());
        sim.navigate("sim://cart").await.unwrap();
        assert_eq!(
            sim.read_text(&total).await.unwrap().as_deref(),
            Some("Total: $85.00")
        );
    }

    #[tokio::test]
    async fn test_remove_needs_confirmation() {
        let mut sim = storefront();
        sim.navigate("sim://cart").await.unwrap();

        sim.click(&item("Travel Mug").locate(".remove-item")).await.unwrap();
        assert!(sim.modal_open());
        assert_eq!(sim.line_names().len(), 2);

        let confirm = Locator::new("#remove-confirm-modal")
            .locate(r#"button.confirm-remove:has-text("Yes")"#);
        sim.click(&confirm).await.unwrap();
        assert!(!sim.modal_open());
        assert_eq!(sim.line_names(), vec!["Bluetooth Headphones"]);
        assert!(sim.checkout_enabled());
    }

    #[tokio::test]
    async fn test_confirm_without_modal_times_out() {
        let mut sim = storefront();
        sim.navigate("sim://cart").await.unwrap();
        let confirm = Locator::new("#remove-confirm-modal")
            .locate(r#"button.confirm-remove:has-text("Yes")"#);
        assert!(matches!(sim.click(&confirm).await, Err(E2eError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_quantity_input_drives_total() {
        let mut sim = storefront();
        sim.navigate("sim://cart").await.unwrap();
        let input = item("Headphones").locate("input.quantity");
        sim.clear(&input).await.unwrap();
        sim.fill(&input, "3").await.unwrap();
        assert_eq!(sim.total(), Money::from_cents(25500));
    }

    #[tokio::test]
    async fn test_wait_hidden_on_present_item_fails() {
        let mut sim = storefront();
        sim.navigate("sim://cart").await.unwrap();
        assert!(sim.wait_for(&item("Travel Mug"), WaitState::Hidden).await.is_err());
        assert!(sim.wait_for(&item("Teapot"), WaitState::Hidden).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_selector_is_rejected() {
        let mut sim = storefront();
        sim.navigate("sim://cart").await.unwrap();
        let err = sim.click(&Locator::new("#newsletter")).await.unwrap_err();
        assert!(matches!(err, E2eError::StepFailed { .. }));
    }
}
