//! Scenario state machine and expected-cart bookkeeping
//!
//! A scenario walks `Initial -> ItemRemoved* -> QuantityUpdated* -> Verified`.
//! Every mutating action is applied to the page and to the local
//! [`ExpectedCart`]; verification compares the two.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::cart::{expected_total, CartItem, ExpectedTotal, Money};
use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult};
use crate::page::ShoppingCartPage;
use crate::spec::TestStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioPhase {
    Initial,
    ItemRemoved,
    QuantityUpdated,
    Verified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    RemoveItem,
    UpdateQuantity,
    Verify,
}

impl fmt::Display for ScenarioPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioPhase::Initial => "initial",
            ScenarioPhase::ItemRemoved => "item_removed",
            ScenarioPhase::QuantityUpdated => "quantity_updated",
            ScenarioPhase::Verified => "verified",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Transition::RemoveItem => "remove_item",
            Transition::UpdateQuantity => "update_quantity",
            Transition::Verify => "verify",
        };
        f.write_str(name)
    }
}

impl ScenarioPhase {
    /// Next phase after `transition`. Removals may not follow quantity
    /// updates, and nothing follows verification.
    pub fn advance(self, transition: Transition) -> E2eResult<Self> {
        use ScenarioPhase::*;

        let next = match (self, transition) {
            (Verified, _) | (QuantityUpdated, Transition::RemoveItem) => None,
            (_, Transition::RemoveItem) => Some(ItemRemoved),
            (_, Transition::UpdateQuantity) => Some(QuantityUpdated),
            (_, Transition::Verify) => Some(Verified),
        };

        next.ok_or_else(|| E2eError::InvalidTransition {
            from: self.to_string(),
            to: transition.to_string(),
        })
    }

    pub fn is_terminal(self) -> bool {
        self == ScenarioPhase::Verified
    }
}

/// The cart as the scenario believes it should be
#[derive(Debug, Clone, Default)]
pub struct ExpectedCart {
    items: Vec<CartItem>,
}

impl ExpectedCart {
    pub fn new(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|i| i.name == name)
    }

    pub fn remove(&mut self, name: &str) -> E2eResult<CartItem> {
        let index = self
            .items
            .iter()
            .position(|i| i.name == name)
            .ok_or_else(|| E2eError::UnknownItem(name.to_string()))?;
        Ok(self.items.remove(index))
    }

    pub fn set_quantity(&mut self, name: &str, quantity: u32) -> E2eResult<()> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.name == name)
            .ok_or_else(|| E2eError::UnknownItem(name.to_string()))?;
        item.quantity = quantity;
        Ok(())
    }

    /// Lines that count towards the total
    pub fn purchasable(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter().filter(|i| i.in_stock)
    }

    pub fn expected_total(&self) -> ExpectedTotal {
        expected_total(self.purchasable())
    }

    /// Checkout is possible when no out-of-stock line is left and at least
    /// one purchasable unit remains.
    pub fn checkout_enabled(&self) -> bool {
        let blocked = self.items.iter().any(|i| !i.in_stock);
        let quantity: u64 = self.purchasable().map(|i| u64::from(i.quantity)).sum();
        !blocked && quantity > 0
    }
}

/// One expected-vs-observed comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub expected: Money,
    pub observed: Money,
    pub matches: bool,
    pub checkout_enabled: bool,
}

/// A scenario in progress against one browser page
pub struct ScenarioExecution<D: BrowserDriver> {
    page: ShoppingCartPage<D>,
    cart: ExpectedCart,
    phase: ScenarioPhase,
}

impl<D: BrowserDriver> ScenarioExecution<D> {
    /// Load the cart page. The scenario starts in [`ScenarioPhase::Initial`].
    pub async fn start(mut page: ShoppingCartPage<D>, items: Vec<CartItem>) -> E2eResult<Self> {
        page.navigate().await?;
        Ok(Self {
            page,
            cart: ExpectedCart::new(items),
            phase: ScenarioPhase::Initial,
        })
    }

    pub fn phase(&self) -> ScenarioPhase {
        self.phase
    }

    pub fn cart(&self) -> &ExpectedCart {
        &self.cart
    }

    fn ensure_open(&self, step: &str) -> E2eResult<()> {
        if self.phase.is_terminal() {
            return Err(E2eError::InvalidTransition {
                from: self.phase.to_string(),
                to: step.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_known(&self, item_name: &str) -> E2eResult<()> {
        if !self.cart.contains(item_name) {
            return Err(E2eError::UnknownItem(item_name.to_string()));
        }
        Ok(())
    }

    /// Remove a line: click remove, then confirm in the modal.
    pub async fn remove_item(&mut self, item_name: &str) -> E2eResult<()> {
        let next = self.phase.advance(Transition::RemoveItem)?;
        self.ensure_known(item_name)?;

        self.page.request_removal(item_name).await?.confirm().await?;
        self.cart.remove(item_name)?;
        self.phase = next;
        debug!("Removed '{}', expected total now ${}", item_name, self.cart.expected_total());
        Ok(())
    }

    pub async fn set_quantity(&mut self, item_name: &str, quantity: u32) -> E2eResult<()> {
        let next = self.phase.advance(Transition::UpdateQuantity)?;
        self.ensure_known(item_name)?;

        self.page.update_item_quantity(item_name, quantity).await?;
        self.cart.set_quantity(item_name, quantity)?;
        self.phase = next;
        debug!(
            "Set '{}' to {}, expected total now ${}",
            item_name,
            quantity,
            self.cart.expected_total()
        );
        Ok(())
    }

    pub async fn expect_checkout(&mut self, enabled: bool) -> E2eResult<()> {
        self.ensure_open("expect_checkout")?;
        if enabled {
            self.page.expect_checkout_enabled().await
        } else {
            self.page.expect_checkout_disabled().await
        }
    }

    pub async fn expect_hidden(&mut self, item_name: &str) -> E2eResult<()> {
        self.ensure_open("expect_hidden")?;
        self.page.expect_item_hidden(item_name).await
    }

    /// Compare the page total with the expected cart, then check the
    /// checkout control matches purchasability. Terminal.
    pub async fn verify(&mut self) -> E2eResult<Reconciliation> {
        let next = self.phase.advance(Transition::Verify)?;

        let expected = self.cart.expected_total().amount();
        let observed = self.page.cart_total().await?;
        let checkout_enabled = self.cart.checkout_enabled();
        let reconciliation = Reconciliation {
            expected,
            observed,
            matches: expected == observed,
            checkout_enabled,
        };

        if !reconciliation.matches {
            return Err(E2eError::TotalMismatch { expected, observed });
        }

        if checkout_enabled {
            self.page.expect_checkout_enabled().await?;
        } else {
            self.page.expect_checkout_disabled().await?;
        }

        self.phase = next;
        info!(
            "Verified total ${} (checkout {})",
            expected,
            if checkout_enabled { "enabled" } else { "disabled" }
        );
        Ok(reconciliation)
    }

    /// Run one declarative step. Returns the reconciliation for `verify`.
    pub async fn run_step(&mut self, step: &TestStep) -> E2eResult<Option<Reconciliation>> {
        match step {
            TestStep::Remove { item } => self.remove_item(item).await?,
            TestStep::SetQuantity { item, quantity } => self.set_quantity(item, *quantity).await?,
            TestStep::ExpectCheckout { enabled } => self.expect_checkout(*enabled).await?,
            TestStep::ExpectHidden { item } => self.expect_hidden(item).await?,
            TestStep::Verify => return self.verify().await.map(Some),
            TestStep::Log { message } => info!("[SCENARIO LOG] {}", message),
        }
        Ok(None)
    }

    pub async fn screenshot(&mut self, path: &Path) -> E2eResult<bool> {
        self.page.screenshot(path).await
    }

    pub async fn finish(self) -> E2eResult<()> {
        self.page.close().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart() -> ExpectedCart {
        ExpectedCart::new(vec![
            CartItem::new("Kid’s T-shirt – Size M", Money::from_cents(1999), 1),
            CartItem::new("Bluetooth Headphones", Money::from_cents(8500), 1),
            CartItem::new("Travel Mug", Money::from_cents(1250), 1).out_of_stock(),
        ])
    }

    #[test]
    fn test_phase_order() {
        let phase = ScenarioPhase::Initial
            .advance(Transition::RemoveItem)
            .and_then(|p| p.advance(Transition::RemoveItem))
            .and_then(|p| p.advance(Transition::UpdateQuantity))
            .and_then(|p| p.advance(Transition::Verify))
            .unwrap();
        assert_eq!(phase, ScenarioPhase::Verified);
        assert!(phase.is_terminal());
    }

    #[test]
    fn test_removal_after_quantity_update_rejected() {
        let err = ScenarioPhase::QuantityUpdated
            .advance(Transition::RemoveItem)
            .unwrap_err();
        assert!(matches!(err, E2eError::InvalidTransition { .. }));
    }

    #[test]
    fn test_nothing_follows_verified() {
        for t in [Transition::RemoveItem, Transition::UpdateQuantity, Transition::Verify] {
            assert!(ScenarioPhase::Verified.advance(t).is_err());
        }
    }

    #[test]
    fn test_initial_cart_excludes_out_of_stock() {
        let cart = cart();
        assert_eq!(cart.expected_total().to_string(), "104.99");
        assert!(!cart.checkout_enabled());
    }

    #[test]
    fn test_removing_blocker_enables_checkout() {
        let mut cart = cart();
        cart.remove("Travel Mug").unwrap();
        assert_eq!(cart.expected_total().to_string(), "104.99");
        assert!(cart.checkout_enabled());
    }

    #[test]
    fn test_removal_leaves_remaining_item() {
        let mut cart = ExpectedCart::new(vec![
            CartItem::new("Kid’s T-shirt – Size M", Money::from_cents(1999), 1),
            CartItem::new("Bluetooth Headphones", Money::from_cents(8500), 1),
        ]);
        cart.remove("Bluetooth Headphones").unwrap();
        assert_eq!(cart.expected_total().to_string(), "19.99");
        assert!(cart.checkout_enabled());
    }

    #[test]
    fn test_zero_quantities_disable_checkout() {
        let mut cart = cart();
        cart.remove("Travel Mug").unwrap();
        cart.set_quantity("Kid’s T-shirt – Size M", 0).unwrap();
        cart.set_quantity("Bluetooth Headphones", 0).unwrap();
        assert_eq!(cart.expected_total().to_string(), "0.00");
        assert!(!cart.checkout_enabled());
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_unknown_item() {
        let mut cart = cart();
        assert!(matches!(cart.remove("Teapot"), Err(E2eError::UnknownItem(_))));
        assert!(cart.set_quantity("Teapot", 2).is_err());
    }
}
