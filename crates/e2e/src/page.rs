//! Page object for the shopping cart
//!
//! Maps named cart operations onto locators. Selectors live in
//! [`CartSelectors`] so a restyled storefront only needs a config change.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::cart::Money;
use crate::driver::{BrowserDriver, Locator, WaitState};
use crate::error::E2eResult;
use crate::total;

/// CSS selectors for the page-under-test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSelectors {
    pub checkout_button: String,
    pub cart_total: String,
    pub confirm_modal: String,
    /// Confirm control, scoped inside the modal
    pub confirm_button: String,
    /// Cart line container; `{name}` is replaced by the item name
    pub item: String,
    /// Remove control, scoped inside the item
    pub remove_button: String,
    /// Quantity input, scoped inside the item
    pub quantity_input: String,
}

impl Default for CartSelectors {
    fn default() -> Self {
        Self {
            checkout_button: "#checkoutBtn".to_string(),
            cart_total: "#cartTotal".to_string(),
            confirm_modal: "#remove-confirm-modal".to_string(),
            confirm_button: r#"button.confirm-remove:has-text("Yes")"#.to_string(),
            item: r#".cart-item:has-text("{name}")"#.to_string(),
            remove_button: ".remove-item".to_string(),
            quantity_input: "input.quantity".to_string(),
        }
    }
}

impl CartSelectors {
    /// Selector for the line item named `name`.
    pub fn item_selector(&self, name: &str) -> String {
        self.item.replace("{name}", &escape_text(name))
    }

    /// Recover the item name from a selector built by [`Self::item_selector`].
    pub fn item_name(&self, selector: &str) -> Option<String> {
        let (prefix, suffix) = self.item.split_once("{name}")?;
        let escaped = selector.strip_prefix(prefix)?.strip_suffix(suffix)?;
        Some(unescape_text(escaped))
    }
}

fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unescape_text(text: &str) -> String {
    text.replace("\\\"", "\"").replace("\\\\", "\\")
}

/// The shopping cart page
pub struct ShoppingCartPage<D: BrowserDriver> {
    driver: D,
    url: String,
    selectors: CartSelectors,
    checkout_button: Locator,
    cart_total: Locator,
    confirm_button: Locator,
}

impl<D: BrowserDriver> ShoppingCartPage<D> {
    pub fn new(driver: D, url: impl Into<String>, selectors: CartSelectors) -> Self {
        let checkout_button = Locator::new(selectors.checkout_button.clone());
        let cart_total = Locator::new(selectors.cart_total.clone());
        let confirm_button =
            Locator::new(selectors.confirm_modal.clone()).locate(selectors.confirm_button.clone());
        Self {
            driver,
            url: url.into(),
            selectors,
            checkout_button,
            cart_total,
            confirm_button,
        }
    }

    fn item_locator(&self, item_name: &str) -> Locator {
        Locator::new(self.selectors.item_selector(item_name))
    }

    pub async fn navigate(&mut self) -> E2eResult<()> {
        info!("Opening cart at {}", self.url);
        self.driver.navigate(&self.url).await
    }

    /// Click the item's remove control. The item stays in the cart until the
    /// returned [`PendingRemoval`] is confirmed.
    pub async fn request_removal(&mut self, item_name: &str) -> E2eResult<PendingRemoval<'_, D>> {
        let remove = self.item_locator(item_name).locate(self.selectors.remove_button.clone());
        debug!("Requesting removal of '{}'", item_name);
        self.driver.click(&remove).await?;
        Ok(PendingRemoval {
            page: self,
            item_name: item_name.to_string(),
        })
    }

    /// Set the absolute quantity of a line. Zero keeps the line in place.
    pub async fn update_item_quantity(&mut self, item_name: &str, quantity: u32) -> E2eResult<()> {
        let input = self.item_locator(item_name).locate(self.selectors.quantity_input.clone());
        debug!("Setting quantity of '{}' to {}", item_name, quantity);
        self.driver.clear(&input).await?;
        self.driver.fill(&input, &quantity.to_string()).await
    }

    /// The total shown on the page, zero if the label has no `$X.YY` amount.
    pub async fn cart_total(&mut self) -> E2eResult<Money> {
        let label = self.driver.read_text(&self.cart_total).await?;
        let parsed = label.as_deref().and_then(total::extract_amount);
        if parsed.is_none() {
            debug!("No amount in total label {:?}; reading as 0.00", label);
        }
        Ok(total::observed_total(label.as_deref()))
    }

    pub async fn expect_item_hidden(&mut self, item_name: &str) -> E2eResult<()> {
        let item = self.item_locator(item_name);
        self.driver.wait_for(&item, WaitState::Hidden).await
    }

    pub async fn expect_checkout_enabled(&mut self) -> E2eResult<()> {
        self.driver.expect_enabled(&self.checkout_button, true).await
    }

    pub async fn expect_checkout_disabled(&mut self) -> E2eResult<()> {
        self.driver.expect_enabled(&self.checkout_button, false).await
    }

    pub async fn screenshot(&mut self, path: &Path) -> E2eResult<bool> {
        self.driver.screenshot(path).await
    }

    /// Close the page and hand back the driver.
    pub async fn close(mut self) -> E2eResult<D> {
        self.driver.close().await?;
        Ok(self.driver)
    }
}

/// A removal that has been requested but not yet confirmed
#[must_use = "the item is only removed once the removal is confirmed"]
pub struct PendingRemoval<'a, D: BrowserDriver> {
    page: &'a mut ShoppingCartPage<D>,
    item_name: String,
}

impl<'a, D: BrowserDriver> PendingRemoval<'a, D> {
    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    /// Acknowledge the confirmation modal.
    pub async fn confirm(self) -> E2eResult<()> {
        debug!("Confirming removal of '{}'", self.item_name);
        let confirm = self.page.confirm_button.clone();
        self.page.driver.click(&confirm).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_selector_round_trips_name() {
        let selectors = CartSelectors::default();
        let selector = selectors.item_selector("Kid’s T-shirt – Size M");
        assert_eq!(selector, r#".cart-item:has-text("Kid’s T-shirt – Size M")"#);
        assert_eq!(selectors.item_name(&selector).as_deref(), Some("Kid’s T-shirt – Size M"));
    }

    #[test]
    fn test_item_selector_escapes_quotes() {
        let selectors = CartSelectors::default();
        let selector = selectors.item_selector(r#"12" Pizza Stone"#);
        assert_eq!(selector, r#".cart-item:has-text("12\" Pizza Stone")"#);
        assert_eq!(selectors.item_name(&selector).as_deref(), Some(r#"12" Pizza Stone"#));
    }

    #[test]
    fn test_item_name_rejects_other_selectors() {
        let selectors = CartSelectors::default();
        assert_eq!(selectors.item_name("#cartTotal"), None);
    }
}
