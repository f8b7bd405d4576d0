//! Reading the cart total back out of the rendered label

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::cart::Money;

static AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\d+\.\d{2})").expect("amount pattern is valid"));

/// First `$X.YY` amount in `text`, if any.
pub fn extract_amount(text: &str) -> Option<Money> {
    let amount = AMOUNT.captures(text)?.get(1)?.as_str();
    match amount.parse() {
        Ok(money) => Some(money),
        Err(e) => {
            debug!("Total label amount out of range: {}", e);
            None
        }
    }
}

/// Observed total for a label that may not be rendered yet.
///
/// A missing label or one without a dollar amount reads as zero, so the
/// comparison against the expected total still happens and fails loudly
/// instead of aborting the scenario.
pub fn observed_total(label: Option<&str>) -> Money {
    label.and_then(extract_amount).unwrap_or(Money::ZERO)
}
