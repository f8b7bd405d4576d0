//! Cart line items and the expected-total calculation
//!
//! Amounts are held as integer cents so that sums of prices like `19.99`
//! never drift the way binary floating point does.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A non-negative amount of money with two fractional digits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "MoneyRepr", into = "String")]
pub struct Money {
    cents: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid amount '{0}': expected digits with at most two decimal places")]
pub struct ParseMoneyError(String);

impl Money {
    pub const ZERO: Money = Money { cents: 0 };

    pub const fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub const fn cents(&self) -> u64 {
        self.cents
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Price times quantity. Saturates instead of wrapping.
    pub fn times(self, quantity: u32) -> Money {
        Money::from_cents(self.cents.saturating_mul(u64::from(quantity)))
    }

    pub fn saturating_add(self, other: Money) -> Money {
        Money::from_cents(self.cents.saturating_add(other.cents))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ParseMoneyError(s.to_string());

        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(frac) || frac.len() > 2 {
            return Err(invalid());
        }

        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let frac_cents = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse::<u64>().map_err(|_| invalid())?,
        };

        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .map(Money::from_cents)
            .ok_or_else(invalid)
    }
}

impl From<Money> for String {
    fn from(money: Money) -> Self {
        money.to_string()
    }
}

/// Amounts in YAML specs come in as plain numbers (`19.99`) or strings (`"19.99"`)
#[derive(Deserialize)]
#[serde(untagged)]
enum MoneyRepr {
    Integer(u64),
    Float(f64),
    Text(String),
}

impl TryFrom<MoneyRepr> for Money {
    type Error = ParseMoneyError;

    fn try_from(repr: MoneyRepr) -> Result<Self, Self::Error> {
        match repr {
            MoneyRepr::Integer(units) => units
                .checked_mul(100)
                .map(Money::from_cents)
                .ok_or_else(|| ParseMoneyError(units.to_string())),
            // Shortest round-trip form, so `19.999` keeps its third decimal
            MoneyRepr::Float(value) => value.to_string().parse(),
            MoneyRepr::Text(text) => text.parse(),
        }
    }
}

/// One line in the cart as the scenario expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Visible product name; unique within a scenario
    pub name: String,

    /// Unit price
    #[serde(alias = "unit_price")]
    pub price: Money,

    #[serde(default = "default_quantity")]
    pub quantity: u32,

    /// Out-of-stock lines are listed but not purchasable
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_quantity() -> u32 {
    1
}

fn default_in_stock() -> bool {
    true
}

impl CartItem {
    pub fn new(name: impl Into<String>, price: Money, quantity: u32) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
            in_stock: true,
        }
    }

    pub fn out_of_stock(mut self) -> Self {
        self.in_stock = false;
        self
    }

    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// Locally computed reference total for a set of cart items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectedTotal(Money);

impl ExpectedTotal {
    pub fn amount(&self) -> Money {
        self.0
    }
}

impl fmt::Display for ExpectedTotal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Sum of `price * quantity` over every item, in order.
pub fn expected_total<'a, I>(items: I) -> ExpectedTotal
where
    I: IntoIterator<Item = &'a CartItem>,
{
    let total = items
        .into_iter()
        .fold(Money::ZERO, |acc, item| acc.saturating_add(item.line_total()));
    ExpectedTotal(total)
}
