//! Shopping-cart E2E scenarios
//!
//! This crate drives a storefront's cart page through Playwright and checks
//! that the total it renders matches a total computed locally from the
//! items the scenario believes are in the cart.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Cart E2E Runner (Rust)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner<F: SessionFactory>                              │
//! │    ├── open_session(spec) -> BrowserDriver                  │
//! │    ├── ScenarioExecution (Initial → Removed → Updated →     │
//! │    │                      Verified)                         │
//! │    │     └── ShoppingCartPage (locators, two-step remove)   │
//! │    └── reconcile: expected_total(items) == $X.YY on page    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSpec (YAML)                                            │
//! │    ├── name, description, tags, path                        │
//! │    ├── items: [CartItem { name, price, quantity, in_stock }]│
//! │    └── steps: remove | set_quantity | expect_checkout |     │
//! │               expect_hidden | verify | log                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Drivers: PlaywrightSession (node subprocess, JSON lines)   │
//! │           SimulatedStorefront (in-process)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod cart;
pub mod config;
pub mod driver;
pub mod error;
pub mod page;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod simulator;
pub mod spec;
pub mod target;
pub mod total;

pub use cart::{expected_total, CartItem, ExpectedTotal, Money};
pub use error::{E2eError, E2eResult};
pub use runner::TestRunner;
pub use spec::{TestSpec, TestStep};
