//! Expected-vs-observed reconciliation through the page object

use cart_e2e::page::{CartSelectors, ShoppingCartPage};
use cart_e2e::scenario::{ScenarioExecution, ScenarioPhase};
use cart_e2e::simulator::SimulatedStorefront;
use cart_e2e::{CartItem, E2eError, Money, TestStep};

fn two_items() -> Vec<CartItem> {
    vec![
        CartItem::new("Kid’s T-shirt – Size M", Money::from_cents(1999), 1),
        CartItem::new("Bluetooth Headphones", Money::from_cents(8500), 1),
    ]
}

fn page(storefront: SimulatedStorefront) -> ShoppingCartPage<SimulatedStorefront> {
    ShoppingCartPage::new(storefront, "sim://storefront/#", CartSelectors::default())
}

fn storefront(items: Vec<CartItem>) -> SimulatedStorefront {
    SimulatedStorefront::from_items(items, CartSelectors::default())
}

#[tokio::test]
async fn removal_leaves_remaining_item_total() {
    let items = two_items();
    let mut run = ScenarioExecution::start(page(storefront(items.clone())), items)
        .await
        .unwrap();

    run.remove_item("Bluetooth Headphones").await.unwrap();
    run.expect_hidden("Bluetooth Headphones").await.unwrap();
    assert_eq!(run.phase(), ScenarioPhase::ItemRemoved);

    let reconciliation = run.verify().await.unwrap();
    assert_eq!(reconciliation.expected.to_string(), "19.99");
    assert_eq!(reconciliation.observed, reconciliation.expected);
    assert!(reconciliation.checkout_enabled);
    assert_eq!(run.phase(), ScenarioPhase::Verified);
}

#[tokio::test]
async fn unconfirmed_removal_keeps_item() {
    let items = two_items();
    let mut page = page(storefront(items));
    page.navigate().await.unwrap();

    let pending = page.request_removal("Bluetooth Headphones").await.unwrap();
    assert_eq!(pending.item_name(), "Bluetooth Headphones");
    drop(pending);

    assert!(page.expect_item_hidden("Bluetooth Headphones").await.is_err());
    assert_eq!(page.cart_total().await.unwrap(), Money::from_cents(10499));

    let storefront = page.close().await.unwrap();
    assert!(storefront.modal_open());
    assert_eq!(storefront.line_names().len(), 2);
}

#[tokio::test]
async fn removal_clicks_remove_then_confirm() {
    let items = two_items();
    let mut page = page(storefront(items));
    page.navigate().await.unwrap();
    page.request_removal("Kid’s T-shirt").await.unwrap().confirm().await.unwrap();

    let storefront = page.close().await.unwrap();
    let clicks: Vec<_> = storefront
        .history()
        .iter()
        .filter(|h| h.starts_with("click:"))
        .collect();
    assert_eq!(clicks.len(), 2);
    assert!(clicks[0].ends_with(".remove-item"));
    assert!(clicks[1].contains("#remove-confirm-modal"));
    assert_eq!(storefront.line_names(), vec!["Bluetooth Headphones"]);
}

#[tokio::test]
async fn quantity_zero_is_not_a_removal() {
    let items = two_items();
    let mut run = ScenarioExecution::start(page(storefront(items.clone())), items)
        .await
        .unwrap();

    run.set_quantity("Kid’s T-shirt – Size M", 0).await.unwrap();
    run.set_quantity("Bluetooth Headphones", 0).await.unwrap();

    let reconciliation = run.verify().await.unwrap();
    assert_eq!(reconciliation.observed.to_string(), "0.00");
    assert!(!reconciliation.checkout_enabled);
    assert_eq!(run.cart().items().len(), 2);
}

#[tokio::test]
async fn wrong_page_total_is_a_mismatch() {
    let items = two_items();
    let broken = storefront(items.clone()).with_surcharge(Money::from_cents(500));
    let mut run = ScenarioExecution::start(page(broken), items).await.unwrap();

    match run.verify().await {
        Err(E2eError::TotalMismatch { expected, observed }) => {
            assert_eq!(expected.to_string(), "104.99");
            assert_eq!(observed.to_string(), "109.99");
        }
        other => panic!("expected a total mismatch, got {:?}", other.map(|_| ())),
    }
    assert_eq!(run.phase(), ScenarioPhase::Initial);
}

#[tokio::test]
async fn missing_amount_reads_as_zero() {
    let items = two_items();
    let mut page = page(storefront(items.clone()).without_total_amount());
    page.navigate().await.unwrap();
    assert_eq!(page.cart_total().await.unwrap(), Money::ZERO);

    let blank = storefront(items.clone()).without_total_amount();
    let mut run = ScenarioExecution::start(self::page(blank), items).await.unwrap();
    let err = run.verify().await.unwrap_err();
    assert!(matches!(err, E2eError::TotalMismatch { observed, .. } if observed == Money::ZERO));
}

#[tokio::test]
async fn removal_after_quantity_update_is_rejected() {
    let items = two_items();
    let mut run = ScenarioExecution::start(page(storefront(items.clone())), items)
        .await
        .unwrap();

    run.set_quantity("Bluetooth Headphones", 2).await.unwrap();
    let err = run.remove_item("Kid’s T-shirt – Size M").await.unwrap_err();
    assert!(matches!(err, E2eError::InvalidTransition { .. }));
    assert_eq!(run.cart().items().len(), 2);
}

#[tokio::test]
async fn nothing_runs_after_verification() {
    let items = two_items();
    let mut run = ScenarioExecution::start(page(storefront(items.clone())), items)
        .await
        .unwrap();

    run.run_step(&TestStep::Verify).await.unwrap();
    let step = TestStep::ExpectCheckout { enabled: true };
    assert!(matches!(
        run.run_step(&step).await,
        Err(E2eError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn checkout_assertion_failure_surfaces() {
    let items = vec![
        CartItem::new("Bluetooth Headphones", Money::from_cents(8500), 1),
        CartItem::new("Travel Mug", Money::from_cents(1250), 1).out_of_stock(),
    ];
    let mut run = ScenarioExecution::start(page(storefront(items.clone())), items)
        .await
        .unwrap();

    let err = run.expect_checkout(true).await.unwrap_err();
    assert!(matches!(err, E2eError::AssertionFailed(_)));
    run.expect_checkout(false).await.unwrap();
}
