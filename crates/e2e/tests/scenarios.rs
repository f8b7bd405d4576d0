//! Shipped cart scenarios, run against the simulated storefront

use std::path::PathBuf;

use cart_e2e::config::HarnessConfig;
use cart_e2e::page::CartSelectors;
use cart_e2e::runner::TestResult;
use cart_e2e::simulator::SimulatedSessionFactory;
use cart_e2e::{E2eError, TestRunner, TestSpec};

fn scenarios_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}

fn runner(output_dir: PathBuf) -> TestRunner<SimulatedSessionFactory> {
    let config = HarnessConfig {
        specs_dir: scenarios_dir(),
        output_dir,
        ..Default::default()
    };
    let factory = SimulatedSessionFactory::new("sim://storefront", CartSelectors::default());
    TestRunner::new(factory, &config).without_screenshots()
}

fn final_total(result: &TestResult) -> String {
    result
        .reconciliations
        .last()
        .map(|r| r.observed.to_string())
        .expect("scenario reconciled at least once")
}

#[test]
fn shipped_scenarios_parse() {
    let specs = TestSpec::load_all(&scenarios_dir()).unwrap();
    let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "increase-quantities",
            "initial-total",
            "remove-all",
            "remove-out-of-stock",
            "zero-quantities",
        ]
    );
}

#[tokio::test]
async fn shipped_scenarios_pass_against_simulator() {
    let out = tempfile::tempdir().unwrap();
    let runner = runner(out.path().to_path_buf());

    let suite = runner.run_all().await.unwrap();
    for result in &suite.results {
        assert!(result.success, "{} failed: {:?}", result.name, result.error);
    }
    assert_eq!(suite.total, 5);
    assert!(suite.all_passed());

    let totals: Vec<_> = suite
        .results
        .iter()
        .map(|r| (r.name.as_str(), final_total(r)))
        .collect();
    assert_eq!(
        totals,
        vec![
            ("increase-quantities", "209.98".to_string()),
            ("initial-total", "104.99".to_string()),
            ("remove-all", "0.00".to_string()),
            ("remove-out-of-stock", "104.99".to_string()),
            ("zero-quantities", "0.00".to_string()),
        ]
    );
}

#[tokio::test]
async fn checkout_state_recorded_per_scenario() {
    let out = tempfile::tempdir().unwrap();
    let runner = runner(out.path().to_path_buf());

    let initial = runner.run_test("initial-total").await.unwrap();
    assert!(!initial.reconciliations[0].checkout_enabled);

    let removed = runner.run_test("remove-out-of-stock").await.unwrap();
    assert!(removed.reconciliations[0].checkout_enabled);

    let zeroed = runner.run_test("zero-quantities").await.unwrap();
    assert!(!zeroed.reconciliations[0].checkout_enabled);
}

#[tokio::test]
async fn tag_filter_selects_smoke_scenarios() {
    let out = tempfile::tempdir().unwrap();
    let runner = runner(out.path().to_path_buf());

    let suite = runner.run_tagged("smoke").await.unwrap();
    let names: Vec<_> = suite.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["initial-total", "remove-out-of-stock"]);
}

#[tokio::test]
async fn unknown_scenario_name_is_an_error() {
    let out = tempfile::tempdir().unwrap();
    let runner = runner(out.path().to_path_buf());
    let err = runner.run_test("checkout-flow").await.unwrap_err();
    assert!(matches!(err, E2eError::ScenarioNotFound(ref name) if name == "checkout-flow"), "{err}");
}

#[tokio::test]
async fn unmatched_tag_is_an_error() {
    let out = tempfile::tempdir().unwrap();
    let runner = runner(out.path().to_path_buf());
    let err = runner.run_tagged("checkout").await.unwrap_err();
    assert!(matches!(err, E2eError::NoScenarios(_)), "{err}");
}

#[tokio::test]
async fn missing_specs_dir_is_an_error() {
    let out = tempfile::tempdir().unwrap();
    let config = HarnessConfig {
        specs_dir: out.path().join("does-not-exist"),
        output_dir: out.path().to_path_buf(),
        ..Default::default()
    };
    let factory = SimulatedSessionFactory::new("sim://storefront", CartSelectors::default());
    let runner = TestRunner::new(factory, &config).without_screenshots();

    let err = runner.run_all().await.unwrap_err();
    assert!(matches!(err, E2eError::InvalidConfig(_)), "{err}");
}

#[tokio::test]
async fn empty_specs_dir_is_an_error() {
    let out = tempfile::tempdir().unwrap();
    let config = HarnessConfig {
        specs_dir: out.path().to_path_buf(),
        output_dir: out.path().join("results"),
        ..Default::default()
    };
    let factory = SimulatedSessionFactory::new("sim://storefront", CartSelectors::default());
    let runner = TestRunner::new(factory, &config).without_screenshots();

    let err = runner.run_all().await.unwrap_err();
    assert!(matches!(err, E2eError::NoScenarios(_)), "{err}");
}

#[tokio::test]
async fn results_written_as_json() {
    let out = tempfile::tempdir().unwrap();
    let runner = runner(out.path().to_path_buf());

    let suite = runner.run_tagged("quantity").await.unwrap();
    let path = runner.write_results(&suite).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["passed"], 2);
    assert_eq!(json["results"][0]["reconciliations"][0]["expected"], "209.98");
}
