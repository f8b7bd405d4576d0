//! Declarative YAML scenario specification

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::cart::CartItem;
use crate::error::{E2eError, E2eResult};

/// A complete cart scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Cart page path, relative to the base URL
    #[serde(default = "default_path")]
    pub path: String,

    /// Cart contents as the page presents them on load
    pub items: Vec<CartItem>,

    /// Steps to execute in order
    #[serde(default)]
    pub steps: Vec<TestStep>,
}

fn default_path() -> String {
    "/#".to_string()
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Remove a line, acknowledging the confirmation modal
    Remove { item: String },

    /// Set a line's quantity to an absolute value
    SetQuantity { item: String, quantity: u32 },

    /// Assert the checkout control's enabled state
    ExpectCheckout { enabled: bool },

    /// Assert a line is no longer shown
    ExpectHidden { item: String },

    /// Reconcile the page total and checkout state against the expected cart
    Verify,

    /// Log a message (for debugging)
    Log { message: String },
}

impl TestStep {
    /// Short label used in results and logs
    pub fn label(&self) -> String {
        match self {
            TestStep::Remove { item } => format!("remove:{}", item),
            TestStep::SetQuantity { item, quantity } => format!("set_quantity:{}={}", item, quantity),
            TestStep::ExpectCheckout { enabled } => {
                format!("expect_checkout:{}", if *enabled { "enabled" } else { "disabled" })
            }
            TestStep::ExpectHidden { item } => format!("expect_hidden:{}", item),
            TestStep::Verify => "verify".to_string(),
            TestStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }

    fn item(&self) -> Option<&str> {
        match self {
            TestStep::Remove { item }
            | TestStep::SetQuantity { item, .. }
            | TestStep::ExpectHidden { item } => Some(item),
            _ => None,
        }
    }
}

impl TestSpec {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, sorted by name
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(E2eError::InvalidConfig(format!(
                "specs directory {} does not exist",
                dir.display()
            )));
        }

        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry.map_err(|e| E2eError::Io(e.into()))?;
            let is_yaml = entry
                .path()
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false);
            if !is_yaml {
                continue;
            }
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        specs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(specs)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    /// Reject duplicate item names and steps naming items not in the cart.
    pub fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::SpecParse("scenario name is empty".to_string()));
        }

        let mut names = HashSet::new();
        for item in &self.items {
            if !names.insert(item.name.as_str()) {
                return Err(E2eError::SpecParse(format!(
                    "{}: duplicate item '{}'",
                    self.name, item.name
                )));
            }
        }

        for step in &self.steps {
            if let Some(item) = step.item() {
                if !names.contains(item) {
                    return Err(E2eError::SpecParse(format!(
                        "{}: step '{}' references unknown item",
                        self.name,
                        step.label()
                    )));
                }
            }
        }

        Ok(())
    }
}
