//! Behavior library: the versioned reference dataset of communication
//! behaviors and traits that analyses point into.

use serde::{Deserialize, Serialize};

/// Version tag of the built-in empty library
pub const DEFAULT_LIBRARY_VERSION: &str = "1.0.0";

/// A single behavior or trait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Behavior {
    /// Stable identifier referenced by analyses
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Example phrases
    #[serde(default)]
    pub examples: Vec<String>,
}

/// A group of behaviors within a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorSubcategory {
    /// Subcategory name
    pub name: String,
    /// Behaviors in this subcategory
    #[serde(default)]
    pub behaviors: Vec<Behavior>,
}

/// A top-level behavior category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorCategory {
    /// Category name
    #[serde(rename = "category")]
    pub name: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Subcategories
    #[serde(default)]
    pub subcategories: Vec<BehaviorSubcategory>,
}

/// The full behavior library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorLibrary {
    /// Version tag
    pub version: String,
    /// When the library was last updated (free-form ISO-8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Categories
    #[serde(default)]
    pub categories: Vec<BehaviorCategory>,
}

impl BehaviorLibrary {
    /// Total number of behaviors across all categories
    pub fn count_behaviors(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| c.subcategories.iter())
            .map(|s| s.behaviors.len())
            .sum()
    }

    /// Category names in library order
    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    /// Look up a behavior by id
    pub fn find(&self, behavior_id: &str) -> Option<&Behavior> {
        self.categories
            .iter()
            .flat_map(|c| c.subcategories.iter())
            .flat_map(|s| s.behaviors.iter())
            .find(|b| b.id == behavior_id)
    }
}

impl Default for BehaviorLibrary {
    fn default() -> Self {
        Self {
            version: DEFAULT_LIBRARY_VERSION.to_string(),
            last_updated: Some(crate::time::to_rfc3339(&crate::time::now())),
            categories: Vec::new(),
        }
    }
}
