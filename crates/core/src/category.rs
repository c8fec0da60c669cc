use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Catalog category shared by vendors and products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Electronics,
    Fashion,
    Home,
    Books,
    Sports,
    Toys,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Electronics,
        Category::Fashion,
        Category::Home,
        Category::Books,
        Category::Sports,
        Category::Toys,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "electronics",
            Category::Fashion => "fashion",
            Category::Home => "home",
            Category::Books => "books",
            Category::Sports => "sports",
            Category::Toys => "toys",
            Category::Other => "other",
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.to_lowercase())
            .ok_or_else(|| DomainError::validation(format!("unknown category '{s}'")))
    }
}
