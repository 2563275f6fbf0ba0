//! Category resolution.
//!
//! A transaction names its category in one of three ways. Resolution is
//! decided here against the family's current categories; the store applies
//! the outcome inside the same database transaction as the insert.

use nestegg_shared::types::CategoryId;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{Category, NewCategory};
use super::validation::parse_budget;

/// Longest category name accepted.
pub const MAX_CATEGORY_NAME_LEN: usize = 120;

/// Categories seeded for a family that has none, with monthly budgets.
pub const DEFAULT_CATEGORIES: [(&str, i64); 9] = [
    ("Salary", 0),
    ("Groceries", 500),
    ("Transportation", 200),
    ("Utilities", 300),
    ("Entertainment", 150),
    ("Healthcare", 200),
    ("Shopping", 300),
    ("Rent/Mortgage", 1200),
    ("Other", 0),
];

/// Returns [`DEFAULT_CATEGORIES`] as insertable rows.
#[must_use]
pub fn default_categories() -> Vec<NewCategory> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(name, budget)| NewCategory {
            name: (*name).to_string(),
            monthly_budget: Decimal::new(*budget * 100, 2),
        })
        .collect()
}

/// Matching key for category names: trimmed, inner whitespace collapsed,
/// lower-cased. Unique per family.
#[must_use]
pub fn name_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// How a transaction refers to its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryRef {
    /// Legacy free-form token: an all-digit token is tried as an id first,
    /// then any token is matched by name, then created.
    Token(String),
    /// Explicit id. Must exist in the caller's family.
    Id(CategoryId),
    /// Explicit name, never interpreted as an id. Matched or created.
    Name(String),
}

/// Outcome of resolving a [`CategoryRef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<'a> {
    /// Use this existing category.
    Existing(&'a Category),
    /// Create this category first.
    Create(NewCategory),
}

impl CategoryRef {
    /// Builds a token reference. Blank tokens yield `None`.
    ///
    /// Tokens longer than a category name are clipped, so that the same
    /// token always resolves to the same category.
    #[must_use]
    pub fn token(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self::Token(
            trimmed.chars().take(MAX_CATEGORY_NAME_LEN).collect(),
        ))
    }

    /// Builds an explicit name reference.
    ///
    /// # Errors
    ///
    /// Returns `CategoryNameRequired` for blank names and
    /// `CategoryNameTooLong` for oversized ones.
    pub fn name(raw: &str) -> Result<Self, LedgerError> {
        validate_category_name(raw).map(Self::Name)
    }

    /// Resolves against the family's categories.
    ///
    /// Returns `None` only for an explicit id that is not in `categories`.
    #[must_use]
    pub fn select<'a>(&self, categories: &'a [Category]) -> Option<Selection<'a>> {
        match self {
            Self::Id(id) => categories
                .iter()
                .find(|c| c.id == *id)
                .map(Selection::Existing),
            Self::Token(token) => {
                let by_id = if token.bytes().all(|b| b.is_ascii_digit()) {
                    token
                        .parse::<i64>()
                        .ok()
                        .and_then(|raw| categories.iter().find(|c| c.id.get() == raw))
                } else {
                    None
                };
                Some(by_id.map_or_else(
                    || match_or_create(token, categories),
                    Selection::Existing,
                ))
            }
            Self::Name(name) => Some(match_or_create(name, categories)),
        }
    }
}

fn match_or_create<'a>(name: &str, categories: &'a [Category]) -> Selection<'a> {
    let key = name_key(name);
    categories
        .iter()
        .find(|c| name_key(&c.name) == key)
        .map_or_else(
            || {
                Selection::Create(NewCategory {
                    name: name.trim().to_string(),
                    monthly_budget: Decimal::ZERO,
                })
            },
            Selection::Existing,
        )
}

/// Trims and checks a category name.
///
/// # Errors
///
/// Returns `CategoryNameRequired` or `CategoryNameTooLong`.
pub fn validate_category_name(raw: &str) -> Result<String, LedgerError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(LedgerError::CategoryNameRequired);
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(LedgerError::CategoryNameTooLong);
    }
    Ok(name.to_string())
}

/// Validates an explicit category creation request.
///
/// # Errors
///
/// Returns a validation error for a missing or oversized name, or a
/// negative or non-numeric budget.
pub fn validate_new_category(
    name: Option<&str>,
    monthly_budget: Option<&serde_json::Value>,
) -> Result<NewCategory, LedgerError> {
    let name = validate_category_name(name.unwrap_or_default())?;
    let monthly_budget = match monthly_budget {
        None | Some(serde_json::Value::Null) => Decimal::ZERO,
        Some(value) => parse_budget(value)?,
    };
    Ok(NewCategory {
        name,
        monthly_budget,
    })
}
