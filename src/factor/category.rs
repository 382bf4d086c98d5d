//! Category Rules
//!
//! Keyword table used to infer an ingredient's category from its name when no
//! factor matches by name or alias.

use crate::model::{IngredientCategory, RecordStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRule {
    pub code: String,
    /// Factor sub-category holding the representative factor
    pub sub_category: String,
    pub keywords: Vec<String>,
    pub priority: i32,
}

/// Winning rule and the length (in chars) of the keyword that selected it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryHit<'a> {
    pub rule: &'a CategoryRule,
    pub keyword_len: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryRules {
    rules: Vec<CategoryRule>,
}

impl CategoryRules {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    /// Active categories only; keywords are lower-cased and blanks dropped.
    pub fn from_categories(categories: &[IngredientCategory]) -> Self {
        let rules = categories
            .iter()
            .filter(|c| c.status == RecordStatus::Active)
            .map(|c| CategoryRule {
                code: c.category_code.trim().to_lowercase(),
                sub_category: c.factor_sub_category.trim().to_string(),
                keywords: c
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
                priority: c.priority,
            })
            .collect();
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn by_code(&self, code: &str) -> Option<&CategoryRule> {
        let code = code.trim().to_lowercase();
        self.rules.iter().find(|r| r.code == code)
    }

    pub fn infer(&self, name: &str) -> Option<CategoryHit<'_>> {
        longest_match(&self.rules, name)
    }
}

/// Pick the rule whose matching keyword is longest. Equal lengths go to the
/// smaller category code.
pub fn longest_match<'a>(rules: &'a [CategoryRule], name: &str) -> Option<CategoryHit<'a>> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return None;
    }

    rules
        .iter()
        .filter_map(|rule| {
            rule.keywords
                .iter()
                .filter(|k| name.contains(k.as_str()))
                .map(|k| k.chars().count())
                .max()
                .map(|keyword_len| CategoryHit { rule, keyword_len })
        })
        .max_by(|a, b| {
            a.keyword_len
                .cmp(&b.keyword_len)
                .then_with(|| b.rule.code.cmp(&a.rule.code))
        })
}
