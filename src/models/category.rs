use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Which catalog a category applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryScope {
    #[default]
    All,
    Tshirt,
    Jewellery,
}

text_enum!(CategoryScope, "category scope" {
    All => "all",
    Tshirt => "tshirt",
    Jewellery => "jewellery",
});

/// A node of the two-level category tree. Roots have no parent and
/// children never have children of their own.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub product_type: CategoryScope,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub product_type: CategoryScope,
}
