use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::supplier::SupplierId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticleId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub name: String,
    pub unit: String,
    pub notes: Option<String>,
    pub active: bool,
}

/// Price/unit link between an article and one supplier. An article with
/// exactly one link routes automatically; zero or several links leave the
/// order line unresolved for manual assignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArticleSupplierLink {
    pub id: String,
    pub article_id: ArticleId,
    pub supplier_id: SupplierId,
    pub supplier_article_number: Option<String>,
    pub price: Option<Decimal>,
    pub unit: String,
}
