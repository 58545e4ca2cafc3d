use serde::Serialize;
use serde_json::Value;

use crate::coalesce::{first_number, first_present, first_str, head, pick_array, to_label};
use crate::shape::{unwrap_envelope, Section};

/// Labels from a catalog listing (categories, vendors, attributes, intent topics).
pub fn compact_product_list(input: &Value, top_n: usize) -> Section<Vec<String>> {
    let data = match unwrap_envelope(input) {
        Ok(d) => d,
        Err(e) => return Section::Failed(e),
    };
    Section::Ready(
        pick_array(data, &["categories", "vendors", "attributes", "topics", "items"])
            .iter()
            .map(to_label)
            .filter(|l| !l.is_empty())
            .take(top_n)
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Value>,
    pub features: Vec<Value>,
}

pub fn compact_product_info(input: &Value) -> Section<ProductInfo> {
    let data = match unwrap_envelope(input) {
        Ok(d) => d,
        Err(e) => return Section::Failed(e),
    };
    Section::Ready(ProductInfo {
        name: first_str(data, &["name", "productName", "title"]),
        category: first_str(data, &["category", "productCategory"]),
        pricing: first_present(data, &["pricing", "price"]).cloned(),
        features: head(data, "features", 3),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductReviews {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_count: Option<Value>,
    pub pros: Vec<Value>,
    pub cons: Vec<Value>,
}

pub fn compact_product_reviews(input: &Value) -> Section<ProductReviews> {
    let data = match unwrap_envelope(input) {
        Ok(d) => d,
        Err(e) => return Section::Failed(e),
    };
    Section::Ready(ProductReviews {
        rating: first_number(data, &["rating", "avgRating", "averageRating"]),
        review_count: first_number(data, &["reviewCount", "reviewsCount", "count"]),
        pros: head(data, "pros", 2),
        cons: head(data, "cons", 2),
    })
}
