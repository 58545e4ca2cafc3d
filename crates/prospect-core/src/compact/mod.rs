//! Per-category compactors.
//!
//! Each compactor unwraps its input, passes an upstream `{error}` through untouched,
//! coalesces the known source shapes, then ranks and truncates to a bounded output.

mod cloud;
mod contracts;
mod fai;
mod firmographic;
mod products;
mod spend;
mod technographic;

pub use cloud::{
    compact_cloud_spend, CloudSpendLimits, CloudSpendRow, CloudSpendSummary, RecentAdoption,
};
pub use contracts::{compact_contracts, ContractRow, ContractsSummary};
pub use fai::{compact_fai, DepartmentRow};
pub use firmographic::{compact_firmographic, CompanyProfile};
pub use products::{
    compact_product_info, compact_product_list, compact_product_reviews, ProductInfo,
    ProductReviews,
};
pub use spend::{compact_spend, SpendBreakdownRow, SpendSummary};
pub use technographic::{compact_technographic, TechHighlight};
