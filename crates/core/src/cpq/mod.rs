pub mod catalog;
pub mod constraints;
pub mod sku;
pub mod spec_context;
pub mod visibility;
pub mod weight;
