pub mod bom;
pub mod catalog;
pub mod configuration;
pub mod history;
pub mod product;
pub mod selection;
pub mod validation;
