pub mod catalog;
pub mod dedup;
pub mod entities;
pub mod normalize;
pub mod records;
