pub mod extractor;
pub mod host;
pub mod prompt;
pub mod store;
