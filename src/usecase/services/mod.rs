pub mod extraction_service;
pub mod import_service;
pub mod mapping_resolver;
pub mod merge_coordinator;
