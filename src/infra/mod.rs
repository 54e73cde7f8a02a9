pub mod codec;
pub mod extract;
pub mod grid;
pub mod import;
pub mod memory;
pub mod sqlite;
pub mod unattended;
