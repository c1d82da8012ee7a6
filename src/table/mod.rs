//! Play tables and the matches played on them

pub mod registry;

pub use registry::TableRegistry;
