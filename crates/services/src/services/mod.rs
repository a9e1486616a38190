pub mod config;
pub mod google_sheets;
pub mod notification;
pub mod sheet_import;
pub mod sheet_sync;
