pub mod company;
pub mod notification;
pub mod property;
pub mod sheet_sync;
pub mod task;
pub mod user;
