pub mod category;
pub mod create;
pub mod dashboard;
pub mod export;
pub mod init;
pub mod item;
pub mod list;
pub mod report;
pub mod seed;
pub mod show;
pub mod status;
pub mod ticket_type;
pub mod user;
