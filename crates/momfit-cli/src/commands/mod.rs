pub mod assign;
pub mod check;
pub mod config;
pub mod context;
pub mod detect;
pub mod event;
pub mod init;
pub mod notifications;
pub mod roles;
