pub mod auth;
pub mod feed;
pub mod init;
pub mod status;
