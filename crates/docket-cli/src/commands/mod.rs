pub mod dispatch;
pub mod init;
pub mod status;
pub mod sync;
