pub mod batch;
pub mod notification;
pub mod search;
pub mod watch;
