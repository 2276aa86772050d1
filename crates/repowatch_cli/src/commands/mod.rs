pub mod limits;
pub mod meta;
pub mod report;
pub mod watch;
