pub mod course;
pub mod notification;
pub mod session;
pub mod stats;
pub mod student;
