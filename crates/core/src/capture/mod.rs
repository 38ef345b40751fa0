pub mod domain;
pub mod event;
pub mod infrastructure;
pub mod throttle;
