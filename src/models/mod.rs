pub mod courier;
pub mod event;
pub mod region;
pub mod store;
