pub mod coverage;
pub mod editor;
pub mod notify;
pub mod overlap;
pub mod proximity;
pub mod region_store;
pub mod regions;
pub mod tracker;
pub mod tracking;
pub mod waiting;
