pub mod rows;
pub mod temporal_filter;
