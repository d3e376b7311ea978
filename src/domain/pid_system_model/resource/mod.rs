pub mod compute_resource;
pub mod compute_unit;
