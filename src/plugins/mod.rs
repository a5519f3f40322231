pub mod base;
pub mod fetch;
pub mod overpass;
