pub mod client;
pub mod osm;
pub mod template;
