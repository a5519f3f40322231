pub mod document;
pub mod layers;
