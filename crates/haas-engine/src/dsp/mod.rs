pub mod effect;
pub mod haas;
