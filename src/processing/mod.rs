pub mod layout;
pub mod scale;
pub mod tiles;
