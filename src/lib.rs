pub mod config;
pub mod error;
pub mod events;
pub mod gpu;
pub mod platform;
pub mod processing;
pub mod tasks {
    pub mod loader;
    pub mod viewer;
}
