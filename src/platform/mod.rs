mod backend;
mod selector;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use backend::{
    BackendCapabilities, BackendError, DisplayMode, GraphicsBackend, Platform, RendererMode,
};
pub use selector::select_backend;
