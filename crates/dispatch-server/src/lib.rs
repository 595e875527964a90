//! HTTP surface of the campaign dispatch engine

pub mod app;
pub mod handlers;
pub mod state;

pub use app::init_app;
pub use state::AppState;
