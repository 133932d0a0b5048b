//! HTTP surface for the playlist streamer: routes, settings and folder naming.
pub mod sanitize;
pub mod server;
pub mod settings;

pub use sanitize::sanitize_name;
pub use server::{router, AppState};
pub use settings::Settings;
