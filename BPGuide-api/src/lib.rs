// BPGuide-api lib.rs
//
// This is the main library file for the BPGuide API.
// It re-exports the router factory and the modules it is built from.

// Public modules
pub mod api;
pub mod entities;
pub mod openapi;
pub mod state;

pub use api::create_app;
pub use state::AppState;
