pub mod app;
pub mod auth;
pub mod db;
pub mod geocoder;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod query;
pub mod seed;
pub mod state;
pub mod uploads;
pub mod utils;

pub use app::create_app;
pub use auth::AuthService;
pub use db::Database;
pub use geocoder::Geocoder;
pub use state::AppState;
pub use utils::{ApiError, ApiResult, Config};
