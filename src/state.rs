use crate::{auth::AuthService, db::Database, geocoder::Geocoder, utils::Config};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth_service: Arc<AuthService>,
    pub config: Arc<Config>,
    /// Present only when a geocoding API key is configured
    pub geocoder: Option<Geocoder>,
}
