use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn},
    notify::Notifier,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub notifier: Arc<dyn Notifier>,
    pub default_radius_km: f64,
}
