pub mod bindings;
pub mod error;
pub mod habits;
pub mod middleware;

use std::sync::Arc;

use ritual_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub bot_secret: String,
}
