use std::sync::Arc;

use common::storage::FileStore;
use sea_orm::DatabaseConnection;

use crate::cache::FragmentCache;
use crate::checkers::wasm::ScriptRuntime;
use crate::config::AppConfig;
use crate::mail::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub files: Arc<FileStore>,
    pub scripts: Arc<ScriptRuntime>,
    pub cache: Arc<FragmentCache>,
    pub mailer: Arc<dyn Mailer>,
}
