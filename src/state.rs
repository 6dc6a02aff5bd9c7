// Application state management
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::api::ApiClient;
use crate::audio::cpal_engine::CpalAudioEngine;
use crate::audio::engine::AudioEngine;
use crate::db::connection::DatabaseConnection;
use crate::playback::ambience::AmbiencePlaybackController;
use crate::playback::primary::PrimaryPlaybackController;
use crate::settings::AmbienceStore;

pub struct AppState {
    pub primary: Arc<PrimaryPlaybackController>,
    pub ambience: Arc<AmbiencePlaybackController>,
    pub db: DatabaseConnection,
    pub api: ApiClient,
    pub app_dir: PathBuf,
}

impl AppState {
    /// Wire up the real engine, storage, and both controllers.
    pub fn new(app_dir: PathBuf, api_base_url: &str) -> Result<Self> {
        let engine: Arc<dyn AudioEngine> = Arc::new(CpalAudioEngine::new());
        Self::with_engine(engine, app_dir, api_base_url)
    }

    /// Same wiring with a caller-supplied engine (tests, alternate backends).
    pub fn with_engine(
        engine: Arc<dyn AudioEngine>,
        app_dir: PathBuf,
        api_base_url: &str,
    ) -> Result<Self> {
        let db = DatabaseConnection::new(app_dir.join("rewired.db"))?;
        let store = AmbienceStore::new(&app_dir);

        let primary = Arc::new(PrimaryPlaybackController::new(
            Arc::clone(&engine),
            Some(db.clone()),
        ));
        let ambience = Arc::new(AmbiencePlaybackController::new(engine, store));

        Ok(Self {
            primary,
            ambience,
            db,
            api: ApiClient::new(api_base_url),
            app_dir,
        })
    }
}
