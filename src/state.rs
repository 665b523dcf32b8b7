//! Application state: live sessions, prompt builder, oracle and catalog.
//!
//! Sessions are kept in memory only; deleting one (or dropping its WebSocket)
//! closes it so a reply still in flight is discarded.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_app_config_from_env, AppConfig, Catalog};
use crate::domain::Configuration;
use crate::logic::SessionHandle;
use crate::oracle::{oracle_from_env, Oracle};
use crate::prompt::PromptBuilder;
use crate::session::ExerciseSession;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
    pub oracle: Arc<dyn Oracle>,
    pub prompts: Arc<PromptBuilder>,
    pub defaults: Configuration,
    pub catalog: Catalog,
}

impl AppState {
    /// Build state from env: load config, pick the oracle transport.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_app_config_from_env().unwrap_or_default();
        let oracle = oracle_from_env();
        info!(target: "lingo_drill", oracle = oracle.name(), languages = cfg.catalog.languages.len(), topics = cfg.catalog.topics.len(), "App state ready");
        Self::with_parts(cfg, oracle)
    }

    pub fn with_parts(cfg: AppConfig, oracle: Arc<dyn Oracle>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            oracle,
            prompts: Arc::new(PromptBuilder::new(cfg.prompts)),
            defaults: cfg.defaults,
            catalog: cfg.catalog,
        }
    }

    /// Register a fresh idle session. The caller triggers the first generation.
    #[instrument(level = "info", skip(self, config), fields(custom_config = config.is_some()))]
    pub async fn create_session(&self, config: Option<Configuration>) -> (String, SessionHandle) {
        let id = Uuid::new_v4().to_string();
        let mut session = ExerciseSession::new(id.clone(), self.defaults.clone(), self.prompts.clone());
        if let Some(cfg) = config {
            session.configure(cfg);
        }
        let handle: SessionHandle = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id.clone(), handle.clone());
        info!(target: "session", %id, "Session created");
        (id, handle)
    }

    pub async fn get_session(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Remove and close. Returns false for unknown ids.
    #[instrument(level = "info", skip(self), fields(%id))]
    pub async fn remove_session(&self, id: &str) -> bool {
        let removed = { self.sessions.write().await.remove(id) };
        match removed {
            Some(handle) => {
                handle.lock().await.close();
                true
            }
            None => {
                warn!(target: "session", %id, "Teardown requested for unknown session");
                false
            }
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::UnconfiguredOracle;
    use crate::session::SessionPhase;

    fn state() -> AppState {
        AppState::with_parts(AppConfig::default(), Arc::new(UnconfiguredOracle))
    }

    #[tokio::test]
    async fn sessions_are_created_idle_with_defaults() {
        let st = state();
        let (id, handle) = st.create_session(None).await;
        let s = handle.lock().await;
        assert_eq!(s.id(), id);
        assert_eq!(s.phase(), SessionPhase::Idle);
        assert_eq!(s.config(), &Configuration::default());
        drop(s);
        assert_eq!(st.session_count().await, 1);
        assert!(st.get_session(&id).await.is_some());
    }

    #[tokio::test]
    async fn custom_configuration_is_applied() {
        let st = state();
        let cfg = Configuration { topic: "weer".into(), ..Configuration::default() };
        let (_, handle) = st.create_session(Some(cfg.clone())).await;
        assert_eq!(handle.lock().await.config(), &cfg);
    }

    #[tokio::test]
    async fn removal_closes_the_session() {
        let st = state();
        let (id, handle) = st.create_session(None).await;
        assert!(st.remove_session(&id).await);
        assert!(handle.lock().await.is_closed());
        assert!(st.get_session(&id).await.is_none());
        assert!(!st.remove_session(&id).await);
    }
}
