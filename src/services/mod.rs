//! Circulation desk engine services

pub mod applier;
pub mod desk;
pub mod guard;
pub mod policy;
pub mod resolver;
pub mod validation;

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    backend::CirculationBackend,
    config::DeskConfig,
    error::{DeskError, DeskResult},
    models::Operator,
};

use desk::DeskController;
use validation::ValidationSession;

/// Open desk and validation sessions, keyed by session id
#[derive(Clone)]
pub struct Services {
    backend: Arc<dyn CirculationBackend>,
    desk_config: DeskConfig,
    desks: Arc<RwLock<HashMap<Uuid, Arc<DeskController>>>>,
    validations: Arc<RwLock<HashMap<Uuid, Arc<Mutex<ValidationSession>>>>>,
}

impl Services {
    pub fn new(backend: Arc<dyn CirculationBackend>, desk_config: DeskConfig) -> Self {
        Self {
            backend,
            desk_config,
            desks: Arc::new(RwLock::new(HashMap::new())),
            validations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn open_desk(&self, operator: Operator) -> (Uuid, Arc<DeskController>) {
        let id = Uuid::new_v4();
        let desk = Arc::new(DeskController::new(
            self.backend.clone(),
            operator,
            self.desk_config.clone(),
        ));
        self.desks.write().await.insert(id, desk.clone());
        tracing::info!("Desk session {} opened", id);
        (id, desk)
    }

    pub async fn desk(&self, id: Uuid) -> DeskResult<Arc<DeskController>> {
        self.desks
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DeskError::SessionNotFound(id.to_string()))
    }

    pub async fn desk_count(&self) -> usize {
        self.desks.read().await.len()
    }

    pub async fn close_desk(&self, id: Uuid) {
        if self.desks.write().await.remove(&id).is_some() {
            tracing::info!("Desk session {} closed", id);
        }
    }

    pub async fn open_validation(
        &self,
        operator: Operator,
        library_pid: String,
    ) -> DeskResult<(Uuid, Arc<Mutex<ValidationSession>>)> {
        let session = ValidationSession::open(self.backend.clone(), operator, library_pid).await?;
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(session));
        self.validations.write().await.insert(id, session.clone());
        tracing::info!("Validation session {} opened", id);
        Ok((id, session))
    }

    pub async fn validation_count(&self) -> usize {
        self.validations.read().await.len()
    }

    /// Drop a validation session and its loaded requests
    pub async fn close_validation(&self, id: Uuid) -> DeskResult<()> {
        self.validations
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| DeskError::SessionNotFound(id.to_string()))?;
        tracing::info!("Validation session {} closed", id);
        Ok(())
    }

    pub async fn validation(&self, id: Uuid) -> DeskResult<Arc<Mutex<ValidationSession>>> {
        self.validations
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DeskError::SessionNotFound(id.to_string()))
    }
}
