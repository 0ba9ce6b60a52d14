//! In-process persistence service.
//!
//! Keeps records in memory, logs every call and can be told to fail a
//! specific upcoming call. Used by the CLI and by tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use super::{
    NewPlacement, NewScene, PersistenceError, PersistenceResult, PersistenceService,
    PlacementPatch, ScenePatch,
};
use crate::model::{Placement, Scene};

/// A call received by [`InMemoryPersistence`]
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceCall {
    CreatePlacement,
    UpdatePlacement(Uuid),
    DeletePlacement(Uuid),
    CreateScene,
    UpdateScene(Uuid),
    ListPlacements,
    ListScenes,
}

#[derive(Debug, Default)]
struct Records {
    scenes: Vec<Scene>,
    placements: Vec<Placement>,
    calls: Vec<PersistenceCall>,
    /// Call number (0-based, over the service lifetime) -> injected failure
    failures: BTreeMap<usize, PersistenceError>,
}

impl Records {
    /// Log the call and return the failure scheduled for it, if any.
    fn record(&mut self, call: PersistenceCall) -> PersistenceResult<()> {
        let number = self.calls.len();
        self.calls.push(call);
        match self.failures.remove(&number) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Persistence backed by vectors behind a mutex
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    records: Mutex<Records>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the service with existing records.
    pub fn with_records(scenes: Vec<Scene>, placements: Vec<Placement>) -> Self {
        Self {
            records: Mutex::new(Records {
                scenes,
                placements,
                ..Records::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: PersistenceError) {
        self.fail_nth(0, error);
    }

    /// Fail the call `n` calls from now (0 is the next call) with `error`.
    pub fn fail_nth(&self, n: usize, error: PersistenceError) {
        let mut records = self.lock();
        let number = records.calls.len() + n;
        records.failures.insert(number, error);
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<PersistenceCall> {
        self.lock().calls.clone()
    }

    /// Number of calls matching `predicate`
    pub fn count_calls(&self, predicate: impl Fn(&PersistenceCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn scenes(&self) -> Vec<Scene> {
        self.lock().scenes.clone()
    }

    pub fn placements(&self) -> Vec<Placement> {
        self.lock().placements.clone()
    }
}

impl PersistenceService for InMemoryPersistence {
    async fn create_placement(&self, data: NewPlacement) -> PersistenceResult<Placement> {
        let mut records = self.lock();
        records.record(PersistenceCall::CreatePlacement)?;
        let placement = data.into_placement(Uuid::new_v4());
        records.placements.push(placement.clone());
        Ok(placement)
    }

    async fn update_placement(&self, id: Uuid, patch: PlacementPatch) -> PersistenceResult<Placement> {
        let mut records = self.lock();
        records.record(PersistenceCall::UpdatePlacement(id))?;
        let placement = records
            .placements
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(PersistenceError::NotFound { id })?;
        patch.apply(placement);
        Ok(placement.clone())
    }

    async fn delete_placement(&self, id: Uuid) -> PersistenceResult<()> {
        let mut records = self.lock();
        records.record(PersistenceCall::DeletePlacement(id))?;
        let before = records.placements.len();
        records.placements.retain(|p| p.id != id);
        if records.placements.len() == before {
            return Err(PersistenceError::NotFound { id });
        }
        Ok(())
    }

    async fn create_scene(&self, data: NewScene) -> PersistenceResult<Scene> {
        let mut records = self.lock();
        records.record(PersistenceCall::CreateScene)?;
        let scene = data.into_scene(Uuid::new_v4());
        records.scenes.push(scene.clone());
        Ok(scene)
    }

    async fn update_scene(&self, id: Uuid, patch: ScenePatch) -> PersistenceResult<Scene> {
        let mut records = self.lock();
        records.record(PersistenceCall::UpdateScene(id))?;
        let scene = records
            .scenes
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(PersistenceError::NotFound { id })?;
        patch.apply(scene);
        Ok(scene.clone())
    }

    async fn list_placements(&self) -> PersistenceResult<Vec<Placement>> {
        let mut records = self.lock();
        records.record(PersistenceCall::ListPlacements)?;
        Ok(records.placements.clone())
    }

    async fn list_scenes(&self) -> PersistenceResult<Vec<Scene>> {
        let mut records = self.lock();
        records.record(PersistenceCall::ListScenes)?;
        Ok(records.scenes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_applies_patch() {
        let scene = Scene::new(1, 0.0, 4.0, Some("a.mp4".into()));
        let service = InMemoryPersistence::with_records(vec![scene.clone()], Vec::new());

        let patch = ScenePatch {
            start_time: Some(2.0),
            ..ScenePatch::default()
        };
        let stored = service.update_scene(scene.id, patch).await.unwrap();
        assert_eq!(stored.start_time, 2.0);
        assert_eq!(service.scenes()[0].start_time, 2.0);
        assert_eq!(service.calls(), vec![PersistenceCall::UpdateScene(scene.id)]);
    }

    #[tokio::test]
    async fn test_injected_failure_hits_only_its_call() {
        let service = InMemoryPersistence::new();
        service.fail_nth(
            1,
            PersistenceError::Unavailable {
                reason: "offline".into(),
            },
        );

        assert!(service.list_scenes().await.is_ok());
        assert!(service.list_scenes().await.is_err());
        assert!(service.list_scenes().await.is_ok());
        assert_eq!(service.count_calls(|c| *c == PersistenceCall::ListScenes), 3);
    }

    #[tokio::test]
    async fn test_missing_records() {
        let service = InMemoryPersistence::new();
        let id = Uuid::new_v4();
        assert_eq!(
            service.delete_placement(id).await,
            Err(PersistenceError::NotFound { id })
        );
    }
}
