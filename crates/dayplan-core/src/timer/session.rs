//! Registry of independent timer sessions keyed by session id.
//!
//! Each session owns its own copy of the plan's blocks, so concurrent
//! sessions never share mutable state. Callers pass the id explicitly on
//! every operation.

use std::collections::BTreeMap;

use crate::error::SessionError;
use crate::events::TimerEvent;
use crate::schedule::Block;

use super::engine::{TimerEngine, TimerProgress};

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<String, TimerEngine>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new idle session over `blocks` and return its id.
    ///
    /// # Errors
    /// Returns [`SessionError::EmptyPlan`] when `blocks` is empty.
    pub fn create(&mut self, blocks: Vec<Block>) -> Result<String, SessionError> {
        if blocks.is_empty() {
            return Err(SessionError::EmptyPlan);
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions.insert(id.clone(), TimerEngine::new(blocks));
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<&TimerEngine, SessionError> {
        self.sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut TimerEngine, SessionError> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Start session `id` at block `index`.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyRunning`] if it is counting down, plus
    /// the engine's own start errors.
    pub fn start(&mut self, id: &str, index: usize) -> Result<Vec<TimerEvent>, SessionError> {
        let engine = self.get_mut(id)?;
        if engine.is_running() {
            return Err(SessionError::AlreadyRunning(id.to_string()));
        }
        engine.start_from(index)
    }

    pub fn pause(&mut self, id: &str) -> Result<Option<TimerEvent>, SessionError> {
        Ok(self.get_mut(id)?.pause())
    }

    pub fn resume(&mut self, id: &str) -> Result<Option<TimerEvent>, SessionError> {
        Ok(self.get_mut(id)?.resume())
    }

    pub fn skip(&mut self, id: &str) -> Result<Vec<TimerEvent>, SessionError> {
        Ok(self.get_mut(id)?.skip())
    }

    pub fn stop(&mut self, id: &str) -> Result<Option<TimerEvent>, SessionError> {
        Ok(self.get_mut(id)?.stop())
    }

    pub fn tick(&mut self, id: &str) -> Result<Vec<TimerEvent>, SessionError> {
        Ok(self.get_mut(id)?.tick())
    }

    pub fn progress(&self, id: &str) -> Result<TimerProgress, SessionError> {
        Ok(self.get(id)?.progress())
    }

    /// Drop session `id`, handing back its engine.
    pub fn remove(&mut self, id: &str) -> Result<TimerEngine, SessionError> {
        self.sessions
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
