use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;
use crate::games::GameId;
use crate::storage::{self, KeyValueStore};

/// One screen of the fixed game + survey sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageId {
    Start,
    G1,
    Q1,
    G2,
    Q2,
    G3,
    Q3,
    G4,
    Q4,
    End,
}

impl StageId {
    pub const ALL: [StageId; 10] = [
        StageId::Start,
        StageId::G1,
        StageId::Q1,
        StageId::G2,
        StageId::Q2,
        StageId::G3,
        StageId::Q3,
        StageId::G4,
        StageId::Q4,
        StageId::End,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageId::Start => "start",
            StageId::G1 => "g1",
            StageId::Q1 => "q1",
            StageId::G2 => "g2",
            StageId::Q2 => "q2",
            StageId::G3 => "g3",
            StageId::Q3 => "q3",
            StageId::G4 => "g4",
            StageId::Q4 => "q4",
            StageId::End => "end",
        }
    }

    /// Successor in normal mode. `End` is terminal.
    pub fn next(self) -> StageId {
        match self {
            StageId::Start => StageId::G1,
            StageId::G1 => StageId::Q1,
            StageId::Q1 => StageId::G2,
            StageId::G2 => StageId::Q2,
            StageId::Q2 => StageId::G3,
            StageId::G3 => StageId::Q3,
            StageId::Q3 => StageId::G4,
            StageId::G4 => StageId::Q4,
            StageId::Q4 => StageId::End,
            StageId::End => StageId::End,
        }
    }

    pub fn game(self) -> Option<GameId> {
        match self {
            StageId::G1 => Some(GameId::Simon),
            StageId::G2 => Some(GameId::Memory),
            StageId::G3 => Some(GameId::Verbal),
            StageId::G4 => Some(GameId::Math),
            _ => None,
        }
    }

    pub fn is_survey(self) -> bool {
        matches!(self, StageId::Q1 | StageId::Q2 | StageId::Q3 | StageId::Q4)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    Freeplay,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Freeplay => "freeplay",
        }
    }
}

/// Participant session. Fields are read through accessors; every write goes
/// through a persisting setter so memory and storage never disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    participant_id: Option<String>,
    session_id: String,
    started_at: DateTime<Utc>,
    stage: StageId,
    mode: Mode,
}

impl Session {
    /// Restore the session from storage, minting and persisting a session id and
    /// start time when absent. Without a participant the stage is forced to start.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, StorageError> {
        let participant_id: Option<String> = storage::load::<String>(store, storage::KEY_PARTICIPANT_ID)
            .filter(|p| !p.trim().is_empty());
        let session_id = storage::load::<String>(store, storage::KEY_SESSION_ID)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let started_at = storage::load::<DateTime<Utc>>(store, storage::KEY_STARTED_AT)
            .unwrap_or_else(Utc::now);
        let mut stage = storage::load_or(store, storage::KEY_STAGE, StageId::Start);
        let mode = storage::load_or(store, storage::KEY_MODE, Mode::Normal);

        storage::save(store, storage::KEY_SESSION_ID, &session_id)?;
        storage::save(store, storage::KEY_STARTED_AT, &started_at)?;

        if participant_id.is_none() {
            stage = StageId::Start;
            storage::save(store, storage::KEY_STAGE, &stage)?;
        }

        Ok(Self {
            participant_id,
            session_id,
            started_at,
            stage,
            mode,
        })
    }

    pub fn participant_id(&self) -> Option<&str> {
        self.participant_id.as_deref()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn stage(&self) -> StageId {
        self.stage
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn set_participant(
        &mut self,
        store: &dyn KeyValueStore,
        id: String,
    ) -> Result<(), StorageError> {
        storage::save(store, storage::KEY_PARTICIPANT_ID, &id)?;
        self.participant_id = Some(id);
        Ok(())
    }

    pub(crate) fn set_stage(
        &mut self,
        store: &dyn KeyValueStore,
        stage: StageId,
    ) -> Result<(), StorageError> {
        self.stage = stage;
        storage::save(store, storage::KEY_STAGE, &stage)
    }

    pub(crate) fn set_mode(&mut self, store: &dyn KeyValueStore, mode: Mode) -> Result<(), StorageError> {
        self.mode = mode;
        storage::save(store, storage::KEY_MODE, &mode)
    }

    /// Fallback id for participants who skip the name field.
    pub fn anonymous_id(&self) -> String {
        let prefix: String = self.session_id.chars().take(6).collect();
        format!("anon_{prefix}")
    }

    pub fn player_badge(&self) -> String {
        format!("Player: {}", self.participant_id.as_deref().unwrap_or("—"))
    }

    pub fn stage_badge(&self) -> String {
        match self.mode {
            Mode::Freeplay => format!("Stage: {} (freeplay)", self.stage),
            Mode::Normal => format!("Stage: {}", self.stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn first_load_mints_and_persists_identity() {
        let store = MemoryStore::new();
        let s = Session::load(&store).unwrap();
        assert!(s.participant_id().is_none());
        assert_eq!(s.stage(), StageId::Start);
        assert!(Uuid::parse_str(s.session_id()).is_ok());

        let again = Session::load(&store).unwrap();
        assert_eq!(again.session_id(), s.session_id());
        assert_eq!(again.started_at(), s.started_at());
    }

    #[test]
    fn missing_participant_forces_start_stage() {
        let store = MemoryStore::new();
        storage::save(&store, storage::KEY_STAGE, &StageId::G3).unwrap();
        let s = Session::load(&store).unwrap();
        assert_eq!(s.stage(), StageId::Start);
        let persisted: Option<StageId> = storage::load(&store, storage::KEY_STAGE);
        assert_eq!(persisted, Some(StageId::Start));
    }

    #[test]
    fn known_participant_resumes_persisted_stage_and_mode() {
        let store = MemoryStore::new();
        storage::save(&store, storage::KEY_PARTICIPANT_ID, "Ada").unwrap();
        storage::save(&store, storage::KEY_STAGE, &StageId::Q2).unwrap();
        storage::save(&store, storage::KEY_MODE, &Mode::Freeplay).unwrap();
        let s = Session::load(&store).unwrap();
        assert_eq!(s.participant_id(), Some("Ada"));
        assert_eq!(s.stage(), StageId::Q2);
        assert_eq!(s.mode(), Mode::Freeplay);
        assert_eq!(s.stage_badge(), "Stage: q2 (freeplay)");
    }

    #[test]
    fn corrupted_stage_falls_back_to_start() {
        let store = MemoryStore::new();
        storage::save(&store, storage::KEY_PARTICIPANT_ID, "Ada").unwrap();
        store.set_item(storage::KEY_STAGE, "\"g9\"").unwrap();
        assert_eq!(Session::load(&store).unwrap().stage(), StageId::Start);
    }

    #[test]
    fn normal_sequence_is_linear() {
        let mut stage = StageId::Start;
        let mut seen = vec![stage];
        while stage != StageId::End {
            stage = stage.next();
            seen.push(stage);
        }
        assert_eq!(seen, StageId::ALL.to_vec());
    }
}
