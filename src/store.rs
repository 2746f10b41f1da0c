//! Record store
//!
//! Persistence is an external collaborator; the engine only needs the reads
//! and the idempotent upsert below. [`MemoryStore`] is the in-memory
//! implementation used by tests and the CLI, with JSON load/save so fixture
//! stores can live on disk.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::AnalysisError;
use crate::types::{ResponseRecord, StoredAnalysis};

/// Quiz document as stored by the authoring flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizDoc {
    pub quiz_id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_count: Option<u32>,
}

/// Read/write surface the analysis pipeline needs from persistence
pub trait RecordStore {
    /// Display title for a quiz, `None` if the quiz does not exist
    fn quiz_title(&self, quiz_id: i64) -> Result<Option<String>, AnalysisError>;

    /// Distinct user ids that answered a quiz, in first-response order
    fn user_ids_for_quiz(&self, quiz_id: i64) -> Result<Vec<String>, AnalysisError>;

    /// All response records for one (quiz, user) pair
    fn responses_for(&self, quiz_id: i64, user_id: &str)
        -> Result<Vec<ResponseRecord>, AnalysisError>;

    /// Idempotent upsert keyed by (user_id, quiz_id); the last write wins
    fn upsert_analysis(&mut self, analysis: StoredAnalysis) -> Result<(), AnalysisError>;

    /// Stored analyses for one user across quizzes
    fn analyses_for_user(&self, user_id: &str) -> Result<Vec<StoredAnalysis>, AnalysisError>;
}

/// In-memory record store with JSON persistence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    quizzes: Vec<QuizDoc>,
    #[serde(default)]
    responses: Vec<ResponseRecord>,
    #[serde(default)]
    analyses: Vec<StoredAnalysis>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let json = fs::read_to_string(path).map_err(|e| {
            AnalysisError::StoreError(format!("cannot read store {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: &Path) -> Result<(), AnalysisError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|e| {
            AnalysisError::StoreError(format!("cannot write store {}: {}", path.display(), e))
        })
    }

    pub fn add_quiz(&mut self, quiz: QuizDoc) {
        self.quizzes.push(quiz);
    }

    pub fn add_response(&mut self, record: ResponseRecord) {
        self.responses.push(record);
    }

    pub fn quiz_count(&self) -> usize {
        self.quizzes.len()
    }

    pub fn response_count(&self) -> usize {
        self.responses.len()
    }

    pub fn analysis_count(&self) -> usize {
        self.analyses.len()
    }
}

impl RecordStore for MemoryStore {
    fn quiz_title(&self, quiz_id: i64) -> Result<Option<String>, AnalysisError> {
        Ok(self
            .quizzes
            .iter()
            .find(|q| q.quiz_id == quiz_id)
            .map(|q| q.title.clone()))
    }

    fn user_ids_for_quiz(&self, quiz_id: i64) -> Result<Vec<String>, AnalysisError> {
        let mut user_ids: Vec<String> = Vec::new();
        for record in self.responses.iter().filter(|r| r.quiz_id == quiz_id) {
            if !user_ids.iter().any(|u| *u == record.user_id) {
                user_ids.push(record.user_id.clone());
            }
        }
        Ok(user_ids)
    }

    fn responses_for(
        &self,
        quiz_id: i64,
        user_id: &str,
    ) -> Result<Vec<ResponseRecord>, AnalysisError> {
        Ok(self
            .responses
            .iter()
            .filter(|r| r.quiz_id == quiz_id && r.user_id == user_id)
            .cloned()
            .collect())
    }

    fn upsert_analysis(&mut self, analysis: StoredAnalysis) -> Result<(), AnalysisError> {
        match self
            .analyses
            .iter_mut()
            .find(|a| a.user_id == analysis.user_id && a.quiz_id == analysis.quiz_id)
        {
            Some(existing) => *existing = analysis,
            None => self.analyses.push(analysis),
        }
        Ok(())
    }

    fn analyses_for_user(&self, user_id: &str) -> Result<Vec<StoredAnalysis>, AnalysisError> {
        Ok(self
            .analyses
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }
}
