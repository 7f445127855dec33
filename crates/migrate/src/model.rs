//! Record shapes before and after the solutions migration.
//!
//! Wire names are camelCase. Fields the store may omit are `Option`s and
//! are left out when serialized, because the store cannot hold `null`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MigrationError;

/// Task id recorded on solutions that were already graded before the
/// migration, in place of a real work-queue task.
pub const MIGRATION_TASK_ID: &str = "migrate-version-1";

/// Submission body shared by legacy solutions, queued solutions and tasks.
///
/// Fields this crate does not know about are carried through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SolutionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Grading outcome stored next to a legacy solution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyResolution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
    /// Verifier output; present only once the solution was graded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
    pub verified: bool,
    pub solved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Attempt start time (as a string key) to solving duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<BTreeMap<String, i64>>,
}

/// A submission with its grading metadata and results, keyed by task id.
///
/// `results` is non-empty iff `meta.verified`; an unverified solution may
/// still carry the `task_id` of its pending task. `meta.solved` implies
/// `history[started_at]` is the solving duration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueuedSolution {
    pub meta: SolutionMeta,
    pub payload: SolutionPayload,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub results: BTreeMap<String, Value>,
}

impl QueuedSolution {
    /// Build a queued solution from a legacy solution payload and its
    /// resolution, if any. A missing resolution means the problem was
    /// opened but never attempted.
    pub fn from_legacy(payload: SolutionPayload, resolution: Option<&LegacyResolution>) -> Self {
        let resolution = resolution.cloned().unwrap_or_default();

        let verified = resolution.output.is_some();
        let solved = resolution
            .output
            .as_ref()
            .and_then(|output| output.get("solved"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let mut solution = QueuedSolution {
            meta: SolutionMeta {
                started_at: resolution.started_at,
                ended_at: resolution.ended_at,
                verified,
                solved,
                task_id: None,
                history: None,
            },
            payload,
            results: BTreeMap::new(),
        };

        if let Some(output) = resolution.output {
            solution.meta.task_id = Some(MIGRATION_TASK_ID.to_string());
            solution.results.insert(MIGRATION_TASK_ID.to_string(), output);
        }

        if solved {
            if let (Some(started_at), Some(ended_at)) = (resolution.started_at, resolution.ended_at)
            {
                solution.meta.history = ended_at
                    .checked_sub(started_at)
                    .map(|duration| BTreeMap::from([(started_at.to_string(), duration)]));
            }
        }

        solution
    }

    /// Reject a record that cannot be written as a queued solution.
    pub fn validate(&self, path: &str) -> Result<(), MigrationError> {
        let mut missing = Vec::new();
        if self.meta.started_at.is_none() {
            missing.push("startedAt");
        }
        if self.meta.ended_at.is_none() {
            missing.push("endedAt");
        }
        if !missing.is_empty() {
            return Err(MigrationError::malformed(
                path,
                format!("missing {}", missing.join(", ")),
            ));
        }
        if self.meta.solved && self.duration().is_none() {
            return Err(MigrationError::malformed(
                path,
                "endedAt - startedAt is out of range",
            ));
        }
        Ok(())
    }

    /// Solving duration, when solved.
    pub fn duration(&self) -> Option<i64> {
        if !self.meta.solved {
            return None;
        }
        let started_at = self.meta.started_at?;
        self.meta.history.as_ref()?.get(&started_at.to_string()).copied()
    }
}

/// Per-user summary of a queued solution, stored under the user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub solved: bool,
    /// Present iff `solved`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

impl From<&QueuedSolution> for SolutionRef {
    fn from(solution: &QueuedSolution) -> Self {
        SolutionRef {
            started_at: solution.meta.started_at,
            language: solution.payload.language.clone(),
            solved: solution.meta.solved,
            duration: solution.duration(),
        }
    }
}

/// Work-queue entry asking a verifier to grade a submission.
///
/// Ownership and consumption flags are plain data here; who may claim or
/// consume a task is decided by the store's access rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub owner: String,
    pub payload: SolutionPayload,
    /// Creation time, or the server timestamp placeholder before the store
    /// resolves it.
    pub created_at: Value,
    pub started: bool,
    pub completed: bool,
    pub consumed: bool,
    /// Store path of the queued solution this task grades.
    pub solution_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn python_payload() -> SolutionPayload {
        serde_json::from_value(json!({
            "tests": ">>> hello\n\"world\"",
            "solution": "hello = \"world\"",
            "language": "python"
        }))
        .unwrap()
    }

    #[test]
    fn solved_resolution_becomes_verified_solved_solution() {
        let resolution: LegacyResolution = serde_json::from_value(json!({
            "startedAt": 12345,
            "endedAt": 12347,
            "output": {
                "solved": true,
                "printed": "",
                "results": {"0": {"call": "hello", "correct": true}}
            }
        }))
        .unwrap();

        let solution = QueuedSolution::from_legacy(python_payload(), Some(&resolution));
        let expected = json!({
            "meta": {
                "startedAt": 12345,
                "endedAt": 12347,
                "verified": true,
                "solved": true,
                "taskId": "migrate-version-1",
                "history": {"12345": 2}
            },
            "payload": {
                "tests": ">>> hello\n\"world\"",
                "solution": "hello = \"world\"",
                "language": "python"
            },
            "results": {
                "migrate-version-1": {
                    "solved": true,
                    "printed": "",
                    "results": {"0": {"call": "hello", "correct": true}}
                }
            }
        });

        assert_eq!(serde_json::to_value(&solution).unwrap(), expected);
        assert_eq!(solution.duration(), Some(2));
    }

    #[test]
    fn resolution_without_output_is_unverified() {
        let resolution = LegacyResolution {
            started_at: Some(12345),
            ended_at: Some(12347),
            output: None,
        };

        let solution = QueuedSolution::from_legacy(python_payload(), Some(&resolution));
        let value = serde_json::to_value(&solution).unwrap();

        assert_eq!(value["meta"]["verified"], json!(false));
        assert_eq!(value["meta"]["solved"], json!(false));
        assert!(value.get("results").is_none());
        assert!(value["meta"].get("history").is_none());
        assert!(value["meta"].get("taskId").is_none());
    }

    #[test]
    fn failed_attempt_is_verified_but_not_solved() {
        let resolution = LegacyResolution {
            started_at: Some(10),
            ended_at: Some(20),
            output: Some(json!({"solved": false})),
        };

        let solution = QueuedSolution::from_legacy(python_payload(), Some(&resolution));
        assert!(solution.meta.verified);
        assert!(!solution.meta.solved);
        assert!(solution.meta.history.is_none());
        assert_eq!(solution.meta.task_id.as_deref(), Some(MIGRATION_TASK_ID));
        assert_eq!(solution.duration(), None);
    }

    #[test]
    fn output_without_solved_flag_counts_as_unsolved() {
        let resolution = LegacyResolution {
            started_at: Some(10),
            ended_at: Some(20),
            output: Some(json!({"printed": "boom"})),
        };
        let solution = QueuedSolution::from_legacy(python_payload(), Some(&resolution));
        assert!(solution.meta.verified);
        assert!(!solution.meta.solved);
    }

    #[test]
    fn missing_resolution_is_unattempted_and_invalid() {
        let solution = QueuedSolution::from_legacy(python_payload(), None);
        assert!(!solution.meta.verified);
        assert!(!solution.meta.solved);

        let err = solution.validate("singpath/solutions/p/l/q/bob").unwrap_err();
        match err {
            MigrationError::MalformedRecord { path, reason } => {
                assert_eq!(path, "singpath/solutions/p/l/q/bob");
                assert_eq!(reason, "missing startedAt, endedAt");
            }
            other => panic!("expected MalformedRecord, got: {}", other),
        }
    }

    #[test]
    fn missing_end_time_is_invalid() {
        let resolution = LegacyResolution {
            started_at: Some(10),
            ended_at: None,
            output: None,
        };
        let solution = QueuedSolution::from_legacy(python_payload(), Some(&resolution));
        assert!(solution.validate("x").is_err());
    }

    #[test]
    fn overflowing_duration_is_invalid() {
        let resolution = LegacyResolution {
            started_at: Some(i64::MIN),
            ended_at: Some(i64::MAX),
            output: Some(json!({"solved": true})),
        };
        let solution = QueuedSolution::from_legacy(python_payload(), Some(&resolution));
        assert_eq!(solution.meta.history, None);
        match solution.validate("singpath/solutions/p/l/q/u") {
            Err(MigrationError::MalformedRecord { path, reason }) => {
                assert_eq!(path, "singpath/solutions/p/l/q/u");
                assert!(reason.contains("out of range"), "{}", reason);
            }
            other => panic!("expected MalformedRecord, got: {:?}", other),
        }
    }

    #[test]
    fn solution_ref_carries_duration_only_when_solved() {
        let solved = QueuedSolution::from_legacy(
            python_payload(),
            Some(&LegacyResolution {
                started_at: Some(100),
                ended_at: Some(160),
                output: Some(json!({"solved": true})),
            }),
        );
        assert_eq!(
            serde_json::to_value(SolutionRef::from(&solved)).unwrap(),
            json!({"startedAt": 100, "language": "python", "solved": true, "duration": 60})
        );

        let unsolved = QueuedSolution::from_legacy(
            python_payload(),
            Some(&LegacyResolution {
                started_at: Some(100),
                ended_at: Some(160),
                output: None,
            }),
        );
        assert_eq!(
            serde_json::to_value(SolutionRef::from(&unsolved)).unwrap(),
            json!({"startedAt": 100, "language": "python", "solved": false})
        );
    }

    #[test]
    fn payload_keeps_unknown_fields() {
        let payload: SolutionPayload = serde_json::from_value(json!({
            "language": "java",
            "tests": "t",
            "editor": "vim"
        }))
        .unwrap();
        assert_eq!(payload.extra.get("editor"), Some(&json!("vim")));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"language": "java", "tests": "t", "editor": "vim"})
        );
    }
}
