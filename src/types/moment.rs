//! Moment — a temporal event derived from Resources (§3, §4.6, §8 property 4).

use super::entity::EntityMeta;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentType {
    Meeting,
    Conversation,
    Reflection,
    Planning,
    Observation,
}

/// A person referenced by a Moment, keyed by a stable person-key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonDescriptor {
    pub display_label: String,
}

/// A present person who also spoke, with measured speaking time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerDescriptor {
    pub display_label: String,
    pub speaking_time_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Moment {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
    pub moment_type: MomentType,
    pub summary: Option<String>,
    pub content: String,
    pub resource_timestamp: DateTime<Utc>,
    pub resource_ends_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub emotion_tags: Vec<String>,
    #[serde(default)]
    pub topic_tags: Vec<String>,
    #[serde(default)]
    pub present_persons: HashMap<String, PersonDescriptor>,
    #[serde(default)]
    pub speakers: HashMap<String, SpeakerDescriptor>,
    pub location: Option<String>,
}

/// A problem with a Moment found during validation. Durations out of range
/// are warnings (§4.6), everything else listed here is a hard invariant
/// violation (§3 invariant d, §8 property 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MomentValidationIssue {
    EndBeforeStart,
    SpeakerNotPresent(String),
    DurationTooShort,
    DurationTooLong,
}

impl Moment {
    pub fn id(&self) -> Uuid {
        self.meta.id
    }

    /// Validate against §3 invariant (d) and §4.6's span-length warnings.
    /// Returns every issue found rather than failing fast, so callers can
    /// decide which are warnings (duration) vs hard errors (ordering,
    /// speaker membership).
    pub fn validate(&self) -> Vec<MomentValidationIssue> {
        let mut issues = Vec::new();

        if self.resource_ends_timestamp < self.resource_timestamp {
            issues.push(MomentValidationIssue::EndBeforeStart);
        }

        for key in self.speakers.keys() {
            if !self.present_persons.contains_key(key) {
                issues.push(MomentValidationIssue::SpeakerNotPresent(key.clone()));
            }
        }

        let duration = self.resource_ends_timestamp - self.resource_timestamp;
        if duration > chrono::Duration::zero() {
            if duration < chrono::Duration::minutes(1) {
                issues.push(MomentValidationIssue::DurationTooShort);
            } else if duration > chrono::Duration::hours(8) {
                issues.push(MomentValidationIssue::DurationTooLong);
            }
        }

        issues
    }

    /// True if `issues` contains anything besides the two duration
    /// warnings — those never block a write per §4.6 ("flagged as
    /// warnings, not errors").
    pub fn has_hard_violation(issues: &[MomentValidationIssue]) -> bool {
        issues.iter().any(|i| {
            !matches!(
                i,
                MomentValidationIssue::DurationTooShort | MomentValidationIssue::DurationTooLong
            )
        })
    }
}
