// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Itinerary activity model for storage, sync and API.
//!
//! Field names are camelCase on the wire so documents written by the
//! browser client and by this crate stay interchangeable.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

/// Category of a planned activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    #[default]
    Activity,
    Food,
    Transport,
    Accommodation,
    /// Also absorbs unknown values from older documents.
    #[serde(other)]
    Other,
}

/// A planned, dated event in the itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Opaque identifier, assigned at creation
    pub id: String,
    /// Calendar date (YYYY-MM-DD)
    pub date: String,
    /// Clock time (HH:MM); absent means unscheduled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Length in minutes; absent or zero means a point in time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Map URL or plain address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ActivityType,
}

impl Activity {
    /// Clock time, treating an empty string as unscheduled.
    pub fn time(&self) -> Option<&str> {
        self.time.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Duration in minutes if positive.
    pub fn positive_duration(&self) -> Option<u32> {
        self.duration_minutes.filter(|d| *d > 0)
    }
}

/// Payload for creating an activity. The id is assigned by the service.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    #[validate(custom(function = "validate_date"))]
    pub date: String,
    #[validate(custom(function = "validate_time"))]
    pub time: Option<String>,
    pub duration_minutes: Option<u32>,
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    pub city: Option<String>,
    pub location: Option<String>,
    pub comments: Option<String>,
    pub link: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ActivityType,
}

impl NewActivity {
    /// Build the stored activity with a fresh identifier.
    pub fn into_activity(self) -> Activity {
        Activity {
            id: uuid::Uuid::new_v4().to_string(),
            date: self.date.trim().to_string(),
            time: non_blank(self.time),
            duration_minutes: self.duration_minutes.filter(|d| *d > 0),
            title: self.title.trim().to_string(),
            city: non_blank(self.city),
            location: non_blank(self.location),
            comments: non_blank(self.comments),
            link: non_blank(self.link),
            kind: self.kind,
        }
    }
}

/// Partial update keyed by activity id.
///
/// Absent fields are left alone. An empty string clears an optional text
/// field and a zero duration clears the duration.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPatch {
    #[validate(custom(function = "validate_date"))]
    pub date: Option<String>,
    #[validate(custom(function = "validate_time"))]
    pub time: Option<String>,
    pub duration_minutes: Option<u32>,
    #[validate(custom(function = "validate_title"))]
    pub title: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub comments: Option<String>,
    pub link: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ActivityType>,
}

impl ActivityPatch {
    /// Apply the patch in place. The id is never touched.
    pub fn apply(self, activity: &mut Activity) {
        if let Some(date) = self.date {
            activity.date = date.trim().to_string();
        }
        if let Some(time) = self.time {
            activity.time = non_blank(Some(time));
        }
        if let Some(duration) = self.duration_minutes {
            activity.duration_minutes = Some(duration).filter(|d| *d > 0);
        }
        if let Some(title) = self.title {
            activity.title = title.trim().to_string();
        }
        if let Some(city) = self.city {
            activity.city = non_blank(Some(city));
        }
        if let Some(location) = self.location {
            activity.location = non_blank(Some(location));
        }
        if let Some(comments) = self.comments {
            activity.comments = non_blank(Some(comments));
        }
        if let Some(link) = self.link {
            activity.link = non_blank(Some(link));
        }
        if let Some(kind) = self.kind {
            activity.kind = kind;
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_date(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    // Zero-padded ISO dates only; sort keys compare lexically.
    if value.len() == 10 && chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("date").with_message("date must be YYYY-MM-DD".into()))
    }
}

fn validate_time(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || crate::services::time_model::to_minutes(value).is_some() {
        Ok(())
    } else {
        Err(ValidationError::new("time").with_message("time must be HH:MM".into()))
    }
}

fn validate_title(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("title").with_message("title is required".into()))
    } else {
        Ok(())
    }
}
