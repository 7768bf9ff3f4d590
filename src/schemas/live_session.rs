use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::types::LiveSessionStatus;
use crate::schemas::datetime::{deserialize_datetime, deserialize_option_datetime};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LiveSessionCreate {
    #[validate(length(min = 1, max = 255, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "scheduledAt", deserialize_with = "deserialize_datetime")]
    pub(crate) scheduled_at: PrimitiveDateTime,
    #[serde(default = "default_duration", alias = "durationMinutes")]
    #[validate(range(min = 1, max = 1440, message = "duration_minutes must be between 1 and 1440"))]
    pub(crate) duration_minutes: i32,
    #[serde(default, alias = "meetingUrl")]
    #[validate(url(message = "meeting_url must be a valid URL"))]
    pub(crate) meeting_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LiveSessionUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "scheduledAt", deserialize_with = "deserialize_option_datetime")]
    pub(crate) scheduled_at: Option<PrimitiveDateTime>,
    #[serde(default, alias = "durationMinutes")]
    #[validate(range(min = 1, max = 1440, message = "duration_minutes must be between 1 and 1440"))]
    pub(crate) duration_minutes: Option<i32>,
    #[serde(default, alias = "meetingUrl")]
    #[validate(url(message = "meeting_url must be a valid URL"))]
    pub(crate) meeting_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LiveSessionStatusUpdate {
    pub(crate) status: LiveSessionStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct LiveSessionResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) scheduled_at: String,
    pub(crate) duration_minutes: i32,
    pub(crate) meeting_url: Option<String>,
    pub(crate) status: LiveSessionStatus,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl LiveSessionResponse {
    pub(crate) fn from_db(session: crate::db::models::LiveSession) -> Self {
        Self {
            id: session.id,
            course_id: session.course_id,
            title: session.title,
            description: session.description,
            scheduled_at: format_primitive(session.scheduled_at),
            duration_minutes: session.duration_minutes,
            meeting_url: session.meeting_url,
            status: session.status,
            created_by: session.created_by,
            created_at: format_primitive(session.created_at),
            updated_at: format_primitive(session.updated_at),
        }
    }
}

fn default_duration() -> i32 {
    60
}
