use chrono::NaiveDateTime;
use serde::Serialize;

/// Local mirror of an identity-provider user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject_id: String,
    pub email: Option<String>,
    /// Created by first-seen provisioning rather than imported.
    pub locally_provisioned: bool,
    pub created_at: Option<NaiveDateTime>,
}

impl Principal {
    pub fn provisioned(subject_id: &str, email: Option<&str>) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            email: email.map(str::to_string),
            locally_provisioned: true,
            created_at: None,
        }
    }
}
