use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored lead. Timestamps and `owner_id` are server-owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: LeadStatus,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Proposal,
    Won,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 6] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Proposal,
        LeadStatus::Won,
        LeadStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Proposal => "proposal",
            LeadStatus::Won => "won",
            LeadStatus::Lost => "lost",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| format!("unknown lead status '{}'", s))
    }
}

/// Client-settable lead attributes, in validation and export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LeadField {
    Name,
    Email,
    Phone,
    Company,
    Status,
    Source,
    Notes,
}

impl LeadField {
    pub const ALL: [LeadField; 7] = [
        LeadField::Name,
        LeadField::Email,
        LeadField::Phone,
        LeadField::Company,
        LeadField::Status,
        LeadField::Source,
        LeadField::Notes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadField::Name => "name",
            LeadField::Email => "email",
            LeadField::Phone => "phone",
            LeadField::Company => "company",
            LeadField::Status => "status",
            LeadField::Source => "source",
            LeadField::Notes => "notes",
        }
    }
}

impl fmt::Display for LeadField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == wanted)
            .ok_or_else(|| format!("unknown lead field '{}'", s))
    }
}

/// A create payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: LeadStatus,
    pub source: Option<String>,
    pub notes: Option<String>,
}

impl NewLead {
    pub fn into_lead(self, owner_id: Option<String>, now: DateTime<Utc>) -> Lead {
        Lead {
            id: Uuid::new_v4(),
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            status: self.status,
            source: self.source,
            notes: self.notes,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An update payload that passed validation.
///
/// `None` leaves a field untouched. For optional attributes `Some(None)`
/// clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub company: Option<Option<String>>,
    pub status: Option<LeadStatus>,
    pub source: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl LeadPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.company.is_none()
            && self.status.is_none()
            && self.source.is_none()
            && self.notes.is_none()
    }

    /// Merge the present fields into `lead` and stamp `updated_at`.
    pub fn apply(&self, lead: &mut Lead, updated_at: DateTime<Utc>) {
        if let Some(name) = &self.name {
            lead.name = name.clone();
        }
        if let Some(email) = &self.email {
            lead.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            lead.phone = phone.clone();
        }
        if let Some(company) = &self.company {
            lead.company = company.clone();
        }
        if let Some(status) = self.status {
            lead.status = status;
        }
        if let Some(source) = &self.source {
            lead.source = source.clone();
        }
        if let Some(notes) = &self.notes {
            lead.notes = notes.clone();
        }
        lead.updated_at = updated_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Lead {
        NewLead {
            name: "Jane Doe".into(),
            email: "jane@x.com".into(),
            phone: Some("555-0100".into()),
            company: None,
            status: LeadStatus::New,
            source: None,
            notes: Some("met at expo".into()),
        }
        .into_lead(Some("user-1".into()), Utc::now())
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Won".parse::<LeadStatus>().unwrap(), LeadStatus::Won);
        assert_eq!(" lost ".parse::<LeadStatus>().unwrap(), LeadStatus::Lost);
        assert!("archived".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn field_names_round_trip() {
        for field in LeadField::ALL {
            assert_eq!(field.as_str().parse::<LeadField>().unwrap(), field);
        }
        assert!("ownerId".parse::<LeadField>().is_err());
    }

    #[test]
    fn new_lead_stamps_both_timestamps_once() {
        let lead = sample();
        assert_eq!(lead.created_at, lead.updated_at);
        assert_eq!(lead.owner_id.as_deref(), Some("user-1"));
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut lead = sample();
        let created = lead.created_at;
        let later = created + Duration::seconds(5);

        let patch = LeadPatch {
            status: Some(LeadStatus::Contacted),
            phone: Some(None),
            ..Default::default()
        };
        patch.apply(&mut lead, later);

        assert_eq!(lead.status, LeadStatus::Contacted);
        assert_eq!(lead.phone, None);
        assert_eq!(lead.name, "Jane Doe");
        assert_eq!(lead.notes.as_deref(), Some("met at expo"));
        assert_eq!(lead.created_at, created);
        assert_eq!(lead.updated_at, later);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("ownerId").is_some());
        assert_eq!(value["status"], "new");
    }
}
