use serde::Deserialize;
use serde_json::Value;

use crate::database::models::LeadField;

/// Body of `POST /leads`.
///
/// Lead fields stay raw JSON so a wrong type is reported per field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadPayload {
    pub name: Option<Value>,
    pub email: Option<Value>,
    pub phone: Option<Value>,
    pub company: Option<Value>,
    pub status: Option<Value>,
    pub source: Option<Value>,
    pub notes: Option<Value>,

    // Server-owned; accepted here only so they can be reported.
    pub id: Option<Value>,
    pub owner_id: Option<Value>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
}

/// Body of `PUT /leads/:id`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadPayload {
    pub name: Option<Value>,
    pub email: Option<Value>,
    pub phone: Option<Value>,
    pub company: Option<Value>,
    pub status: Option<Value>,
    pub source: Option<Value>,
    pub notes: Option<Value>,

    pub id: Option<Value>,
    pub owner_id: Option<Value>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
}

macro_rules! payload_fields {
    ($payload:ty) => {
        impl $payload {
            pub(super) fn fields(&self) -> [(LeadField, Option<&Value>); 7] {
                [
                    (LeadField::Name, self.name.as_ref()),
                    (LeadField::Email, self.email.as_ref()),
                    (LeadField::Phone, self.phone.as_ref()),
                    (LeadField::Company, self.company.as_ref()),
                    (LeadField::Status, self.status.as_ref()),
                    (LeadField::Source, self.source.as_ref()),
                    (LeadField::Notes, self.notes.as_ref()),
                ]
            }

            pub(super) fn server_owned(&self) -> [(&'static str, bool); 4] {
                [
                    ("id", self.id.is_some()),
                    ("ownerId", self.owner_id.is_some()),
                    ("createdAt", self.created_at.is_some()),
                    ("updatedAt", self.updated_at.is_some()),
                ]
            }
        }
    };
}

payload_fields!(CreateLeadPayload);
payload_fields!(UpdateLeadPayload);
