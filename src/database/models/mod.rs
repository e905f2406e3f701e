pub mod lead;

pub use lead::{Lead, LeadField, LeadPatch, LeadStatus, NewLead};
