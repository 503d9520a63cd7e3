use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{attachments::AttachmentStager, error::ClaimFlowError};

/// Line of business a claim is filed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    Auto,
    Home,
    Life,
    Health,
}

impl ClaimType {
    pub const ALL: [ClaimType; 4] = [
        ClaimType::Auto,
        ClaimType::Home,
        ClaimType::Life,
        ClaimType::Health,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Auto => "auto",
            ClaimType::Home => "home",
            ClaimType::Life => "life",
            ClaimType::Health => "health",
        }
    }

    /// Label shown next to the option in a picker
    pub fn label(&self) -> &'static str {
        match self {
            ClaimType::Auto => "Auto Insurance",
            ClaimType::Home => "Home Insurance",
            ClaimType::Life => "Life Insurance",
            ClaimType::Health => "Health Insurance",
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimType {
    type Err = ClaimFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ClaimFlowError::UnknownClaimType(s.to_string()))
    }
}

/// Scalar fields of a claim draft, in the order the gateway validates them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimField {
    ClaimType,
    Description,
    DateOfIncident,
    EstimatedAmount,
    PolicyNumber,
    ContactPhone,
    ContactEmail,
}

impl ClaimField {
    /// Fields that must be non-empty before the form lets a submission through
    pub const REQUIRED: [ClaimField; 7] = [
        ClaimField::ClaimType,
        ClaimField::Description,
        ClaimField::DateOfIncident,
        ClaimField::EstimatedAmount,
        ClaimField::PolicyNumber,
        ClaimField::ContactPhone,
        ClaimField::ContactEmail,
    ];

    /// Fields the backend checks, in order. Contact details are not re-checked there.
    pub const SERVER_REQUIRED: [ClaimField; 5] = [
        ClaimField::ClaimType,
        ClaimField::Description,
        ClaimField::DateOfIncident,
        ClaimField::EstimatedAmount,
        ClaimField::PolicyNumber,
    ];

    /// Name of the field on the wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            ClaimField::ClaimType => "claimType",
            ClaimField::Description => "description",
            ClaimField::DateOfIncident => "dateOfIncident",
            ClaimField::EstimatedAmount => "estimatedAmount",
            ClaimField::PolicyNumber => "policyNumber",
            ClaimField::ContactPhone => "contactPhone",
            ClaimField::ContactEmail => "contactEmail",
        }
    }
}

impl fmt::Display for ClaimField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for ClaimField {
    type Err = ClaimFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimField::REQUIRED
            .into_iter()
            .find(|f| f.wire_name() == s)
            .ok_or_else(|| ClaimFlowError::UnknownField(s.to_string()))
    }
}

/// In-progress claim held by the form. Every scalar is kept as entered;
/// nothing is validated on write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDraft {
    pub claim_type: String,
    pub description: String,
    pub date_of_incident: String,
    pub estimated_amount: String,
    pub policy_number: String,
    pub contact_phone: String,
    pub contact_email: String,
    #[serde(default)]
    pub documents: AttachmentStager,
}

impl ClaimDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: ClaimField) -> &str {
        match field {
            ClaimField::ClaimType => &self.claim_type,
            ClaimField::Description => &self.description,
            ClaimField::DateOfIncident => &self.date_of_incident,
            ClaimField::EstimatedAmount => &self.estimated_amount,
            ClaimField::PolicyNumber => &self.policy_number,
            ClaimField::ContactPhone => &self.contact_phone,
            ClaimField::ContactEmail => &self.contact_email,
        }
    }

    pub fn set(&mut self, field: ClaimField, value: impl Into<String>) {
        let slot = match field {
            ClaimField::ClaimType => &mut self.claim_type,
            ClaimField::Description => &mut self.description,
            ClaimField::DateOfIncident => &mut self.date_of_incident,
            ClaimField::EstimatedAmount => &mut self.estimated_amount,
            ClaimField::PolicyNumber => &mut self.policy_number,
            ClaimField::ContactPhone => &mut self.contact_phone,
            ClaimField::ContactEmail => &mut self.contact_email,
        };
        *slot = value.into();
    }
}
