use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    draft::ClaimField,
    validation::{amount_from_value, is_truthy},
};

pub const CLAIM_RECORD_KIND: &str = "claim";

/// Normalized claim as forwarded to the provider's servicing endpoint.
///
/// Scalar fields are relayed as they arrived. `estimatedAmount` is the only
/// conversion: a string becomes a float here, and a value with no numeric
/// prefix becomes `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub claim_type: Value,
    pub description: Value,
    pub date_of_incident: Value,
    pub estimated_amount: Option<f64>,
    pub policy_number: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<Value>,
    pub documents: Value,
}

impl ClaimRecord {
    pub fn from_payload(payload: &Value) -> Self {
        let field = |f: ClaimField| payload.get(f.wire_name()).cloned().unwrap_or(Value::Null);
        let documents = payload
            .get("documents")
            .filter(|d| is_truthy(d))
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));

        Self {
            kind: CLAIM_RECORD_KIND.to_string(),
            claim_type: field(ClaimField::ClaimType),
            description: field(ClaimField::Description),
            date_of_incident: field(ClaimField::DateOfIncident),
            estimated_amount: amount_from_value(&field(ClaimField::EstimatedAmount)),
            policy_number: field(ClaimField::PolicyNumber),
            contact_phone: payload.get(ClaimField::ContactPhone.wire_name()).cloned(),
            contact_email: payload.get(ClaimField::ContactEmail.wire_name()).cloned(),
            documents,
        }
    }
}
