use serde::{Deserialize, Serialize};

/// How a sender is identified to the entitlement service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierKind {
    Phone,
    WebUserId,
}

/// A sender identity ready for the access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub kind: IdentifierKind,
    pub value: String,
}

impl Identity {
    /// `56912345678@c.us` becomes phone `+56912345678`; anything without `@` is a web user id
    pub fn from_sender(sender_id: &str) -> Self {
        match sender_id.split_once('@') {
            Some((number, _)) => {
                let number = number.trim();
                let value = if number.starts_with('+') {
                    number.to_string()
                } else {
                    format!("+{}", number)
                };
                Self {
                    kind: IdentifierKind::Phone,
                    value,
                }
            }
            None => Self {
                kind: IdentifierKind::WebUserId,
                value: sender_id.trim().to_string(),
            },
        }
    }
}

/// Answer from the entitlement service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    #[serde(rename = "hasWhatsAppAccess", default)]
    pub has_access: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl AccessDecision {
    pub fn granted() -> Self {
        Self {
            has_access: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            has_access: false,
            reason: Some(reason.into()),
        }
    }
}

/// Acknowledgement of a sent message
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeliveryReceipt {
    #[serde(default)]
    pub id: Option<String>,
}

/// Acknowledgement from the listings-creation service
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListingAck {
    #[serde(default)]
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whatsapp_ids_become_phone_identities() {
        let identity = Identity::from_sender("56912345678@c.us");
        assert_eq!(identity.kind, IdentifierKind::Phone);
        assert_eq!(identity.value, "+56912345678");

        let identity = Identity::from_sender("+56912345678@c.us");
        assert_eq!(identity.value, "+56912345678");
    }

    #[test]
    fn other_ids_are_web_users() {
        let identity = Identity::from_sender("user_2x9");
        assert_eq!(identity.kind, IdentifierKind::WebUserId);
        assert_eq!(identity.value, "user_2x9");
    }

    #[test]
    fn access_decision_reads_the_konecte_shape() {
        let decision: AccessDecision =
            serde_json::from_str(r#"{"hasWhatsAppAccess": false, "reason": "plan básico"}"#).unwrap();
        assert_eq!(decision, AccessDecision::denied("plan básico"));

        let decision: AccessDecision = serde_json::from_str("{}").unwrap();
        assert!(!decision.has_access);
    }
}
