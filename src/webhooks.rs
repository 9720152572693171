//! Webhook payload parsing and signature verification.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Scheme tag GitHub prefixes onto the hex digest.
const SIGNATURE_SCHEME: &str = "sha256=";

/// Verify a GitHub webhook signature using HMAC-SHA256.
///
/// The signature must be computed over the exact body bytes as received;
/// re-serializing a parsed payload is not equivalent.
///
/// # Arguments
/// * `body` - Raw webhook body bytes
/// * `signature` - Value of the `X-Hub-Signature-256` header (`sha256=<hex>`)
/// * `secret` - Webhook signing secret
///
/// # Returns
/// `true` if signature is valid, `false` otherwise
#[must_use]
pub fn verify_webhook_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let Some(hex_digest) = signature.strip_prefix(SIGNATURE_SCHEME) else {
        return false;
    };

    let Ok(signature_bytes) = hex::decode(hex_digest) else {
        return false;
    };

    // HMAC-SHA256 accepts keys of any length, including empty; an empty secret
    // is a deployment misconfiguration, not a special case here.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    // Constant-time comparison to prevent timing attacks
    computed.as_slice().ct_eq(&signature_bytes).into()
}

/// Webhook action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    /// Entity was opened (reopens arrive as the same action)
    Opened,
    /// Entity was closed
    Closed,
    /// Pull request was merged
    Merged,
    /// Any other action (catch-all to avoid parse failures; ignored, not an error)
    #[serde(other)]
    Unknown,
}

/// `issues` event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuesEvent {
    /// Action type
    pub action: EventAction,
    /// Affected issue
    pub issue: EventEntity,
    /// Repository the event originated from
    #[serde(default)]
    pub repository: Option<EventRepository>,
}

/// `pull_request` event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    /// Action type
    pub action: EventAction,
    /// Affected pull request
    pub pull_request: EventEntity,
    /// Repository the event originated from
    #[serde(default)]
    pub repository: Option<EventRepository>,
}

/// The issue or pull request carried by an event (one polymorphic shape).
#[derive(Debug, Clone, Deserialize)]
pub struct EventEntity {
    /// GitHub entity id
    pub id: i64,
    /// Entity number within the repository (needed for comment posting)
    #[serde(default)]
    pub number: Option<i64>,
    /// Title
    pub title: String,
    /// Body text
    #[serde(default)]
    pub body: Option<String>,
    /// Actor: the user who authored the entity
    pub user: EventUser,
}

/// Actor reference inside an event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct EventUser {
    /// GitHub account identifier
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
}

/// Repository reference inside an event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRepository {
    /// Full name (`owner/repo`)
    pub full_name: String,
}

/// GitHub sends numeric account ids; the local mapping stores them as text.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}
