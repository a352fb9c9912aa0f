// Bulk user provisioning (the admin callable).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::gateway::{DocumentGateway, GatewayError, UserDirectory};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Rejected before any mutation: the caller lacks the admin claim.
    #[error("caller is not authorized to provision users")]
    NotAuthorized,

    #[error("no account found for email `{email}`")]
    UnknownEmail { email: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSeed {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub users: Vec<UserSeed>,
}

/// Identity claims of whoever invoked the call.
#[derive(Debug, Clone)]
pub struct CallerClaims {
    pub uid: String,
    pub admin: bool,
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Provision a batch of users: resolve each email to an account uid, then
/// merge-write name and email into that user's record.
///
/// The admin check happens before anything else. Email resolution is
/// two-phase — every email must resolve before the first write — so an
/// unknown email aborts the whole batch with no partial writes.
pub async fn provision_users(
    directory: &dyn UserDirectory,
    gateway: &dyn DocumentGateway,
    caller: &CallerClaims,
    request: &ProvisionRequest,
) -> Result<String, ProvisionError> {
    if !caller.admin {
        return Err(ProvisionError::NotAuthorized);
    }

    // Phase 1: resolve all identities.
    let mut resolved = Vec::with_capacity(request.users.len());
    for seed in &request.users {
        let uid = directory
            .lookup_by_email(&seed.email)
            .await?
            .ok_or_else(|| ProvisionError::UnknownEmail {
                email: seed.email.clone(),
            })?;
        resolved.push((uid, seed));
    }

    // Phase 2: merge-write each record.
    for (uid, seed) in &resolved {
        gateway
            .merge_update(
                "users",
                uid,
                &serde_json::json!({"name": seed.name, "email": seed.email}),
            )
            .await?;
    }

    info!(
        "provisioned {} users on behalf of {}",
        resolved.len(),
        caller.uid
    );
    Ok(format!("provisioned {} users", resolved.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use serde_json::json;

    fn admin() -> CallerClaims {
        CallerClaims {
            uid: "admin_1".to_string(),
            admin: true,
        }
    }

    fn request(seeds: &[(&str, &str)]) -> ProvisionRequest {
        ProvisionRequest {
            users: seeds
                .iter()
                .map(|(email, name)| UserSeed {
                    email: email.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn provisions_users_and_reports_count() {
        let gateway = MemoryGateway::new();
        gateway.seed_account("maya@example.com", "u_77");
        gateway.seed_account("kit@example.com", "u_78");
        // Existing profile field that the merge must preserve
        gateway.seed_document("users", "u_77", json!({"pickems": {"ev1": ["a"]}}));

        let message = provision_users(
            &gateway,
            &gateway,
            &admin(),
            &request(&[
                ("maya@example.com", "Maya Cross"),
                ("kit@example.com", "Kit Halloway"),
            ]),
        )
        .await
        .unwrap();

        assert_eq!(message, "provisioned 2 users");

        let maya = gateway.document_fields("users", "u_77").unwrap();
        assert_eq!(maya["name"], json!("Maya Cross"));
        assert_eq!(maya["email"], json!("maya@example.com"));
        // Merge preserved the existing pick list
        assert_eq!(maya["pickems"]["ev1"], json!(["a"]));

        let kit = gateway.document_fields("users", "u_78").unwrap();
        assert_eq!(kit["name"], json!("Kit Halloway"));
    }

    #[tokio::test]
    async fn non_admin_caller_is_rejected_before_any_write() {
        let gateway = MemoryGateway::new();
        gateway.seed_account("maya@example.com", "u_77");

        let caller = CallerClaims {
            uid: "user_9".to_string(),
            admin: false,
        };
        let err = provision_users(
            &gateway,
            &gateway,
            &caller,
            &request(&[("maya@example.com", "Maya Cross")]),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProvisionError::NotAuthorized));
        assert!(gateway.document_fields("users", "u_77").is_none());
    }

    #[tokio::test]
    async fn unknown_email_aborts_with_no_partial_writes() {
        let gateway = MemoryGateway::new();
        gateway.seed_account("maya@example.com", "u_77");
        // kit@example.com deliberately missing

        let err = provision_users(
            &gateway,
            &gateway,
            &admin(),
            &request(&[
                ("maya@example.com", "Maya Cross"),
                ("kit@example.com", "Kit Halloway"),
            ]),
        )
        .await
        .unwrap_err();

        match err {
            ProvisionError::UnknownEmail { email } => assert_eq!(email, "kit@example.com"),
            other => panic!("expected UnknownEmail, got: {other}"),
        }
        // Even the resolvable first user must not have been written
        assert!(gateway.document_fields("users", "u_77").is_none());
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op_success() {
        let gateway = MemoryGateway::new();
        let message = provision_users(&gateway, &gateway, &admin(), &request(&[]))
            .await
            .unwrap();
        assert_eq!(message, "provisioned 0 users");
    }
}
