//! Admin credential checks for the admin WebSocket.
//!
//! Tokens come from the environment, named by [`AuthConfig`]: a per-admin
//! list (`alice:tokA,bob:tokB`), a single shared token, or nothing at all
//! (dev mode, any connection accepted). Only SHA-256 digests are kept in
//! memory; hashing also normalizes lengths so `ct_eq` always compares 32
//! bytes.

use sb_domain::config::AuthConfig;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Close reason for a bad or missing token.
pub const REASON_BAD_TOKEN: &str = "Invalid or expired token";
/// Close reason when the admin identity cannot be resolved.
pub const REASON_BAD_IDENTITY: &str = "Invalid token payload";

fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

fn digest_eq(provided: &str, expected: &[u8; 32]) -> bool {
    digest(provided).ct_eq(expected).into()
}

enum Mode {
    /// (admin_id, token digest) pairs.
    PerAdmin(Vec<(String, [u8; 32])>),
    Shared([u8; 32]),
    Open,
}

/// Startup-computed admin credential set.
pub struct AdminAuth {
    mode: Mode,
}

impl AdminAuth {
    pub fn from_env(config: &AuthConfig) -> Self {
        let per_admin = std::env::var(&config.admin_tokens_env).ok();
        let shared = std::env::var(&config.admin_token_env).ok();
        Self::from_parts(per_admin, shared)
    }

    fn from_parts(per_admin: Option<String>, shared: Option<String>) -> Self {
        if let Some(raw) = per_admin {
            let pairs: Vec<(String, [u8; 32])> = raw
                .split(',')
                .filter_map(|pair| pair.trim().split_once(':'))
                .filter(|(admin_id, token)| !admin_id.is_empty() && !token.is_empty())
                .map(|(admin_id, token)| (admin_id.to_string(), digest(token)))
                .collect();
            tracing::info!(admins = pairs.len(), "admin auth: per-admin tokens");
            return Self {
                mode: Mode::PerAdmin(pairs),
            };
        }
        if let Some(token) = shared {
            tracing::info!("admin auth: shared token");
            return Self {
                mode: Mode::Shared(digest(&token)),
            };
        }
        tracing::warn!("admin auth: no token configured, accepting any admin (dev mode)");
        Self { mode: Mode::Open }
    }

    /// Resolve the connecting admin's identity, or the close reason to
    /// reject it with.
    ///
    /// With per-admin tokens the identity can be derived from the token
    /// alone; the `admin_id` hint, when present, must name the matching
    /// admin. The shared-token and open modes have nothing to derive an
    /// identity from, so they require the hint.
    pub fn authenticate(
        &self,
        token: Option<&str>,
        admin_id: Option<&str>,
    ) -> Result<String, &'static str> {
        let admin_id = admin_id.map(str::trim).filter(|id| !id.is_empty());
        match &self.mode {
            Mode::PerAdmin(pairs) => {
                let Some(token) = token else {
                    return Err(REASON_BAD_TOKEN);
                };
                match admin_id {
                    Some(hint) => pairs
                        .iter()
                        .find(|(id, expected)| id == hint && digest_eq(token, expected))
                        .map(|(id, _)| id.clone())
                        .ok_or(REASON_BAD_TOKEN),
                    None => pairs
                        .iter()
                        .find(|(_, expected)| digest_eq(token, expected))
                        .map(|(id, _)| id.clone())
                        .ok_or(REASON_BAD_TOKEN),
                }
            }
            Mode::Shared(expected) => {
                let Some(token) = token else {
                    return Err(REASON_BAD_TOKEN);
                };
                if !digest_eq(token, expected) {
                    return Err(REASON_BAD_TOKEN);
                }
                admin_id
                    .map(str::to_string)
                    .ok_or(REASON_BAD_IDENTITY)
            }
            Mode::Open => admin_id.map(str::to_string).ok_or(REASON_BAD_IDENTITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_admin_resolves_identity_from_token() {
        let auth = AdminAuth::from_parts(Some("alice:tokA, bob:tokB".into()), None);
        assert_eq!(auth.authenticate(Some("tokB"), None).unwrap(), "bob");
        assert_eq!(
            auth.authenticate(Some("tokA"), Some("alice")).unwrap(),
            "alice"
        );
    }

    #[test]
    fn per_admin_hint_must_match_token_owner() {
        let auth = AdminAuth::from_parts(Some("alice:tokA,bob:tokB".into()), None);
        assert_eq!(
            auth.authenticate(Some("tokA"), Some("bob")),
            Err(REASON_BAD_TOKEN)
        );
    }

    #[test]
    fn per_admin_rejects_unknown_token() {
        let auth = AdminAuth::from_parts(Some("alice:tokA".into()), None);
        assert_eq!(auth.authenticate(Some("nope"), None), Err(REASON_BAD_TOKEN));
        assert_eq!(auth.authenticate(None, Some("alice")), Err(REASON_BAD_TOKEN));
    }

    #[test]
    fn shared_token_requires_admin_id() {
        let auth = AdminAuth::from_parts(None, Some("sekrit".into()));
        assert_eq!(
            auth.authenticate(Some("sekrit"), Some("carol")).unwrap(),
            "carol"
        );
        assert_eq!(
            auth.authenticate(Some("sekrit"), None),
            Err(REASON_BAD_IDENTITY)
        );
        assert_eq!(
            auth.authenticate(Some("wrong"), Some("carol")),
            Err(REASON_BAD_TOKEN)
        );
    }

    #[test]
    fn open_mode_accepts_any_token_but_needs_identity() {
        let auth = AdminAuth::from_parts(None, None);
        assert_eq!(auth.authenticate(None, Some("dev")).unwrap(), "dev");
        assert_eq!(auth.authenticate(Some("x"), Some("  ")), Err(REASON_BAD_IDENTITY));
    }
}
