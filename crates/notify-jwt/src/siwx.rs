//! CAIP-122 (Sign-In-With-X) statement construction and the CACAO container
//! that carries the user's signature over it.

use serde::{Deserialize, Serialize};

use crate::did::did_pkh;

/// The two statement flavors `prepare_registration` can compose
/// (spec.md §4.1), keyed off the caller's `all_apps` flag.
pub fn statement_text(all_apps: bool, domain: &str) -> String {
    if all_apps {
        "I further authorize this app to send me notifications for ALL apps. Read more at https://walletconnect.network/notify-terms"
            .to_string()
    } else {
        format!(
            "I further authorize this app to send me notifications. This app can read my wallet address, which is a cryptographically secure way for it to manage my notification subscriptions. This app's domain is {domain}."
        )
    }
}

/// `true` for any recorded statement matching the recap-style shorthand a
/// notify server may substitute for the long-form text above — the
/// staleness check in §4.1 treats these as equivalent to a fresh statement.
pub fn is_recap_statement(text: &str) -> bool {
    text.contains("'manage':") && text.to_lowercase().contains("notifications")
}

/// `{header, payload, signature}`, the CACAO container spec.md's glossary
/// describes. `signature` is filled in by the caller after the user signs
/// `message_text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacaoPayload {
    pub domain: String,
    pub iss: String,
    pub statement: String,
    pub aud: String,
    pub version: String,
    pub nonce: String,
    pub iat: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cacao {
    pub header: CacaoHeader,
    pub payload: CacaoPayload,
    pub signature: CacaoSignature,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacaoHeader {
    pub t: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacaoSignature {
    pub t: String,
    pub s: String,
}

/// Composes the full CAIP-122 message text a wallet displays for signing,
/// in the conventional EIP-4361-derived layout.
pub fn compose_message(payload: &CacaoPayload) -> String {
    let mut lines = vec![
        format!("{} wants you to sign in with your account:", payload.domain),
        payload.iss.clone(),
        String::new(),
        payload.statement.clone(),
        String::new(),
        format!("URI: {}", payload.aud),
        format!("Version: {}", payload.version),
        format!("Nonce: {}", payload.nonce),
        format!("Issued At: {}", payload.iat),
    ];
    if !payload.resources.is_empty() {
        lines.push("Resources:".to_string());
        for resource in &payload.resources {
            lines.push(format!("- {resource}"));
        }
    }
    lines.join("\n")
}

/// Builds the CACAO payload for a registration request. `aud` is the
/// relying party URI (`https://<domain>`), `nonce` a fresh random token.
pub fn build_registration_payload(
    account_caip10: &str,
    domain: &str,
    all_apps: bool,
    nonce: &str,
    iat_rfc3339: &str,
) -> CacaoPayload {
    CacaoPayload {
        domain: domain.to_string(),
        iss: did_pkh(account_caip10),
        statement: statement_text(all_apps, domain),
        aud: format!("https://{domain}"),
        version: "1".to_string(),
        nonce: nonce.to_string(),
        iat: iat_rfc3339.to_string(),
        resources: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_differs_by_all_apps_flag() {
        let scoped = statement_text(false, "example.com");
        let all = statement_text(true, "example.com");
        assert_ne!(scoped, all);
        assert!(scoped.contains("example.com"));
    }

    #[test]
    fn recognizes_recap_shorthand() {
        assert!(is_recap_statement("I further authorize... 'manage': 'notifications'"));
        assert!(!is_recap_statement("some unrelated statement"));
    }

    #[test]
    fn compose_message_includes_statement_and_domain() {
        let payload = build_registration_payload(
            "eip155:1:0xabc",
            "example.com",
            false,
            "abc123",
            "2024-01-01T00:00:00Z",
        );
        let message = compose_message(&payload);
        assert!(message.contains("example.com wants you to sign in"));
        assert!(message.contains(&payload.statement));
    }
}
