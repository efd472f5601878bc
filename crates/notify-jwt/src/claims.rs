//! Per-method claim set shapes. All extend [`JwtBasicClaims`]; all `act`
//! tags match the method table in spec.md §4.1.

use serde::{Deserialize, Serialize};

use crate::basic::{JwtBasicClaims, VerifyableClaims};

/// One entry of a server-signed `sbs` (subscriptions) array, the sole input
/// to subscription reconciliation (§4.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSubscription {
    pub app_domain: String,
    pub app_authentication_key: String,
    pub sym_key: String,
    /// Enabled notification type ids; the full [`crate::ScopeMap`] is built
    /// by intersecting this against the dapp's `NotifyConfig`.
    pub scope: Vec<String>,
    pub expiry: i64,
}

macro_rules! impl_verifyable_claims {
    ($ty:ty) => {
        impl VerifyableClaims for $ty {
            fn basic(&self) -> &JwtBasicClaims {
                &self.basic
            }
            fn act(&self) -> &str {
                &self.act
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRequestAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
    pub scp: String,
}
impl_verifyable_claims!(SubscriptionRequestAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionResponseAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
    pub sbs: Vec<ServerSubscription>,
}
impl_verifyable_claims!(SubscriptionResponseAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequestAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
    pub scp: String,
}
impl_verifyable_claims!(UpdateRequestAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateResponseAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
    pub sbs: Vec<ServerSubscription>,
}
impl_verifyable_claims!(UpdateResponseAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequestAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
}
impl_verifyable_claims!(DeleteRequestAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponseAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
    pub sbs: Vec<ServerSubscription>,
}
impl_verifyable_claims!(DeleteResponseAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchSubscriptionsRequestAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
}
impl_verifyable_claims!(WatchSubscriptionsRequestAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchSubscriptionsResponseAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
    pub sbs: Vec<ServerSubscription>,
}
impl_verifyable_claims!(WatchSubscriptionsResponseAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionsChangedAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
    pub sbs: Vec<ServerSubscription>,
}
impl_verifyable_claims!(SubscriptionsChangedAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationBodyAuth {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type")]
    pub notification_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
    pub msg: NotificationBodyAuth,
}
impl_verifyable_claims!(MessageAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponseAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
}
impl_verifyable_claims!(MessageResponseAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetNotificationsRequestAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}
impl_verifyable_claims!(GetNotificationsRequestAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetNotificationsResponseAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
    pub notifications: Vec<NotificationBodyAuth>,
    pub has_more: bool,
}
impl_verifyable_claims!(GetNotificationsResponseAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkNotificationsAsReadRequestAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
    pub ids: Vec<String>,
    pub all: bool,
}
impl_verifyable_claims!(MarkNotificationsAsReadRequestAuth);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkNotificationsAsReadResponseAuth {
    #[serde(flatten)]
    pub basic: JwtBasicClaims,
    pub act: String,
}
impl_verifyable_claims!(MarkNotificationsAsReadResponseAuth);

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    fn basic() -> JwtBasicClaims {
        JwtBasicClaims {
            iss: "did:key:zIssuer".into(),
            aud: "did:key:zDapp".into(),
            sub: "did:pkh:eip155:1:0xabc".into(),
            iat: 1000,
            exp: 1300,
            ksu: "https://keys.walletconnect.com".into(),
            app: Some("did:web:example.com".into()),
        }
    }

    #[test]
    fn subscription_request_round_trips() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let claims = SubscriptionRequestAuth {
            basic: basic(),
            act: "notify_subscription".into(),
            scp: "alerts promotions".into(),
        };
        let token = claims.encode(&signing_key).unwrap();
        assert_eq!(SubscriptionRequestAuth::try_from_str(&token).unwrap(), claims);
    }

    #[test]
    fn mark_read_request_carries_all_flag() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let claims = MarkNotificationsAsReadRequestAuth {
            basic: basic(),
            act: "notify_mark_notifications_as_read".into(),
            ids: vec![],
            all: true,
        };
        let token = claims.encode(&signing_key).unwrap();
        let decoded = MarkNotificationsAsReadRequestAuth::try_from_str(&token).unwrap();
        assert!(decoded.all);
        assert!(decoded.ids.is_empty());
    }
}
