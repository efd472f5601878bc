use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A CAIP-10 blockchain account identifier: `namespace:reference:address`.
///
/// Immutable once chosen as the subject of a registration; the engine never
/// mutates an `Account` in place, only replaces the identity bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Account {
    namespace: String,
    reference: String,
    address: String,
}

impl Account {
    pub fn new(
        namespace: impl Into<String>,
        reference: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            reference: reference.into(),
            address: address.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// The `namespace:reference:address` CAIP-10 string.
    pub fn as_caip10(&self) -> String {
        format!("{}:{}:{}", self.namespace, self.reference, self.address)
    }

    /// `did:pkh:<caip10>`, the subject encoding used inside every JWT.
    pub fn as_did_pkh(&self) -> String {
        format!("did:pkh:{}", self.as_caip10())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_caip10())
    }
}

impl FromStr for Account {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(namespace), Some(reference), Some(address)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::InvalidAccount(s.to_string()));
        };
        if namespace.is_empty() || reference.is_empty() || address.is_empty() {
            return Err(Error::InvalidAccount(s.to_string()));
        }
        Ok(Self::new(namespace, reference, address))
    }
}

impl TryFrom<String> for Account {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Account> for String {
    fn from(account: Account) -> Self {
        account.as_caip10()
    }
}

impl Account {
    /// Parse a `did:pkh:namespace:reference:address` subject back into an
    /// account, the inverse of [`Account::as_did_pkh`].
    pub fn from_did_pkh(did: &str) -> Result<Self, Error> {
        let caip10 = did
            .strip_prefix("did:pkh:")
            .ok_or_else(|| Error::InvalidAccount(did.to_string()))?;
        caip10.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_did_pkh() {
        let account = Account::new("eip155", "1", "0xabc123");
        let did = account.as_did_pkh();
        assert_eq!(did, "did:pkh:eip155:1:0xabc123");
        assert_eq!(Account::from_did_pkh(&did).unwrap(), account);
    }

    #[test]
    fn rejects_malformed_caip10() {
        assert!("eip155:1".parse::<Account>().is_err());
        assert!("eip155::0xabc".parse::<Account>().is_err());
    }
}
