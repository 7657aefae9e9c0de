//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up IDs from different contexts (a broker's order id
//! is not a signal id, even though both are strings on the wire).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier using UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(SignalId, "Unique identifier for a signal configuration.");
define_id!(UserId, "Unique identifier for the owning user.");
define_id!(
    BrokerAccountId,
    "Internal identifier for a linked broker account."
);
define_id!(
    ClientId,
    "Broker-side client code for a trading account (AngelOne clientcode)."
);
define_id!(
    BrokerOrderId,
    "Broker-assigned order id, unique per broker account."
);
define_id!(
    SymbolToken,
    "Broker-specific numeric instrument token (AngelOne symboltoken)."
);
