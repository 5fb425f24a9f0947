//! Branded ID newtypes for type safety.
//!
//! Every entity the dashboard deals with has a distinct ID type implemented
//! as a newtype wrapper around `String`. IDs are minted by the server, so
//! there is no generator here; the client only carries them around. This
//! prevents accidentally looking up a call by a conversation ID.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string value.
            #[must_use]
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

branded_id!(
    /// Identifier of a phone call.
    CallId
);
branded_id!(
    /// Identifier of a conversation attached to a call.
    ConversationId
);
branded_id!(
    /// Identifier of a single conversation message.
    MessageId
);
branded_id!(
    /// Identifier of a dashboard user.
    UserId
);
branded_id!(
    /// Identifier of the tenant (customer account) a user belongs to.
    TenantId
);
