//! Newtype identifiers.
//!
//! Ledger-owned identifiers (`RecordId`, `LineageId`, `TransferBatchId`) are
//! UUIDs minted by this system. Externally-owned references (`StudentId`,
//! `SubjectId`, `InstitutionId`, `ActorId`) are opaque strings issued by the
//! collaborating systems and never interpreted here.

use std::fmt;

use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn value(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

uuid_id!(
    /// Identifier of one immutable ledger record (one version).
    RecordId
);
uuid_id!(
    /// Shared identifier of every version descended from one initial record.
    LineageId
);
uuid_id!(
    /// Identifier shared by all records created in one transfer execution.
    TransferBatchId
);

string_id!(
    /// Reference to a student in the external student registry.
    StudentId
);
string_id!(
    /// Reference to a subject in the external catalogue.
    SubjectId
);
string_id!(
    /// Reference to an institution in the external registry.
    InstitutionId
);
string_id!(
    /// Reference to the user or system that performed an action.
    ActorId
);
