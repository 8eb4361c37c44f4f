use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh identifier.
            #[must_use]
            pub fn new() -> Self {
                // v7 sorts by creation time, which keeps freshly created records last.
                Self(Uuid::now_v7())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                s.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(d: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(d)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

record_id!(
    /// Identifier of a task record (UUID v7).
    TaskId
);

record_id!(
    /// Identifier of a lead record (UUID v7).
    LeadId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_use_uuid_v7() {
        assert_eq!(TaskId::new().0.get_version_num(), 7);
        assert_eq!(LeadId::new().0.get_version_num(), 7);
    }

    #[test]
    fn parse_trims_surrounding_whitespace() {
        let uuid = Uuid::now_v7();
        let parsed: TaskId = format!("  {uuid}\n")
            .parse()
            .unwrap_or_else(|err| panic!("must parse task id: {err}"));
        assert_eq!(parsed.0, uuid);
    }

    #[test]
    fn lead_id_serializes_as_plain_string() {
        let id = LeadId::new();
        let json = serde_json::to_string(&id).unwrap_or_else(|err| panic!("serialize: {err}"));
        assert_eq!(json, format!("\"{id}\""));
        let back: LeadId =
            serde_json::from_str(&json).unwrap_or_else(|err| panic!("deserialize: {err}"));
        assert_eq!(back, id);
    }
}
