/// Closed value sets shared by the API, the CSV importer and the store.
///
/// Every set is stored and transmitted as its display string ("Bug Fix",
/// "Under Review", ...). Parsing is an exact, case-sensitive match so the
/// database CHECK constraints and request validation agree.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Error returned when a string is not a member of a value set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {set}")]
pub struct UnknownValue {
    pub set: &'static str,
    pub value: String,
}

macro_rules! value_set {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownValue { set: $label, value: other.to_string() }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

value_set! {
    /// Kind of change being requested
    RequestType, "request type" {
        NewFeature => "New Feature",
        Enhancement => "Enhancement",
        BugFix => "Bug Fix",
        Integration => "Integration",
    }
}

value_set! {
    /// Product area the request targets
    ProductArea, "product area" {
        WebPortal => "Web Portal",
        MobileApp => "Mobile App",
        Reporting => "Reporting",
        Api => "API",
        Infrastructure => "Infrastructure",
        Other => "Other",
    }
}

value_set! {
    /// How strongly the requestor wants the change
    DesireLevel, "desire level" {
        NiceToHave => "Nice to Have",
        ShouldHave => "Should Have",
        MustHave => "Must Have",
    }
}

value_set! {
    Difficulty, "difficulty" {
        Easy => "Easy",
        Medium => "Medium",
        Hard => "Hard",
        VeryHard => "Very Hard",
    }
}

value_set! {
    /// One entry of the multi-select "who benefits" field
    Beneficiary, "beneficiary" {
        Customers => "Customers",
        InternalStaff => "Internal Staff",
        Partners => "Partners",
        Administrators => "Administrators",
    }
}

value_set! {
    /// Workflow status. New requests start as `Submitted`.
    #[derive(Default)]
    Status, "status" {
        #[default]
        Submitted => "Submitted",
        UnderReview => "Under Review",
        Accepted => "Accepted",
        InDevelopment => "In Development",
        Completed => "Completed",
        Denied => "Denied",
    }
}

value_set! {
    #[derive(Default)]
    Priority, "priority" {
        Low => "Low",
        #[default]
        Medium => "Medium",
        High => "High",
        Critical => "Critical",
    }
}

/// Ordered "who benefits" selection, stored as `"Customers, Partners"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beneficiaries(Vec<Beneficiary>);

impl Beneficiaries {
    /// Parse a comma-separated selection. Pieces are trimmed and empty
    /// pieces dropped; on failure the error carries only the invalid pieces
    /// in input order. An input with no pieces at all is rejected with an
    /// empty list.
    pub fn parse(raw: &str) -> Result<Self, Vec<String>> {
        let mut selected = Vec::new();
        let mut invalid = Vec::new();

        for piece in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match piece.parse::<Beneficiary>() {
                Ok(b) => selected.push(b),
                Err(_) => invalid.push(piece.to_string()),
            }
        }

        if !invalid.is_empty() || selected.is_empty() {
            return Err(invalid);
        }
        Ok(Self(selected))
    }

    pub fn as_slice(&self) -> &[Beneficiary] {
        &self.0
    }
}

impl From<Vec<Beneficiary>> for Beneficiaries {
    fn from(values: Vec<Beneficiary>) -> Self {
        Self(values)
    }
}

impl fmt::Display for Beneficiaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(Beneficiary::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}

impl Serialize for Beneficiaries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Beneficiaries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Beneficiaries::parse(&raw).map_err(|invalid| {
            if invalid.is_empty() {
                serde::de::Error::custom("at least one beneficiary is required")
            } else {
                serde::de::Error::custom(format!("invalid beneficiaries: {}", invalid.join(", ")))
            }
        })
    }
}
