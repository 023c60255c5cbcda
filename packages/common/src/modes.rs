#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;

/// How participants get into a contest.
///
/// When the `sea-orm` feature is enabled these enums can be used directly
/// as entity columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationType {
    /// Anyone may self-register while the registration window is open.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "open"))]
    Open,
    /// Self-registration creates an unapproved participant awaiting
    /// organizer approval.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "moderated"))]
    Moderated,
    /// Only organizers add participants.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "closed"))]
    Closed,
}

impl RegistrationType {
    pub fn allows_self_registration(&self) -> bool {
        matches!(self, Self::Open | Self::Moderated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Moderated => "moderated",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for RegistrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether participants are single users or teams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationMode {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "individual"))]
    Individual,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "team"))]
    Team,
}

impl ParticipationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Team => "team",
        }
    }
}

impl fmt::Display for ParticipationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a contest's tasks are presented and ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum TasksGrouping {
    /// Tasks are grouped into ordered categories.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "by_categories"))]
    ByCategories,
    /// A single ordered list of tasks.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "one_by_one"))]
    OneByOne,
}

impl TasksGrouping {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ByCategories => "by_categories",
            Self::OneByOne => "one_by_one",
        }
    }
}

impl fmt::Display for TasksGrouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&TasksGrouping::ByCategories).unwrap(),
            "\"by_categories\""
        );
        let parsed: RegistrationType = serde_json::from_str("\"moderated\"").unwrap();
        assert_eq!(parsed, RegistrationType::Moderated);
    }

    #[test]
    fn self_registration_rules() {
        assert!(RegistrationType::Open.allows_self_registration());
        assert!(RegistrationType::Moderated.allows_self_registration());
        assert!(!RegistrationType::Closed.allows_self_registration());
    }
}
