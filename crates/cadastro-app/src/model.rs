// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::Date;

use crate::ids::*;
use crate::masks::DocumentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Active,
    Inactive,
}

impl RecordStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub const fn from_flag(active: bool) -> Self {
        if active { Self::Active } else { Self::Inactive }
    }

    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Wire codes follow the backend: "F" for a natural person, "J" for a
/// legal entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersonKind {
    Natural,
    Legal,
}

impl PersonKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Natural => "F",
            Self::Legal => "J",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "F" => Some(Self::Natural),
            "J" => Some(Self::Legal),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Natural => "natural person",
            Self::Legal => "legal entity",
        }
    }

    pub const fn document_kind(self) -> DocumentKind {
        match self {
            Self::Natural => DocumentKind::Person,
            Self::Legal => DocumentKind::Organization,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Natural => Self::Legal,
            Self::Legal => Self::Natural,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabKind {
    Dashboard,
    Contacts,
    Companies,
    Sectors,
    Roles,
}

impl TabKind {
    pub const ALL: [Self; 5] = [
        Self::Dashboard,
        Self::Contacts,
        Self::Companies,
        Self::Sectors,
        Self::Roles,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Contacts => "contacts",
            Self::Companies => "companies",
            Self::Sectors => "sectors",
            Self::Roles => "roles",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    Contact,
    Company,
    Sector,
    Role,
}

impl FormKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Company => "company",
            Self::Sector => "sector",
            Self::Role => "role",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub company_id: CompanyId,
    pub sector_id: SectorId,
    pub role_id: RoleId,
    pub status: RecordStatus,
    pub created_on: Option<Date>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub legal_name: String,
    pub trade_name: String,
    pub person: PersonKind,
    pub document: String,
    pub state_registration: String,
    pub municipal_registration: String,
    pub postal_code: String,
    pub street: String,
    pub district: String,
    pub city: String,
    pub state: String,
    pub status: RecordStatus,
    pub created_on: Option<Date>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub name: String,
    pub status: RecordStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRole {
    pub id: RoleId,
    pub name: String,
    pub sector_id: SectorId,
    pub position_index: Option<i32>,
    pub status: RecordStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SummaryCounts {
    pub contacts_active: usize,
    pub contacts_inactive: usize,
    pub companies_active: usize,
    pub companies_inactive: usize,
    pub sectors_active: usize,
    pub roles_active: usize,
}

/// Registry record returned by the organization-document lookup. Only used
/// to pre-fill fields the operator left empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCompany {
    pub legal_name: String,
    pub trade_name: String,
    pub state_registration: String,
    pub municipal_registration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub street: String,
    pub district: String,
    pub city: String,
    pub state: String,
}

#[cfg(test)]
mod tests {
    use super::{PersonKind, RecordStatus, TabKind};
    use crate::masks::DocumentKind;

    #[test]
    fn status_round_trips_and_toggles() {
        assert_eq!(RecordStatus::parse("active"), Some(RecordStatus::Active));
        assert_eq!(
            RecordStatus::parse(RecordStatus::Inactive.as_str()),
            Some(RecordStatus::Inactive)
        );
        assert_eq!(RecordStatus::parse("deleted"), None);
        assert_eq!(RecordStatus::Active.toggled(), RecordStatus::Inactive);
        assert!(RecordStatus::from_flag(true).is_active());
    }

    #[test]
    fn person_kind_wire_codes() {
        assert_eq!(PersonKind::Natural.as_str(), "F");
        assert_eq!(PersonKind::parse("J"), Some(PersonKind::Legal));
        assert_eq!(PersonKind::parse("X"), None);
        assert_eq!(PersonKind::Natural.document_kind(), DocumentKind::Person);
        assert_eq!(
            PersonKind::Legal.document_kind(),
            DocumentKind::Organization
        );
    }

    #[test]
    fn tab_order_starts_at_dashboard() {
        assert_eq!(TabKind::ALL[0], TabKind::Dashboard);
        assert_eq!(TabKind::ALL.len(), 5);
    }
}
