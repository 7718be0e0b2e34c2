// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::masks::{digits_only, validate_person_document};
use crate::{CompanyId, ContactId, FormKind, JobRole, PersonKind, RoleId, SectorId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactFormInput {
    pub id: Option<ContactId>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub company_id: CompanyId,
    pub sector_id: SectorId,
    pub role_id: RoleId,
    pub password: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyFormInput {
    pub id: Option<CompanyId>,
    pub person: PersonKind,
    pub legal_name: String,
    pub trade_name: String,
    pub document: String,
    pub state_registration: String,
    pub municipal_registration: String,
    pub postal_code: String,
    pub street: String,
    pub district: String,
    pub city: String,
    pub state: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorFormInput {
    pub id: Option<SectorId>,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFormInput {
    pub id: Option<RoleId>,
    pub name: String,
    pub sector_id: SectorId,
    pub position_index: Option<i32>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPayload {
    Contact(ContactFormInput),
    Company(Box<CompanyFormInput>),
    Sector(SectorFormInput),
    Role(RoleFormInput),
}

impl FormPayload {
    pub fn kind(&self) -> FormKind {
        match self {
            Self::Contact(_) => FormKind::Contact,
            Self::Company(_) => FormKind::Company,
            Self::Sector(_) => FormKind::Sector,
            Self::Role(_) => FormKind::Role,
        }
    }

    pub fn blank_for(kind: FormKind) -> Self {
        match kind {
            FormKind::Contact => Self::Contact(ContactFormInput {
                id: None,
                full_name: String::new(),
                email: String::new(),
                phone: String::new(),
                company_id: CompanyId::new(0),
                sector_id: SectorId::new(0),
                role_id: RoleId::new(0),
                password: String::new(),
                active: true,
            }),
            FormKind::Company => Self::Company(Box::new(CompanyFormInput {
                id: None,
                person: PersonKind::Legal,
                legal_name: String::new(),
                trade_name: String::new(),
                document: String::new(),
                state_registration: String::new(),
                municipal_registration: String::new(),
                postal_code: String::new(),
                street: String::new(),
                district: String::new(),
                city: String::new(),
                state: String::new(),
                active: true,
            })),
            FormKind::Sector => Self::Sector(SectorFormInput {
                id: None,
                name: String::new(),
                active: true,
            }),
            FormKind::Role => Self::Role(RoleFormInput {
                id: None,
                name: String::new(),
                sector_id: SectorId::new(0),
                position_index: None,
                active: true,
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Contact(contact) => contact.validate(),
            Self::Company(company) => company.validate(),
            Self::Sector(sector) => sector.validate(),
            Self::Role(role) => role.validate(),
        }
    }
}

impl ContactFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.full_name.trim().is_empty() {
            bail!("contact name is required -- enter a full name and retry");
        }
        if self.email.trim().is_empty() {
            bail!("contact email is required -- enter an email and retry");
        }
        if !email_is_valid(&self.email) {
            bail!("contact email is not a valid address");
        }
        if self.company_id.get() <= 0 {
            bail!("contact company is required -- choose a company and retry");
        }
        if self.sector_id.get() <= 0 {
            bail!("contact sector is required -- choose a sector and retry");
        }
        if self.role_id.get() <= 0 {
            bail!("contact role is required -- choose a role and retry");
        }
        let phone_digits = digits_only(&self.phone);
        if !phone_digits.is_empty() && !(10..=11).contains(&phone_digits.len()) {
            bail!("contact phone must have 10 or 11 digits");
        }
        if self.id.is_none() && self.password.chars().count() < 6 {
            bail!("contact password must have at least 6 characters");
        }
        Ok(())
    }
}

impl CompanyFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.legal_name.trim().is_empty() {
            bail!("company legal name is required -- enter it and retry");
        }
        if self.trade_name.trim().is_empty() {
            bail!("company trade name is required -- enter it and retry");
        }
        let document_digits = digits_only(&self.document);
        match self.person {
            PersonKind::Natural => {
                if !validate_person_document(&document_digits) {
                    bail!("company document is not a valid person document");
                }
            }
            PersonKind::Legal => {
                if document_digits.len() != 14 {
                    bail!("company document must have 14 digits for a legal entity");
                }
            }
        }
        let postal_digits = digits_only(&self.postal_code);
        if !postal_digits.is_empty() && postal_digits.len() != 8 {
            bail!("company postal code must have 8 digits");
        }
        Ok(())
    }
}

impl SectorFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("sector name is required -- enter a name and retry");
        }
        Ok(())
    }
}

impl RoleFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("role name is required -- enter a name and retry");
        }
        if self.sector_id.get() <= 0 {
            bail!("role sector is required -- choose a sector and retry");
        }
        if let Some(index) = self.position_index
            && index < 0
        {
            bail!("role ordering index cannot be negative");
        }
        Ok(())
    }
}

/// The selected role must belong to the selected sector; checked against
/// the loaded role list before submission.
pub fn role_matches_sector(roles: &[JobRole], role_id: RoleId, sector_id: SectorId) -> bool {
    roles
        .iter()
        .find(|role| role.id == role_id)
        .is_some_and(|role| role.sector_id == sector_id)
}

pub fn email_is_valid(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.split_once('.').is_some_and(|(head, tail)| {
            !head.is_empty() && !tail.is_empty() && !tail.ends_with('.')
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
    pub remember: bool,
}

impl SignInInput {
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            bail!("email is required");
        }
        if !email_is_valid(&self.email) {
            bail!("email is not a valid address");
        }
        if self.password.is_empty() {
            bail!("password is required");
        }
        if self.password.chars().count() < 6 {
            bail!("password must have at least 6 characters");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        }
    }
}

/// Six criteria, two points bands: <=2 weak, <=4 medium, else strong.
pub fn password_strength(password: &str) -> (PasswordStrength, Vec<&'static str>) {
    let mut score = 0u8;
    let mut met = Vec::new();
    let length = password.chars().count();

    if length >= 8 {
        score += 1;
        met.push("8+ characters");
    }
    if length >= 12 {
        score += 1;
        met.push("12+ characters");
    }
    if password.chars().any(|ch| ch.is_ascii_lowercase()) {
        score += 1;
        met.push("lowercase");
    }
    if password.chars().any(|ch| ch.is_ascii_uppercase()) {
        score += 1;
        met.push("uppercase");
    }
    if password.chars().any(|ch| ch.is_ascii_digit()) {
        score += 1;
        met.push("digits");
    }
    if password.chars().any(|ch| !ch.is_ascii_alphanumeric()) {
        score += 1;
        met.push("symbols");
    }

    let level = if score <= 2 {
        PasswordStrength::Weak
    } else if score <= 4 {
        PasswordStrength::Medium
    } else {
        PasswordStrength::Strong
    };
    (level, met)
}

/// Payload of the duplicate pre-check. Only populated fields are examined
/// by the backend; `record_id` excludes the record being edited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniquenessQuery {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub record_id: Option<i64>,
}

impl UniquenessQuery {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none() && self.document.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DuplicateFields {
    pub email: bool,
    pub phone: bool,
    pub document: bool,
}

impl DuplicateFields {
    pub const fn any(self) -> bool {
        self.email || self.phone || self.document
    }
}
