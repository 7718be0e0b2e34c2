// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use cadastro_api::{Client, EntityKind};
use cadastro_app::{
    Company, CompanyId, Contact, ContactId, DuplicateFields, FormPayload, JobRole, PostalAddress,
    RecordStatus, RegistryCompany, RoleId, Sector, SectorId, SignInInput, SummaryCounts, TabKind,
    UniquenessQuery, digits_only,
};
use cadastro_testkit::{DemoData, demo_data};
use cadastro_tui::{
    AppRuntime, InternalEvent, TabSnapshot, UniquenessEvent, UniquenessField,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;

fn entity_kind_for(tab: TabKind) -> Result<EntityKind> {
    match tab {
        TabKind::Dashboard => bail!("dashboard rows have no backing records"),
        TabKind::Contacts => Ok(EntityKind::Contact),
        TabKind::Companies => Ok(EntityKind::Company),
        TabKind::Sectors => Ok(EntityKind::Sector),
        TabKind::Roles => Ok(EntityKind::Role),
    }
}

fn summarize(
    contacts: &[Contact],
    companies: &[Company],
    sectors: &[Sector],
    roles: &[JobRole],
) -> SummaryCounts {
    SummaryCounts {
        contacts_active: contacts.iter().filter(|row| row.status.is_active()).count(),
        contacts_inactive: contacts.iter().filter(|row| !row.status.is_active()).count(),
        companies_active: companies.iter().filter(|row| row.status.is_active()).count(),
        companies_inactive: companies
            .iter()
            .filter(|row| !row.status.is_active())
            .count(),
        sectors_active: sectors.iter().filter(|row| row.status.is_active()).count(),
        roles_active: roles.iter().filter(|row| row.status.is_active()).count(),
    }
}

/// Production runtime: every operation goes through the HTTP client. The
/// remembered sign-in email lives in a small file next to the config, the
/// terminal stand-in for the browser's local storage.
pub struct ApiRuntime {
    client: Client,
    lookup_enabled: bool,
    remembered_path: PathBuf,
}

impl ApiRuntime {
    pub fn new(client: Client, lookup_enabled: bool, remembered_path: PathBuf) -> Self {
        Self {
            client,
            lookup_enabled,
            remembered_path,
        }
    }
}

impl AppRuntime for ApiRuntime {
    fn load_summary(&mut self) -> Result<SummaryCounts> {
        let contacts = self.client.list_contacts()?;
        let companies = self.client.list_companies()?;
        let sectors = self.client.list_sectors()?;
        let roles = self.client.list_roles()?;
        Ok(summarize(&contacts, &companies, &sectors, &roles))
    }

    fn load_tab_snapshot(&mut self, tab: TabKind) -> Result<Option<TabSnapshot>> {
        Ok(match tab {
            TabKind::Dashboard => None,
            TabKind::Contacts => Some(TabSnapshot::Contacts(self.client.list_contacts()?)),
            TabKind::Companies => Some(TabSnapshot::Companies(self.client.list_companies()?)),
            TabKind::Sectors => Some(TabSnapshot::Sectors(self.client.list_sectors()?)),
            TabKind::Roles => Some(TabSnapshot::Roles(self.client.list_roles()?)),
        })
    }

    fn load_companies(&mut self) -> Result<Vec<Company>> {
        self.client.list_companies()
    }

    fn load_sectors(&mut self) -> Result<Vec<Sector>> {
        self.client.list_sectors()
    }

    fn load_roles(&mut self) -> Result<Vec<JobRole>> {
        self.client.list_roles()
    }

    fn remembered_email(&mut self) -> Option<String> {
        let raw = fs::read_to_string(&self.remembered_path).ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    }

    fn sign_in(&mut self, input: &SignInInput) -> Result<String> {
        let operator = self.client.sign_in(input.email.trim(), &input.password)?;
        // best effort, like local storage: a failed write never blocks the session
        if input.remember {
            let _ = fs::write(&self.remembered_path, input.email.trim());
        } else {
            let _ = fs::remove_file(&self.remembered_path);
        }
        Ok(operator)
    }

    fn submit_form(&mut self, payload: &FormPayload) -> Result<()> {
        payload.validate()?;
        self.client.save_record(payload)
    }

    fn toggle_status(&mut self, tab: TabKind, id: i64, desired: bool) -> Result<RecordStatus> {
        self.client.toggle_status(entity_kind_for(tab)?, id, desired)
    }

    fn delete_record(&mut self, tab: TabKind, id: i64) -> Result<()> {
        if tab != TabKind::Contacts {
            bail!("delete is only available for contacts");
        }
        self.client.delete_contact(ContactId::new(id))
    }

    fn check_uniqueness(&mut self, query: &UniquenessQuery) -> Result<DuplicateFields> {
        self.client.check_uniqueness(query)
    }

    fn spawn_uniqueness_check(
        &mut self,
        request_id: u64,
        field: UniquenessField,
        query: UniquenessQuery,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        thread::spawn(move || {
            let event = match client.check_uniqueness(&query) {
                Ok(duplicates) => InternalEvent::Uniqueness(UniquenessEvent::Completed {
                    request_id,
                    field,
                    duplicates,
                }),
                Err(error) => InternalEvent::Uniqueness(UniquenessEvent::Failed {
                    request_id,
                    field,
                    error: error.to_string(),
                }),
            };
            let _ = tx.send(event);
        });
        Ok(())
    }

    fn company_registry_lookup(&mut self, document: &str) -> Result<Option<RegistryCompany>> {
        if !self.lookup_enabled {
            return Ok(None);
        }
        self.client.company_registry_lookup(document)
    }

    fn postal_lookup(&mut self, code: &str) -> Result<Option<PostalAddress>> {
        if !self.lookup_enabled {
            return Ok(None);
        }
        self.client.postal_lookup(code)
    }

    fn import_records(&mut self, path: &Path) -> Result<String> {
        let bytes =
            fs::read(path).with_context(|| format!("read import file {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("import.csv");
        self.client.import_records(file_name, bytes)
    }
}

/// Fully local runtime backed by the fixture data set; toggles, saves,
/// and duplicate checks run against memory.
pub struct DemoRuntime {
    data: DemoData,
}

impl DemoRuntime {
    pub fn new(seed: u64) -> Self {
        Self {
            data: demo_data(seed),
        }
    }

    fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
        ids.max().unwrap_or(0) + 1
    }
}

impl AppRuntime for DemoRuntime {
    fn load_summary(&mut self) -> Result<SummaryCounts> {
        Ok(summarize(
            &self.data.contacts,
            &self.data.companies,
            &self.data.sectors,
            &self.data.roles,
        ))
    }

    fn load_tab_snapshot(&mut self, tab: TabKind) -> Result<Option<TabSnapshot>> {
        Ok(match tab {
            TabKind::Dashboard => None,
            TabKind::Contacts => Some(TabSnapshot::Contacts(self.data.contacts.clone())),
            TabKind::Companies => Some(TabSnapshot::Companies(self.data.companies.clone())),
            TabKind::Sectors => Some(TabSnapshot::Sectors(self.data.sectors.clone())),
            TabKind::Roles => Some(TabSnapshot::Roles(self.data.roles.clone())),
        })
    }

    fn load_companies(&mut self) -> Result<Vec<Company>> {
        Ok(self.data.companies.clone())
    }

    fn load_sectors(&mut self) -> Result<Vec<Sector>> {
        Ok(self.data.sectors.clone())
    }

    fn load_roles(&mut self) -> Result<Vec<JobRole>> {
        Ok(self.data.roles.clone())
    }

    fn remembered_email(&mut self) -> Option<String> {
        None
    }

    fn sign_in(&mut self, input: &SignInInput) -> Result<String> {
        input.validate()?;
        Ok(input
            .email
            .split('@')
            .next()
            .unwrap_or("operator")
            .to_owned())
    }

    fn submit_form(&mut self, payload: &FormPayload) -> Result<()> {
        payload.validate()?;
        match payload {
            FormPayload::Contact(form) => match form.id {
                Some(id) => {
                    let Some(contact) =
                        self.data.contacts.iter_mut().find(|row| row.id == id)
                    else {
                        bail!("contact {} not found", id.get());
                    };
                    contact.full_name = form.full_name.clone();
                    contact.email = form.email.clone();
                    contact.phone = digits_only(&form.phone);
                    contact.company_id = form.company_id;
                    contact.sector_id = form.sector_id;
                    contact.role_id = form.role_id;
                    contact.status = RecordStatus::from_flag(form.active);
                }
                None => {
                    let id = Self::next_id(self.data.contacts.iter().map(|row| row.id.get()));
                    self.data.contacts.push(Contact {
                        id: ContactId::new(id),
                        full_name: form.full_name.clone(),
                        email: form.email.clone(),
                        phone: digits_only(&form.phone),
                        company_id: form.company_id,
                        sector_id: form.sector_id,
                        role_id: form.role_id,
                        status: RecordStatus::from_flag(form.active),
                        created_on: None,
                    });
                }
            },
            FormPayload::Company(form) => match form.id {
                Some(id) => {
                    let Some(company) =
                        self.data.companies.iter_mut().find(|row| row.id == id)
                    else {
                        bail!("company {} not found", id.get());
                    };
                    company.legal_name = form.legal_name.clone();
                    company.trade_name = form.trade_name.clone();
                    company.person = form.person;
                    company.document = digits_only(&form.document);
                    company.state_registration = form.state_registration.clone();
                    company.municipal_registration = form.municipal_registration.clone();
                    company.postal_code = digits_only(&form.postal_code);
                    company.street = form.street.clone();
                    company.district = form.district.clone();
                    company.city = form.city.clone();
                    company.state = form.state.clone();
                    company.status = RecordStatus::from_flag(form.active);
                }
                None => {
                    let id = Self::next_id(self.data.companies.iter().map(|row| row.id.get()));
                    self.data.companies.push(Company {
                        id: CompanyId::new(id),
                        legal_name: form.legal_name.clone(),
                        trade_name: form.trade_name.clone(),
                        person: form.person,
                        document: digits_only(&form.document),
                        state_registration: form.state_registration.clone(),
                        municipal_registration: form.municipal_registration.clone(),
                        postal_code: digits_only(&form.postal_code),
                        street: form.street.clone(),
                        district: form.district.clone(),
                        city: form.city.clone(),
                        state: form.state.clone(),
                        status: RecordStatus::from_flag(form.active),
                        created_on: None,
                    });
                }
            },
            FormPayload::Sector(form) => match form.id {
                Some(id) => {
                    let Some(sector) = self.data.sectors.iter_mut().find(|row| row.id == id)
                    else {
                        bail!("sector {} not found", id.get());
                    };
                    sector.name = form.name.clone();
                    sector.status = RecordStatus::from_flag(form.active);
                }
                None => {
                    let id = Self::next_id(self.data.sectors.iter().map(|row| row.id.get()));
                    self.data.sectors.push(Sector {
                        id: SectorId::new(id),
                        name: form.name.clone(),
                        status: RecordStatus::from_flag(form.active),
                    });
                }
            },
            FormPayload::Role(form) => match form.id {
                Some(id) => {
                    let Some(role) = self.data.roles.iter_mut().find(|row| row.id == id) else {
                        bail!("role {} not found", id.get());
                    };
                    role.name = form.name.clone();
                    role.sector_id = form.sector_id;
                    role.position_index = form.position_index;
                    role.status = RecordStatus::from_flag(form.active);
                }
                None => {
                    let id = Self::next_id(self.data.roles.iter().map(|row| row.id.get()));
                    self.data.roles.push(JobRole {
                        id: RoleId::new(id),
                        name: form.name.clone(),
                        sector_id: form.sector_id,
                        position_index: form.position_index,
                        status: RecordStatus::from_flag(form.active),
                    });
                }
            },
        }
        Ok(())
    }

    fn toggle_status(&mut self, tab: TabKind, id: i64, desired: bool) -> Result<RecordStatus> {
        let status = RecordStatus::from_flag(desired);
        let found = match tab {
            TabKind::Dashboard => false,
            TabKind::Contacts => self
                .data
                .contacts
                .iter_mut()
                .find(|row| row.id.get() == id)
                .map(|row| row.status = status)
                .is_some(),
            TabKind::Companies => self
                .data
                .companies
                .iter_mut()
                .find(|row| row.id.get() == id)
                .map(|row| row.status = status)
                .is_some(),
            TabKind::Sectors => self
                .data
                .sectors
                .iter_mut()
                .find(|row| row.id.get() == id)
                .map(|row| row.status = status)
                .is_some(),
            TabKind::Roles => self
                .data
                .roles
                .iter_mut()
                .find(|row| row.id.get() == id)
                .map(|row| row.status = status)
                .is_some(),
        };
        if !found {
            bail!("record {id} not found");
        }
        Ok(status)
    }

    fn delete_record(&mut self, tab: TabKind, id: i64) -> Result<()> {
        if tab != TabKind::Contacts {
            bail!("delete is only available for contacts");
        }
        let before = self.data.contacts.len();
        self.data.contacts.retain(|row| row.id.get() != id);
        if self.data.contacts.len() == before {
            bail!("contact {id} not found");
        }
        Ok(())
    }

    fn check_uniqueness(&mut self, query: &UniquenessQuery) -> Result<DuplicateFields> {
        let mut duplicates = DuplicateFields::default();
        if let Some(email) = &query.email {
            duplicates.email = self.data.contacts.iter().any(|row| {
                row.email.eq_ignore_ascii_case(email) && Some(row.id.get()) != query.record_id
            });
        }
        if let Some(phone) = &query.phone {
            let needle = digits_only(phone);
            duplicates.phone = self.data.contacts.iter().any(|row| {
                digits_only(&row.phone) == needle && Some(row.id.get()) != query.record_id
            });
        }
        if let Some(document) = &query.document {
            let needle = digits_only(document);
            duplicates.document = self.data.companies.iter().any(|row| {
                row.document == needle && Some(row.id.get()) != query.record_id
            });
        }
        Ok(duplicates)
    }

    fn company_registry_lookup(&mut self, _document: &str) -> Result<Option<RegistryCompany>> {
        Ok(None)
    }

    fn postal_lookup(&mut self, _code: &str) -> Result<Option<PostalAddress>> {
        Ok(None)
    }

    fn import_records(&mut self, _path: &Path) -> Result<String> {
        bail!("import requires the API backend; run without --demo")
    }
}
