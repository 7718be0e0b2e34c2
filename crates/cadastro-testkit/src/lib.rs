// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use cadastro_app::{
    Company, CompanyId, Contact, ContactId, JobRole, PersonKind, RecordStatus, RoleId, Sector,
    SectorId,
};
use time::{Date, Month};

const FIRST_NAMES: [&str; 16] = [
    "Ana", "Bruno", "Carla", "Diego", "Elisa", "Fabio", "Gabriela", "Heitor", "Isabela", "Joao",
    "Larissa", "Marcos", "Natalia", "Otavio", "Paula", "Rafael",
];
const LAST_NAMES: [&str; 16] = [
    "Almeida", "Barbosa", "Cardoso", "Dias", "Esteves", "Ferreira", "Gomes", "Lima", "Martins",
    "Nogueira", "Oliveira", "Pereira", "Ribeiro", "Santos", "Teixeira", "Vieira",
];
const MAIL_DOMAINS: [&str; 5] = [
    "example.com",
    "corp.example.com",
    "mail.example.org",
    "agency.example.net",
    "office.example.com",
];

const COMPANY_STEMS: [&str; 12] = [
    "Horizonte",
    "Atlas",
    "Vertice",
    "Aurora",
    "Praia Azul",
    "Serra Alta",
    "Nova Era",
    "Delta",
    "Planalto",
    "Mirante",
    "Litoral",
    "Continental",
];
const COMPANY_SECTORS: [&str; 8] = [
    "Comunicacao",
    "Engenharia",
    "Logistica",
    "Consultoria",
    "Tecnologia",
    "Distribuidora",
    "Publicidade",
    "Comercio",
];
const COMPANY_SUFFIXES: [&str; 3] = ["Ltda", "S.A.", "ME"];

const CITIES: [(&str, &str); 8] = [
    ("Sao Paulo", "SP"),
    ("Rio de Janeiro", "RJ"),
    ("Belo Horizonte", "MG"),
    ("Curitiba", "PR"),
    ("Porto Alegre", "RS"),
    ("Recife", "PE"),
    ("Salvador", "BA"),
    ("Florianopolis", "SC"),
];
const DISTRICTS: [&str; 6] = [
    "Centro",
    "Bela Vista",
    "Jardim America",
    "Vila Nova",
    "Boa Viagem",
    "Moema",
];
const STREETS: [&str; 6] = [
    "Avenida Paulista",
    "Rua das Flores",
    "Avenida Atlantica",
    "Rua XV de Novembro",
    "Rua da Aurora",
    "Avenida Beira-Mar",
];

const SECTOR_NAMES: [&str; 6] = [
    "Comercial",
    "Financeiro",
    "Marketing",
    "Operacoes",
    "Recursos Humanos",
    "Tecnologia",
];
const ROLE_NAMES: [&str; 5] = [
    "Assistente",
    "Analista",
    "Coordenador",
    "Gerente",
    "Diretor",
];

const REFERENCE_YEAR: i32 = 2026;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Deterministic registry data: same seed, same records. Sector and role
/// catalogs are fixed; contacts and companies are derived from the pools.
#[derive(Debug, Clone)]
pub struct RegistryFaker {
    rng: DeterministicRng,
}

impl RegistryFaker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: DeterministicRng::new(if seed == 0 { 1 } else { seed }),
        }
    }

    pub fn contact(&mut self, id: i64, company_id: i64, role: &JobRole) -> Contact {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let domain = self.pick(&MAIL_DOMAINS);
        Contact {
            id: ContactId::new(id),
            full_name: format!("{first} {last}"),
            email: format!(
                "{}.{}{}@{domain}",
                first.to_ascii_lowercase(),
                last.to_ascii_lowercase(),
                id,
            ),
            phone: format!(
                "119{:04}{:04}",
                self.rng.int_n(10_000),
                self.rng.int_n(10_000)
            ),
            company_id: CompanyId::new(company_id),
            sector_id: role.sector_id,
            role_id: role.id,
            status: if self.rng.int_n(4) == 0 {
                RecordStatus::Inactive
            } else {
                RecordStatus::Active
            },
            created_on: Some(self.date_in_reference_year()),
        }
    }

    pub fn company(&mut self, id: i64) -> Company {
        let stem = self.pick(&COMPANY_STEMS);
        let trade = self.pick(&COMPANY_SECTORS);
        let suffix = self.pick(&COMPANY_SUFFIXES);
        let (city, state) = CITIES[self.rng.int_n(CITIES.len())];
        let person = if self.rng.int_n(5) == 0 {
            PersonKind::Natural
        } else {
            PersonKind::Legal
        };
        let document = match person {
            PersonKind::Natural => self.person_document(),
            PersonKind::Legal => self.organization_document(),
        };

        Company {
            id: CompanyId::new(id),
            legal_name: format!("{stem} {trade} {suffix}"),
            trade_name: stem.to_owned(),
            person,
            document,
            state_registration: format!("{:09}", self.rng.int_n(999_999_999)),
            municipal_registration: format!("{:07}", self.rng.int_n(9_999_999)),
            postal_code: format!("{:05}{:03}", self.rng.int_n(99_999), self.rng.int_n(999)),
            street: self.pick(&STREETS).to_owned(),
            district: self.pick(&DISTRICTS).to_owned(),
            city: city.to_owned(),
            state: state.to_owned(),
            status: if self.rng.int_n(4) == 0 {
                RecordStatus::Inactive
            } else {
                RecordStatus::Active
            },
            created_on: Some(self.date_in_reference_year()),
        }
    }

    /// 11 digits with valid mod-11 check digits.
    pub fn person_document(&mut self) -> String {
        let mut digits: Vec<u32> = (0..9).map(|_| self.rng.int_n(10) as u32).collect();
        if digits.iter().all(|&digit| digit == digits[0]) {
            digits[0] = (digits[0] + 1) % 10;
        }
        digits.push(mod11_check_digit(&digits));
        digits.push(mod11_check_digit(&digits));
        digits.iter().map(|digit| digit.to_string()).collect()
    }

    /// 14 digits in the headquarters branch form; no checksum is applied
    /// to organization documents anywhere in the client.
    pub fn organization_document(&mut self) -> String {
        format!(
            "{:08}0001{:02}",
            self.rng.int_n(99_999_999),
            self.rng.int_n(100)
        )
    }

    fn pick<'a>(&mut self, pool: &[&'a str]) -> &'a str {
        pool[self.rng.int_n(pool.len())]
    }

    fn date_in_reference_year(&mut self) -> Date {
        let month = Month::try_from(1 + self.rng.int_n(12) as u8).expect("month in range");
        let day = 1 + self.rng.int_n(28) as u8;
        Date::from_calendar_date(REFERENCE_YEAR, month, day).expect("valid fixture date")
    }
}

fn mod11_check_digit(values: &[u32]) -> u32 {
    let top = values.len() as u32 + 1;
    let sum: u32 = values
        .iter()
        .enumerate()
        .map(|(index, &value)| value * (top - index as u32))
        .sum();
    let remainder = sum % 11;
    if remainder < 2 { 0 } else { 11 - remainder }
}

pub fn sector_catalog() -> Vec<Sector> {
    SECTOR_NAMES
        .iter()
        .enumerate()
        .map(|(index, name)| Sector {
            id: SectorId::new(index as i64 + 1),
            name: (*name).to_owned(),
            status: RecordStatus::Active,
        })
        .collect()
}

/// Every sector gets the full role ladder; ids are stable across runs.
pub fn role_catalog(sectors: &[Sector]) -> Vec<JobRole> {
    let mut roles = Vec::with_capacity(sectors.len() * ROLE_NAMES.len());
    for sector in sectors {
        for (index, name) in ROLE_NAMES.iter().enumerate() {
            roles.push(JobRole {
                id: RoleId::new((sector.id.get() - 1) * ROLE_NAMES.len() as i64 + index as i64 + 1),
                name: (*name).to_owned(),
                sector_id: sector.id,
                position_index: Some(index as i32 + 1),
                status: RecordStatus::Active,
            });
        }
    }
    roles
}

#[derive(Debug, Clone)]
pub struct DemoData {
    pub contacts: Vec<Contact>,
    pub companies: Vec<Company>,
    pub sectors: Vec<Sector>,
    pub roles: Vec<JobRole>,
}

pub fn demo_data(seed: u64) -> DemoData {
    let mut faker = RegistryFaker::new(seed);
    let sectors = sector_catalog();
    let roles = role_catalog(&sectors);

    let companies: Vec<Company> = (1..=12).map(|id| faker.company(id)).collect();
    let contacts: Vec<Contact> = (1..=40)
        .map(|id| {
            let company_id = companies[(id as usize - 1) % companies.len()].id.get();
            let role = &roles[(id as usize * 7) % roles.len()];
            faker.contact(id, company_id, role)
        })
        .collect();

    DemoData {
        contacts,
        companies,
        sectors,
        roles,
    }
}
