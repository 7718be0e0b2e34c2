// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::blocking::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::Date;
use time::macros::format_description;
use url::Url;

use cadastro_app::{
    Company, CompanyId, Contact, ContactId, DuplicateFields, FormPayload, JobRole, PersonKind,
    PostalAddress, RecordStatus, RegistryCompany, RoleId, Sector, SectorId, UniquenessQuery,
    digits_only,
};

const DEFAULT_POSTAL_BASE_URL: &str = "https://viacep.com.br";

/// Backend entity addressed by per-record endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Contact,
    Company,
    Sector,
    Role,
}

impl EntityKind {
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Contact => "contatos",
            Self::Company => "clientes",
            Self::Sector => "setores",
            Self::Role => "cargos",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    postal_base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty");
        }
        Url::parse(&base_url)
            .with_context(|| format!("server.base_url {base_url:?} is not a valid URL"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            postal_base_url: DEFAULT_POSTAL_BASE_URL.to_owned(),
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_postal_base_url(&mut self, base_url: &str) -> Result<()> {
        let trimmed = base_url.trim_end_matches('/');
        Url::parse(trimmed)
            .with_context(|| format!("lookup.postal_base_url {trimmed:?} is not a valid URL"))?;
        self.postal_base_url = trimmed.to_owned();
        Ok(())
    }

    /// Startup reachability check; the sector list is the smallest
    /// collection the backend serves.
    pub fn ping(&self) -> Result<()> {
        self.list_sectors().map(|_| ())
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/api/login", self.base_url))
            .json(&SignInRequest {
                email,
                senha: password,
            })
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: SignInResponse = response.json().context("decode sign-in response")?;
        if !parsed.success {
            bail!(
                "sign-in rejected: {}",
                parsed.error.as_deref().unwrap_or("invalid credentials")
            );
        }
        Ok(parsed.nome.unwrap_or_else(|| email.to_owned()))
    }

    pub fn list_contacts(&self) -> Result<Vec<Contact>> {
        let rows: Vec<ContactRow> = self.fetch_list("contatos")?;
        rows.into_iter().map(ContactRow::into_model).collect()
    }

    pub fn list_companies(&self) -> Result<Vec<Company>> {
        let rows: Vec<CompanyRow> = self.fetch_list("clientes")?;
        rows.into_iter().map(CompanyRow::into_model).collect()
    }

    pub fn list_sectors(&self) -> Result<Vec<Sector>> {
        let rows: Vec<SectorRow> = self.fetch_list("setores")?;
        Ok(rows.into_iter().map(SectorRow::into_model).collect())
    }

    pub fn list_roles(&self) -> Result<Vec<JobRole>> {
        let rows: Vec<RoleRow> = self.fetch_list("cargos")?;
        Ok(rows.into_iter().map(RoleRow::into_model).collect())
    }

    /// Creates or updates a record: POST to the collection for new
    /// records, PUT to the record URL when an id is present.
    pub fn save_record(&self, payload: &FormPayload) -> Result<()> {
        let (segment, record_id, body) = match payload {
            FormPayload::Contact(form) => {
                let mut body = serde_json::json!({
                    "nome_completo": form.full_name,
                    "email": form.email,
                    "telefone": form.phone,
                    "cliente_id": form.company_id.get(),
                    "setor_id": form.sector_id.get(),
                    "cargo_id": form.role_id.get(),
                    "status": form.active,
                });
                if form.id.is_none() {
                    body["senha"] = serde_json::json!(form.password);
                }
                ("contatos", form.id.map(ContactId::get), body)
            }
            FormPayload::Company(form) => (
                "clientes",
                form.id.map(CompanyId::get),
                serde_json::json!({
                    "razao_social": form.legal_name,
                    "nome_fantasia": form.trade_name,
                    "pessoa": form.person.as_str(),
                    "cnpj": form.document,
                    "inscricao_estadual": form.state_registration,
                    "inscricao_municipal": form.municipal_registration,
                    "cep": form.postal_code,
                    "logradouro": form.street,
                    "bairro": form.district,
                    "cidade": form.city,
                    "uf": form.state,
                    "status": form.active,
                }),
            ),
            FormPayload::Sector(form) => (
                "setores",
                form.id.map(SectorId::get),
                serde_json::json!({
                    "display": form.name,
                    "status": form.active,
                }),
            ),
            FormPayload::Role(form) => (
                "cargos",
                form.id.map(RoleId::get),
                serde_json::json!({
                    "descricao": form.name,
                    "setor_id": form.sector_id.get(),
                    "indice": form.position_index,
                    "status": form.active,
                }),
            ),
        };

        let request = match record_id {
            Some(id) => self
                .http
                .put(format!("{}/api/{segment}/{id}", self.base_url)),
            None => self.http.post(format!("{}/api/{segment}", self.base_url)),
        };
        let response = request
            .json(&body)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: AckResponse = response.json().context("decode save response")?;
        if !parsed.success {
            bail!(
                "save rejected: {}",
                parsed.error.as_deref().unwrap_or("unknown server error")
            );
        }
        Ok(())
    }

    /// Flips the record's active flag. The status echoed by the server is
    /// authoritative for the row patch, not the requested value.
    pub fn toggle_status(&self, kind: EntityKind, id: i64, desired: bool) -> Result<RecordStatus> {
        let response = self
            .http
            .post(format!(
                "{}/api/{}/{}/toggle-status",
                self.base_url,
                kind.path_segment(),
                id
            ))
            .form(&[("status", if desired { "true" } else { "false" })])
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: ToggleResponse = response.json().context("decode toggle response")?;
        if !parsed.success {
            bail!(
                "toggle rejected: {}",
                parsed.error.as_deref().unwrap_or("unknown server error")
            );
        }
        Ok(RecordStatus::from_flag(parsed.status))
    }

    pub fn delete_contact(&self, id: ContactId) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/api/contatos/{}/deletar", self.base_url, id.get()))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: AckResponse = response.json().context("decode delete response")?;
        if !parsed.success {
            bail!(
                "delete rejected: {}",
                parsed.error.as_deref().unwrap_or("unknown server error")
            );
        }
        Ok(())
    }

    pub fn check_uniqueness(&self, query: &UniquenessQuery) -> Result<DuplicateFields> {
        let response = self
            .http
            .post(format!("{}/api/verificar-duplicados", self.base_url))
            .json(&UniquenessRequest {
                email: query.email.as_deref(),
                telefone: query.phone.as_deref(),
                documento: query.document.as_deref(),
                registro_id: query.record_id,
            })
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: UniquenessResponse = response.json().context("decode uniqueness response")?;
        if !parsed.ok {
            bail!(
                "uniqueness check inconclusive: {}",
                parsed.error.as_deref().unwrap_or("unknown server error")
            );
        }
        let duplicates = parsed.duplicates.unwrap_or_default();
        Ok(DuplicateFields {
            email: duplicates.email,
            phone: duplicates.telefone,
            document: duplicates.documento,
        })
    }

    /// Registry record for a 14-digit organization document. A not-found
    /// answer is `None`; only transport and server errors propagate.
    pub fn company_registry_lookup(&self, document: &str) -> Result<Option<RegistryCompany>> {
        let digits = digits_only(document);
        if digits.len() != 14 {
            bail!("registry lookup requires a 14-digit organization document");
        }

        let response = self
            .http
            .get(format!("{}/api/cnpj/{digits}", self.base_url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: RegistryResponse = response.json().context("decode registry response")?;
        if !parsed.ok {
            return Ok(None);
        }
        Ok(Some(RegistryCompany {
            legal_name: parsed.razao_social,
            trade_name: parsed.nome_fantasia,
            state_registration: parsed.inscricao_estadual,
            municipal_registration: parsed.inscricao_municipal,
        }))
    }

    /// Third-party postal lookup (ViaCEP wire shape). A miss is a soft
    /// `None`, never a blocking error.
    pub fn postal_lookup(&self, code: &str) -> Result<Option<PostalAddress>> {
        let digits = digits_only(code);
        if digits.len() != 8 {
            bail!("postal lookup requires an 8-digit code");
        }

        let response = self
            .http
            .get(format!("{}/ws/{digits}/json/", self.postal_base_url))
            .send()
            .map_err(|error| connection_error(&self.postal_base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(None);
        }

        let parsed: PostalResponse = response.json().context("decode postal response")?;
        if parsed.erro {
            return Ok(None);
        }
        Ok(Some(PostalAddress {
            street: parsed.logradouro,
            district: parsed.bairro,
            city: parsed.localidade,
            state: parsed.uf,
        }))
    }

    /// Multipart upload of a records file; the caller reloads every
    /// snapshot on success.
    pub fn import_records(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_owned())
            .mime_str("application/octet-stream")
            .context("build import part")?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/api/importar", self.base_url))
            .multipart(form)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: ImportResponse = response.json().context("decode import response")?;
        if !parsed.success {
            bail!(
                "import rejected: {}",
                parsed.error.as_deref().unwrap_or("unknown server error")
            );
        }
        Ok(parsed
            .message
            .unwrap_or_else(|| "import finished".to_owned()))
    }

    fn fetch_list<T: serde::de::DeserializeOwned>(&self, segment: &str) -> Result<Vec<T>> {
        let response = self
            .http
            .get(format!("{}/api/{segment}", self.base_url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        response
            .json()
            .with_context(|| format!("decode {segment} list"))
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check [server].base_url and that the backend is running ({} )",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), error);
    }

    if let Ok(parsed) = serde_json::from_str::<MessageEnvelope>(body)
        && let Some(message) = parsed.message
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}

fn parse_wire_date(raw: Option<String>) -> Result<Option<Date>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Date::parse(trimmed, &format_description!("[year]-[month]-[day]"))
        .map(Some)
        .with_context(|| format!("invalid wire date {trimmed:?}"))
}

#[derive(Debug, Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    senha: &'a str,
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    success: bool,
    nome: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContactRow {
    id: i64,
    nome_completo: String,
    email: String,
    #[serde(default)]
    telefone: String,
    cliente_id: i64,
    setor_id: i64,
    cargo_id: i64,
    status: bool,
    #[serde(default)]
    criado_em: Option<String>,
}

impl ContactRow {
    fn into_model(self) -> Result<Contact> {
        Ok(Contact {
            id: ContactId::new(self.id),
            full_name: self.nome_completo,
            email: self.email,
            phone: self.telefone,
            company_id: CompanyId::new(self.cliente_id),
            sector_id: SectorId::new(self.setor_id),
            role_id: RoleId::new(self.cargo_id),
            status: RecordStatus::from_flag(self.status),
            created_on: parse_wire_date(self.criado_em)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CompanyRow {
    id: i64,
    razao_social: String,
    nome_fantasia: String,
    pessoa: String,
    #[serde(default)]
    cnpj: String,
    #[serde(default)]
    inscricao_estadual: String,
    #[serde(default)]
    inscricao_municipal: String,
    #[serde(default)]
    cep: String,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    cidade: String,
    #[serde(default)]
    uf: String,
    status: bool,
    #[serde(default)]
    criado_em: Option<String>,
}

impl CompanyRow {
    fn into_model(self) -> Result<Company> {
        let person = PersonKind::parse(&self.pessoa)
            .ok_or_else(|| anyhow!("unknown person kind {:?}", self.pessoa))?;
        Ok(Company {
            id: CompanyId::new(self.id),
            legal_name: self.razao_social,
            trade_name: self.nome_fantasia,
            person,
            document: digits_only(&self.cnpj),
            state_registration: self.inscricao_estadual,
            municipal_registration: self.inscricao_municipal,
            postal_code: digits_only(&self.cep),
            street: self.logradouro,
            district: self.bairro,
            city: self.cidade,
            state: self.uf,
            status: RecordStatus::from_flag(self.status),
            created_on: parse_wire_date(self.criado_em)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SectorRow {
    id: i64,
    display: String,
    status: bool,
}

impl SectorRow {
    fn into_model(self) -> Sector {
        Sector {
            id: SectorId::new(self.id),
            name: self.display,
            status: RecordStatus::from_flag(self.status),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    id: i64,
    descricao: String,
    setor_id: i64,
    #[serde(default)]
    indice: Option<i32>,
    status: bool,
}

impl RoleRow {
    fn into_model(self) -> JobRole {
        JobRole {
            id: RoleId::new(self.id),
            name: self.descricao,
            sector_id: SectorId::new(self.setor_id),
            position_index: self.indice,
            status: RecordStatus::from_flag(self.status),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToggleResponse {
    success: bool,
    #[serde(default)]
    status: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    success: bool,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct UniquenessRequest<'a> {
    email: Option<&'a str>,
    telefone: Option<&'a str>,
    documento: Option<&'a str>,
    registro_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct UniquenessResponse {
    ok: bool,
    #[serde(default)]
    duplicates: Option<DuplicateWire>,
    error: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DuplicateWire {
    #[serde(default)]
    email: bool,
    #[serde(default)]
    telefone: bool,
    #[serde(default)]
    documento: bool,
}

#[derive(Debug, Deserialize)]
struct RegistryResponse {
    ok: bool,
    #[serde(default)]
    razao_social: String,
    #[serde(default)]
    nome_fantasia: String,
    #[serde(default)]
    inscricao_estadual: String,
    #[serde(default)]
    inscricao_municipal: String,
}

#[derive(Debug, Deserialize)]
struct PostalResponse {
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
    #[serde(default)]
    erro: bool,
}

#[derive(Debug, Deserialize)]
struct ImportResponse {
    success: bool,
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageEnvelope {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{Client, EntityKind, clean_error_response, parse_wire_date};
    use reqwest::StatusCode;
    use std::time::Duration;

    #[test]
    fn entity_kinds_map_to_backend_segments() {
        assert_eq!(EntityKind::Contact.path_segment(), "contatos");
        assert_eq!(EntityKind::Company.path_segment(), "clientes");
        assert_eq!(EntityKind::Sector.path_segment(), "setores");
        assert_eq!(EntityKind::Role.path_segment(), "cargos");
    }

    #[test]
    fn client_rejects_empty_or_invalid_base_url() {
        assert!(Client::new("", Duration::from_secs(1)).is_err());
        assert!(Client::new("not a url", Duration::from_secs(1)).is_err());
        let client =
            Client::new("http://localhost:5000/", Duration::from_secs(1)).expect("valid base url");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn wire_dates_parse_or_default() {
        assert_eq!(parse_wire_date(None).expect("none is fine"), None);
        assert_eq!(
            parse_wire_date(Some(String::new())).expect("empty is fine"),
            None
        );
        let parsed = parse_wire_date(Some("2026-03-15".to_owned()))
            .expect("date should parse")
            .expect("date should be present");
        assert_eq!(parsed.to_string(), "2026-03-15");
        assert!(parse_wire_date(Some("15/03/2026".to_owned())).is_err());
    }

    #[test]
    fn clean_error_response_prefers_json_envelopes() {
        let error = clean_error_response(StatusCode::BAD_REQUEST, r#"{"error":"duplicate email"}"#);
        assert!(error.to_string().contains("duplicate email"));

        let error =
            clean_error_response(StatusCode::BAD_REQUEST, r#"{"message":"missing field"}"#);
        assert!(error.to_string().contains("missing field"));

        let error = clean_error_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(error.to_string().contains("upstream down"));

        let error = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, r#"{"trace":"..."}"#);
        assert_eq!(error.to_string(), "server returned 500");
    }
}
