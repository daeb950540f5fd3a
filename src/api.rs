use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::CommonConfig;
use crate::domain::{AssayUuid, LandingZoneUuid, ProjectUuid};
use crate::error::SodarError;
use crate::isatab::IsaTabReader;
use crate::landing_zones::resolve_assay;
use crate::models::{Investigation, LandingZone};
use crate::sheets::{self, IsaData, RawSampleSheet};

/// Blocking HTTP access with token authentication. Non-2xx replies are errors.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, token: &str) -> Result<String, SodarError>;
    fn post_form(
        &self,
        url: &str,
        token: &str,
        form: &[(&str, &str)],
    ) -> Result<String, SodarError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, SodarError> {
        Self::from_builder(Client::builder())
    }

    fn from_builder(builder: ClientBuilder) -> Result<Self, SodarError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("sodar-sync/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SodarError::Http(err.to_string()))?,
        );
        let client = builder
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| SodarError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    fn auth_header(token: &str) -> Result<HeaderValue, SodarError> {
        let mut value = HeaderValue::from_str(&format!("Token {token}"))
            .map_err(|err| SodarError::Http(err.to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }

    fn handle_status(response: Response) -> Result<String, SodarError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "SODAR request failed".to_string());
            return Err(SodarError::Status { status, message });
        }
        response
            .text()
            .map_err(|err| SodarError::Http(err.to_string()))
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, token: &str) -> Result<String, SodarError> {
        debug!("HTTP GET request to {url}");
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, Self::auth_header(token)?)
            .send()
            .map_err(|err| SodarError::Http(err.to_string()))?;
        Self::handle_status(response)
    }

    fn post_form(
        &self,
        url: &str,
        token: &str,
        form: &[(&str, &str)],
    ) -> Result<String, SodarError> {
        debug!("HTTP POST request to {url}");
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, Self::auth_header(token)?)
            .form(form)
            .send()
            .map_err(|err| SodarError::Http(err.to_string()))?;
        Self::handle_status(response)
    }
}

/// Strips trailing slashes from a server URL. Idempotent.
pub fn normalize_url(sodar_url: &str) -> &str {
    sodar_url.trim_end_matches('/')
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, SodarError> {
    serde_json::from_str(body).map_err(|err| SodarError::Decode(err.to_string()))
}

pub fn get_investigation<T: Transport + ?Sized>(
    transport: &T,
    sodar_url: &str,
    sodar_api_token: &str,
    project_uuid: &ProjectUuid,
) -> Result<Investigation, SodarError> {
    let sodar_url = normalize_url(sodar_url);
    let url = format!("{sodar_url}/samplesheets/api/investigation/retrieve/{project_uuid}");
    decode(&transport.get(&url, sodar_api_token)?)
}

pub fn get_sample_sheet_raw<T: Transport + ?Sized>(
    transport: &T,
    sodar_url: &str,
    sodar_api_token: &str,
    project_uuid: &ProjectUuid,
) -> Result<RawSampleSheet, SodarError> {
    let sodar_url = normalize_url(sodar_url);
    let url = format!("{sodar_url}/samplesheets/api/export/json/{project_uuid}");
    decode(&transport.get(&url, sodar_api_token)?)
}

pub fn list_landing_zones<T: Transport + ?Sized>(
    transport: &T,
    sodar_url: &str,
    sodar_api_token: &str,
    project_uuid: &ProjectUuid,
) -> Result<Vec<LandingZone>, SodarError> {
    let sodar_url = normalize_url(sodar_url);
    let url = format!("{sodar_url}/landingzones/api/list/{project_uuid}");
    decode(&transport.get(&url, sodar_api_token)?)
}

/// Creates a landing zone. Without `assay_uuid` the project must have exactly
/// one study with exactly one assay, which is then used.
pub fn create_landing_zone<T: Transport + ?Sized>(
    transport: &T,
    sodar_url: &str,
    sodar_api_token: &str,
    project_uuid: &ProjectUuid,
    assay_uuid: Option<&AssayUuid>,
) -> Result<LandingZone, SodarError> {
    let sodar_url = normalize_url(sodar_url);

    let assay_uuid = match assay_uuid {
        Some(assay_uuid) => assay_uuid.clone(),
        None => {
            let investigation =
                get_investigation(transport, sodar_url, sodar_api_token, project_uuid)?;
            resolve_assay(&investigation)?
        }
    };

    let url = format!("{sodar_url}/landingzones/api/create/{project_uuid}");
    let body = transport.post_form(&url, sodar_api_token, &[("assay", assay_uuid.as_str())])?;
    decode(&body)
}

/// Moving a landing zone is not wired to the server yet: the URL is
/// normalized but no request is sent.
pub fn move_landing_zone(
    sodar_url: &str,
    _sodar_api_token: &str,
    landing_zone_uuid: &LandingZoneUuid,
) -> Result<(), SodarError> {
    let sodar_url = normalize_url(sodar_url);
    warn!("not moving landing zone {landing_zone_uuid} on {sodar_url}: no move endpoint is wired");
    Ok(())
}

/// Client bound to one server, optionally with a default project.
pub struct SodarClient<T: Transport> {
    transport: T,
    sodar_url: String,
    sodar_api_token: String,
    project_uuid: Option<ProjectUuid>,
}

impl SodarClient<HttpTransport> {
    pub fn from_config(
        config: &CommonConfig,
        project_uuid: Option<ProjectUuid>,
    ) -> Result<Self, SodarError> {
        Ok(Self::new(
            HttpTransport::new()?,
            &config.sodar_server_url,
            &config.sodar_api_token,
            project_uuid,
        ))
    }
}

impl<T: Transport> SodarClient<T> {
    pub fn new(
        transport: T,
        sodar_url: &str,
        sodar_api_token: &str,
        project_uuid: Option<ProjectUuid>,
    ) -> Self {
        Self {
            transport,
            sodar_url: normalize_url(sodar_url).to_string(),
            sodar_api_token: sodar_api_token.to_string(),
            project_uuid,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sodar_url(&self) -> &str {
        &self.sodar_url
    }

    fn project<'a>(
        &'a self,
        project_uuid: Option<&'a ProjectUuid>,
    ) -> Result<&'a ProjectUuid, SodarError> {
        project_uuid.or(self.project_uuid.as_ref()).ok_or_else(|| {
            SodarError::MissingParameter(
                "both client and method project UUID missing".to_string(),
            )
        })
    }

    pub fn investigation(
        &self,
        project_uuid: Option<&ProjectUuid>,
    ) -> Result<Investigation, SodarError> {
        let project_uuid = self.project(project_uuid)?;
        get_investigation(
            &self.transport,
            &self.sodar_url,
            &self.sodar_api_token,
            project_uuid,
        )
    }

    pub fn sheet_raw(
        &self,
        project_uuid: Option<&ProjectUuid>,
    ) -> Result<RawSampleSheet, SodarError> {
        let project_uuid = self.project(project_uuid)?;
        get_sample_sheet_raw(
            &self.transport,
            &self.sodar_url,
            &self.sodar_api_token,
            project_uuid,
        )
    }

    pub fn sheet(
        &self,
        project_uuid: Option<&ProjectUuid>,
        reader: &dyn IsaTabReader,
    ) -> Result<IsaData, SodarError> {
        let raw = self.sheet_raw(project_uuid)?;
        sheets::assemble(&raw, reader)
    }

    pub fn landing_zones(
        &self,
        project_uuid: Option<&ProjectUuid>,
    ) -> Result<Vec<LandingZone>, SodarError> {
        let project_uuid = self.project(project_uuid)?;
        list_landing_zones(
            &self.transport,
            &self.sodar_url,
            &self.sodar_api_token,
            project_uuid,
        )
    }

    pub fn create_landing_zone(
        &self,
        project_uuid: Option<&ProjectUuid>,
        assay_uuid: Option<&AssayUuid>,
    ) -> Result<LandingZone, SodarError> {
        let project_uuid = self.project(project_uuid)?;
        create_landing_zone(
            &self.transport,
            &self.sodar_url,
            &self.sodar_api_token,
            project_uuid,
            assay_uuid,
        )
    }

    pub fn move_landing_zone(&self, landing_zone_uuid: &LandingZoneUuid) -> Result<(), SodarError> {
        move_landing_zone(&self.sodar_url, &self.sodar_api_token, landing_zone_uuid)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    use assert_matches::assert_matches;

    use super::*;

    struct CapturedRequest {
        request_line: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl CapturedRequest {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    /// Accepts one connection on a local port, records the request and
    /// answers with `status` and `body`.
    fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((key, value)) = line.split_once(':') {
                    headers.push((key.trim().to_string(), value.trim().to_string()));
                }
            }
            let length = headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
                .map(|(_, value)| value.parse::<usize>().unwrap())
                .unwrap_or(0);
            let mut raw_body = vec![0; length];
            reader.read_exact(&mut raw_body).unwrap();
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();
            CapturedRequest {
                request_line: request_line.trim_end().to_string(),
                headers,
                body: String::from_utf8(raw_body).unwrap(),
            }
        });
        (base_url, handle)
    }

    fn local_transport() -> HttpTransport {
        HttpTransport::from_builder(Client::builder().no_proxy()).unwrap()
    }

    #[test]
    fn auth_header_uses_token_scheme() {
        let value = HttpTransport::auth_header("abc").unwrap();
        assert_eq!(value.to_str().unwrap(), "Token abc");
        assert!(value.is_sensitive());
    }

    #[test]
    fn post_form_sends_token_and_assay_field() {
        let (base_url, server) = serve_once("200 OK", r#"{"ok": true}"#);
        let body = local_transport()
            .post_form(
                &format!("{base_url}/landingzones/api/create/p1"),
                "secret-token",
                &[("assay", "0a3b5b4e-1f8b-4c1e-9c2a-7d1e3f4a5b6c")],
            )
            .unwrap();
        assert_eq!(body, r#"{"ok": true}"#);

        let request = server.join().unwrap();
        assert_eq!(
            request.request_line,
            "POST /landingzones/api/create/p1 HTTP/1.1"
        );
        assert_eq!(request.header("authorization"), Some("Token secret-token"));
        assert_eq!(
            request.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert!(
            request
                .header("user-agent")
                .is_some_and(|agent| agent.starts_with("sodar-sync/"))
        );
        assert_eq!(request.body, "assay=0a3b5b4e-1f8b-4c1e-9c2a-7d1e3f4a5b6c");
    }

    #[test]
    fn non_success_status_becomes_status_error() {
        let (base_url, server) = serve_once("403 Forbidden", r#"{"detail": "denied"}"#);
        let err = local_transport()
            .get(&format!("{base_url}/landingzones/api/list/p1"), "t0ken")
            .unwrap_err();
        assert_matches!(
            err,
            SodarError::Status { status: 403, ref message } if message.contains("denied")
        );
        assert!(err.is_remote());

        let request = server.join().unwrap();
        assert_eq!(request.request_line, "GET /landingzones/api/list/p1 HTTP/1.1");
        assert_eq!(request.header("authorization"), Some("Token t0ken"));
    }

    #[test]
    fn normalize_strips_all_trailing_slashes() {
        assert_eq!(normalize_url("https://x///"), "https://x");
        assert_eq!(normalize_url("https://x"), "https://x");
        assert_eq!(normalize_url(normalize_url("https://x/")), "https://x");
    }
}
