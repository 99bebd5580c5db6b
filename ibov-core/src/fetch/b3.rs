//! B3 website fetcher.
//!
//! Two sequential GETs on one cookie-keeping client: the IBOV landing page
//! first (establishes session cookies), then the portfolio endpoint. There
//! is no retry: any transport error or non-2xx status fails the fetch.

use super::sniff::rewrite_if_json;
use super::{FetchError, PortfolioSource};
use crate::schema::local_file_name;
use crate::text;
use crate::validate;
use chrono::NaiveDate;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

pub const LANDING_URL: &str =
    "https://sistemaswebb3-listados.b3.com.br/indexPage/day/IBOV?language=pt-br";

/// Portfolio of the day, page 1, 120 rows, IBOV, segment 1 (base64 JSON query).
pub const DATA_URL: &str = "https://sistemaswebb3-listados.b3.com.br/indexProxy/indexCall/GetPortfolioDay/eyJsYW5ndWFnZSI6InB0LWJyIiwicGFnZU51bWJlciI6MSwicGFnZVNpemUiOjEyMCwiaW5kZXgiOiJJQk9WIiwiY2xhc3NpZmljYXRpb24iOiIiLCJzZWdtZW50IjoiMSJ9";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7";
const ACCEPT_ENCODING: &str = "gzip, deflate, br";

/// Characters of the payload echoed to the debug log.
const PREVIEW_CHARS: usize = 500;

/// Where and how to fetch the composition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Warm-up page, also sent as the `Referer`.
    pub landing_url: String,
    /// Portfolio endpoint.
    pub data_url: String,
    /// Directory the daily file is written to.
    pub download_dir: PathBuf,
    /// Request timeout. `None` waits indefinitely.
    pub http_timeout_secs: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            landing_url: LANDING_URL.to_string(),
            data_url: DATA_URL.to_string(),
            download_dir: PathBuf::from("downloads"),
            http_timeout_secs: None,
        }
    }
}

/// Fetcher for the B3 daily portfolio.
pub struct B3Fetcher {
    client: reqwest::blocking::Client,
    config: FetchConfig,
}

impl B3Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE));
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static(ACCEPT_ENCODING));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            header::REFERER,
            HeaderValue::from_str(&config.landing_url)
                .map_err(|e| FetchError::Client(format!("invalid referer: {e}")))?,
        );

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .timeout(config.http_timeout_secs.map(Duration::from_secs))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Path the file for `today` is written to.
    pub fn local_path(&self, today: NaiveDate) -> PathBuf {
        self.config.download_dir.join(local_file_name(today))
    }

    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::Network(format!("GET {url}: {e}")))?;
        let body = resp
            .bytes()
            .map_err(|e| FetchError::Network(format!("reading body of {url}: {e}")))?;
        Ok(body.to_vec())
    }

    fn fetch_to(&self, path: &Path) -> Result<(), FetchError> {
        info!(url = %self.config.landing_url, "opening B3 landing page");
        self.get(&self.config.landing_url)?;

        info!(url = %self.config.data_url, "downloading daily portfolio");
        let body = self.get(&self.config.data_url)?;

        let io_err = |source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        fs::write(path, &body).map_err(io_err)?;
        info!(path = %path.display(), bytes = body.len(), "file downloaded");

        let preview: String = text::decode(&body).chars().take(PREVIEW_CHARS).collect();
        debug!(%preview, "payload preview");

        let format = rewrite_if_json(&body, path)?;
        debug!(?format, "payload format");

        validate::validate(path)?;
        Ok(())
    }
}

impl PortfolioSource for B3Fetcher {
    fn name(&self) -> &str {
        "b3"
    }

    fn download_daily(&self, today: NaiveDate) -> Result<PathBuf, FetchError> {
        let path = self.local_path(today);
        match self.fetch_to(&path) {
            Ok(()) => Ok(path),
            Err(e) => {
                error!("download failed: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_b3() {
        let cfg = FetchConfig::default();
        assert!(cfg.landing_url.contains("indexPage/day/IBOV"));
        assert!(cfg.data_url.contains("GetPortfolioDay"));
        assert_eq!(cfg.download_dir, PathBuf::from("downloads"));
        assert_eq!(cfg.http_timeout_secs, None);
    }

    #[test]
    fn local_path_is_under_download_dir() {
        let fetcher = B3Fetcher::new(FetchConfig {
            download_dir: PathBuf::from("/tmp/ibov"),
            ..FetchConfig::default()
        })
        .unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(fetcher.local_path(day), PathBuf::from("/tmp/ibov/IBOVDia_150324.csv"));
    }

    #[test]
    fn refused_connection_is_a_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = B3Fetcher::new(FetchConfig {
            landing_url: "http://127.0.0.1:9/".into(),
            data_url: "http://127.0.0.1:9/data".into(),
            download_dir: dir.path().to_path_buf(),
            http_timeout_secs: Some(5),
        })
        .unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let err = fetcher.download_daily(day).unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
        assert!(!fetcher.local_path(day).exists());
    }
}
