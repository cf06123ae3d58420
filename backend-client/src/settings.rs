use crate::BootstrapError;
use reqwest::Url;

pub const URL_VARIABLE: &str = "SUPABASE_URL";
pub const ANON_KEY_VARIABLE: &str = "SUPABASE_ANON_KEY";

#[derive(Clone, Debug)]
pub struct BackendSettings {
    url: Url,
    anon_key: String,
}

impl BackendSettings {
    pub fn new(url: &str, anon_key: &str) -> Result<Self, BootstrapError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(BootstrapError::MissingSetting(URL_VARIABLE));
        }
        if anon_key.trim().is_empty() {
            return Err(BootstrapError::MissingSetting(ANON_KEY_VARIABLE));
        }
        let parsed = Url::parse(url).map_err(|error| BootstrapError::InvalidUrl {
            url: url.into(),
            reason: error.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BootstrapError::InvalidUrl {
                url: url.into(),
                reason: "scheme must be http or https".into(),
            });
        }
        Ok(Self {
            url: parsed,
            anon_key: anon_key.trim().into(),
        })
    }

    pub fn from_env() -> Result<Self, BootstrapError> {
        let url = std::env::var(URL_VARIABLE).unwrap_or_default();
        let anon_key = std::env::var(ANON_KEY_VARIABLE).unwrap_or_default();
        Self::new(&url, &anon_key)
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Resolves `path` below the configured URL, keeping any path prefix the URL already has.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
