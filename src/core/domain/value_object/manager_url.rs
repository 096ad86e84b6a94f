use crate::core::domain::error::ValidationError;
use url::Url;

/// Base path of the manager's REST surface, joined under the caller's host.
const REST_BASE_PATH: &str = "/ovm/core/wsapi/rest";

/// A validated manager base URL.
///
/// Wraps the caller-supplied host URL and exposes the fully-joined REST
/// endpoint. Validation happens once at construction; afterwards the value
/// is immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerUrl {
    rest_base: String,
}

impl ManagerUrl {
    /// Parses and validates a host URL such as `https://ovm.example.com:7002`.
    ///
    /// Only `http` and `https` schemes are accepted and the host must be
    /// present. Any path on the input is discarded; the REST base path is
    /// fixed by the manager.
    pub fn new(host: &str) -> Result<Self, ValidationError> {
        let parsed = Url::parse(host)
            .map_err(|e| ValidationError::Format(format!("invalid manager URL '{host}': {e}")))?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ValidationError::Format(format!(
                    "manager URL scheme must be http or https, got '{other}'"
                )));
            }
        }

        if parsed.host_str().is_none() {
            return Err(ValidationError::Format(
                "manager URL has no host".to_string(),
            ));
        }

        // Scheme://host:port only; whatever path the caller supplied is
        // dropped in favor of the manager's fixed REST base.
        let origin = parsed.origin().ascii_serialization();
        Ok(Self {
            rest_base: format!("{origin}{REST_BASE_PATH}"),
        })
    }

    /// The REST base, e.g. `https://ovm.example.com:7002/ovm/core/wsapi/rest`.
    pub fn rest_base(&self) -> &str {
        &self.rest_base
    }

    /// Joins a relative resource path under the REST base.
    pub fn endpoint(&self, rel_path: &str) -> String {
        format!("{}/{}", self.rest_base, rel_path.trim_start_matches('/'))
    }
}
