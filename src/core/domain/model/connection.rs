use crate::core::domain::value_object::manager_url::ManagerUrl;

/// Connection parameters for a manager: validated base URL, static basic
/// credentials, and the TLS verification policy.
///
/// TLS verification is ON unless the caller explicitly opts out; managers
/// running self-signed certificates must ask for the weakening.
#[derive(Debug, Clone)]
pub struct OvmConnection {
    url: ManagerUrl,
    username: String,
    password: String,
    verify_tls: bool,
}

impl OvmConnection {
    pub fn new(
        url: ManagerUrl,
        username: impl Into<String>,
        password: impl Into<String>,
        verify_tls: bool,
    ) -> Self {
        Self {
            url,
            username: username.into(),
            password: password.into(),
            verify_tls,
        }
    }

    pub fn url(&self) -> &ManagerUrl {
        &self.url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }
}
