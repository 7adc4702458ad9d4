use rst_common::standard::serde::{self, Deserialize};

use prople_courier_core::provisioning::types::{AgentRole, ProvisionOptions};

use crate::common::types::{CommonError, ToValidate};

/// `Agent` is the identity of the local agent, used to provision it to its agency
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Agent {
    pub(super) role: String,
    pub(super) endpoint: String,
    pub(super) seed: String,
    pub(super) wallet_key: String,
    pub(super) wallet_name: Option<String>,
    pub(super) payment_method: Option<String>,
    pub(super) webhook_url: Option<String>,
    pub(super) institution_name: Option<String>,
}

impl Agent {
    pub fn get_identity(&self) -> (AgentRole, String, String) {
        (
            AgentRole::from(self.role.as_str()),
            self.endpoint.to_owned(),
            self.seed.to_owned(),
        )
    }

    pub fn get_webhook_url(&self) -> Option<String> {
        self.webhook_url.to_owned()
    }

    pub fn provision_options(&self) -> ProvisionOptions {
        let mut options = ProvisionOptions::new(self.wallet_key.to_owned());

        if let Some(name) = &self.wallet_name {
            options = options.wallet_name(name.to_owned());
        }

        if let Some(method) = &self.payment_method {
            options = options.payment_method(method.to_owned());
        }

        if let Some(url) = &self.webhook_url {
            options = options.webhook_url(url.to_owned());
        }

        if let Some(name) = &self.institution_name {
            options = options.institution(name.to_owned(), None);
        }

        options
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self {
            role: "courier".to_string(),
            endpoint: "loopback://agency".to_string(),
            seed: "".to_string(),
            wallet_key: "".to_string(),
            wallet_name: None,
            payment_method: None,
            webhook_url: None,
            institution_name: None,
        }
    }
}

impl ToValidate for Agent {
    fn validate(&self) -> Result<(), CommonError> {
        if self.role.is_empty() {
            return Err(CommonError::ValidationError(
                "config: agent:role is missing".to_string(),
            ));
        }

        if self.endpoint.is_empty() {
            return Err(CommonError::ValidationError(
                "config: agent:endpoint is missing".to_string(),
            ));
        }

        if self.seed.is_empty() {
            return Err(CommonError::ValidationError(
                "config: agent:seed is missing".to_string(),
            ));
        }

        if self.wallet_key.is_empty() {
            return Err(CommonError::ValidationError(
                "config: agent:wallet_key is missing".to_string(),
            ));
        }

        Ok(())
    }
}
