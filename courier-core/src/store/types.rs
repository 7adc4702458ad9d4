use rst_common::standard::async_trait::async_trait;
use rst_common::with_errors::thiserror::{self, Error};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// `Namespace` separates protocol objects of different kinds inside a single store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Provisions,
    Connections,
    IssuerCredentials,
    HolderCredentials,
    DisclosedProofs,
    VerifierProofs,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Provisions => "provisions",
            Namespace::Connections => "connections",
            Namespace::IssuerCredentials => "issuer_credentials",
            Namespace::HolderCredentials => "holder_credentials",
            Namespace::DisclosedProofs => "disclosed_proofs",
            Namespace::VerifierProofs => "verifier_proofs",
        }
    }

    pub fn all() -> Vec<Namespace> {
        vec![
            Namespace::Provisions,
            Namespace::Connections,
            Namespace::IssuerCredentials,
            Namespace::HolderCredentials,
            Namespace::DisclosedProofs,
            Namespace::VerifierProofs,
        ]
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Namespace {
    type Error = StoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Namespace::all()
            .into_iter()
            .find(|ns| ns.as_str() == value)
            .ok_or_else(|| StoreError::ValidationError(format!("unknown namespace: {}", value)))
    }
}

/// `StoreBuilder` is the persistence contract
///
/// Implementers must make a successful `set` durable before returning and must keep every
/// key-level operation atomic. Reading a missing key is not an error, it must be reported as `None`.
/// The `keys` and `values` results must follow the same order.
#[async_trait]
pub trait StoreBuilder: Clone + Sync + Send {
    async fn get(&self, namespace: Namespace, key: String) -> Result<Option<Vec<u8>>, StoreError>;
    async fn set(&self, namespace: Namespace, key: String, value: Vec<u8>) -> Result<(), StoreError>;
    async fn keys(&self, namespace: Namespace) -> Result<Vec<String>, StoreError>;
    async fn values(&self, namespace: Namespace) -> Result<Vec<Vec<u8>>, StoreError>;
}
