//! Shared access signature token inspection
//!
//! The device never signs tokens itself; it only checks that the provisioned
//! token is well formed and reads its expiry for diagnostics.

use core::fmt;

const PREFIX: &str = "SharedAccessSignature ";

/// Fields of a `SharedAccessSignature sr=…&sig=…&se=…` token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SasToken<'a> {
    /// URL-encoded resource URI the token is scoped to
    pub resource: &'a str,
    /// URL-encoded signature
    pub signature: &'a str,
    /// Expiry as seconds since the Unix epoch
    pub expiry: u64,
    /// Shared access policy name, for hub-level tokens
    pub key_name: Option<&'a str>,
}

impl<'a> SasToken<'a> {
    pub fn parse(token: &'a str) -> Result<Self, TokenError> {
        let fields = token.strip_prefix(PREFIX).ok_or(TokenError::MissingPrefix)?;

        let mut resource = None;
        let mut signature = None;
        let mut expiry = None;
        let mut key_name = None;

        for field in fields.split('&') {
            let (key, value) = field.split_once('=').ok_or(TokenError::MalformedField)?;
            match key {
                "sr" => resource = Some(value),
                "sig" => signature = Some(value),
                "se" => expiry = Some(value.parse::<u64>().map_err(|_| TokenError::InvalidExpiry)?),
                "skn" => key_name = Some(value),
                _ => {}
            }
        }

        Ok(Self {
            resource: resource.ok_or(TokenError::MissingField("sr"))?,
            signature: signature.ok_or(TokenError::MissingField("sig"))?,
            expiry: expiry.ok_or(TokenError::MissingField("se"))?,
            key_name,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    MissingPrefix,
    MalformedField,
    MissingField(&'static str),
    InvalidExpiry,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::MissingPrefix => write!(f, "token does not start with '{}'", PREFIX.trim_end()),
            TokenError::MalformedField => f.write_str("token field without '='"),
            TokenError::MissingField(name) => write!(f, "token field '{}' is missing", name),
            TokenError::InvalidExpiry => f.write_str("token expiry is not a number"),
        }
    }
}
