//! Verification strategy identifiers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One concrete verification method offered for an attempt step.
///
/// The wire format is a single string (`"password"`, `"email_code"`,
/// `"oauth_google"`, ...). Unrecognized values are preserved verbatim in
/// [`Strategy::Unknown`] so that a newer server never breaks decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Strategy {
    Password,
    EmailCode,
    PhoneCode,
    Passkey,
    Totp,
    BackupCode,
    ResetPasswordEmailCode,
    ResetPasswordPhoneCode,
    EnterpriseSso,
    /// Social login through the named provider (`oauth_google` etc.).
    Oauth(String),
    /// Native identity-token login through the named provider (`id_token_apple` etc.).
    IdToken(String),
    /// Anything this build does not know about, kept as received.
    Unknown(String),
}

impl Strategy {
    /// Parse a wire string. Never fails; unrecognized input becomes `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "password" => Self::Password,
            "email_code" => Self::EmailCode,
            "phone_code" => Self::PhoneCode,
            "passkey" => Self::Passkey,
            "totp" => Self::Totp,
            "backup_code" => Self::BackupCode,
            "reset_password_email_code" => Self::ResetPasswordEmailCode,
            "reset_password_phone_code" => Self::ResetPasswordPhoneCode,
            "enterprise_sso" => Self::EnterpriseSso,
            other => {
                if let Some(provider) = other.strip_prefix("oauth_") {
                    Self::Oauth(provider.to_string())
                } else if let Some(provider) = other.strip_prefix("id_token_") {
                    Self::IdToken(provider.to_string())
                } else {
                    Self::Unknown(other.to_string())
                }
            }
        }
    }

    /// True for strategies that require a redirect or platform UI flow
    /// rather than a code/credential the caller can collect inline.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Oauth(_) | Self::IdToken(_) | Self::EnterpriseSso)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password => f.write_str("password"),
            Self::EmailCode => f.write_str("email_code"),
            Self::PhoneCode => f.write_str("phone_code"),
            Self::Passkey => f.write_str("passkey"),
            Self::Totp => f.write_str("totp"),
            Self::BackupCode => f.write_str("backup_code"),
            Self::ResetPasswordEmailCode => f.write_str("reset_password_email_code"),
            Self::ResetPasswordPhoneCode => f.write_str("reset_password_phone_code"),
            Self::EnterpriseSso => f.write_str("enterprise_sso"),
            Self::Oauth(provider) => write!(f, "oauth_{}", provider),
            Self::IdToken(provider) => write!(f, "id_token_{}", provider),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for Strategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Strategy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
