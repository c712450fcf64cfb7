//! Process-wide key material for both token schemes.
//!
//! Flow Overview:
//! 1) Read the RSA key pair (PEM) and the shared secret once at startup.
//! 2) Build the signing/verification keys for `RS256` and `HS256`.
//! 3) Probe the pair: a token signed with the private key must verify with the
//!    public key, otherwise startup is aborted.
//!
//! The store is immutable after `load`; share it behind an `Arc`.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

use super::{error::AdmissionError, token::Claims};

const PROBE_SUBJECT: &str = "key-material-probe";
const PROBE_TTL_SECONDS: u64 = 60;

/// Cryptographic scheme used to sign and verify a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// RSA key pair (`RS256`).
    Asymmetric,
    /// Shared secret (`HS256`).
    Symmetric,
}

impl Scheme {
    #[must_use]
    pub const fn algorithm(self) -> Algorithm {
        match self {
            Self::Asymmetric => Algorithm::RS256,
            Self::Symmetric => Algorithm::HS256,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asymmetric => "asymmetric",
            Self::Symmetric => "symmetric",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the key material lives on disk, plus the shared secret.
#[derive(Clone, Debug)]
pub struct KeyMaterialSource {
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub shared_secret: SecretString,
}

pub struct KeyMaterial {
    rsa_encoding: EncodingKey,
    rsa_decoding: DecodingKey,
    hmac_encoding: EncodingKey,
    hmac_decoding: DecodingKey,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial").finish_non_exhaustive()
    }
}

impl KeyMaterial {
    /// Load key material from disk.
    ///
    /// # Errors
    /// Returns `KeyMaterialLoadFailed` if a file cannot be read, a key cannot
    /// be parsed, the secret is empty, or the key pair does not match.
    #[instrument(skip(source), fields(
        private_key = %source.private_key_path.display(),
        public_key = %source.public_key_path.display()
    ))]
    pub fn load(source: &KeyMaterialSource) -> Result<Self, AdmissionError> {
        let private_pem = read_pem(&source.private_key_path)?;
        let public_pem = read_pem(&source.public_key_path)?;

        let keys = Self::from_pem(
            &private_pem,
            &public_pem,
            source.shared_secret.expose_secret().as_bytes(),
        )?;

        debug!("key material loaded");

        Ok(keys)
    }

    /// Build key material from in-memory PEM documents and a shared secret.
    ///
    /// # Errors
    /// Same conditions as [`KeyMaterial::load`], minus file access.
    pub fn from_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        shared_secret: &[u8],
    ) -> Result<Self, AdmissionError> {
        if shared_secret.is_empty() {
            return Err(AdmissionError::KeyMaterialLoadFailed(
                "shared secret is empty".to_string(),
            ));
        }

        let rsa_encoding = EncodingKey::from_rsa_pem(private_pem).map_err(|err| {
            AdmissionError::KeyMaterialLoadFailed(format!("invalid private key: {err}"))
        })?;
        let rsa_decoding = DecodingKey::from_rsa_pem(public_pem).map_err(|err| {
            AdmissionError::KeyMaterialLoadFailed(format!("invalid public key: {err}"))
        })?;

        let keys = Self {
            rsa_encoding,
            rsa_decoding,
            hmac_encoding: EncodingKey::from_secret(shared_secret),
            hmac_decoding: DecodingKey::from_secret(shared_secret),
        };

        keys.probe()?;

        Ok(keys)
    }

    /// Sign claims under the given scheme.
    ///
    /// The service never originates sessions; this is used for the startup
    /// probe and by tooling that needs to mint tokens.
    ///
    /// # Errors
    /// Returns `KeyMaterialLoadFailed` if encoding fails.
    pub fn sign(&self, claims: &Claims, scheme: Scheme) -> Result<String, AdmissionError> {
        encode(&Header::new(scheme.algorithm()), claims, self.encoding_key(scheme))
            .map_err(|err| AdmissionError::KeyMaterialLoadFailed(format!("signing failed: {err}")))
    }

    pub(crate) const fn decoding_key(&self, scheme: Scheme) -> &DecodingKey {
        match scheme {
            Scheme::Asymmetric => &self.rsa_decoding,
            Scheme::Symmetric => &self.hmac_decoding,
        }
    }

    const fn encoding_key(&self, scheme: Scheme) -> &EncodingKey {
        match scheme {
            Scheme::Asymmetric => &self.rsa_encoding,
            Scheme::Symmetric => &self.hmac_encoding,
        }
    }

    fn probe(&self) -> Result<(), AdmissionError> {
        let claims = Claims::new(
            PROBE_SUBJECT,
            jsonwebtoken::get_current_timestamp() + PROBE_TTL_SECONDS,
        );
        let token = self.sign(&claims, Scheme::Asymmetric)?;
        let validation = Validation::new(Scheme::Asymmetric.algorithm());

        decode::<Claims>(&token, self.decoding_key(Scheme::Asymmetric), &validation)
            .map(|_| ())
            .map_err(|_| {
                AdmissionError::KeyMaterialLoadFailed(
                    "public key does not match private key".to_string(),
                )
            })
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, AdmissionError> {
    fs::read(path).map_err(|err| {
        AdmissionError::KeyMaterialLoadFailed(format!("failed to read {}: {err}", path.display()))
    })
}
