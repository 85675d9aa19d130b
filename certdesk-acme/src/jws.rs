//! JSON Web Signature support for ACME requests.
//!
//! Every ACME POST is a flattened JWS. Account creation and lookup embed the
//! public key as a `jwk`; all other requests reference the account URL via
//! `kid`.

use crate::error::{AcmeError, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use certdesk_crypto::PrivateKey;
use ring::digest::{SHA256, digest};
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED_SIGNING, EcdsaKeyPair, KeyPair,
    RSA_PKCS1_SHA256, RsaKeyPair,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Public key in JWK form.
///
/// Members are declared in lexicographic order so that the serialized form
/// is the canonical thumbprint input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Jwk {
    Ec {
        crv: &'static str,
        kty: &'static str,
        x: String,
        y: String,
    },
    Rsa {
        e: String,
        kty: &'static str,
        n: String,
    },
}

impl Jwk {
    /// JWK thumbprint: base64url SHA-256 of the canonical JSON.
    pub fn thumbprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self)?;
        Ok(b64(digest(&SHA256, &canonical).as_ref()))
    }
}

/// Flattened JWS request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jws {
    pub protected: String,
    pub payload: String,
    pub signature: String,
}

#[derive(Serialize)]
struct ProtectedHeader<'a> {
    alg: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    jwk: Option<&'a Jwk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
    nonce: &'a str,
    url: &'a str,
}

enum Signer {
    Ecdsa(EcdsaKeyPair),
    Rsa(RsaKeyPair, usize),
}

/// An account key ready to sign ACME requests.
pub struct AccountKey {
    signer: Signer,
    alg: &'static str,
    jwk: Jwk,
    thumbprint: String,
    rng: SystemRandom,
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountKey")
            .field("alg", &self.alg)
            .field("thumbprint", &self.thumbprint)
            .finish_non_exhaustive()
    }
}

impl AccountKey {
    /// Build a signer from an RSA, P-256 or P-384 private key.
    pub fn from_private_key(key: &PrivateKey) -> Result<Self> {
        let rng = SystemRandom::new();
        let pkcs8 = key.to_pkcs8_der()?;

        let (signer, alg, jwk) = match key {
            PrivateKey::Rsa(_) => {
                let (n, e) = key
                    .rsa_public_components()
                    .ok_or_else(|| AcmeError::InvalidKey("missing RSA public key".to_string()))?;
                let pair = RsaKeyPair::from_pkcs8(&pkcs8)
                    .map_err(|e| AcmeError::InvalidKey(e.to_string()))?;
                let jwk = Jwk::Rsa {
                    e: b64(&e),
                    kty: "RSA",
                    n: b64(&n),
                };
                (Signer::Rsa(pair, n.len()), "RS256", jwk)
            }
            PrivateKey::EcP256(_) => {
                let pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &pkcs8, &rng)
                    .map_err(|e| AcmeError::InvalidKey(e.to_string()))?;
                let jwk = ec_jwk("P-256", pair.public_key().as_ref(), 32)?;
                (Signer::Ecdsa(pair), "ES256", jwk)
            }
            PrivateKey::EcP384(_) => {
                let pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P384_SHA384_FIXED_SIGNING, &pkcs8, &rng)
                    .map_err(|e| AcmeError::InvalidKey(e.to_string()))?;
                let jwk = ec_jwk("P-384", pair.public_key().as_ref(), 48)?;
                (Signer::Ecdsa(pair), "ES384", jwk)
            }
        };

        let thumbprint = jwk.thumbprint()?;
        Ok(Self {
            signer,
            alg,
            jwk,
            thumbprint,
            rng,
        })
    }

    /// JWS algorithm name.
    pub fn alg(&self) -> &'static str {
        self.alg
    }

    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }

    /// RFC 7638 thumbprint of the public key.
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    /// Sign a request.
    ///
    /// `kid` selects key-id mode; without it the JWK is embedded. A `None`
    /// payload produces a POST-as-GET body.
    pub fn sign(
        &self,
        url: &str,
        nonce: &str,
        kid: Option<&str>,
        payload: Option<&[u8]>,
    ) -> Result<Jws> {
        let header = ProtectedHeader {
            alg: self.alg,
            jwk: if kid.is_none() { Some(&self.jwk) } else { None },
            kid,
            nonce,
            url,
        };
        let protected = b64(&serde_json::to_vec(&header)?);
        let payload = payload.map(b64).unwrap_or_default();

        let signing_input = format!("{}.{}", protected, payload);
        let signature = self.sign_bytes(signing_input.as_bytes())?;

        Ok(Jws {
            protected,
            payload,
            signature: b64(&signature),
        })
    }

    fn sign_bytes(&self, message: &[u8]) -> Result<Vec<u8>> {
        match &self.signer {
            Signer::Ecdsa(pair) => pair
                .sign(&self.rng, message)
                .map(|sig| sig.as_ref().to_vec())
                .map_err(|_| AcmeError::Internal("ECDSA signing failed".to_string())),
            Signer::Rsa(pair, modulus_len) => {
                let mut signature = vec![0u8; *modulus_len];
                pair.sign(&RSA_PKCS1_SHA256, &self.rng, message, &mut signature)
                    .map_err(|_| AcmeError::Internal("RSA signing failed".to_string()))?;
                Ok(signature)
            }
        }
    }
}

/// base64url without padding.
pub fn b64(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

// Uncompressed SEC1 point: 0x04 || x || y
fn ec_jwk(crv: &'static str, point: &[u8], coord_len: usize) -> Result<Jwk> {
    if point.len() != 1 + 2 * coord_len || point[0] != 0x04 {
        return Err(AcmeError::InvalidKey(format!(
            "unexpected {} public key encoding",
            crv
        )));
    }
    let (x, y) = point[1..].split_at(coord_len);
    Ok(Jwk::Ec {
        crv,
        kty: "EC",
        x: b64(x),
        y: b64(y),
    })
}
