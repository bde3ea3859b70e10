//! Private-key handling for key-pair authentication.
//!
//! The uploaded key arrives as PEM, optionally passphrase-encrypted.
//! The client needs unencrypted PKCS#8 DER, so the key is parsed here
//! and re-encoded; a wrong passphrase or malformed key must surface as
//! a [`KeyError`], never as raw bytes handed to the client.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};

use crate::error::{KeyError, KeyResult};

/// Parses an uploaded private key and re-encodes it for the client
///
/// The passphrase is consulted only when `encrypted` is set, mirroring
/// the upload form's "is encrypted" checkbox.
///
/// # Errors
///
/// Returns `KeyError::MissingPassphrase` if the key is marked encrypted
/// but no passphrase was given, `KeyError::Decrypt` when decryption
/// fails (typically a wrong passphrase), and `KeyError::Malformed` for
/// key material that does not parse at all.
pub fn decode_private_key(
    pem: &[u8],
    encrypted: bool,
    passphrase: Option<&str>,
) -> KeyResult<Vec<u8>> {
    let text = std::str::from_utf8(pem)
        .map_err(|e| KeyError::Malformed(format!("key file is not valid UTF-8 PEM: {e}")))?;

    let key = if encrypted {
        let passphrase = passphrase
            .filter(|p| !p.is_empty())
            .ok_or(KeyError::MissingPassphrase)?;
        RsaPrivateKey::from_pkcs8_encrypted_pem(text, passphrase)
            .map_err(|e| KeyError::Decrypt(e.to_string()))?
    } else {
        RsaPrivateKey::from_pkcs8_pem(text).map_err(|e| KeyError::Malformed(e.to_string()))?
    };

    let der = key
        .to_pkcs8_der()
        .map_err(|e| KeyError::Encode(e.to_string()))?;
    Ok(der.as_bytes().to_vec())
}

/// Computes the public-key fingerprint for JWT issuance
///
/// The fingerprint is the base64-encoded SHA-256 digest of the
/// public-key DER, the form the warehouse expects in the JWT issuer.
///
/// # Errors
///
/// Returns `KeyError::Malformed` if the stored DER does not parse and
/// `KeyError::Encode` if the public key cannot be re-encoded.
pub fn public_key_fingerprint(pkcs8_der: &[u8]) -> KeyResult<String> {
    let key =
        RsaPrivateKey::from_pkcs8_der(pkcs8_der).map_err(|e| KeyError::Malformed(e.to_string()))?;
    let public_der = key
        .to_public_key()
        .to_public_key_der()
        .map_err(|e| KeyError::Encode(e.to_string()))?;
    Ok(STANDARD.encode(Sha256::digest(public_der.as_bytes())))
}

/// Converts stored PKCS#8 DER to PKCS#1 DER for the JWT signer
///
/// # Errors
///
/// Returns `KeyError::Malformed` if the stored DER does not parse and
/// `KeyError::Encode` if re-encoding fails.
pub fn pkcs1_der(pkcs8_der: &[u8]) -> KeyResult<Vec<u8>> {
    let key =
        RsaPrivateKey::from_pkcs8_der(pkcs8_der).map_err(|e| KeyError::Malformed(e.to_string()))?;
    let der = key
        .to_pkcs1_der()
        .map_err(|e| KeyError::Encode(e.to_string()))?;
    Ok(der.as_bytes().to_vec())
}
