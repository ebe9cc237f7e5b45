//! Stream encryption interface.
//!
//! The emitter treats encryption as an opaque transformation supplied by the
//! enclosing document writer: every embedded stream is passed through
//! [`StreamEncrypt::encrypt_stream`] together with the object number it will
//! be written under. Unencrypted documents use [`IdentityEncrypt`].

/// Encrypts stream payloads for a specific indirect object.
pub trait StreamEncrypt {
    /// Encrypt `data` for the object numbered `object_number`.
    fn encrypt_stream(&self, data: Vec<u8>, object_number: u32) -> Vec<u8>;
}

/// No-op encryption for unencrypted documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityEncrypt;

impl StreamEncrypt for IdentityEncrypt {
    fn encrypt_stream(&self, data: Vec<u8>, _object_number: u32) -> Vec<u8> {
        data
    }
}
