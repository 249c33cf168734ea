use md5::{Digest, Md5};

use crate::PasswordDigest;

impl PasswordDigest {
    /// Digests a plaintext password as the platform expects it: the lowercase
    /// hexadecimal MD5 of its UTF-8 bytes
    pub fn md5(password: &str) -> Self {
        Self::from(hex::encode(Md5::digest(password.as_bytes())))
    }
}
