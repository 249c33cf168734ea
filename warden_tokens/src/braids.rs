use aliri_braid::braid;
use std::fmt;

/// Implements `Debug` and `Display` for a secret-bearing braid such that the
/// value is masked unless the alternate form (`{:#?}`/`{:#}`) is requested
macro_rules! masked {
    ($ty:ty: $label:literal, $reveal:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    f.write_str("\"")?;
                    reveal_prefix(&self.0, &mut *f, $reveal)?;
                    f.write_str("\"")
                } else {
                    f.write_str(concat!("***", $label, "***"))
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    reveal_prefix(&self.0, &mut *f, usize::MAX)
                } else {
                    f.write_str(concat!("***", $label, "***"))
                }
            }
        }
    };
}

/// Writes at most `width` characters (or `default_len` if no width is given),
/// ending with an ellipsis when the value was cut short
fn reveal_prefix(secret: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        return f.write_str("…");
    }

    if secret.chars().count() <= max_len {
        return f.write_str(secret);
    }

    match secret.char_indices().nth(max_len - 1) {
        Some((cut, _)) => {
            f.write_str(&secret[..cut])?;
            f.write_str("…")
        }
        None => f.write_str(secret),
    }
}

/// An application client ID issued by the platform
#[braid(serde)]
pub struct ClientId;

/// An application client secret issued by the platform
#[braid(serde, debug = "owned", display = "owned")]
pub struct ClientSecret;

masked!(ClientSecretRef: "CLIENT SECRET", 5);

/// An access token, presented on every call to the platform
#[braid(serde, debug = "owned", display = "owned")]
pub struct AccessToken;

masked!(AccessTokenRef: "ACCESS TOKEN", 15);

/// A refresh token, exchanged for a new access token when the current one goes stale
#[braid(serde, debug = "owned", display = "owned")]
pub struct RefreshToken;

masked!(RefreshTokenRef: "REFRESH TOKEN", 5);

/// A digested account password, as transmitted in a password grant
#[braid(serde, debug = "owned", display = "owned")]
pub struct PasswordDigest;

masked!(PasswordDigestRef: "PASSWORD DIGEST", 0);
