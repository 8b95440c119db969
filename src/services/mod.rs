pub mod api_key_auth;
pub mod appearance;
pub mod auth_service;
pub mod billing_service;
pub mod notifier;
pub mod payments;

/// Returns `bytes` random bytes as a lowercase hex string.
pub fn random_hex(bytes: usize) -> String {
    use rand::RngCore;

    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    hex::encode(buf)
}
