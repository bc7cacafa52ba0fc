// ABOUTME: Client device identity used to gate login per physical or browser device
// ABOUTME: Generates a pseudo-random token once and returns the persisted value afterwards

use anyhow::Result;
use rand::Rng;

use crate::local_store::{DEVICE_ID_KEY, LocalStore};

const TOKEN_PREFIX: &str = "web_";
const TOKEN_LEN: usize = 13;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub fn device_token(store: &mut LocalStore) -> Result<String> {
    if let Some(existing) = store.get(DEVICE_ID_KEY) {
        if !existing.is_empty() {
            return Ok(existing.to_string());
        }
    }

    let token = generate_token();
    store.set(DEVICE_ID_KEY, token.as_str())?;
    tracing::debug!(device_id = %token, "generated device token");
    Ok(token)
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TOKEN_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{TOKEN_PREFIX}{suffix}")
}
