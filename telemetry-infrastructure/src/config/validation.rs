use anyhow::{anyhow, Result};

pub const LOG_BACKENDS: [&str; 2] = ["redis", "memory"];

pub fn validate_bind_addr(name: &str, value: &str) -> Result<()> {
    value
        .parse::<std::net::SocketAddr>()
        .map(|_| ())
        .map_err(|err| anyhow!("invalid {}: {}", name, err))
}

pub fn validate_positive(name: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(anyhow!("{} must be greater than 0", name));
    }
    Ok(())
}

pub fn validate_not_blank(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{} must not be empty", name));
    }
    Ok(())
}

pub fn validate_log_backend(value: &str) -> Result<()> {
    if !LOG_BACKENDS.contains(&value) {
        return Err(anyhow!(
            "unknown log_backend '{}', expected one of {:?}",
            value,
            LOG_BACKENDS
        ));
    }
    Ok(())
}
