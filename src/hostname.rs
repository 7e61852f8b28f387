use crate::error::HostnameError;

/// Endpoint name reported with every record.
///
/// A non-empty `configured` value wins; otherwise the OS hostname is used.
pub fn resolve(configured: Option<&str>) -> Result<String, HostnameError> {
    if let Some(name) = configured.map(str::trim).filter(|n| !n.is_empty()) {
        return Ok(name.to_owned());
    }

    sysinfo::System::host_name()
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty())
        .ok_or(HostnameError::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_name_wins() {
        assert_eq!(resolve(Some(" redis-agent-01 ")).unwrap(), "redis-agent-01");
    }

    #[test]
    fn blank_override_falls_back_to_os() {
        let os = sysinfo::System::host_name()
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty());
        match os {
            Some(name) => assert_eq!(resolve(Some("   ")).unwrap(), name),
            None => assert!(matches!(resolve(Some("   ")), Err(HostnameError::Unavailable))),
        }
        assert_eq!(resolve(None).ok(), resolve(Some("")).ok());
    }
}
