// ABOUTME: Registry credential builder for authenticated image pulls.
// ABOUTME: Builds the engine credential once per batch; every pull reuses it.

use crate::runtime::RegistryAuth;
use bollard::auth::DockerCredentials;

/// Build the credential shared by every pull in a batch.
///
/// The engine client serializes it to JSON and base64-encodes it into the
/// `X-Registry-Auth` header of each pull.
pub fn build_credential(server: &str, username: &str, password: &str) -> RegistryAuth {
    RegistryAuth {
        server: server.to_string(),
        credentials: DockerCredentials {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            serveraddress: Some(server.to_string()),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_serializes_to_engine_auth_json() {
        let auth = build_credential("ghcr.io", "octo", "p?ss>>");
        let json = serde_json::to_value(&auth.credentials).unwrap();

        assert_eq!(json["username"], "octo");
        assert_eq!(json["password"], "p?ss>>");
        assert_eq!(json["serveraddress"], "ghcr.io");
    }

    #[test]
    fn debug_hides_password() {
        let auth = build_credential("ghcr.io", "octo", "hunter2");
        let debug = format!("{:?}", auth);
        assert!(debug.contains("octo"));
        assert!(!debug.contains("hunter2"));
    }
}
