use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub signing_key: SecretString,
    pub link_key: SecretString,
    pub base_url: String,
    pub admin_email: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(
        signing_key: SecretString,
        link_key: SecretString,
        base_url: String,
        admin_email: String,
    ) -> Self {
        Self {
            signing_key,
            link_key,
            base_url,
            admin_email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(
            SecretString::from("signing-secret".to_string()),
            SecretString::from("link-secret".to_string()),
            "https://leaguedesk.example.com".to_string(),
            "admins@example.com".to_string(),
        );
        assert_eq!(args.signing_key.expose_secret(), "signing-secret");
        assert_eq!(args.link_key.expose_secret(), "link-secret");
        assert_eq!(args.base_url, "https://leaguedesk.example.com");
        assert_eq!(args.admin_email, "admins@example.com");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let args = GlobalArgs::new(
            SecretString::from("signing-secret".to_string()),
            SecretString::from("link-secret".to_string()),
            "https://leaguedesk.example.com".to_string(),
            "admins@example.com".to_string(),
        );
        let output = format!("{args:?}");
        assert!(!output.contains("signing-secret"));
        assert!(!output.contains("link-secret"));
    }
}
