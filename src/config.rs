//! Process configuration: CLI flags with environment-variable fallbacks,
//! matching how terminals and deploy tooling already configure this
//! service (`PORT`, key file paths).

use clap::Parser;

/// Acquirer-side ISO 8583 authorization endpoint.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Config {
    /// TCP port to bind, 0.0.0.0.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// PEM-encoded RSA private key used to unwrap incoming transport keys.
    #[arg(long, env = "TRANSPORT_KEY_PATH", default_value = "keys/transport.pem")]
    pub transport_key_path: String,

    /// PEM-encoded RSA private key used to sign terminal provisioning
    /// tokens.
    #[arg(long, env = "TOKEN_KEY_PATH", default_value = "keys/token.pem")]
    pub token_key_path: String,

    /// Directory of static assets served alongside the API, `index.html`
    /// as the default document.
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    pub public_dir: String,

    /// Comma-separated terminal serials allowed to request a provisioning
    /// token.
    #[arg(long, env = "ALLOWED_SERIALS", default_value = "")]
    pub allowed_serials: String,
}

impl Config {
    pub fn allow_list(&self) -> Vec<String> {
        self.allowed_serials
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_splits_and_trims_serials() {
        let cfg = Config {
            port: 8080,
            transport_key_path: String::new(),
            token_key_path: String::new(),
            public_dir: String::new(),
            allowed_serials: " ABC123 , DEF456,,GHI789 ".to_string(),
        };
        assert_eq!(cfg.allow_list(), vec!["ABC123", "DEF456", "GHI789"]);
    }

    #[test]
    fn empty_allowed_serials_is_empty_list() {
        let cfg = Config {
            port: 8080,
            transport_key_path: String::new(),
            token_key_path: String::new(),
            public_dir: String::new(),
            allowed_serials: String::new(),
        };
        assert!(cfg.allow_list().is_empty());
    }
}
