use anyhow::Result;
use phishguard_auth::AuthConfig;

use crate::output::{print_field, print_json, print_success};

pub fn check(config: &AuthConfig) -> Result<()> {
    print_json(&serde_json::to_value(config)?);
    print_success("Configuration is valid");

    match config.verifier.validate() {
        Ok(()) => {
            print_field("Issuer", &config.verifier.issuer());
            print_field("JWKS", &config.verifier.jwks_uri());
        }
        Err(e) => print_field("Token verification", &format!("not configured ({e})")),
    }
    Ok(())
}
