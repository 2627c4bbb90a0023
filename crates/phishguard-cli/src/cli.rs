use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "phishguard")]
#[command(about = "PhishGuard auth toolkit: secret hashes, one-time codes and token checks")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./phishguard.toml when present)
    #[arg(short, long, global = true, env = "PHISHGUARD_CONFIG")]
    pub config: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the SECRET_HASH for a username and app client
    SecretHash(SecretHashArgs),
    /// Print the one-time code for a secret
    TotpCode(TotpCodeArgs),
    /// Check a one-time code across the drift window
    TotpCheck(TotpCheckArgs),
    /// Print the otpauth:// provisioning URI for a secret
    TotpUri(TotpUriArgs),
    /// Verify a bearer token against the configured user pool
    VerifyToken(VerifyTokenArgs),
    /// Expand roles into permissions
    Permissions(PermissionsArgs),
    /// Load, validate and print the effective configuration
    CheckConfig,
}

#[derive(clap::Args)]
pub struct SecretHashArgs {
    /// Username the hash is bound to
    pub username: String,
    /// App client ID
    #[arg(long, env = "PHISHGUARD_CLIENT_ID")]
    pub client_id: String,
    /// App client secret
    #[arg(long, env = "PHISHGUARD_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,
}

#[derive(clap::Args)]
pub struct TotpCodeArgs {
    /// Base32 shared secret
    pub secret: String,
    /// Unix timestamp to generate for (defaults to now)
    #[arg(long)]
    pub at: Option<i64>,
}

#[derive(clap::Args)]
pub struct TotpCheckArgs {
    /// Base32 shared secret
    pub secret: String,
    /// Submitted code
    pub code: String,
    /// Server time as Unix timestamp (defaults to now)
    #[arg(long)]
    pub at: Option<i64>,
    /// Client-reported time as Unix timestamp
    #[arg(long)]
    pub client_time: Option<i64>,
}

#[derive(clap::Args)]
pub struct TotpUriArgs {
    /// Base32 shared secret
    pub secret: String,
    /// Account label shown by the authenticator app
    pub account: String,
}

#[derive(clap::Args)]
pub struct VerifyTokenArgs {
    /// Bearer token, with or without the "Bearer " prefix
    pub token: String,
    /// Organization hint, as sent in the organization header
    #[arg(long)]
    pub org: Option<String>,
    /// Fail when no organization resolves
    #[arg(long)]
    pub require_org: bool,
}

#[derive(clap::Args)]
pub struct PermissionsArgs {
    /// Roles to expand
    #[arg(required = true)]
    pub roles: Vec<String>,
    /// Permission to check against the expanded set
    #[arg(long)]
    pub check: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_totp_check() {
        let cli = Cli::try_parse_from([
            "phishguard",
            "totp-check",
            "JBSWY3DPEHPK3PXP",
            "123456",
            "--client-time",
            "1700000000",
        ])
        .unwrap();
        match cli.command {
            Commands::TotpCheck(args) => {
                assert_eq!(args.code, "123456");
                assert_eq!(args.client_time, Some(1_700_000_000));
                assert!(args.at.is_none());
            }
            _ => panic!("expected totp-check"),
        }
    }

    #[test]
    fn test_permissions_require_roles() {
        assert!(Cli::try_parse_from(["phishguard", "permissions"]).is_err());
    }
}
