use anyhow::{Context, Result};
use phishguard_auth::totp::Match;
use phishguard_auth::{AuthConfig, Clock, SystemClock, TotpMatcher};

use crate::cli::{TotpCheckArgs, TotpCodeArgs, TotpUriArgs};
use crate::output::{print_failure, print_field, print_success};

pub fn code(config: &AuthConfig, args: &TotpCodeArgs) -> Result<()> {
    let matcher = TotpMatcher::new(&config.totp);
    let at = timestamp(args.at)?;
    let code = matcher.code_at(&args.secret, at)?;
    println!("{code}");
    Ok(())
}

pub fn check(config: &AuthConfig, args: &TotpCheckArgs) -> Result<()> {
    let matcher = TotpMatcher::new(&config.totp);
    let at = timestamp(args.at)?;
    let client_time = args
        .client_time
        .map(|t| u64::try_from(t).context("client time must not be negative"))
        .transpose()?;

    match matcher.matching_offset(&args.secret, args.code.trim(), at, client_time) {
        Some(Match::Window(offset)) => {
            print_success("Code accepted");
            print_field("Step offset", &offset.to_string());
            Ok(())
        }
        Some(Match::ClientTime) => {
            print_success("Code accepted at client time");
            Ok(())
        }
        None => {
            print_failure("Code rejected");
            print_field(
                "Tolerance",
                &format!("±{}s", config.totp.tolerance().as_secs()),
            );
            anyhow::bail!("code does not match");
        }
    }
}

pub fn uri(config: &AuthConfig, args: &TotpUriArgs) -> Result<()> {
    let matcher = TotpMatcher::new(&config.totp);
    println!("{}", matcher.provisioning_uri(&args.secret, &args.account)?);
    Ok(())
}

fn timestamp(at: Option<i64>) -> Result<u64> {
    let at = at.unwrap_or_else(|| SystemClock.unix_timestamp());
    u64::try_from(at).context("timestamp must not be negative")
}
