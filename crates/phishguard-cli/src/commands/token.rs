use anyhow::Result;
use phishguard_auth::token::bearer_token;
use phishguard_auth::{AuthConfig, OrgHints, OrgRequirement, TokenVerifier, rbac};
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::cli::VerifyTokenArgs;
use crate::output::{print_json, print_success};

pub async fn verify(config: &AuthConfig, args: &VerifyTokenArgs) -> Result<()> {
    let verifier = TokenVerifier::from_config(config)?;
    let token = bearer_token(&args.token).unwrap_or(args.token.as_str());

    let mut hints = OrgHints::none();
    if let Some(org) = &args.org {
        hints = hints.with_header(org);
    }
    let requirement = if args.require_org {
        OrgRequirement::Required
    } else {
        OrgRequirement::Optional
    };

    let ctx = verifier.verify(token, &hints, requirement).await?;
    let none: &[&str] = &[];
    let access = rbac::expand_roles(ctx.roles.as_slice(), none);
    let expires = OffsetDateTime::from_unix_timestamp(ctx.expires_at)?.format(&Rfc3339)?;

    print_success(&format!("Token verified for {}", ctx.display_name()));
    print_json(&json!({
        "subject": ctx.subject,
        "username": ctx.username,
        "orgId": ctx.org_id,
        "tokenUse": ctx.token_use,
        "expiresAt": expires,
        "roles": access.roles,
        "permissions": access.permissions.iter().collect::<Vec<_>>(),
    }));
    Ok(())
}
