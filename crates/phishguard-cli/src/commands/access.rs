use anyhow::Result;
use phishguard_auth::rbac;
use serde_json::json;

use crate::cli::PermissionsArgs;
use crate::output::{print_failure, print_json, print_success};

pub fn permissions(args: &PermissionsArgs) -> Result<()> {
    let none: &[&str] = &[];
    let access = rbac::expand_roles(args.roles.as_slice(), none);

    print_json(&json!({
        "roles": access.roles,
        "permissions": access.permissions.iter().collect::<Vec<_>>(),
        "unrestricted": access.permissions.is_unrestricted(),
    }));

    if let Some(required) = &args.check {
        if access.can(required) {
            print_success(&format!("Granted: {required}"));
        } else {
            print_failure(&format!("Denied: {required}"));
            anyhow::bail!("permission {required} is not granted");
        }
    }
    Ok(())
}
