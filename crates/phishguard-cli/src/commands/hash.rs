use anyhow::Result;
use phishguard_auth::secret_hash;

use crate::cli::SecretHashArgs;

pub fn secret_hash(args: &SecretHashArgs) -> Result<()> {
    let hash = secret_hash::sign(&args.username, &args.client_id, &args.client_secret)?;
    println!("{hash}");
    Ok(())
}
