//! `treesync init --profile <name> [target flags]`

use anyhow::{Context, Result};
use clap::Args;

use treesync_core::{config, ProfileName};

use super::TargetArgs;

/// Save a named sync profile.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Name of the profile to write. Creates ~/.treesync/<name>.yaml
    #[arg(long = "name", short = 'n')]
    pub name: String,

    #[command(flatten)]
    pub target: TargetArgs,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let config = self.target.resolve()?;
        let name = ProfileName::from(self.name);
        config::save(&name, &config)
            .with_context(|| format!("failed to save profile '{name}'"))?;

        println!("✓ Saved profile '{}' → {}", name, config.target);
        println!("  Saved to: ~/.treesync/{name}.yaml");
        if matches!(config.target, treesync_core::Target::Ftp { password: Some(_), .. }) {
            println!("  Note: the password is stored in plain text (file mode 0600).");
        }
        Ok(())
    }
}
