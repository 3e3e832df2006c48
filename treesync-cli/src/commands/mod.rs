pub mod init;
pub mod plan;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use treesync_core::config::{self, DEFAULT_FTP_PORT};
use treesync_core::{ProfileName, SyncConfig, Target};
use treesync_sync::{DirRemote, FtpRemote, Remote};

// ---------------------------------------------------------------------------
// Shared target arguments
// ---------------------------------------------------------------------------

/// Where to sync from and to. Flags win over the environment, which wins
/// over the selected profile.
#[derive(Args, Debug, Default, Clone)]
pub struct TargetArgs {
    /// Saved profile to start from (see `treesync init`).
    #[arg(long, short = 'p')]
    pub profile: Option<String>,

    /// FTP server host name.
    #[arg(long, env = "INPUT_SERVER")]
    pub server: Option<String>,

    /// FTP control port [default: 21].
    #[arg(long, env = "INPUT_PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "INPUT_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "INPUT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Mirror into a local (or mounted) directory instead of an FTP server.
    #[arg(long, value_name = "DIR")]
    pub mirror_dir: Option<PathBuf>,

    /// Local directory to publish [default: ./].
    #[arg(long, env = "INPUT_LOCAL_DIR")]
    pub local_dir: Option<PathBuf>,

    /// Remote directory, relative to the login directory [default: ./].
    #[arg(long, env = "INPUT_SERVER_DIR")]
    pub server_dir: Option<String>,

    /// File name of the manifest kept in the server directory.
    #[arg(long)]
    pub manifest_name: Option<String>,

    /// Relative path to leave alone on both sides (repeatable).
    #[arg(long = "exclude", value_name = "PATH")]
    pub exclude: Vec<String>,
}

impl TargetArgs {
    /// Merge flags over the selected profile.
    pub fn resolve(&self) -> Result<SyncConfig> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        self.resolve_at(&home)
    }

    pub fn resolve_at(&self, home: &Path) -> Result<SyncConfig> {
        let profile = match &self.profile {
            Some(name) => {
                let name = ProfileName::from(name.as_str());
                let loaded = config::load_at(home, &name).with_context(|| {
                    format!(
                        "failed to load profile '{name}' ({}) — run `treesync init` first",
                        known_profiles(home)
                    )
                })?;
                Some(loaded)
            }
            None => None,
        };

        let target = self.target(profile.as_ref().map(|p| &p.target))?;
        let mut config = match profile {
            Some(mut loaded) => {
                loaded.target = target;
                loaded
            }
            None => SyncConfig::new(target),
        };
        if let Some(local_dir) = &self.local_dir {
            config.local_dir = local_dir.clone();
        }
        if let Some(server_dir) = &self.server_dir {
            config.server_dir = server_dir.clone();
        }
        if let Some(manifest_name) = &self.manifest_name {
            config.manifest_name = manifest_name.clone();
        }
        config.exclude.extend(self.exclude.iter().cloned());
        Ok(config)
    }

    fn target(&self, saved: Option<&Target>) -> Result<Target> {
        if let Some(root) = &self.mirror_dir {
            return Ok(Target::Directory { root: root.clone() });
        }

        let (saved_server, saved_port, saved_user, saved_password) = match saved {
            Some(Target::Ftp {
                server,
                port,
                username,
                password,
            }) => (
                Some(server.clone()),
                Some(*port),
                Some(username.clone()),
                password.clone(),
            ),
            Some(other) if self.server.is_none() => return Ok(other.clone()),
            _ => (None, None, None, None),
        };

        let Some(server) = self.server.clone().or(saved_server) else {
            bail!(
                "no target: pass --server (or set INPUT_SERVER), --mirror-dir, \
                 or select a profile with --profile"
            );
        };
        let Some(username) = self.username.clone().or(saved_user) else {
            bail!("missing FTP username: pass --username or set INPUT_USERNAME");
        };
        Ok(Target::Ftp {
            server,
            port: self.port.or(saved_port).unwrap_or(DEFAULT_FTP_PORT),
            username,
            password: self.password.clone().or(saved_password),
        })
    }
}

fn known_profiles(home: &Path) -> String {
    match config::list_profiles_at(home) {
        Ok(names) if !names.is_empty() => {
            let names: Vec<String> = names.iter().map(ToString::to_string).collect();
            format!("saved profiles: {}", names.join(", "))
        }
        _ => "no saved profiles".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Remote session
// ---------------------------------------------------------------------------

/// An open connection to the resolved target.
pub enum Session {
    Ftp(FtpRemote),
    Dir(DirRemote),
}

impl Session {
    pub fn open(target: &Target) -> Result<Self> {
        match target {
            Target::Ftp {
                server,
                port,
                username,
                password,
            } => {
                let password = password
                    .as_deref()
                    .context("missing FTP password: pass --password or set INPUT_PASSWORD")?;
                let remote = FtpRemote::connect(server, *port, username, password)
                    .with_context(|| format!("could not connect to {target}"))?;
                Ok(Session::Ftp(remote))
            }
            Target::Directory { root } => {
                let remote = DirRemote::open(root)
                    .with_context(|| format!("cannot open mirror directory '{}'", root.display()))?;
                Ok(Session::Dir(remote))
            }
        }
    }

    pub fn remote(&mut self) -> &mut dyn Remote {
        match self {
            Session::Ftp(remote) => remote,
            Session::Dir(remote) => remote,
        }
    }

    pub fn close(self) -> Result<()> {
        match self {
            Session::Ftp(remote) => remote.quit().context("FTP logout failed"),
            Session::Dir(_) => Ok(()),
        }
    }
}
