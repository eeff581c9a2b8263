//! Argument parsing and command dispatch for `proxymanctl`.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use proxyman_client::{HandlerService, HttpChannelConfig, Proxyman};
use proxyman_types::{Account, ProtocolAccount, ShadowsocksCipher, XtlsFlow};
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "proxymanctl")]
#[command(about = "Add, remove and list users on Xray inbounds")]
pub struct Cli {
    /// Base URL of the engine's handler service gateway
    #[arg(short, long, env = "PROXYMAN_ENDPOINT", default_value = "http://127.0.0.1:8080")]
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[arg(short, long, default_value = "10")]
    pub timeout: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Channel configuration derived from the global flags.
    pub fn channel_config(&self) -> HttpChannelConfig {
        HttpChannelConfig {
            base_url: self.endpoint.clone(),
            timeout_secs: self.timeout,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a user to an inbound
    AddUser(AddUserArgs),

    /// Remove a user from an inbound
    RemoveUser {
        /// Inbound tag
        #[arg(long)]
        tag: String,
        /// Email of the user to remove
        #[arg(long)]
        email: String,
    },

    /// List the users currently attached to an inbound
    ListUsers {
        /// Inbound tag
        #[arg(long)]
        tag: String,
    },
}

#[derive(Args, Debug)]
pub struct AddUserArgs {
    /// Inbound tag
    #[arg(long)]
    pub tag: String,

    /// Email identifying the user on the engine
    #[arg(long)]
    pub email: String,

    /// Policy level
    #[arg(long, default_value = "0")]
    pub level: u32,

    /// Inbound protocol
    #[arg(long, value_enum)]
    pub protocol: Protocol,

    /// UUID for vmess/vless, password for trojan/shadowsocks
    #[arg(long)]
    pub credential: String,

    /// VLESS flow, e.g. xtls-rprx-vision
    #[arg(long)]
    pub flow: Option<String>,

    /// Shadowsocks cipher method, e.g. aes-256-gcm
    #[arg(long)]
    pub cipher: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Vmess,
    Vless,
    Trojan,
    Shadowsocks,
}

impl AddUserArgs {
    /// Builds the account described by these arguments.
    pub fn to_account(&self) -> Result<Account> {
        let protocol = match self.protocol {
            Protocol::Vmess => ProtocolAccount::Vmess {
                id: parse_id(&self.credential)?,
            },
            Protocol::Vless => ProtocolAccount::Vless {
                id: parse_id(&self.credential)?,
                flow: match &self.flow {
                    Some(flow) => flow.parse()?,
                    None => XtlsFlow::None,
                },
            },
            Protocol::Trojan => ProtocolAccount::Trojan {
                password: self.credential.clone(),
            },
            Protocol::Shadowsocks => ProtocolAccount::Shadowsocks {
                password: self.credential.clone(),
                cipher: match &self.cipher {
                    Some(cipher) => cipher.parse()?,
                    None => ShadowsocksCipher::default(),
                },
            },
        };
        if self.flow.is_some() && self.protocol != Protocol::Vless {
            bail!("--flow only applies to vless");
        }
        if self.cipher.is_some() && self.protocol != Protocol::Shadowsocks {
            bail!("--cipher only applies to shadowsocks");
        }

        Ok(Account::new(self.email.clone(), protocol)?.with_level(self.level))
    }
}

fn parse_id(credential: &str) -> Result<Uuid> {
    Uuid::parse_str(credential).with_context(|| format!("invalid user id: {credential}"))
}

/// Runs `command` against `client`, returning the lines to print.
pub async fn run<S: HandlerService>(client: &Proxyman<S>, command: &Command) -> Result<Vec<String>> {
    match command {
        Command::AddUser(args) => {
            let account = args.to_account()?;
            client
                .add_inbound_user(&args.tag, &account)
                .await
                .with_context(|| format!("failed to add {} to {}", args.email, args.tag))?;
            info!("Added {} to {}", args.email, args.tag);
            Ok(Vec::new())
        }
        Command::RemoveUser { tag, email } => {
            client
                .remove_inbound_user(tag, email)
                .await
                .with_context(|| format!("failed to remove {email} from {tag}"))?;
            info!("Removed {} from {}", email, tag);
            Ok(Vec::new())
        }
        Command::ListUsers { tag } => client
            .list_inbound_users(tag)
            .await
            .with_context(|| format!("failed to list users of {tag}")),
    }
}
