use clap::{value_parser, Parser, Subcommand};

pub mod args;
pub mod commands;

/// Safe (ERC-4337) account tool
#[derive(Debug, Parser)]
#[command(author, version, about = "safe4337", long_about = None)]
pub struct Cli {
    /// The command to execute
    #[clap(subcommand)]
    command: Commands,

    /// The verbosity level
    #[clap(long, short, global = true, default_value_t = 2, value_parser = value_parser!(u8).range(..=4))]
    verbosity: u8,
}

impl Cli {
    /// Get the log level based on the verbosity level
    pub fn get_log_level(&self) -> String {
        match self.verbosity {
            0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        }
        .into()
    }
}

/// Commands to be executed
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Address and factory data of a new account
    #[command(name = "account-address")]
    AccountAddress(commands::AccountAddressCommand),

    /// Address of the verifier of a passkey owner
    #[command(name = "webauthn-verifier-address")]
    WebAuthnVerifierAddress(commands::WebAuthnVerifierAddressCommand),

    /// Encode transactions into executor call data
    #[command(name = "encode-call-data")]
    EncodeCallData(commands::EncodeCallDataCommand),

    /// Decode executor call data into transactions
    #[command(name = "decode-call-data")]
    DecodeCallData(commands::DecodeCallDataCommand),

    /// Hashes of a user operation
    #[command(name = "hash")]
    Hash(commands::HashCommand),

    /// Sign a user operation
    #[command(name = "sign")]
    Sign(commands::SignCommand),

    /// Read owners and nonce of a deployed account
    #[command(name = "owners")]
    Owners(commands::OwnersCommand),
}

pub fn run() -> eyre::Result<()> {
    let cli = Cli::parse();

    let rust_log = match std::env::var("RUST_LOG") {
        Ok(val) => format!("{val},safe4337={}", cli.get_log_level()),
        Err(_) => format!("safe4337={}", cli.get_log_level()),
    };
    std::env::set_var("RUST_LOG", rust_log);
    tracing_subscriber::fmt::init();

    match cli.command {
        Commands::AccountAddress(command) => command.execute(),
        Commands::WebAuthnVerifierAddress(command) => command.execute(),
        Commands::EncodeCallData(command) => command.execute(),
        Commands::DecodeCallData(command) => command.execute(),
        Commands::Hash(command) => command.execute(),
        Commands::Sign(command) => command.execute(),
        Commands::Owners(command) => {
            let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
            rt.block_on(command.execute())
        }
    }
}
