use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// the config file.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
    /// more logging, repeat for more.
    #[arg(long, short, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// no logging at all.
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Issue a certificate and private key for a domain.
    Sign(SignArgs),
}

#[derive(Args, Debug)]
pub struct SignArgs {
    /// domain to sign, becomes the certificate's common name.
    pub domain: String,
    /// path to CA cert.
    #[arg(long, env = "CA_CRT")]
    pub ca_cert: Option<PathBuf>,
    /// path to CA private key.
    #[arg(long, env = "CA_KEY")]
    pub ca_key: Option<PathBuf>,
    /// the private key length in bits.
    #[arg(long, env = "KEY_LEN")]
    pub key_len: Option<u32>,
    /// days for certificate to be valid.
    #[arg(long, env = "DAYS", allow_negative_numbers = true)]
    pub days: Option<i64>,
    /// subject string, e.g. /C=US/O=org. CN is always the domain.
    #[arg(long, env = "SUBJ")]
    pub subj: Option<String>,
    /// sign by running this script instead of the built-in signer.
    #[arg(long, env = "SIGN_SCRIPT")]
    pub script: Option<PathBuf>,
    /// Output dir for cert.pem and key.pem, defaults to ./<domain>
    #[arg(long, conflicts_with = "as_text")]
    pub out: Option<PathBuf>,
    /// print certificate and key instead of writing files.
    #[arg(long)]
    pub as_text: bool,
    /// overwrite existing files without asking.
    #[arg(long, short)]
    pub force: bool,
    /// never prompt, fail instead.
    #[arg(long)]
    pub non_interactive: bool,
}
