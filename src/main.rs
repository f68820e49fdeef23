use std::{
    env::current_dir,
    fs::{create_dir_all, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use certsign::{
    config::{read_config, read_config_file, Config},
    CertSigner, IssueRequest, IssuedCertificate,
};
use clap::Parser;
use cli::{Cli, Commands, SignArgs};
use directories::ProjectDirs;
use tracing_subscriber::EnvFilter;

mod cli;
mod utils;

const CERT_FILE: &str = "cert.pem";
const KEY_FILE: &str = "key.pem";

#[derive(Debug)]
enum Output {
    Text,
    Dir(PathBuf),
}

#[derive(Debug)]
struct SignPlan {
    request: IssueRequest,
    output: Output,
    force: bool,
    interactive: bool,
}

/// Command line wins over the config file, which wins over the defaults.
fn create_plan(args: SignArgs, config: &mut Config) -> anyhow::Result<SignPlan> {
    if let Some(ca_cert) = args.ca_cert {
        config.ca.cert_path = ca_cert;
    }
    if let Some(ca_key) = args.ca_key {
        config.ca.key_path = ca_key;
    }
    if args.script.is_some() {
        config.script.path = args.script;
    }

    let request = IssueRequest::new(args.domain.trim())
        .days(args.days.unwrap_or(config.defaults.days))
        .key_length(args.key_len.unwrap_or(config.defaults.key_len))
        .subject(args.subj.unwrap_or_else(|| config.defaults.subject.clone()));

    let output = if args.as_text {
        Output::Text
    } else if let Some(out) = args.out {
        Output::Dir(out)
    } else {
        Output::Dir(utils::domain_dir(&current_dir()?, &request.domain)?)
    };

    Ok(SignPlan {
        request,
        output,
        force: args.force,
        interactive: !args.non_interactive,
    })
}

fn init_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }
    let level = match verbose {
        0 => "certsign=warn",
        1 => "certsign=info",
        2 => "certsign=debug",
        _ => "certsign=trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => read_config_file(path)?,
        None => {
            let app = ProjectDirs::from("org", "certsign", "certsign")
                .context("can't find a home directory for the config file")?;
            read_config(&app)?
        }
    };

    match cli.command {
        Commands::Sign(args) => {
            let plan = create_plan(args, &mut config)?;
            sign(plan, &config)
        }
    }
}

fn sign(plan: SignPlan, config: &Config) -> anyhow::Result<()> {
    let signer = config.signer().context("can't set up signer")?;
    let domain = plan.request.domain.clone();
    let issued = signer
        .issue(&plan.request)
        .with_context(|| format!("Failed to sign domain \"{domain}\""))?;

    match plan.output {
        Output::Text => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(issued.cert_bytes())?;
            stdout.write_all(b"\n")?;
            stdout.write_all(issued.key_bytes())?;
        }
        Output::Dir(dir) => {
            save_cert(&dir, &issued, plan.force, plan.interactive)?;
            eprintln!("wrote {CERT_FILE} and {KEY_FILE} to {dir:?}");
        }
    }
    Ok(())
}

fn save_cert<P: AsRef<Path>>(
    dir: P,
    issued: &IssuedCertificate,
    force: bool,
    interactive: bool,
) -> anyhow::Result<()> {
    let dir = dir.as_ref();
    create_dir_all(dir).with_context(|| format!("can't create dir {dir:?}"))?;

    let cert_path = dir.join(CERT_FILE);
    let key_path = dir.join(KEY_FILE);
    let existing: Vec<&Path> = [cert_path.as_path(), key_path.as_path()]
        .into_iter()
        .filter(|path| path.exists())
        .collect();
    anyhow::ensure!(
        utils::may_overwrite(&existing, force, interactive)?,
        "not overwriting existing files in {dir:?}"
    );

    write_file(&cert_path, issued.cert_bytes(), 0o644)?;
    write_file(&key_path, issued.key_bytes(), 0o600)?;
    Ok(())
}

fn write_file(path: &Path, data: &[u8], mode: u32) -> anyhow::Result<()> {
    let mut options = File::options();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    options
        .open(path)
        .with_context(|| format!("can't open file {path:?}"))?
        .write_all(data)
        .with_context(|| format!("can't write file {path:?}"))
}
