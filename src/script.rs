//! Signing by delegating to an external script.
//!
//! The script is run as `<interpreter> <script> <domain>` and must print one
//! PEM certificate and one PEM private key on stdout. Days, key length and
//! subject are *not* passed along; the script picks its own.

use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use crate::{
    error::{CertError, Result},
    signer::{CertSigner, IssueRequest, IssuedCertificate},
};

pub const DEFAULT_INTERPRETER: &str = "bash";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Per stream. Anything past this is read and thrown away.
pub const MAX_OUTPUT_BYTES: u64 = 1 << 20;
const POLL_INTERVAL: Duration = Duration::from_millis(20);

const CERTIFICATE_LABELS: &[&str] = &["CERTIFICATE"];
const PRIVATE_KEY_LABELS: &[&str] = &["RSA PRIVATE KEY", "PRIVATE KEY"];

#[derive(Debug, Clone)]
pub struct ScriptSigner {
    script: PathBuf,
    interpreter: Option<PathBuf>,
    timeout: Duration,
}

impl ScriptSigner {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            interpreter: Some(DEFAULT_INTERPRETER.into()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// `None` executes the script directly.
    pub fn with_interpreter(mut self, interpreter: Option<PathBuf>) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    fn command(&self, domain: &str) -> Command {
        let mut cmd = match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&self.script);
                cmd
            }
            None => Command::new(&self.script),
        };
        cmd.arg(domain)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // own group, so a timeout takes anything the script left running
        // with it
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }

    fn run(&self, domain: &str) -> Result<ScriptOutput> {
        let execution_error = |status: String, stderr: String| {
            CertError::ScriptExecution {
                domain: domain.to_owned(),
                status,
                stderr,
            }
        };

        let mut child = self.command(domain).spawn().map_err(|e| {
            execution_error(
                format!("{:?} could not be started", self.script),
                e.to_string(),
            )
        })?;
        let deadline = Instant::now() + self.timeout;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let timed_out = |child: &mut Child| {
            tracing::warn!(
                domain,
                script = ?self.script,
                timeout = ?self.timeout,
                "script timed out, killing it"
            );
            terminate(child);
            CertError::ScriptTimeout {
                domain: domain.to_owned(),
                timeout: self.timeout,
            }
        };

        let status = match wait_until(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => return Err(timed_out(&mut child)),
            Err(e) => {
                terminate(&mut child);
                return Err(execution_error(
                    "could not be waited on".into(),
                    e.to_string(),
                ));
            }
        };

        // a background process can keep the pipes open after the script
        // itself has exited
        let Some(stdout) = collect(&stdout, deadline) else {
            return Err(timed_out(&mut child));
        };
        let Some(stderr) = collect(&stderr, deadline) else {
            return Err(timed_out(&mut child));
        };

        Ok(ScriptOutput {
            status,
            stdout,
            stderr,
        })
    }
}

impl CertSigner for ScriptSigner {
    fn issue(&self, request: &IssueRequest) -> Result<IssuedCertificate> {
        let domain = request.domain.as_str();
        tracing::info!(domain, script = ?self.script, "signing domain with script");
        tracing::debug!(
            days = request.days,
            key_len = request.key_length,
            subj = %request.subject,
            "script decides days, key length and subject on its own"
        );

        let output = self.run(domain)?;
        if !output.status.success() {
            return Err(CertError::ScriptExecution {
                domain: domain.to_owned(),
                status: output.status.to_string(),
                stderr: output.stderr,
            });
        }

        parse_script_output(&output.stdout)
    }
}

struct ScriptOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

/// Pulls the certificate and private key blocks out of whatever the script
/// printed.
pub fn parse_script_output(stdout: &str) -> Result<IssuedCertificate> {
    let cert_pem = extract_pem_block(stdout, CERTIFICATE_LABELS)
        .ok_or(CertError::OutputParse {
            block: "certificate",
        })?;
    let key_pem = extract_pem_block(stdout, PRIVATE_KEY_LABELS)
        .ok_or(CertError::OutputParse {
            block: "private key",
        })?;
    Ok(IssuedCertificate { cert_pem, key_pem })
}

/// Returns the first complete block whose label is one of `labels`.
fn extract_pem_block(text: &str, labels: &[&str]) -> Option<String> {
    let mut block = String::new();
    let mut end_marker: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(end) = &end_marker {
            block.push_str(line);
            block.push('\n');
            if line == end {
                return Some(block);
            }
            continue;
        }

        let label = labels
            .iter()
            .find(|label| line == format!("-----BEGIN {label}-----"));
        if let Some(label) = label {
            block.push_str(line);
            block.push('\n');
            end_marker = Some(format!("-----END {label}-----"));
        }
    }

    None
}

/// Reads a pipe to its end on a helper thread, keeping the first
/// [`MAX_OUTPUT_BYTES`].
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = (&mut pipe).take(MAX_OUTPUT_BYTES).read_to_end(&mut buf);
            // keep the writer from blocking on a full pipe
            let _ = io::copy(&mut pipe, &mut io::sink());
            let _ = tx.send(buf);
        });
    }
    rx
}

/// `None` when the pipe is still open at the deadline.
fn collect(output: &Receiver<Vec<u8>>, deadline: Instant) -> Option<String> {
    match output.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(buf) => Some(String::from_utf8_lossy(&buf).into_owned()),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
    }
}

/// Kills the script's whole process group and reaps the script.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::{
            errno::Errno,
            sys::signal::{killpg, Signal},
            unistd::Pid,
        };

        if let Ok(pid) = i32::try_from(child.id()) {
            match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => tracing::warn!(pid, error = %e, "can't kill script process group"),
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn wait_until(
    child: &mut Child,
    deadline: Instant,
) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
