use std::path::{Path, PathBuf};

use rustyline::DefaultEditor;

pub fn prompt_question(
    rl: &mut DefaultEditor,
    question: &str,
    true_answer: &str,
) -> anyhow::Result<bool> {
    let response = rl.readline(question)?;
    Ok(response.trim().to_lowercase() == true_answer)
}

/// Decides whether existing output files may be replaced.
pub fn may_overwrite(
    existing: &[&Path],
    force: bool,
    interactive: bool,
) -> anyhow::Result<bool> {
    if existing.is_empty() || force {
        return Ok(true);
    }
    if !interactive {
        return Ok(false);
    }
    let names = existing
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let mut rl = DefaultEditor::new()?;
    prompt_question(&mut rl, &format!("{names} already exists. Overwrite? (y/N) "), "y")
}

/// `<base>/<domain>`, as long as the domain is a single plain path component.
pub fn domain_dir(base: &Path, domain: &str) -> anyhow::Result<PathBuf> {
    let domain = domain.trim();
    anyhow::ensure!(
        !domain.is_empty()
            && domain != "."
            && domain != ".."
            && !domain.contains(['/', '\\']),
        "can't use {domain:?} as a directory name, pass --out"
    );
    Ok(base.join(domain))
}
