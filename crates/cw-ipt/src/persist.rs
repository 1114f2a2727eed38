use anyhow::{Context as _, Result};
use cw_core::{ChainId, CommandRunner, Context, PersistConfig, Persister, Protocol};
use similar::{ChangeTag, TextDiff};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Writes the output of the family's save command to the configured rules file.
pub struct SaveFilePersister<R> {
    runner: R,
    config: PersistConfig,
}

impl<R: CommandRunner> SaveFilePersister<R> {
    pub fn new(runner: R, config: PersistConfig) -> Self {
        Self { runner, config }
    }
}

impl<R: CommandRunner> Persister for SaveFilePersister<R> {
    fn persist(&self, ctx: &dyn Context, name: &ChainId, protocol: Protocol) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let path = self.config.path_for(protocol);
        let dump = self.runner.execute(protocol.save_command())?;
        let previous = match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        let stripped_dump = strip_comments(&dump);
        if let Some(previous) = &previous {
            let stripped_previous = strip_comments(previous);
            if stripped_previous == stripped_dump {
                ctx.debug(&format!(
                    "{} is already up to date after changing '{}'",
                    path.display(),
                    name
                ));
                return Ok(());
            }
        }

        let (added, removed) = diff_stats(
            previous.as_deref().map(strip_comments).as_deref().unwrap_or(""),
            &stripped_dump,
        );
        ctx.debug(&format!(
            "Saving {} ruleset to {} (+{} -{} lines)",
            protocol,
            path.display(),
            added,
            removed
        ));

        write_atomic(path, &dump)
    }
}

/// Drop the `# Generated/Completed on ...` lines, which change on every dump.
fn strip_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .map(|line| format!("{}\n", line))
        .collect()
}

fn diff_stats(previous: &str, current: &str) -> (usize, usize) {
    let diff = TextDiff::from_lines(previous, current);
    let mut added = 0;
    let mut removed = 0;

    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => removed += 1,
            ChangeTag::Equal => {}
        }
    }

    (added, removed)
}

/// Scratch file next to the target, e.g. `rules.v4.tmp`.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let tmp = tmp_path(path);
    std::fs::write(&tmp, content)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}
