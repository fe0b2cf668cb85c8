//! Discovery of paired `<name>.up.sql` / `<name>.down.sql` files.

use crate::error::{LoadDiagnostic, MigrateError, MigrateResult};
use crate::migration::Migration;
use crate::set::MigrationSet;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

/// Suffix of forward migration files
pub const UP_SUFFIX: &str = ".up.sql";
/// Suffix of reverse migration files
pub const DOWN_SUFFIX: &str = ".down.sql";

/// Where migration files come from
pub trait MigrationSource {
    /// Names of the entries directly inside `dir`
    fn list(&self, dir: &Path) -> io::Result<Vec<String>>;

    /// Contents of the file at `path`
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// [`MigrationSource`] backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl MigrationSource for FsSource {
    fn list(&self, dir: &Path) -> io::Result<Vec<String>> {
        std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Pick out the migration names that have both halves present.
///
/// Returns accepted names in first-seen order alongside one diagnostic per
/// rejected filename. The diagnostics are empty when nothing was rejected.
pub fn migration_names_from_filenames<S: AsRef<str>>(
    filenames: &[S],
) -> (Vec<String>, Vec<LoadDiagnostic>) {
    let present: HashSet<&str> = filenames.iter().map(|f| f.as_ref()).collect();
    let mut accepted: Vec<String> = Vec::new();
    let mut rejected = Vec::new();

    for filename in filenames {
        let filename: &str = filename.as_ref();
        let Some(base) = filename
            .strip_suffix(UP_SUFFIX)
            .or_else(|| filename.strip_suffix(DOWN_SUFFIX))
        else {
            rejected.push(LoadDiagnostic::InvalidSuffix {
                filename: filename.to_string(),
            });
            continue;
        };

        if accepted.iter().any(|name| name == base) {
            continue;
        }
        let paired = present.contains(format!("{base}{UP_SUFFIX}").as_str())
            && present.contains(format!("{base}{DOWN_SUFFIX}").as_str());
        if paired {
            accepted.push(base.to_string());
        } else {
            rejected.push(LoadDiagnostic::MissingReverse {
                filename: filename.to_string(),
            });
        }
    }

    (accepted, rejected)
}

/// Migrations built from a directory, plus everything that went wrong
#[derive(Debug)]
pub struct LoadReport {
    pub dir: PathBuf,
    /// Every migration that was read successfully, in name order
    pub migrations: MigrationSet,
    pub diagnostics: Vec<LoadDiagnostic>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The loaded set, or an aggregate error when anything was rejected
    pub fn into_set(self) -> MigrateResult<MigrationSet> {
        if self.is_clean() {
            Ok(self.migrations)
        } else {
            Err(MigrateError::Load {
                path: self.dir.display().to_string(),
                diagnostics: self.diagnostics,
            })
        }
    }
}

/// Load every migration pair in `dir` through `source`.
///
/// Only a failure to list the directory is returned as an error; pairing and
/// read problems are collected on the report so the usable migrations are
/// still available.
pub fn load_directory(source: &dyn MigrationSource, dir: &Path) -> MigrateResult<LoadReport> {
    let mut filenames = source.list(dir).map_err(|e| MigrateError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;
    filenames.sort();

    let (names, mut diagnostics) = migration_names_from_filenames(filenames.as_slice());
    let mut migrations = Vec::with_capacity(names.len());
    for name in names {
        let up_path = dir.join(format!("{name}{UP_SUFFIX}"));
        let down_path = dir.join(format!("{name}{DOWN_SUFFIX}"));
        match Migration::from_source(source, &name, &up_path, &down_path) {
            Ok(migration) => migrations.push(migration),
            Err(MigrateError::Io { path, source: e }) => {
                diagnostics.push(LoadDiagnostic::Unreadable {
                    path,
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    log::debug!(
        "Loaded {} migration(s) from {} with {} diagnostic(s)",
        migrations.len(),
        dir.display(),
        diagnostics.len()
    );
    Ok(LoadReport {
        dir: dir.to_path_buf(),
        migrations: MigrationSet::new(migrations),
        diagnostics,
    })
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod tests;
