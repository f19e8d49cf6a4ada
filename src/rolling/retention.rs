// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs;
use std::path::Path;

use jiff::Span;
use jiff::civil::Date;

use crate::rolling::archive::DATE_FORMAT;

/// Deletes the archives directly under `dir` dated `retention_days` or more days before `today`.
///
/// An archive is due once a whole window has passed since the midnight that starts its day, so
/// with one day of retention yesterday's archive goes at the first rotation of today.
///
/// Nothing here is fatal: unreadable entries, foreign `.gz` files and failed deletions are logged
/// and left for the next sweep. Returns the number of archives deleted.
pub(crate) fn sweep(dir: &Path, retention_days: u32, today: Date) -> usize {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(err) => {
            log::warn!("failed to read log dir {}: {err}", dir.display());
            return 0;
        }
    };

    // windows beyond the supported date range keep everything
    let cutoff = Span::new()
        .try_days(i64::from(retention_days))
        .map(|window| today.saturating_sub(window))
        .unwrap_or(Date::MIN);
    let mut deleted = 0;
    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("failed to read entry of {}: {err}", dir.display());
                continue;
            }
        };

        // Only archives we could have written: regular files named `*.log-<date>.gz`.
        match entry.file_type() {
            Ok(file_type) if file_type.is_file() => {}
            Ok(_) => continue,
            Err(err) => {
                log::warn!("failed to stat {}: {err}", entry.path().display());
                continue;
            }
        }
        let filename = entry.file_name();
        let Some(filename) = filename.to_str() else {
            continue;
        };
        if !filename.ends_with(".gz") {
            continue;
        }

        let date = match archive_date(filename) {
            Some(date) => date,
            None => {
                log::warn!("skip archive with malformed name: {filename}");
                continue;
            }
        };
        if date > cutoff {
            continue;
        }

        let path = entry.path();
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("deleted outdated archive {}", path.display());
                deleted += 1;
            }
            Err(err) => log::warn!("failed to delete archive {}: {err}", path.display()),
        }
    }
    deleted
}

/// Parses the date of an archive named `<name>.log-<YYYY_MM_DD>.gz`.
fn archive_date(filename: &str) -> Option<Date> {
    let stem = filename.strip_suffix(".gz")?;
    let (_, date) = stem.rsplit_once(".log-")?;
    Date::strptime(DATE_FORMAT, date).ok()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_archive_date() {
        assert_eq!(
            archive_date("access.log-2024_08_09.gz"),
            Some(jiff::civil::date(2024, 8, 9))
        );
        assert_eq!(archive_date("access.log-2024-08-09.gz"), None);
        assert_eq!(archive_date("backup.tar.gz"), None);
        assert_eq!(archive_date("access.log-2024_13_40.gz"), None);
        assert_eq!(archive_date("access.log"), None);
    }

    #[test]
    fn test_sweep_deletes_archives_outside_retention() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let dir = temp_dir.path();
        let today = jiff::civil::date(2024, 8, 10);

        // three days of retention: 08-07 is out, 08-08 is the oldest kept
        touch(dir, "access.log-2024_08_01.gz");
        touch(dir, "access.log-2024_08_07.gz");
        touch(dir, "access.log-2024_08_08.gz");
        touch(dir, "access.log-2024_08_09.gz");
        touch(dir, "access.log");
        touch(dir, "notes.gz");
        fs::create_dir(dir.join("nested.log-2024_01_01.gz")).unwrap();

        assert_eq!(sweep(dir, 3, today), 2);

        let mut remaining = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        remaining.sort();
        assert_eq!(
            remaining,
            vec![
                "access.log",
                "access.log-2024_08_08.gz",
                "access.log-2024_08_09.gz",
                "nested.log-2024_01_01.gz",
                "notes.gz",
            ]
        );
    }

    #[test]
    fn test_sweep_window_boundary() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let dir = temp_dir.path();
        touch(dir, "access.log-2024_08_05.gz");
        touch(dir, "access.log-2024_08_06.gz");

        assert_eq!(sweep(dir, 7, jiff::civil::date(2024, 8, 12)), 1);
        assert!(!dir.join("access.log-2024_08_05.gz").exists());
        assert!(dir.join("access.log-2024_08_06.gz").exists());

        // a single day of retention drops yesterday's archive
        assert_eq!(sweep(dir, 1, jiff::civil::date(2024, 8, 7)), 1);
        assert_eq!(fs::read_dir(dir).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_sweep_skips_failed_deletions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let dir = temp_dir.path().join("locked");
        fs::create_dir(&dir).unwrap();
        touch(&dir, "access.log-2024_08_01.gz");
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();

        // privileged users ignore directory permissions; nothing can fail then
        let enforced = fs::File::create(dir.join("access.log")).is_err();
        let deleted = sweep(&dir, 1, jiff::civil::date(2024, 8, 10));
        let archive_left = dir.join("access.log-2024_08_01.gz").exists();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();

        if enforced {
            assert_eq!(deleted, 0);
            assert!(archive_left);
        }
    }

    #[test]
    fn test_sweep_missing_dir() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let missing = temp_dir.path().join("missing");
        assert_eq!(sweep(&missing, 7, jiff::civil::date(2024, 8, 10)), 0);
    }
}
