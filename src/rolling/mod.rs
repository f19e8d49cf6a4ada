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

//! The writer side of the pipeline: destination files, daily rotation and retention.

use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use jiff::civil::Date;

use crate::LogRecord;
use crate::clock::Clock;
use crate::route::Router;

mod archive;
mod retention;

/// Appends records to their destination files and rotates them daily.
///
/// Owned by the writer thread alone, so neither the handle table nor the current day needs
/// synchronization.
///
/// Rotation is lazy per destination. When the day changes, every open handle is closed and its
/// destination is marked stale with the day it was written. A stale destination is compressed
/// into `<file>-<YYYY_MM_DD>.gz` right before its next write, and the archives next to it are
/// swept for retention.
#[derive(Debug)]
pub(crate) struct RollingWriter {
    router: Router,
    clock: Clock,
    retention_days: u32,
    day: Date,
    handles: HashMap<PathBuf, BufWriter<File>>,
    stale: HashMap<PathBuf, Date>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Phase {
    Writing,
    Rotating(Date),
}

impl RollingWriter {
    pub(crate) fn new(router: Router, clock: Clock, retention_days: u32) -> Self {
        let day = clock.today();
        Self {
            router,
            clock,
            retention_days,
            day,
            handles: HashMap::new(),
            stale: HashMap::new(),
        }
    }

    pub(crate) fn write(&mut self, record: &LogRecord) -> anyhow::Result<()> {
        let dst = self.router.resolve(record.route_key());

        let mut phase = Phase::Writing;
        loop {
            match phase {
                Phase::Writing => {
                    let today = self.clock.today();
                    if today != self.day {
                        phase = Phase::Rotating(today);
                        continue;
                    }

                    if let Some(day) = self.stale.remove(&dst) {
                        self.archive(&dst, day)?;
                    }
                    let writer = self.open(&dst)?;
                    return writer
                        .write_all(record.payload())
                        .with_context(|| format!("failed to write {}", dst.display()));
                }
                Phase::Rotating(today) => {
                    self.rotate(today)?;
                    phase = Phase::Writing;
                }
            }
        }
    }

    pub(crate) fn flush(&mut self) -> anyhow::Result<()> {
        for (path, writer) in self.handles.iter_mut() {
            writer
                .flush()
                .with_context(|| format!("failed to flush {}", path.display()))?;
        }
        Ok(())
    }

    fn rotate(&mut self, today: Date) -> anyhow::Result<()> {
        log::debug!("rotating access logs from {} to {today}", self.day);

        for (path, mut writer) in self.handles.drain() {
            writer
                .flush()
                .with_context(|| format!("failed to flush {}", path.display()))?;
            self.stale.insert(path, self.day);
        }
        self.day = today;
        Ok(())
    }

    fn archive(&self, dst: &Path, day: Date) -> anyhow::Result<()> {
        if let Some(archived) = archive::compress(dst, day)? {
            log::debug!("archived {} to {}", dst.display(), archived.display());
        }

        let dir = dst.parent().unwrap_or(self.router.log_dir());
        retention::sweep(dir, self.retention_days, self.day);
        Ok(())
    }

    fn open(&mut self, dst: &Path) -> anyhow::Result<&mut BufWriter<File>> {
        if !self.handles.contains_key(dst) {
            if let Some(dir) = dst.parent() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(dst)
                .with_context(|| format!("failed to open log file {}", dst.display()))?;
            self.handles.insert(dst.to_path_buf(), BufWriter::new(file));
        }

        self.handles
            .get_mut(dst)
            .with_context(|| format!("no open handle for {}", dst.display()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Read;
    use std::str::FromStr;

    use flate2::read::GzDecoder;
    use jiff::ToSpan;
    use jiff::Zoned;
    use rand::Rng;
    use rand::distr::Alphanumeric;
    use tempfile::TempDir;

    use super::*;
    use crate::clock::ManualClock;

    fn writer(dir: &Path, prefixes: &[&str], clock: &ManualClock) -> RollingWriter {
        writer_with_retention(dir, prefixes, clock, 7)
    }

    fn writer_with_retention(
        dir: &Path,
        prefixes: &[&str],
        clock: &ManualClock,
        retention_days: u32,
    ) -> RollingWriter {
        let prefixes = prefixes.iter().map(|p| p.to_string()).collect();
        RollingWriter::new(
            Router::new(dir, prefixes),
            Clock::from(clock.clone()),
            retention_days,
        )
    }

    fn gunzip(path: &Path) -> String {
        let mut content = String::new();
        GzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    #[test]
    fn test_records_append_in_order() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let clock = ManualClock::new(Zoned::from_str("2024-08-10T10:00:00[UTC]").unwrap());
        let mut writer = writer(temp_dir.path(), &[], &clock);

        writer.write(&LogRecord::new("/a", "1\n")).unwrap();
        writer.write(&LogRecord::new("/a", "2\n")).unwrap();
        writer.write(&LogRecord::new("/b", "3\n")).unwrap();
        writer.flush().unwrap();

        let content = fs::read_to_string(temp_dir.path().join("access.log")).unwrap();
        assert_eq!(content, "1\n2\n3\n");
        assert_eq!(writer.handles.len(), 1);
    }

    #[test]
    fn test_separate_destinations() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let clock = ManualClock::new(Zoned::from_str("2024-08-10T10:00:00[UTC]").unwrap());
        let mut writer = writer(temp_dir.path(), &["api"], &clock);

        writer.write(&LogRecord::new("/api/users", "u\n")).unwrap();
        writer.write(&LogRecord::new("/home", "h\n")).unwrap();
        writer.flush().unwrap();

        let users = temp_dir.path().join("api").join("users").join("access.log");
        assert_eq!(fs::read_to_string(users).unwrap(), "u\n");
        let shared = temp_dir.path().join("access.log");
        assert_eq!(fs::read_to_string(shared).unwrap(), "h\n");
    }

    #[test]
    fn test_rotation_at_midnight() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let clock = ManualClock::new(Zoned::from_str("2024-08-10T23:59:00[UTC]").unwrap());
        let mut writer = writer(temp_dir.path(), &[], &clock);

        writer.write(&LogRecord::new("/a", "before\n")).unwrap();
        clock.advance(2.minutes());
        writer.write(&LogRecord::new("/a", "after\n")).unwrap();
        writer.flush().unwrap();

        let archive = temp_dir.path().join("access.log-2024_08_10.gz");
        assert_eq!(gunzip(&archive), "before\n");
        let current = temp_dir.path().join("access.log");
        assert_eq!(fs::read_to_string(current).unwrap(), "after\n");
        assert_eq!(writer.day, jiff::civil::date(2024, 8, 11));
    }

    #[test]
    fn test_rotation_is_lazy_per_destination() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let clock = ManualClock::new(Zoned::from_str("2024-08-10T12:00:00[UTC]").unwrap());
        let mut writer = writer(temp_dir.path(), &["b"], &clock);

        writer.write(&LogRecord::new("/a", "a1\n")).unwrap();
        writer.write(&LogRecord::new("/b", "b1\n")).unwrap();

        clock.advance(1.day());
        writer.write(&LogRecord::new("/a", "a2\n")).unwrap();
        writer.flush().unwrap();

        // `b` has not been written today; its file is closed but untouched
        let b = temp_dir.path().join("b").join("access.log");
        assert_eq!(fs::read_to_string(&b).unwrap(), "b1\n");
        assert!(writer.handles.get(&b).is_none());
        assert!(temp_dir.path().join("access.log-2024_08_10.gz").exists());

        clock.advance(1.day());
        writer.write(&LogRecord::new("/b", "b3\n")).unwrap();
        writer.flush().unwrap();

        // archived under the day it was written, not the day it was rotated
        let archive = temp_dir.path().join("b").join("access.log-2024_08_10.gz");
        assert_eq!(gunzip(&archive), "b1\n");
        assert_eq!(fs::read_to_string(&b).unwrap(), "b3\n");
    }

    #[test]
    fn test_rotation_sweeps_outdated_archives() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let dir = temp_dir.path();
        fs::write(dir.join("access.log-2024_08_01.gz"), b"").unwrap();
        fs::write(dir.join("access.log-2024_08_10.gz"), b"").unwrap();

        let clock = ManualClock::new(Zoned::from_str("2024-08-11T12:00:00[UTC]").unwrap());
        let mut writer = writer_with_retention(dir, &[], &clock, 2);
        writer.write(&LogRecord::new("/", "x\n")).unwrap();
        clock.advance(1.day());
        writer.write(&LogRecord::new("/", "y\n")).unwrap();
        writer.flush().unwrap();

        // two days of retention on 08-12 keep only the archive made at this rotation
        assert!(!dir.join("access.log-2024_08_01.gz").exists());
        assert!(!dir.join("access.log-2024_08_10.gz").exists());
        assert_eq!(gunzip(&dir.join("access.log-2024_08_11.gz")), "x\n");
    }

    #[test]
    fn test_each_day_lands_in_its_own_archive() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let clock = ManualClock::new(Zoned::from_str("2024-08-10T00:00:00[UTC]").unwrap());
        let mut writer = writer_with_retention(temp_dir.path(), &[], &clock, 30);

        let mut days = vec![];
        for _ in 0..3 {
            let mut expected = String::new();
            for _ in 0..24 {
                let line = format!("{}\n", generate_random_string());
                writer.write(&LogRecord::new("/", line.as_str())).unwrap();
                expected.push_str(&line);
                clock.advance(1.hour());
            }
            writer.flush().unwrap();
            days.push(expected);
        }
        // the third day is archived on the first write of the fourth
        writer.write(&LogRecord::new("/", "last\n")).unwrap();
        writer.flush().unwrap();

        for (expected, day) in days.iter().zip(10..) {
            let archive = temp_dir.path().join(format!("access.log-2024_08_{day}.gz"));
            assert_eq!(&gunzip(&archive), expected);
        }
        let current = fs::read_to_string(temp_dir.path().join("access.log")).unwrap();
        assert_eq!(current, "last\n");
    }

    fn generate_random_string() -> String {
        let mut rng = rand::rng();
        let len = rng.random_range(50..=100);
        let random_string: String = std::iter::repeat(())
            .map(|()| rng.sample(Alphanumeric))
            .map(char::from)
            .take(len)
            .collect();

        random_string
    }
}
