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

use std::ffi::OsString;
use std::fs;
use std::fs::File;
use std::io;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use flate2::Compression;
use flate2::write::GzEncoder;
use jiff::civil::Date;

pub(crate) const DATE_FORMAT: &str = "%Y_%m_%d";

/// The archive path of `src` for `day`: `<src>-<YYYY_MM_DD>.gz`.
pub(crate) fn archive_path(src: &Path, day: Date) -> PathBuf {
    let mut name = OsString::from(src.as_os_str());
    name.push(format!("-{}.gz", day.strftime(DATE_FORMAT)));
    PathBuf::from(name)
}

/// Compresses `src` into its archive for `day` and removes `src`.
///
/// The source is removed only after the archive is completely written. Returns `None` if there
/// was nothing to archive.
pub(crate) fn compress(src: &Path, day: Date) -> anyhow::Result<Option<PathBuf>> {
    let infile = match File::open(src) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            log::warn!("log file {} vanished before rotation", src.display());
            return Ok(None);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to open {}", src.display()));
        }
    };
    let mut reader = BufReader::new(infile);

    let dst = archive_path(src, day);
    let outfile =
        File::create(&dst).with_context(|| format!("failed to create {}", dst.display()))?;
    let mut encoder = GzEncoder::new(BufWriter::new(outfile), Compression::default());
    io::copy(&mut reader, &mut encoder)
        .with_context(|| format!("failed to compress {}", src.display()))?;
    encoder
        .finish()
        .and_then(|mut writer| writer.flush())
        .with_context(|| format!("failed to finish {}", dst.display()))?;

    fs::remove_file(src).with_context(|| format!("failed to remove {}", src.display()))?;
    Ok(Some(dst))
}
