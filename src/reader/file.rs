/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Contains an implementation of [`Read`](super::Read) for
//! files, memory mapping them where possible.
//!
//! A `*.json` extension switches the scanner into JSON
//! compatibility mode automatically; the detection can be
//! overridden after opening.

use std::{fs::File, io::Read as _, path::Path};

use memmap2::Mmap;

use super::{
    error::{ReadError, ReaderResult},
    private::Sealed,
    Read, ReadContext, Reader,
};
use crate::scanner::flag::{Flags, O_EXTENDABLE, O_JSON};

/// Threshold under which mapping a file is not worth the
/// syscalls
const MMAP_MIN_SIZE: u64 = 16 * 1024;

/// A [`Read`](super::Read) implementor for files.
///
/// The whole file is available up front, either memory
/// mapped or read into a buffer, so token slices borrow
/// directly from the file contents.
#[derive(Debug)]
pub struct FileReader
{
    backing: Backing,
    json:    bool,
}

enum Backing
{
    /// The live mapping; its address is stable for the
    /// reader's lifetime
    Mapped(Mmap),
    /// Small (or unmappable) files are buffered instead
    Buffered(String),
}

impl FileReader
{
    /// Open (and possibly map) the file at .path
    pub(crate) fn open(path: &Path) -> ReaderResult<Self>
    {
        let json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        let mut file = File::open(path)?;
        let len = file.metadata()?.len();

        let backing = match len >= MMAP_MIN_SIZE
        {
            true => match map_file(&file)
            {
                Some(map) => Backing::Mapped(map),
                None => Backing::Buffered(read_to_string(&mut file, len)?),
            },
            false => Backing::Buffered(read_to_string(&mut file, len)?),
        };

        // Validate mapped content is UTF8 once, up front
        if let Backing::Mapped(ref map) = backing
        {
            std::str::from_utf8(&map[..])?;
        }

        Ok(Self { backing, json })
    }

    /// Whether the scanner will run in JSON compatibility
    /// mode for this file
    pub fn is_json(&self) -> bool
    {
        self.json
    }

    /// Override the extension based JSON detection
    pub fn set_json(&mut self, json: bool)
    {
        self.json = json;
    }

    pub(crate) fn new_reader(&self, opts: Flags) -> Reader<'_, Self>
    {
        Reader::new(self, opts)
    }

    fn data(&self) -> &str
    {
        match &self.backing
        {
            // Contents were validated in open()
            Backing::Mapped(map) =>
            {
                std::str::from_utf8(&map[..]).expect("mapped file was validated as UTF8")
            },
            Backing::Buffered(data) => data,
        }
    }
}

impl Read for FileReader
{
    fn drive<'de>(&'de self, cxt: ReadContext<'_, '_, 'de>) -> Result<(), ReadError>
    {
        let mut flags = cxt.flags & !O_EXTENDABLE;

        if self.json
        {
            flags |= O_JSON;
        }

        cxt.scanner.scan_tokens(flags, self.data(), cxt.queue)?;

        Ok(())
    }

    unsafe fn consume(&self, _bound: usize) -> Result<(), ReadError>
    {
        Ok(())
    }
}

impl Sealed for FileReader {}

impl std::fmt::Debug for Backing
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            Self::Mapped(map) => f.debug_tuple("Mapped").field(&map.len()).finish(),
            Self::Buffered(data) => f.debug_tuple("Buffered").field(&data.len()).finish(),
        }
    }
}

fn map_file(file: &File) -> Option<Mmap>
{
    // Safety: the mapping is read only and this module never
    // hands out the backing File, so the contents cannot be
    // mutated underneath the map through us. A hostile
    // process truncating the file concurrently is outside
    // our threat model, as it is for every mmap consumer
    unsafe { Mmap::map(file).ok() }
}

fn read_to_string(file: &mut File, len: u64) -> ReaderResult<String>
{
    let mut buffer = String::with_capacity(len as usize);

    file.read_to_string(&mut buffer)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests
{
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        reader::test_util::{TestResult, MAPPING_MARKERS, TEST_FLAGS, YAML_MAPPING},
        scanner::flag::O_ZEROED,
    };

    fn temp_file(name: &str, content: &str) -> std::path::PathBuf
    {
        let mut path = std::env::temp_dir();
        path.push(format!("yarrow-file-reader-{}-{}", std::process::id(), name));

        let mut file = File::create(&path).expect("creating a temp file");
        file.write_all(content.as_bytes()).expect("writing temp file");

        path
    }

    #[test]
    fn scan_from_file() -> TestResult
    {
        let path = temp_file("mapping.yaml", YAML_MAPPING);

        let src = FileReader::open(&path)?;
        let mut reader = Reader::new(&src, TEST_FLAGS);

        crate::reader::test_util::drive_test(&mut reader, &MAPPING_MARKERS)?;

        std::fs::remove_file(&path).ok();

        Ok(())
    }

    #[test]
    fn json_detection_by_extension() -> TestResult
    {
        let path = temp_file("detect.json", "{}");

        let src = FileReader::open(&path)?;

        assert!(src.is_json());

        std::fs::remove_file(&path).ok();

        Ok(())
    }

    #[test]
    fn json_mode_rejects_yaml_constructs() -> TestResult
    {
        let path = temp_file("strict.json", "- a\n- b\n");

        let src = FileReader::open(&path)?;
        let mut reader = src.new_reader(O_ZEROED);

        assert!(reader.scan_tokens().is_err() || reader.scan_tokens().is_err());

        std::fs::remove_file(&path).ok();

        Ok(())
    }

    #[test]
    fn json_detection_can_be_overridden() -> TestResult
    {
        let path = temp_file("override.json", "- a\n- b\n");

        let mut src = FileReader::open(&path)?;
        src.set_json(false);

        let mut reader = src.new_reader(O_ZEROED);

        while !reader.is_exhausted()
        {
            reader.scan_tokens()?;
        }

        std::fs::remove_file(&path).ok();

        Ok(())
    }
}
