use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use super::SlotId;
use super::error::{FileError, FileResult};

/// A file treated as an append-only array of fixed-width slots.
///
/// Slot `i` occupies bytes `[i * slot_size, (i + 1) * slot_size)`, so any slot
/// is reachable with a single seek. Reads are bounds-checked against the
/// current slot count; writes may overwrite an existing slot in place or
/// extend the file by exactly one slot.
pub struct SlotFile {
    file: File,
    path: PathBuf,
    slot_size: usize,
    slot_count: usize,
}

impl SlotFile {
    /// Create a new, empty slot file, truncating any existing file
    pub fn create<P: AsRef<Path>>(path: P, slot_size: usize) -> FileResult<Self> {
        let path = path.as_ref();

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        debug!("created slot file {} (slot size {})", path.display(), slot_size);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            slot_size,
            slot_count: 0,
        })
    }

    /// Open an existing slot file for reading and writing
    pub fn open<P: AsRef<Path>>(path: P, slot_size: usize) -> FileResult<Self> {
        let path = path.as_ref();

        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FileError::FileNotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata()?.len();
        if len % slot_size as u64 != 0 {
            return Err(FileError::MisalignedFile {
                path: path.to_path_buf(),
                len,
                slot_size,
            });
        }

        let slot_count = (len / slot_size as u64) as usize;
        debug!("opened slot file {} with {} slots", path.display(), slot_count);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            slot_size,
            slot_count,
        })
    }

    /// Width of every slot in bytes
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Number of slots currently in the file
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Path this file was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of a slot
    pub fn offset_of(&self, slot: SlotId) -> u64 {
        (slot * self.slot_size) as u64
    }

    /// Read exactly one slot into `buffer`
    pub fn read_slot(&mut self, slot: SlotId, buffer: &mut [u8]) -> FileResult<()> {
        self.check_width(buffer.len())?;

        if slot >= self.slot_count {
            return Err(FileError::SlotOutOfRange {
                path: self.path.clone(),
                slot,
                slot_count: self.slot_count,
            });
        }

        let offset = self.offset_of(slot);
        self.seek_to(offset)?;

        let mut filled = 0;
        while filled < buffer.len() {
            match self.file.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(FileError::IoAt {
                        path: self.path.clone(),
                        offset,
                        source,
                    });
                }
            }
        }

        if filled < buffer.len() {
            return Err(FileError::ShortRead {
                path: self.path.clone(),
                offset,
                expected: buffer.len(),
                actual: filled,
            });
        }

        Ok(())
    }

    /// Overwrite an existing slot, or append when `slot == slot_count`
    pub fn write_slot(&mut self, slot: SlotId, buffer: &[u8]) -> FileResult<()> {
        self.check_width(buffer.len())?;

        if slot > self.slot_count {
            return Err(FileError::SlotOutOfRange {
                path: self.path.clone(),
                slot,
                slot_count: self.slot_count,
            });
        }

        let offset = self.offset_of(slot);
        self.seek_to(offset)?;
        self.file
            .write_all(buffer)
            .map_err(|source| FileError::IoAt {
                path: self.path.clone(),
                offset,
                source,
            })?;

        if slot == self.slot_count {
            self.slot_count += 1;
        }

        Ok(())
    }

    /// Append a slot at the end of the file, returning its index
    pub fn append_slot(&mut self, buffer: &[u8]) -> FileResult<SlotId> {
        let slot = self.slot_count;
        self.write_slot(slot, buffer)?;
        Ok(slot)
    }

    /// Sync the file to disk (flush all OS buffers)
    pub fn sync(&mut self) -> FileResult<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    fn check_width(&self, actual: usize) -> FileResult<()> {
        if actual != self.slot_size {
            return Err(FileError::InvalidSlotSize {
                expected: self.slot_size,
                actual,
            });
        }
        Ok(())
    }

    fn seek_to(&mut self, offset: u64) -> FileResult<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|source| FileError::IoAt {
                path: self.path.clone(),
                offset,
                source,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SLOT: usize = 64;

    fn setup_test_dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_create_file() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");

        let file = SlotFile::create(&test_file, SLOT).unwrap();
        assert!(test_file.exists());
        assert_eq!(file.slot_count(), 0);
        assert_eq!(file.slot_size(), SLOT);
    }

    #[test]
    fn test_create_file_in_missing_directory() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("nested").join("dir").join("test.db");

        SlotFile::create(&test_file, SLOT).unwrap();
        assert!(test_file.exists());
    }

    #[test]
    fn test_open_nonexistent_file() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("nonexistent.db");

        let result = SlotFile::open(&test_file, SLOT);
        assert!(matches!(result, Err(FileError::FileNotFound(_))));
    }

    #[test]
    fn test_read_write_slot() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut file = SlotFile::create(&test_file, SLOT).unwrap();

        let mut write_buffer = vec![0u8; SLOT];
        write_buffer[0] = 42;
        write_buffer[SLOT - 1] = 255;
        file.write_slot(0, &write_buffer).unwrap();

        let mut read_buffer = vec![0u8; SLOT];
        file.read_slot(0, &mut read_buffer).unwrap();
        assert_eq!(read_buffer, write_buffer);
    }

    #[test]
    fn test_append_and_reopen() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");

        {
            let mut file = SlotFile::create(&test_file, SLOT).unwrap();
            for i in 0..10u8 {
                let buffer = vec![i; SLOT];
                assert_eq!(file.append_slot(&buffer).unwrap(), i as usize);
            }
            file.sync().unwrap();
        }

        let mut file = SlotFile::open(&test_file, SLOT).unwrap();
        assert_eq!(file.slot_count(), 10);
        for i in 0..10u8 {
            let mut buffer = vec![0u8; SLOT];
            file.read_slot(i as usize, &mut buffer).unwrap();
            assert!(buffer.iter().all(|&b| b == i));
        }
    }

    #[test]
    fn test_overwrite_in_place() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut file = SlotFile::create(&test_file, SLOT).unwrap();

        file.append_slot(&[1u8; SLOT]).unwrap();
        file.append_slot(&[2u8; SLOT]).unwrap();
        file.write_slot(0, &[9u8; SLOT]).unwrap();

        assert_eq!(file.slot_count(), 2);
        let mut buffer = vec![0u8; SLOT];
        file.read_slot(0, &mut buffer).unwrap();
        assert!(buffer.iter().all(|&b| b == 9));
        file.read_slot(1, &mut buffer).unwrap();
        assert!(buffer.iter().all(|&b| b == 2));
    }

    #[test]
    fn test_read_out_of_range() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut file = SlotFile::create(&test_file, SLOT).unwrap();
        file.append_slot(&[0u8; SLOT]).unwrap();

        let mut buffer = vec![0u8; SLOT];
        let result = file.read_slot(1, &mut buffer);
        assert!(matches!(
            result,
            Err(FileError::SlotOutOfRange {
                slot: 1,
                slot_count: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_write_past_end_rejected() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut file = SlotFile::create(&test_file, SLOT).unwrap();

        let result = file.write_slot(3, &[0u8; SLOT]);
        assert!(matches!(result, Err(FileError::SlotOutOfRange { .. })));
        assert_eq!(file.slot_count(), 0);
    }

    #[test]
    fn test_invalid_buffer_size() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut file = SlotFile::create(&test_file, SLOT).unwrap();

        let mut small_buffer = vec![0u8; SLOT - 1];
        let result = file.read_slot(0, &mut small_buffer);
        assert!(matches!(result, Err(FileError::InvalidSlotSize { .. })));

        let large_buffer = vec![0u8; SLOT + 1];
        let result = file.write_slot(0, &large_buffer);
        assert!(matches!(result, Err(FileError::InvalidSlotSize { .. })));
    }

    #[test]
    fn test_open_misaligned_file() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        std::fs::write(&test_file, vec![0u8; SLOT + 3]).unwrap();

        let result = SlotFile::open(&test_file, SLOT);
        assert!(matches!(result, Err(FileError::MisalignedFile { .. })));
    }
}
