#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use crate::log::LogFile;
    use crate::record::{HEADER_SIZE, Record, TOMBSTONE};

    #[test]
    fn test_append_stamps_offset_and_writes_bytes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("append.db");
        let mut log = LogFile::open(&path, 0o644).unwrap();

        let mut record = Record::new(
            b"aragorn".to_vec(),
            b"He's trying to bring down the mountain!".to_vec(),
        )
        .unwrap();
        log.append(&mut record).unwrap();
        assert_eq!(record.offset(), 0);

        let mut second = Record::new(b"legolas".to_vec(), b"That is no orc horn.".to_vec()).unwrap();
        log.append(&mut second).unwrap();
        assert_eq!(second.offset(), record.encoded_len());

        log.sync().unwrap();

        let mut expected = record.encode();
        expected.extend_from_slice(&second.encode());
        assert_eq!(fs::read(&path).unwrap(), expected);
    }

    #[test]
    fn test_tombstone_byte_placement() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tombstone.db");
        let mut log = LogFile::open(&path, 0o644).unwrap();

        let mut first = Record::new(b"gandalf".to_vec(), b"Fool of a Took!".to_vec()).unwrap();
        log.append(&mut first).unwrap();
        let mut second = Record::new(b"gimli".to_vec(), b"Deep is the abyss".to_vec()).unwrap();
        log.append(&mut second).unwrap();

        log.write_tombstone(second.offset()).unwrap();
        log.sync().unwrap();

        let bytes = fs::read(&path).unwrap();
        // The first record is untouched, the second's flag byte is set.
        assert_eq!(bytes[HEADER_SIZE - 1], 0);
        assert_eq!(bytes[second.offset() as usize + HEADER_SIZE - 1], TOMBSTONE);

        // Only the flag byte changed.
        let mut expected = first.encode();
        let mut tombstoned = second.encode();
        tombstoned[HEADER_SIZE - 1] = TOMBSTONE;
        expected.extend_from_slice(&tombstoned);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_size_tracks_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("size.db");
        let mut log = LogFile::open(&path, 0o644).unwrap();
        assert_eq!(log.size().unwrap(), 0);

        let mut record = Record::new(b"hamfast".to_vec(), b"All's well".to_vec()).unwrap();
        log.append(&mut record).unwrap();
        assert_eq!(log.size().unwrap(), record.encoded_len());

        // Tombstoning rewrites in place; the size must not move.
        log.write_tombstone(record.offset()).unwrap();
        assert_eq!(log.size().unwrap(), record.encoded_len());
    }

    #[test]
    fn test_truncate_shrinks_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("truncate.db");
        let mut log = LogFile::open(&path, 0o644).unwrap();

        let mut record = Record::new(b"faramir".to_vec(), b"War will make corpses".to_vec()).unwrap();
        log.append(&mut record).unwrap();

        log.truncate(HEADER_SIZE as u32).unwrap();
        assert_eq!(log.size().unwrap(), HEADER_SIZE as u32);

        log.truncate(0).unwrap();
        assert_eq!(log.size().unwrap(), 0);
    }

    #[test]
    fn test_append_after_scan_goes_to_end() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("append-end.db");
        let mut log = LogFile::open(&path, 0o644).unwrap();

        let mut first = Record::new(b"one".to_vec(), b"1".to_vec()).unwrap();
        log.append(&mut first).unwrap();

        // Leave the file position at the start, as a finished recovery
        // scan of an empty region would.
        log.rewind().unwrap();

        let mut second = Record::new(b"two".to_vec(), b"2".to_vec()).unwrap();
        log.append(&mut second).unwrap();
        assert_eq!(second.offset(), first.encoded_len());
        assert_eq!(log.size().unwrap(), first.encoded_len() + second.encoded_len());
    }
}
