#[cfg(test)]
mod tests {
    use crate::record::{HEADER_SIZE, Record, RecordHeader};

    #[test]
    fn test_empty_value_round_trips() {
        let record = Record::new(b"legolas".to_vec(), Vec::new()).unwrap();
        let bytes = record.encode();
        assert_eq!(bytes.len(), HEADER_SIZE + 7);

        let header = RecordHeader::decode(&bytes[..HEADER_SIZE]).unwrap();
        assert_eq!(header.val_size, 0);

        let back = Record::from_wire(&header, &bytes[HEADER_SIZE..]).unwrap();
        assert_eq!(back.key(), b"legolas");
        assert!(back.value().is_empty());
    }

    #[test]
    fn test_empty_key_and_value_round_trip() {
        let record = Record::new(Vec::new(), Vec::new()).unwrap();
        let bytes = record.encode();
        assert_eq!(bytes.len(), HEADER_SIZE);

        let header = RecordHeader::decode(&bytes).unwrap();
        let back = Record::from_wire(&header, &[]).unwrap();
        assert_eq!(record, back);
    }

    #[test]
    fn test_binary_key_and_value() {
        let key = vec![0x00, 0xff, 0x01, 0xfe];
        let value = vec![0x01; 300];
        let record = Record::new(key.clone(), value.clone()).unwrap();

        let bytes = record.encode();
        let header = RecordHeader::decode(&bytes[..HEADER_SIZE]).unwrap();
        let back = Record::from_wire(&header, &bytes[HEADER_SIZE..]).unwrap();

        assert_eq!(back.key(), key.as_slice());
        assert_eq!(back.value(), value.as_slice());
    }

    #[test]
    fn test_header_body_len_does_not_overflow() {
        // A corrupt header can claim sizes that sum past u32::MAX; the
        // widened arithmetic must not wrap.
        let header = RecordHeader {
            key_size: u32::MAX,
            val_size: u32::MAX,
            deleted: false,
        };
        assert_eq!(header.body_len(), 2 * (u32::MAX as u64));
        assert_eq!(header.record_len(), HEADER_SIZE as u64 + 2 * (u32::MAX as u64));
    }

    #[test]
    fn test_encoded_len_matches_parts() {
        let record = Record::new(b"boromir".to_vec(), b"You are no Elf.".to_vec()).unwrap();
        assert_eq!(record.encoded_len() as usize, HEADER_SIZE + 7 + 15);
    }
}
