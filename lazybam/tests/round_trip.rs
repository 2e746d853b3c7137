use lazybam::record::{decode, tags};
use lazybam::{Flags, Plain, ProgramRecord, Reader, Sequential, Writer};
use std::io::Cursor;
use tempdir::TempDir;

const PAIRED_END: &[u8] = include_bytes!("data/paired_end.ubam");

fn records<S: lazybam::BlockSource>(reader: &mut Reader<S>) -> Vec<Vec<u8>> {
    reader
        .records()
        .map(|r| r.unwrap().into_inner())
        .collect()
}

#[test]
fn test_bgzf_file_round_trip() {
    let dir = TempDir::new("lazybam").unwrap();
    let path = dir.path().join("paired_end.bam");

    let mut input = Reader::new(Sequential(PAIRED_END)).unwrap();
    let expected = records(&mut input);

    {
        let mut writer = Writer::from_path(&path).unwrap();
        writer
            .write_header(input.header(), input.references())
            .unwrap();
        for record in &expected {
            writer.write_record(record).unwrap();
        }
        writer.finish().unwrap();
    }

    let mut reader = Reader::from_path(&path).unwrap();
    assert_eq!(reader.header(), input.header());
    assert_eq!(reader.references().raw(), input.references().raw());
    assert_eq!(records(&mut reader), expected);

    // rewinding through BGZF virtual positions
    reader.reset_alignments().unwrap();
    assert_eq!(records(&mut reader), expected);
}

#[test]
fn test_provenance_round_trip() {
    let dir = TempDir::new("lazybam").unwrap();
    let path = dir.path().join("tagged.bam");

    let mut input = Reader::new(Plain(Cursor::new(PAIRED_END))).unwrap();
    let pg = ProgramRecord::new("lazybam", "lazybam", "0.1.0").with_command_line("round_trip");
    let header = input.header().updated_header(&pg).unwrap();
    let references = input.references().clone();

    {
        let mut writer = Writer::from_path(&path).unwrap();
        writer.write_header(&header, &references).unwrap();
        while let Some(record) = input.next_record().unwrap() {
            writer.write_record(&record).unwrap();
        }
        writer.finish().unwrap();
    }

    let mut reader = Reader::from_path(&path).unwrap();
    assert!(reader.header().is_length_consistent());
    let programs = reader.header().programs();
    let last = programs.last().unwrap();
    assert_eq!(last.id, "lazybam");
    assert_eq!(last.previous.as_deref(), Some("bowtie2"));
    assert_eq!(reader.header().sort_order(), Some("unsorted"));

    let first = reader.next_record().unwrap().unwrap();
    assert_eq!(first.ref_index().unwrap(), 12);
    assert_eq!(first.alignment_start().unwrap(), 133186150);
    assert!(first.flags().unwrap().contains(Flags::PAIRED | Flags::REVERSE));
    assert_eq!(first.cigar().unwrap(), "99M1S");
    let tag_data = first.raw_tags().unwrap();
    assert_eq!(
        tags::alignment_score(tag_data, None, tags::TagScan::Structured).unwrap(),
        Some(198)
    );
    let md = tags::mismatch_string(tag_data, None, tags::TagScan::Structured).unwrap();
    assert_eq!(md, Some("99"));

    let second = reader.next_record().unwrap().unwrap();
    assert_eq!(second.ref_index().unwrap(), -1);
    assert!(second.flags().unwrap().contains(Flags::UNMAPPED));
    assert_eq!(
        decode::decode_seq(second.raw_seq().unwrap()).len(),
        second.raw_seq().unwrap().len() * 2
    );
    assert!(reader.next_record().unwrap().is_none());
}
