//! End-to-end scenarios spanning more than one module: asymmetric chunk
//! sizes across a bundle, and a directory tree with an empty subdirectory,
//! a multi-megabyte file, and attached metadata round-tripping through
//! both the multi-directory framing and the symfile container.

use std::io::Cursor;
use std::path::PathBuf;

use satchel_core::bundle::{decode_combined, encode_combined, EncodeRequest, InputSource};
use satchel_core::identity::KeyPairInfo;
use satchel_core::multidir::{compressing_reader, Consumer, MaterialisingWriter, Producer};
use satchel_core::primitives::fill_random;
use satchel_core::symfile::{self, PayloadKind};

#[test]
fn bundle_round_trip_survives_asymmetric_chunk_sizes() {
    let alice = KeyPairInfo::new_keypair_with_seeds("alice");
    let bob = KeyPairInfo::new_keypair_with_seeds("bob");
    let bob_info = bob.to_key_info();
    let alice_info = alice.to_key_info();

    let mut plaintext = vec![0u8; 10 * 1024 * 1024];
    fill_random(&mut plaintext);

    let req = EncodeRequest {
        sender: &alice,
        receiver: &bob_info,
        input_source: InputSource::Direct,
        original_file_name: None,
        original_file_date: None,
        chunk_size: 32_000,
    };

    let mut combined = Vec::new();
    encode_combined(&req, Cursor::new(&plaintext), &mut combined).unwrap();

    let mut out = Vec::new();
    decode_combined(&bob, &alice_info, &combined[..], &mut out, 65_535, None).unwrap();

    assert_eq!(out, plaintext);
}

fn write_file(path: &std::path::Path, bytes: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

#[test]
fn multidir_round_trip_preserves_empty_dirs_and_metadata() {
    let src = tempfile::tempdir().unwrap();

    let dir_a = src.path().join("dir_a");
    std::fs::create_dir_all(dir_a.join("empty_child")).unwrap();

    let mut big_file = vec![0u8; 5 * 1024 * 1024 + 17];
    fill_random(&mut big_file);
    write_file(&dir_a.join("big.bin"), &big_file);

    let metadata = vec![("k1".to_string(), b"v1".to_vec()), ("k2".to_string(), b"v2".to_vec())];

    let mut producer = Producer::new(&[dir_a.clone()], metadata.clone()).unwrap();

    let dest = tempfile::tempdir().unwrap();
    let mut consumer = Consumer::new(dest.path().to_path_buf());
    std::io::copy(&mut producer, &mut consumer).unwrap();

    assert!(consumer.is_done());
    assert_eq!(consumer.metadata(), metadata.as_slice());

    let recovered_big = std::fs::read(dest.path().join("dir_a").join("big.bin")).unwrap();
    assert_eq!(recovered_big, big_file);
    assert!(dest.path().join("dir_a").join("empty_child").is_dir());
}

#[test]
fn symfile_round_trip_carries_a_compressed_directory_tree() {
    let src = tempfile::tempdir().unwrap();
    let root = src.path().join("payload");
    write_file(&root.join("a.txt"), b"alpha");
    write_file(&root.join("nested").join("b.txt"), b"bravo");

    let reader = compressing_reader(&[root.clone()], Vec::new(), true).unwrap();

    let mut symfile_bytes = Vec::new();
    symfile::encode(b"correct horse battery staple", PayloadKind::MultiDir, None, reader, &mut symfile_bytes, 4096).unwrap();

    let dest = tempfile::tempdir().unwrap();
    let dest_root = dest.path().to_path_buf();

    let header = symfile::decode(b"correct horse battery staple", Cursor::new(symfile_bytes), 4096, move |header| {
        assert_eq!(header.payload_type(), PayloadKind::MultiDir);
        let writer = MaterialisingWriter::new(dest_root.clone(), true)?;
        Ok(Box::new(writer) as Box<dyn std::io::Write>)
    })
    .unwrap();
    assert_eq!(header.payload_type(), PayloadKind::MultiDir);

    let recovered_a = std::fs::read(dest.path().join("payload").join("a.txt")).unwrap();
    assert_eq!(recovered_a, b"alpha");
    let recovered_b = std::fs::read(dest.path().join("payload").join("nested").join("b.txt")).unwrap();
    assert_eq!(recovered_b, b"bravo");
}

#[test]
fn symfile_decode_rejects_wrong_password_before_touching_disk() {
    let dest = tempfile::tempdir().unwrap();
    let mut symfile_bytes = Vec::new();
    symfile::encode(b"right password", PayloadKind::Stream, None, &b"payload"[..], &mut symfile_bytes, 4096).unwrap();

    let marker: PathBuf = dest.path().join("should_not_exist.bin");
    let marker_for_closure = marker.clone();
    let result = symfile::decode(b"wrong password", Cursor::new(symfile_bytes), 4096, move |_header| {
        Ok(Box::new(std::fs::File::create(&marker_for_closure)?) as Box<dyn std::io::Write>)
    });

    assert!(result.is_err());
    assert!(!marker.exists());
}
