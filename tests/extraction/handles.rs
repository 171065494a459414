//! Resource release on success and failure paths.

use std::path::Path;

use signer_extract::platform::ReleaseEvent;
use signer_extract::{
    DescriptorBuilder, ErrorKind, ExtractConfig, MappedImage, MemoryPlatform, NativePlatform,
};

use crate::common::*;

#[test]
fn test_failing_calls_leave_no_open_handles() {
    let mut bad = PeBuilder::pe32_plus().build();
    bad[0..2].copy_from_slice(b"ZM");
    let platform = MemoryPlatform::new().with_file("bad.exe", bad);
    let builder = DescriptorBuilder::with_platform(platform).with_config(ExtractConfig::offline());

    let before = builder.platform().stats().open_handles();
    const N: usize = 50;
    for _ in 0..N {
        assert_eq!(builder.build("bad.exe").unwrap_err().kind(), ErrorKind::NotAPEFile);
    }

    let stats = builder.platform().stats();
    assert_eq!(stats.open_handles(), before);
    assert_eq!(stats.files_opened(), N);
    assert_eq!(stats.views_mapped(), N);
    assert_eq!(stats.releases().len(), 2 * N);
}

#[test]
fn test_view_released_before_file() {
    let platform = MemoryPlatform::new()
        .with_file("ok.exe", PeBuilder::pe32_plus().signed_with(&[b"sig"]).build());
    let builder = DescriptorBuilder::with_platform(platform).with_config(ExtractConfig::offline());

    builder.build("ok.exe").unwrap();
    assert_eq!(
        builder.platform().stats().releases(),
        vec![ReleaseEvent::View, ReleaseEvent::File]
    );
}

#[test]
fn test_map_failure_reports_io_and_closes_file() {
    let platform = MemoryPlatform::new()
        .with_file("locked.exe", PeBuilder::pe32_plus().build())
        .with_map_failure("locked.exe");
    let builder = DescriptorBuilder::with_platform(platform);

    let err = builder.build("locked.exe").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains("locked.exe"));
    assert_eq!(builder.platform().stats().open_handles(), 0);
    assert_eq!(builder.platform().stats().releases(), vec![ReleaseEvent::File]);
}

#[test]
fn test_empty_file_on_disk() {
    let file = create_temp_file(b"");
    let err = DescriptorBuilder::with_platform(NativePlatform)
        .build(file.path())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyFile);
}

#[test]
fn test_missing_file_carries_os_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.exe");
    let err = DescriptorBuilder::new().build(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.os_code().is_some());
}

#[test]
fn test_mapping_does_not_lock_out_other_readers() {
    let data = PeBuilder::pe32().signed_with(&[b"shared"]).build();
    let file = create_temp_file(&data);

    let first = MappedImage::open(&NativePlatform, file.path()).unwrap();
    let second = MappedImage::open(&NativePlatform, file.path()).unwrap();
    assert_eq!(first.bytes(), second.bytes());
    assert_eq!(std::fs::read(file.path()).unwrap(), data);
    assert_eq!(first.path(), Path::new(file.path()));
}
