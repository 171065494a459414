//! Header validation through the public builder.

use signer_extract::formats::pe::{locate, Machine, PeImage};
use signer_extract::{DescriptorBuilder, ErrorKind, ExtractConfig, MemoryPlatform};

use crate::common::*;

fn build(data: Vec<u8>) -> signer_extract::Result<signer_extract::SignerDescriptor> {
    let platform = MemoryPlatform::new().with_file("image.exe", data);
    DescriptorBuilder::with_platform(platform)
        .with_config(ExtractConfig::offline())
        .build("image.exe")
}

#[test]
fn test_pe32_and_pe32_plus_variants() {
    let pe32 = PeBuilder::pe32().build();
    let header = locate(&pe32).unwrap();
    assert!(!header.is_64bit());
    assert_eq!(header.machine, Machine::I386);

    let pe64 = PeBuilder::pe32_plus().build();
    let header = locate(&pe64).unwrap();
    assert!(header.is_64bit());
    assert_eq!(header.machine, Machine::X86_64);
}

#[test]
fn test_bad_dos_signature() {
    let mut data = PeBuilder::pe32_plus().build();
    data[0] = b'X';
    assert_eq!(build(data).unwrap_err().kind(), ErrorKind::NotAPEFile);
}

#[test]
fn test_bad_nt_signature() {
    let mut data = PeBuilder::pe32_plus().build();
    data[E_LFANEW + 2] = b'X';
    assert_eq!(build(data).unwrap_err().kind(), ErrorKind::NotAPEFile);
}

#[test]
fn test_short_files() {
    assert_eq!(build(b"MZ".to_vec()).unwrap_err().kind(), ErrorKind::TruncatedHeader);
    assert_eq!(build(b"ELF".to_vec()).unwrap_err().kind(), ErrorKind::NotAPEFile);
}

#[test]
fn test_e_lfanew_past_end() {
    let mut data = PeBuilder::pe32_plus().build();
    put_u32(&mut data, 60, 0xFFFF_FFF0);
    assert_eq!(build(data).unwrap_err().kind(), ErrorKind::TruncatedHeader);
}

#[test]
fn test_unknown_optional_magic() {
    let mut data = PeBuilder::pe32_plus().build();
    put_u16(&mut data, OPTIONAL_HEADER, 0x0107);
    let err = build(data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedMachine);
    assert!(err.to_string().contains("0x0107"));
}

#[test]
fn test_directory_table_past_end() {
    let data = PeBuilder::pe32_plus().build();
    // Table for PE32+ spans 0x108..0x188; cut inside it.
    let truncated = data[..0x120].to_vec();
    assert_eq!(build(truncated).unwrap_err().kind(), ErrorKind::TruncatedHeader);
}

#[test]
fn test_directory_count_is_clamped() {
    let data = PeBuilder::pe32_plus().directory_count(0xFFFF).build();
    let header = locate(&data).unwrap();
    assert_eq!(header.declared_directory_count, 0xFFFF);
    assert_eq!(header.data_directories.len(), 16);
}

#[test]
fn test_few_directories_means_unsigned() {
    // The security slot lies beyond the declared count, so its bytes are ignored.
    let data = PeBuilder::pe32_plus()
        .signed_with(&[b"ignored"])
        .directory_count(4)
        .build();
    let image = PeImage::parse(&data).unwrap();
    assert!(!image.has_certificate_table());
    assert!(build(data).unwrap().certificates.is_empty());
}
