//! PE header location and validation

use tracing::trace;

use crate::formats::pe::types::*;
use crate::formats::pe::utils::{check_bounds, ReadExt};

/// Validate the DOS stub and return `e_lfanew`.
pub fn parse_dos_header(data: &[u8]) -> Result<u32> {
    if data.read_u16_le_at(0) != Some(DOS_SIGNATURE) {
        return Err(PeError::InvalidDosSignature);
    }

    check_bounds(0, DOS_HEADER_SIZE, data.len())?;

    data.read_u32_le_at(E_LFANEW_OFFSET)
        .ok_or(PeError::TruncatedHeader {
            expected: DOS_HEADER_SIZE,
            actual: data.len(),
        })
}

/// COFF file header fields we keep.
struct CoffFields {
    machine: Machine,
    number_of_sections: u16,
    size_of_optional_header: u16,
    characteristics: u16,
}

fn parse_coff_header(data: &[u8], offset: usize) -> Result<CoffFields> {
    check_bounds(offset, 20, data.len())?;
    let truncated = || PeError::TruncatedHeader {
        expected: offset + 20,
        actual: data.len(),
    };

    Ok(CoffFields {
        machine: Machine::from(data.read_u16_le_at(offset).ok_or_else(truncated)?),
        number_of_sections: data.read_u16_le_at(offset + 2).ok_or_else(truncated)?,
        size_of_optional_header: data.read_u16_le_at(offset + 16).ok_or_else(truncated)?,
        characteristics: data.read_u16_le_at(offset + 18).ok_or_else(truncated)?,
    })
}

/// Parse the data directory table at `offset`, keeping at most
/// [`MAX_DATA_DIRECTORIES`] entries.
pub fn parse_data_directories(
    data: &[u8],
    offset: usize,
    declared: u32,
) -> Result<Vec<DataDirectoryEntry>> {
    let count = (declared as usize).min(MAX_DATA_DIRECTORIES);
    check_bounds(offset, count * DATA_DIRECTORY_ENTRY_SIZE, data.len())?;

    let mut directories = Vec::with_capacity(count);
    for i in 0..count {
        let entry_offset = offset + i * DATA_DIRECTORY_ENTRY_SIZE;
        let truncated = || PeError::TruncatedHeader {
            expected: entry_offset + DATA_DIRECTORY_ENTRY_SIZE,
            actual: data.len(),
        };
        directories.push(DataDirectoryEntry {
            virtual_address: data.read_u32_le_at(entry_offset).ok_or_else(truncated)?,
            size: data.read_u32_le_at(entry_offset + 4).ok_or_else(truncated)?,
        });
    }

    Ok(directories)
}

/// Locate and validate the executable header of a mapped image.
///
/// Walks DOS stub -> `PE\0\0` -> COFF header -> optional header magic -> data
/// directory table. Every offset taken from the file is bounds-checked against
/// `data.len()` before it is dereferenced.
pub fn locate(data: &[u8]) -> Result<ImageHeader> {
    let e_lfanew = parse_dos_header(data)?;
    let nt_offset = e_lfanew as usize;

    check_bounds(nt_offset, PE_SIGNATURE.len(), data.len())?;
    if data.read_slice_at(nt_offset, PE_SIGNATURE.len()) != Some(&PE_SIGNATURE[..]) {
        return Err(PeError::InvalidPeSignature);
    }

    let coff = parse_coff_header(data, nt_offset + 4)?;

    let opt_offset = nt_offset + NT_PREAMBLE_SIZE;
    let magic = data
        .read_u16_le_at(opt_offset)
        .ok_or(PeError::TruncatedHeader {
            expected: opt_offset + 2,
            actual: data.len(),
        })?;
    let kind = OptionalHeaderKind::from_magic(magic)?;

    let count_offset = opt_offset + kind.rva_count_offset();
    let declared_directory_count =
        data.read_u32_le_at(count_offset)
            .ok_or(PeError::TruncatedHeader {
                expected: count_offset + 4,
                actual: data.len(),
            })?;

    let data_directory_offset = opt_offset + kind.data_directory_offset();
    let data_directories =
        parse_data_directories(data, data_directory_offset, declared_directory_count)?;

    trace!(
        nt_offset,
        ?kind,
        machine = ?coff.machine,
        directories = data_directories.len(),
        "Located image header"
    );

    Ok(ImageHeader {
        nt_offset,
        machine: coff.machine,
        number_of_sections: coff.number_of_sections,
        size_of_optional_header: coff.size_of_optional_header,
        characteristics: coff.characteristics,
        kind,
        declared_directory_count,
        data_directory_offset,
        data_directories,
    })
}
