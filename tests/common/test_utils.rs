//! Synthetic PE images and temporary-file helpers.

use std::io::Write;

use tempfile::NamedTempFile;

pub const E_LFANEW: usize = 0x80;
pub const OPTIONAL_HEADER: usize = E_LFANEW + 24;
pub const HEADERS_END: usize = 0x200;

pub const WIN_CERT_REVISION_2_0: u16 = 0x0200;
pub const WIN_CERT_TYPE_PKCS_SIGNED_DATA: u16 = 0x0002;

/// One WIN_CERTIFICATE record to embed.
#[derive(Debug, Clone)]
pub struct TestCertificate {
    pub revision: u16,
    pub certificate_type: u16,
    pub payload: Vec<u8>,
}

impl TestCertificate {
    pub fn pkcs(payload: &[u8]) -> Self {
        Self {
            revision: WIN_CERT_REVISION_2_0,
            certificate_type: WIN_CERT_TYPE_PKCS_SIGNED_DATA,
            payload: payload.to_vec(),
        }
    }
}

/// Builds minimal but well-formed PE32 / PE32+ images.
///
/// Headers occupy the first 0x200 bytes; the certificate table, when there
/// is one, follows immediately at file offset 0x200 with 8-byte aligned
/// records.
#[derive(Debug, Clone)]
pub struct PeBuilder {
    pe32_plus: bool,
    directory_count: u32,
    certificates: Vec<TestCertificate>,
}

impl Default for PeBuilder {
    fn default() -> Self {
        Self {
            pe32_plus: true,
            directory_count: 16,
            certificates: Vec::new(),
        }
    }
}

impl PeBuilder {
    pub fn pe32() -> Self {
        Self {
            pe32_plus: false,
            ..Self::default()
        }
    }

    pub fn pe32_plus() -> Self {
        Self::default()
    }

    pub fn directory_count(mut self, count: u32) -> Self {
        self.directory_count = count;
        self
    }

    pub fn certificate(mut self, certificate: TestCertificate) -> Self {
        self.certificates.push(certificate);
        self
    }

    pub fn signed_with(mut self, payloads: &[&[u8]]) -> Self {
        self.certificates
            .extend(payloads.iter().map(|p| TestCertificate::pkcs(p)));
        self
    }

    /// File offset of the security directory entry.
    pub fn security_entry_offset(&self) -> usize {
        let table = if self.pe32_plus { 112 } else { 96 };
        OPTIONAL_HEADER + table + 4 * 8
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = vec![0u8; HEADERS_END];
        data[0..2].copy_from_slice(b"MZ");
        put_u32(&mut data, 60, E_LFANEW as u32);
        data[E_LFANEW..E_LFANEW + 4].copy_from_slice(b"PE\0\0");

        let (machine, magic, opt_size, count_at) = if self.pe32_plus {
            (0x8664u16, 0x020Bu16, 0xF0u16, 108)
        } else {
            (0x014Cu16, 0x010Bu16, 0xE0u16, 92)
        };
        put_u16(&mut data, E_LFANEW + 4, machine);
        put_u16(&mut data, E_LFANEW + 20, opt_size);
        put_u16(&mut data, OPTIONAL_HEADER, magic);
        put_u32(&mut data, OPTIONAL_HEADER + count_at, self.directory_count);

        if self.certificates.is_empty() {
            return data;
        }

        for cert in &self.certificates {
            let length = cert.payload.len() + 8;
            data.extend_from_slice(&(length as u32).to_le_bytes());
            data.extend_from_slice(&cert.revision.to_le_bytes());
            data.extend_from_slice(&cert.certificate_type.to_le_bytes());
            data.extend_from_slice(&cert.payload);
            data.resize(data.len().div_ceil(8) * 8, 0);
        }

        let table_size = data.len() - HEADERS_END;
        let entry = self.security_entry_offset();
        put_u32(&mut data, entry, HEADERS_END as u32);
        put_u32(&mut data, entry + 4, table_size as u32);
        data
    }
}

pub fn put_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Creates a temporary file with the given content.
pub fn create_temp_file(content: &[u8]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Deterministic, distinct payload for file `index`, certificate `cert`.
pub fn payload_for(index: usize, cert: usize) -> Vec<u8> {
    let len = 17 + (index * 7 + cert * 13) % 40;
    (0..len)
        .map(|i| (index as u8).wrapping_mul(31) ^ (cert as u8).wrapping_add(i as u8))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_layout() {
        let data = PeBuilder::pe32_plus().signed_with(&[b"abc"]).build();
        assert_eq!(&data[0..2], b"MZ");
        assert_eq!(data.len(), HEADERS_END + 16);
        assert_eq!(data.len() % 8, 0);
    }
}
