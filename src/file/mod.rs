//! PE container access for metadata images.
//!
//! Metadata images (`.winmd`) ship as PE files whose CLR runtime header points at the
//! `BSJB` metadata root. This module abstracts over the data source (memory-mapped file or
//! owned buffer), parses the PE headers through `goblin`, and translates relative virtual
//! addresses into file offsets so the metadata layer can slice out the streams it needs.
//!
//! # Key Components
//!
//! - [`crate::file::File`] - PE container with CLR header lookup and RVA translation
//! - [`crate::file::Backend`] - Trait for the data sources backing a [`crate::file::File`]
//! - [`crate::file::parser::Parser`] - Byte cursor used by every decoder in this crate
//! - [`crate::file::io`] - Little-endian primitive reads and writes
//!
//! # Examples
//!
//! ```rust,no_run
//! use winmdgen::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("Windows.Win32.winmd"))?;
//! let (clr_rva, clr_size) = file.clr()?;
//! let offset = file.rva_to_offset(clr_rva)?;
//! println!("CLR header at 0x{:x} ({} bytes)", offset, clr_size);
//! # Ok::<(), winmdgen::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    Error::{Empty, GoblinErr},
    Result,
};
use goblin::pe::{section_table::SectionTable, PE};
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

/// Data source of a [`File`].
///
/// Implemented by the memory-mapped and the in-memory backend. Backends must be `Send + Sync`
/// so a loaded image can be shared by the parallel generator.
pub trait Backend: Send + Sync {
    /// Returns a slice of `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the complete data.
    fn data(&self) -> &[u8];

    /// Returns the number of bytes available.
    fn len(&self) -> usize;
}

/// A loaded PE container.
///
/// The parsed `goblin` headers borrow from the owned backend, hence the self-referencing
/// construction.
#[self_referencing]
pub struct File {
    /// The backend owning the bytes
    data: Box<dyn Backend>,
    /// The parsed PE headers
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl File {
    /// Loads a PE file from disk through a memory map.
    ///
    /// # Arguments
    /// * `file` - Path of the image to map
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, is not a PE file, or has no CLR header.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;
        Self::load(input)
    }

    /// Loads a PE file from an owned buffer.
    ///
    /// # Errors
    /// Returns an error if the buffer is empty, is not a PE file, or has no CLR header.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);
        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data = Box::new(data);
        File::try_new(data, |data| {
            let pe = PE::parse(data.data()).map_err(GoblinErr)?;
            let Some(optional_header) = pe.header.optional_header else {
                return Err(malformed_error!("File does not have an OptionalHeader"));
            };

            if optional_header
                .data_directories
                .get_clr_runtime_header()
                .is_none()
            {
                return Err(crate::Error::NotSupported);
            }

            Ok(pe)
        })
    }

    /// Returns the size of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the file holds no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the RVA and size of the CLR runtime header.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if the image carries no CLR runtime header.
    pub fn clr(&self) -> Result<(usize, usize)> {
        self.with_pe(|pe| {
            let directory = pe
                .header
                .optional_header
                .as_ref()
                .and_then(|header| header.data_directories.get_clr_runtime_header())
                .ok_or(crate::Error::NotSupported)?;

            Ok((
                directory.virtual_address as usize,
                directory.size as usize,
            ))
        })
    }

    /// Returns an iterator over the section headers.
    pub fn sections(&self) -> impl Iterator<Item = &SectionTable> {
        self.with_pe(|pe| pe.sections.iter())
    }

    /// Returns the complete file data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// Returns a slice of the file data.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the file.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.with_data(|data| data.data_slice(offset, len))
    }

    /// Translates a relative virtual address into a file offset.
    ///
    /// # Errors
    /// Returns an error if no section contains `rva`.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva_u32 =
            u32::try_from(rva).map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

        self.with_pe(|pe| {
            for section in &pe.sections {
                let Some(section_max) = section.virtual_address.checked_add(section.virtual_size)
                else {
                    return Err(malformed_error!(
                        "Section malformed, causing integer overflow - {} + {}",
                        section.virtual_address,
                        section.virtual_size
                    ));
                };

                if section.virtual_address <= rva_u32 && section_max > rva_u32 {
                    return Ok((rva_u32 - section.virtual_address) as usize
                        + section.pointer_to_raw_data as usize);
                }
            }

            Err(malformed_error!(
                "RVA could not be converted to offset - {}",
                rva
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::{FieldDef, MetadataBuilder},
        metadata::signatures::TypeSignature,
        MetadataView,
    };

    const SECTION_RVA: u32 = 0x2000;
    const SECTION_OFFSET: usize = 0x200;
    const COR20_SIZE: u32 = 72;

    /// Wraps a metadata root in a minimal PE32+ image with one section holding the CLR
    /// header followed by the root.
    fn pe_image(metadata: &[u8]) -> Vec<u8> {
        let payload = COR20_SIZE + metadata.len() as u32;
        let raw_size = (payload + 0x1FF) & !0x1FF;

        let mut headers = Vec::new();
        headers.extend_from_slice(b"PE\0\0");

        // COFF header
        headers.extend_from_slice(&0x8664u16.to_le_bytes());
        headers.extend_from_slice(&1u16.to_le_bytes());
        headers.extend_from_slice(&[0; 12]);
        headers.extend_from_slice(&0xF0u16.to_le_bytes());
        headers.extend_from_slice(&0x2022u16.to_le_bytes());

        // Optional header, standard fields
        headers.extend_from_slice(&0x20Bu16.to_le_bytes());
        headers.extend_from_slice(&[0; 22]);

        // Optional header, windows fields
        headers.extend_from_slice(&0x1_8000_0000u64.to_le_bytes());
        headers.extend_from_slice(&0x1000u32.to_le_bytes());
        headers.extend_from_slice(&0x200u32.to_le_bytes());
        headers.extend_from_slice(&[0; 16]);
        headers.extend_from_slice(&(SECTION_RVA + 0x1000).to_le_bytes());
        headers.extend_from_slice(&(SECTION_OFFSET as u32).to_le_bytes());
        headers.extend_from_slice(&[0; 4]);
        headers.extend_from_slice(&3u16.to_le_bytes());
        headers.extend_from_slice(&[0; 2]);
        headers.extend_from_slice(&[0; 32]);
        headers.extend_from_slice(&[0; 4]);
        headers.extend_from_slice(&16u32.to_le_bytes());

        // Data directories, only the CLR runtime header is present
        for index in 0..16 {
            let (rva, size) = if index == 14 {
                (SECTION_RVA, COR20_SIZE)
            } else {
                (0, 0)
            };
            headers.extend_from_slice(&rva.to_le_bytes());
            headers.extend_from_slice(&size.to_le_bytes());
        }

        // Section table
        headers.extend_from_slice(b".text\0\0\0");
        headers.extend_from_slice(&payload.to_le_bytes());
        headers.extend_from_slice(&SECTION_RVA.to_le_bytes());
        headers.extend_from_slice(&raw_size.to_le_bytes());
        headers.extend_from_slice(&(SECTION_OFFSET as u32).to_le_bytes());
        headers.extend_from_slice(&[0; 12]);
        headers.extend_from_slice(&0x6000_0020u32.to_le_bytes());

        let mut image = vec![0u8; SECTION_OFFSET];
        image[0..2].copy_from_slice(b"MZ");
        image[0x3C..0x40].copy_from_slice(&0x40u32.to_le_bytes());
        image[0x40..0x40 + headers.len()].copy_from_slice(&headers);

        // CLR header
        image.extend_from_slice(&COR20_SIZE.to_le_bytes());
        image.extend_from_slice(&2u16.to_le_bytes());
        image.extend_from_slice(&5u16.to_le_bytes());
        image.extend_from_slice(&(SECTION_RVA + COR20_SIZE).to_le_bytes());
        image.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
        image.extend_from_slice(&1u32.to_le_bytes());
        image.extend_from_slice(&[0; 52]);

        image.extend_from_slice(metadata);
        image.resize(SECTION_OFFSET + raw_size as usize, 0);
        image
    }

    #[test]
    fn clr_directory() {
        let metadata = MetadataBuilder::new("Image.winmd").build().unwrap();
        let file = File::from_mem(pe_image(&metadata)).unwrap();

        assert_eq!(file.clr().unwrap(), (SECTION_RVA as usize, COR20_SIZE as usize));
        assert_eq!(
            file.rva_to_offset((SECTION_RVA + COR20_SIZE) as usize).unwrap(),
            SECTION_OFFSET + COR20_SIZE as usize
        );
    }

    #[test]
    fn metadata_from_image() {
        let mut builder = MetadataBuilder::new("Image.winmd");
        builder
            .struct_type("Windows.Win32.Test", "POINT")
            .field(FieldDef::new("x", TypeSignature::I4))
            .field(FieldDef::new("y", TypeSignature::I4))
            .finish();

        let view = MetadataView::from_mem(pe_image(&builder.build().unwrap())).unwrap();
        let metadata = view.metadata();
        assert_eq!(metadata.type_count(), 2);
        assert!(metadata.find_typedef("Windows.Win32.Test", "POINT").is_some());
    }

    #[test]
    fn empty_input() {
        assert!(matches!(File::from_mem(Vec::new()), Err(Empty)));
    }

    #[test]
    fn not_a_pe() {
        let result = File::from_mem(vec![0xCC; 512]);
        assert!(result.is_err());
    }
}
