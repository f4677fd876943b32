//! Fixed-size pieces of the ".shp", ".shx" and ".dbf" layouts.
//!
//! The ".shp" format mixes byte orders: the file code, file length and every
//! record header are big-endian; everything else is little-endian. Lengths in
//! ".shp" and ".shx" headers are counted in 16-bit words. The functions here
//! take and return byte counts.
use std::io;
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use encoding::{DecoderTrap, EncodingRef};

use super::shp::{ShapeType, ShpBoundingBox, ShpError, ShpHeader};

pub const SHP_HEADER_LENGTH: usize = 100;
pub const SHP_RECORD_HEADER_LENGTH: usize = 8;
pub const SHX_RECORD_LENGTH: usize = 8;
pub const SHP_MAGIC_NUMBER: u32 = 9994;
pub const SHP_VERSION: u32 = 1000;

/// Reads the first 100 bytes of a ".shp" or ".shx" file.
///
/// Side-effect: advances the file cursor 100 bytes.
pub fn read_shp_header(file: &mut dyn io::Read) -> Result<ShpHeader, ShpError> {
    let mut buf = [ 0u8; SHP_HEADER_LENGTH ];
    file.read_exact(&mut buf)?;

    let magic_number = BigEndian::read_u32(&buf[0..4]);
    let file_len = BigEndian::read_u32(&buf[24..28]) as usize;
    let version = LittleEndian::read_u32(&buf[28..32]);
    let shape_type_u32 = LittleEndian::read_u32(&buf[32..36]);

    if magic_number != SHP_MAGIC_NUMBER {
        return Err(ShpError::ParseError(format!("File has wrong magic number: found {}, expected {}", magic_number, SHP_MAGIC_NUMBER)));
    }

    if version != SHP_VERSION {
        return Err(ShpError::ParseError(format!("File has wrong version: found {}, expected {}", version, SHP_VERSION)));
    }

    if file_len * 2 < SHP_HEADER_LENGTH {
        return Err(ShpError::ParseError(format!("File header says the file is {} bytes long, shorter than the header itself", file_len * 2)));
    }

    let shape_type = match ShapeType::with_u32(shape_type_u32) {
        Some(ShapeType::MultiPatch) => {
            return Err(ShpError::ParseError(format!("File has unsupported type: found {:?}", ShapeType::MultiPatch)));
        }
        Some(shape_type) => shape_type,
        None => {
            return Err(ShpError::ParseError(format!("File has nonexistent data type {}", shape_type_u32)));
        }
    };

    let f = |i: usize| LittleEndian::read_f64(&buf[36 + 8 * i .. 44 + 8 * i]);

    Ok(ShpHeader {
        file_n_bytes: file_len * 2,
        shape_type: shape_type,
        bounding_box: ShpBoundingBox {
            x_min: f(0),
            y_min: f(1),
            x_max: f(2),
            y_max: f(3),
            z_min: f(4),
            z_max: f(5),
            m_min: f(6),
            m_max: f(7),
        },
    })
}

pub fn write_shp_header(file: &mut dyn io::Write, header: &ShpHeader) -> io::Result<()> {
    file.write_u32::<BigEndian>(SHP_MAGIC_NUMBER)?;
    for _ in 0..5 {
        file.write_u32::<BigEndian>(0)?;
    }
    file.write_u32::<BigEndian>((header.file_n_bytes / 2) as u32)?;
    file.write_u32::<LittleEndian>(SHP_VERSION)?;
    file.write_u32::<LittleEndian>(header.shape_type.code())?;

    let bbox = &header.bounding_box;
    for &v in [ bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max, bbox.z_min, bbox.z_max, bbox.m_min, bbox.m_max ].iter() {
        file.write_f64::<LittleEndian>(v)?;
    }
    Ok(())
}

/// Reads a record header: (record number, content length in bytes).
///
/// Side-effect: advances the file cursor 8 bytes.
pub fn read_record_header(file: &mut dyn io::Read) -> io::Result<(u32, usize)> {
    let mut header_buf = [ 0u8; SHP_RECORD_HEADER_LENGTH ];
    file.read_exact(&mut header_buf)?;

    let record_number = BigEndian::read_u32(&header_buf[0..4]);
    let content_length = BigEndian::read_u32(&header_buf[4..8]) as usize;
    Ok((record_number, content_length * 2))
}

pub fn write_record_header(file: &mut dyn io::Write, record_number: u32, content_n_bytes: usize) -> io::Result<()> {
    file.write_u32::<BigEndian>(record_number)?;
    file.write_u32::<BigEndian>((content_n_bytes / 2) as u32)
}

/// Writes one ".shx" entry: where the record header starts, and how long the
/// record content (excluding its header) is.
pub fn write_index_entry(file: &mut dyn io::Write, offset_n_bytes: usize, content_n_bytes: usize) -> io::Result<()> {
    file.write_u32::<BigEndian>((offset_n_bytes / 2) as u32)?;
    file.write_u32::<BigEndian>((content_n_bytes / 2) as u32)
}

/// Decodes a fixed-width text slot, dropping the trailing pad (spaces and
/// NULs).
pub fn decode_fixed_string(bytes: &[u8], encoding: EncodingRef) -> String {
    let end = bytes.iter().rposition(|&b| b != b' ' && b != 0).map_or(0, |i| i + 1);
    encoding.decode(&bytes[..end], DecoderTrap::Replace).unwrap_or_else(|s| s.into_owned())
}
