//! Zip container constants (PKWARE APPNOTE 6.3.x).

pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4B50;
pub const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4B50;
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4B50;
pub const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4B50;
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4B50;

pub const LOCAL_HEADER_SIZE: usize = 30;
pub const CENTRAL_HEADER_SIZE: usize = 46;
pub const END_OF_CENTRAL_DIRECTORY_SIZE: usize = 22;
pub const ZIP64_LOCATOR_SIZE: usize = 20;
/// Byte offset of the "relative offset of local header" field in a central header.
pub const CENTRAL_LOCAL_OFFSET_FIELD: usize = 42;
/// The archive comment length is a u16, so the end record sits within this many bytes of EOF.
pub const MAX_END_RECORD_SEARCH: usize = END_OF_CENTRAL_DIRECTORY_SIZE + u16::MAX as usize;

pub const FLAG_ENCRYPTED: u16 = 0x0001;
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;
pub const FLAG_UTF8: u16 = 0x0800;

/// "Version made by": Unix host, APPNOTE 2.0.
pub const VERSION_MADE_BY: u16 = (3 << 8) | 20;
/// Regular file, `rw-r--r--`, in the upper half of the external attributes.
pub const EXTERNAL_ATTRIBUTES_FILE: u32 = 0o100644 << 16;
/// Directory, `rwxr-xr-x`, plus the MS-DOS directory bit.
pub const EXTERNAL_ATTRIBUTES_DIRECTORY: u32 = (0o040755 << 16) | 0x10;
