//! Fixed-width integer I/O with annotated failures.
//!
//! [`ReadFixed`] and [`WriteFixed`] extend every `Read` / `Write` with
//! little and big endian integer helpers. A failed transfer is reported as
//! an [`IoError`]: the underlying `io::Error` wrapped with an [`IoFailure`]
//! record telling how many bytes of the value were transferred before the
//! failure.

use std::io::{self, Read, Write};
use std::mem;

use crate::annotated::ErrorWithData;

crate::record! {
    /// Progress of a fixed-width transfer when it failed.
    #[derive(Debug, Clone, PartialEq, Eq, Default)]
    pub struct IoFailure {
        pub bytes_done: usize,
        /// Some, but not all, bytes were transferred.
        pub partial: bool,
        pub expected: usize,
    }
}

/// An I/O error carrying transfer progress.
pub type IoError = ErrorWithData<IoFailure>;

const READ_FORMAT: &str = "read %d{bytes_done} of %d{expected} bytes: %w";
const WRITE_FORMAT: &str = "wrote %d{bytes_done} of %d{expected} bytes: %w";

fn annotate(format: &str, err: io::Error, bytes_done: usize, expected: usize) -> IoError {
    let failure = IoFailure {
        bytes_done,
        partial: bytes_done > 0 && bytes_done < expected,
        expected,
    };
    ErrorWithData::wrap(err, format, failure, &[])
}

fn read_exact_tracked<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<(), IoError> {
    let mut done = 0;
    while done < buf.len() {
        match reader.read(&mut buf[done..]) {
            Ok(0) => {
                let eof = io::Error::from(io::ErrorKind::UnexpectedEof);
                return Err(annotate(READ_FORMAT, eof, done, buf.len()));
            }
            Ok(n) => done += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(annotate(READ_FORMAT, e, done, buf.len())),
        }
    }
    Ok(())
}

fn write_all_tracked<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> Result<(), IoError> {
    let mut done = 0;
    while done < buf.len() {
        match writer.write(&buf[done..]) {
            Ok(0) => {
                let zero = io::Error::from(io::ErrorKind::WriteZero);
                return Err(annotate(WRITE_FORMAT, zero, done, buf.len()));
            }
            Ok(n) => done += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(annotate(WRITE_FORMAT, e, done, buf.len())),
        }
    }
    Ok(())
}

/// Integer decoding for any reader.
pub trait ReadFixed {
    fn read_u8(&mut self) -> Result<u8, IoError>;
    fn read_u16_le(&mut self) -> Result<u16, IoError>;
    fn read_u32_le(&mut self) -> Result<u32, IoError>;
    fn read_u64_le(&mut self) -> Result<u64, IoError>;
    fn read_u16_be(&mut self) -> Result<u16, IoError>;
    fn read_u32_be(&mut self) -> Result<u32, IoError>;
    fn read_u64_be(&mut self) -> Result<u64, IoError>;
}

/// Integer encoding for any writer.
pub trait WriteFixed {
    fn write_u8(&mut self, v: u8) -> Result<(), IoError>;
    fn write_u16_le(&mut self, v: u16) -> Result<(), IoError>;
    fn write_u32_le(&mut self, v: u32) -> Result<(), IoError>;
    fn write_u64_le(&mut self, v: u64) -> Result<(), IoError>;
    fn write_u16_be(&mut self, v: u16) -> Result<(), IoError>;
    fn write_u32_be(&mut self, v: u32) -> Result<(), IoError>;
    fn write_u64_be(&mut self, v: u64) -> Result<(), IoError>;
}

macro_rules! decoder_fn {
    ($name:ident, $val_type:ty, $from_bytes:ident) => {
        #[inline]
        fn $name(&mut self) -> Result<$val_type, IoError> {
            let mut buf = [0u8; mem::size_of::<$val_type>()];
            read_exact_tracked(self, &mut buf)?;
            Ok(<$val_type>::$from_bytes(buf))
        }
    };
}

macro_rules! encoder_fn {
    ($name:ident, $val_type:ty, $to_bytes:ident) => {
        #[inline]
        fn $name(&mut self, v: $val_type) -> Result<(), IoError> {
            write_all_tracked(self, &v.$to_bytes())
        }
    };
}

impl<R: Read + ?Sized> ReadFixed for R {
    decoder_fn!(read_u8, u8, from_le_bytes);
    decoder_fn!(read_u16_le, u16, from_le_bytes);
    decoder_fn!(read_u32_le, u32, from_le_bytes);
    decoder_fn!(read_u64_le, u64, from_le_bytes);
    decoder_fn!(read_u16_be, u16, from_be_bytes);
    decoder_fn!(read_u32_be, u32, from_be_bytes);
    decoder_fn!(read_u64_be, u64, from_be_bytes);
}

impl<W: Write + ?Sized> WriteFixed for W {
    encoder_fn!(write_u8, u8, to_le_bytes);
    encoder_fn!(write_u16_le, u16, to_le_bytes);
    encoder_fn!(write_u32_le, u32, to_le_bytes);
    encoder_fn!(write_u64_le, u64, to_le_bytes);
    encoder_fn!(write_u16_be, u16, to_be_bytes);
    encoder_fn!(write_u32_be, u32, to_be_bytes);
    encoder_fn!(write_u64_be, u64, to_be_bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{find_cause, get_field, project};
    use crate::value::Value;
    use std::io::Cursor;

    #[test]
    fn integers_round_trip_in_both_byte_orders() {
        let mut buf = Vec::new();
        buf.write_u16_le(0x0102).unwrap();
        buf.write_u32_be(0x0304_0506).unwrap();
        buf.write_u64_le(7).unwrap();
        buf.write_u8(9).unwrap();
        assert_eq!(&buf[..6], &[0x02, 0x01, 0x03, 0x04, 0x05, 0x06]);

        let mut cursor = Cursor::new(buf);
        assert_eq!(cursor.read_u16_le().unwrap(), 0x0102);
        assert_eq!(cursor.read_u32_be().unwrap(), 0x0304_0506);
        assert_eq!(cursor.read_u64_le().unwrap(), 7);
        assert_eq!(cursor.read_u8().unwrap(), 9);
    }

    #[test]
    fn short_read_reports_progress() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3]);
        let err = cursor.read_u32_le().unwrap_err();
        assert_eq!(
            err.data(),
            &IoFailure {
                bytes_done: 3,
                partial: true,
                expected: 4
            }
        );
        assert_eq!(err.to_string(), "read 3 of 4 bytes: unexpected end of file");
        assert_eq!(get_field(err.as_error(), "partial"), Some(Value::Bool(true)));

        let source = find_cause::<io::Error>(err.as_error()).expect("io cause");
        assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
        let projected: IoFailure = project(err.as_error(), &[]).unwrap();
        assert_eq!(projected.expected, 4);
    }

    #[test]
    fn empty_read_is_not_partial() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let err = cursor.read_u16_be().unwrap_err();
        assert_eq!(err.data().bytes_done, 0);
        assert!(!err.data().partial);
    }

    #[test]
    fn full_writer_reports_write_zero() {
        let mut storage = [0u8; 2];
        let mut cursor = Cursor::new(&mut storage[..]);
        let err = cursor.write_u32_le(1).unwrap_err();
        assert_eq!(err.data().bytes_done, 2);
        assert_eq!(err.to_string(), "wrote 2 of 4 bytes: write zero");
    }
}
