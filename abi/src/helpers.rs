// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Cursor helpers for chain binary encodings
//!
//! [Reader] and [Writer] wrap byte slices for use within [encdec] implementations,
//! tracking the current offset so truncation errors can report where decoding stopped.

use byteorder::{ByteOrder, LittleEndian};
use encdec::{DecodeOwned, Encode};

use crate::Error;

/// Maximum encoded length of a `varuint32`
pub const VARUINT32_MAX_LEN: usize = 5;

/// Compute the encoded length of a `varuint32`
pub const fn varuint32_len(mut v: u32) -> usize {
    let mut n = 1;
    while v >= 0x80 {
        v >>= 7;
        n += 1;
    }
    n
}

/// Compute the encoded length of length-prefixed bytes
pub const fn bytes_len(d: &[u8]) -> usize {
    varuint32_len(d.len() as u32) + d.len()
}

/// Zig-zag encode a signed value for `varint32` encoding
pub const fn zigzag(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

/// Zig-zag decode a `varint32` value
pub const fn unzigzag(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

/// Encode an object to a newly allocated buffer
pub fn to_vec<T: Encode<Error = Error>>(v: &T) -> Result<Vec<u8>, Error> {
    let mut b = vec![0u8; v.encode_len()?];
    let n = v.encode(&mut b)?;
    b.truncate(n);
    Ok(b)
}

/// Append an encoded object to a buffer
pub fn push<T: Encode<Error = Error>>(out: &mut Vec<u8>, v: &T) -> Result<(), Error> {
    let b = to_vec(v)?;
    out.extend_from_slice(&b);
    Ok(())
}

/// Append a `varuint32` to a buffer
pub fn push_varuint32(out: &mut Vec<u8>, mut v: u32) {
    loop {
        let b = (v & 0x7f) as u8;
        v >>= 7;

        if v == 0 {
            out.push(b);
            return;
        }

        out.push(b | 0x80);
    }
}

/// Append length-prefixed bytes to a buffer
pub fn push_bytes(out: &mut Vec<u8>, d: &[u8]) {
    push_varuint32(out, d.len() as u32);
    out.extend_from_slice(d);
}

/// Decoding cursor over a byte slice
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    buff: &'a [u8],
    index: usize,
}

impl<'a> Reader<'a> {
    /// Create a new reader at the start of the provided buffer
    pub fn new(buff: &'a [u8]) -> Self {
        Self { buff, index: 0 }
    }

    /// Current offset into the buffer
    pub fn offset(&self) -> usize {
        self.index
    }

    /// Remaining (unread) data
    pub fn remaining(&self) -> &'a [u8] {
        &self.buff[self.index..]
    }

    /// Check whether all data has been consumed
    pub fn is_empty(&self) -> bool {
        self.index >= self.buff.len()
    }

    fn truncated(&self, ty: &str) -> Error {
        Error::TruncatedInput {
            ty: ty.to_string(),
            offset: self.index,
        }
    }

    /// Take `n` bytes from the buffer
    pub fn take(&mut self, n: usize, ty: &str) -> Result<&'a [u8], Error> {
        if self.buff.len() - self.index < n {
            return Err(self.truncated(ty));
        }

        let d = &self.buff[self.index..][..n];
        self.index += n;

        Ok(d)
    }

    /// Take a fixed size array from the buffer
    pub fn array<const N: usize>(&mut self, ty: &str) -> Result<[u8; N], Error> {
        let mut a = [0u8; N];
        a.copy_from_slice(self.take(N, ty)?);
        Ok(a)
    }

    pub fn u8(&mut self, ty: &str) -> Result<u8, Error> {
        Ok(self.take(1, ty)?[0])
    }

    pub fn u16(&mut self, ty: &str) -> Result<u16, Error> {
        Ok(LittleEndian::read_u16(self.take(2, ty)?))
    }

    pub fn u32(&mut self, ty: &str) -> Result<u32, Error> {
        Ok(LittleEndian::read_u32(self.take(4, ty)?))
    }

    pub fn u64(&mut self, ty: &str) -> Result<u64, Error> {
        Ok(LittleEndian::read_u64(self.take(8, ty)?))
    }

    pub fn i64(&mut self, ty: &str) -> Result<i64, Error> {
        Ok(LittleEndian::read_i64(self.take(8, ty)?))
    }

    /// Read an LEB128 `varuint32`
    pub fn varuint32(&mut self, ty: &str) -> Result<u32, Error> {
        let start = self.index;
        let mut v: u64 = 0;

        for i in 0..VARUINT32_MAX_LEN {
            let b = match self.buff.get(self.index) {
                Some(b) => *b,
                None => return Err(self.truncated(ty)),
            };
            self.index += 1;

            v |= ((b & 0x7f) as u64) << (7 * i);

            if b & 0x80 == 0 {
                return u32::try_from(v).map_err(|_| Error::invalid(ty, "varuint32 overflow"));
            }
        }

        self.index = start;
        Err(Error::invalid(ty, "varuint32 too long"))
    }

    /// Read a zig-zag encoded `varint32`
    pub fn varint32(&mut self, ty: &str) -> Result<i32, Error> {
        self.varuint32(ty).map(unzigzag)
    }

    /// Read length-prefixed bytes
    pub fn bytes(&mut self, ty: &str) -> Result<&'a [u8], Error> {
        let n = self.varuint32(ty)? as usize;
        self.take(n, ty)
    }

    /// Read a length-prefixed UTF-8 string
    pub fn string(&mut self, ty: &str) -> Result<String, Error> {
        let n = self.varuint32(ty)? as usize;
        let offset = self.index;
        let d = self.take(n, ty)?;

        match core::str::from_utf8(d) {
            Ok(s) => Ok(s.to_string()),
            Err(e) => Err(Error::InvalidUtf8 {
                offset: offset + e.valid_up_to(),
            }),
        }
    }

    /// Read an object implementing [DecodeOwned]
    pub fn read<T>(&mut self, ty: &str) -> Result<T::Output, Error>
    where
        T: DecodeOwned<Error = Error>,
    {
        let (v, n) = T::decode_owned(self.remaining())
            .map_err(|e| e.reading(ty).offset_by(self.index))?;
        self.index += n;
        Ok(v)
    }

    /// Read a length-prefixed list of objects implementing [DecodeOwned]
    pub fn list<T>(&mut self, ty: &str) -> Result<Vec<T::Output>, Error>
    where
        T: DecodeOwned<Error = Error>,
    {
        let n = self.varuint32(ty)? as usize;

        // Cap pre-allocation, each entry consumes at least one byte
        let mut v = Vec::with_capacity(n.min(self.buff.len() - self.index));
        for _ in 0..n {
            v.push(self.read::<T>(ty)?);
        }

        Ok(v)
    }
}

/// Encoding cursor over a mutable byte slice
#[derive(Debug)]
pub struct Writer<'a> {
    buff: &'a mut [u8],
    index: usize,
}

impl<'a> Writer<'a> {
    /// Create a new writer at the start of the provided buffer
    pub fn new(buff: &'a mut [u8]) -> Self {
        Self { buff, index: 0 }
    }

    /// Current offset (number of bytes written)
    pub fn offset(&self) -> usize {
        self.index
    }

    /// Write raw data
    pub fn raw(&mut self, d: &[u8]) -> Result<(), Error> {
        if self.buff.len() - self.index < d.len() {
            return Err(Error::Length);
        }

        self.buff[self.index..][..d.len()].copy_from_slice(d);
        self.index += d.len();

        Ok(())
    }

    pub fn u8(&mut self, v: u8) -> Result<(), Error> {
        self.raw(&[v])
    }

    pub fn u16(&mut self, v: u16) -> Result<(), Error> {
        self.raw(&v.to_le_bytes())
    }

    pub fn u32(&mut self, v: u32) -> Result<(), Error> {
        self.raw(&v.to_le_bytes())
    }

    pub fn u64(&mut self, v: u64) -> Result<(), Error> {
        self.raw(&v.to_le_bytes())
    }

    pub fn i64(&mut self, v: i64) -> Result<(), Error> {
        self.raw(&v.to_le_bytes())
    }

    /// Write an LEB128 `varuint32`
    pub fn varuint32(&mut self, v: u32) -> Result<(), Error> {
        let mut b = Vec::with_capacity(VARUINT32_MAX_LEN);
        push_varuint32(&mut b, v);
        self.raw(&b)
    }

    /// Write length-prefixed bytes
    pub fn bytes(&mut self, d: &[u8]) -> Result<(), Error> {
        self.varuint32(d.len() as u32)?;
        self.raw(d)
    }

    /// Write a length-prefixed UTF-8 string
    pub fn string(&mut self, s: &str) -> Result<(), Error> {
        self.bytes(s.as_bytes())
    }

    /// Write an object implementing [Encode]
    pub fn write<T: Encode<Error = Error>>(&mut self, v: &T) -> Result<(), Error> {
        let n = v.encode(&mut self.buff[self.index..])?;
        self.index += n;
        Ok(())
    }

    /// Write a length-prefixed list of objects implementing [Encode]
    pub fn list<T: Encode<Error = Error>>(&mut self, v: &[T]) -> Result<(), Error> {
        self.varuint32(v.len() as u32)?;
        for i in v {
            self.write(i)?;
        }
        Ok(())
    }
}

/// Compute the encoded length of a length-prefixed list
pub fn list_len<T: Encode<Error = Error>>(v: &[T]) -> Result<usize, Error> {
    let mut n = varuint32_len(v.len() as u32);
    for i in v {
        n += i.encode_len()?;
    }
    Ok(n)
}
