//! Record framing of the extension file container.
//!
//! Every record is `[u16 length][u8 type][...]`. Type `0xFF` marks a pseudo
//! record whose `length` payload bytes hold one action; any other type is a
//! real image with a 7 byte header followed by `length - 8` bytes of image
//! data (raw when bit 1 of the type is set, chunked-RLE otherwise). A zero
//! length ends the stream.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

pub const PSEUDO_SPRITE: u8 = 0xFF;

/// Header of a real image record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteHeader {
    pub kind: u8,
    pub height: u8,
    pub width: u16,
    pub x_offs: i16,
    pub y_offs: i16,
}

impl SpriteHeader {
    pub fn is_raw(&self) -> bool {
        self.kind & 0x02 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealSprite<'a> {
    pub header: SpriteHeader,
    /// Image data as stored, still compressed unless `header.is_raw()`
    pub data: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record<'a> {
    Pseudo(&'a [u8]),
    Real(RealSprite<'a>),
}

/// Sequential record reader tracking byte offset and logical line number.
pub struct RecordReader<'a> {
    data: &'a [u8],
    cursor: Cursor<&'a [u8]>,
    line: u32,
}

impl<'a> RecordReader<'a> {
    /// Validate the container header and position the reader on the first
    /// record after it. Returns the reader and the declared record count.
    pub fn open(data: &'a [u8]) -> Result<(Self, u32)> {
        let mut cursor = Cursor::new(data);
        let len = cursor.read_u16::<LittleEndian>()?;
        let kind = cursor.read_u8()?;
        if len != 4 || kind != PSEUDO_SPRITE {
            return Err(Error::InvalidHeader(format!(
                "first record must be a 4 byte pseudo record, got length {} type {:#04x}",
                len, kind
            )));
        }
        let count = cursor.read_u32::<LittleEndian>()?;
        Ok((Self { data, cursor, line: 0 }, count))
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Logical line number of the most recently read record.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Jump to a record boundary previously observed through `position()`.
    pub fn seek(&mut self, offset: usize, line: u32) {
        self.cursor.set_position(offset.min(self.data.len()) as u64);
        self.line = line;
    }

    /// Next record, or `None` at the end marker or end of data.
    pub fn next_record(&mut self) -> Result<Option<Record<'a>>> {
        if self.position() >= self.data.len() {
            return Ok(None);
        }
        let len = self.cursor.read_u16::<LittleEndian>()? as usize;
        if len == 0 {
            return Ok(None);
        }
        let kind = self.cursor.read_u8()?;
        self.line += 1;

        if kind == PSEUDO_SPRITE {
            let start = self.position();
            self.skip(len)?;
            return Ok(Some(Record::Pseudo(&self.data[start..start + len])));
        }

        let header = SpriteHeader {
            kind,
            height: self.cursor.read_u8()?,
            width: self.cursor.read_u16::<LittleEndian>()?,
            x_offs: self.cursor.read_i16::<LittleEndian>()?,
            y_offs: self.cursor.read_i16::<LittleEndian>()?,
        };
        let start = self.position();
        self.skip_image_data(len as i64 - 8, header.is_raw())?;
        let end = self.position();
        Ok(Some(Record::Real(RealSprite { header, data: &self.data[start..end] })))
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        let pos = self.position();
        if pos + n > self.data.len() {
            return Err(Error::UnexpectedEof);
        }
        self.cursor.set_position((pos + n) as u64);
        Ok(())
    }

    /// Consume `size` bytes of decompressed image data.
    fn skip_image_data(&mut self, mut size: i64, raw: bool) -> Result<()> {
        if raw {
            return self.skip(size.max(0) as usize);
        }
        while size > 0 {
            let code = self.cursor.read_i8()?;
            if code >= 0 {
                let run = if code == 0 { 0x80 } else { code as i64 };
                size -= run;
                self.skip(run as usize)?;
            } else {
                size -= -((code >> 3) as i64);
                let mut distance = [0u8; 1];
                self.cursor.read_exact(&mut distance)?;
            }
        }
        Ok(())
    }
}
