use crate::error::{Error, Result};

/// Read cursor over one pseudo-sprite payload
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Total payload length, including bytes already consumed.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn has_data(&self) -> bool {
        self.remaining() > 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Fail with a length mismatch unless the whole payload is at least `wanted` bytes.
    pub fn ensure_length(&self, wanted: usize, action: &'static str) -> Result<()> {
        if self.data.len() < wanted {
            return Err(Error::LengthMismatch { action, actual: self.data.len(), wanted });
        }
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEof);
        }
        self.pos += n;
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        if self.remaining() < 1 {
            return Err(Error::UnexpectedEof);
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        let lo = self.read_u8()? as u16;
        let hi = self.read_u8()? as u16;
        Ok(lo | (hi << 8))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        let lo = self.read_u16_le()? as u32;
        let hi = self.read_u16_le()? as u32;
        Ok(lo | (hi << 16))
    }

    /// Four-character label, read big-endian so it compares as text.
    pub fn read_label(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Variable-width integer: one byte, or `0xFF` followed by a word.
    pub fn read_extended(&mut self) -> Result<u16> {
        let first = self.read_u8()?;
        if first == 0xFF {
            self.read_u16_le()
        } else {
            Ok(first as u16)
        }
    }

    /// Read a value of 1, 2 or 4 bytes.
    pub fn read_varsize(&mut self, size: u8) -> Result<u32> {
        match size {
            1 => Ok(self.read_u8()? as u32),
            2 => Ok(self.read_u16_le()? as u32),
            4 => self.read_u32_le(),
            _ => Err(Error::LengthMismatch { action: "varsize", actual: size as usize, wanted: 4 }),
        }
    }

    /// NUL-terminated string, NUL excluded. An unterminated string runs to
    /// the end of the payload.
    pub fn read_string(&mut self) -> Result<&'a [u8]> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        match rest.iter().position(|&b| b == 0) {
            Some(end) => {
                self.pos += end + 1;
                Ok(&rest[..end])
            }
            None => {
                self.pos = self.data.len();
                Ok(rest)
            }
        }
    }

    /// NUL-terminated string of at most `max_len` bytes including the
    /// terminator. When no NUL appears in time, `max_len` bytes are consumed
    /// and the last one is dropped as if it were the terminator.
    pub fn read_string_max(&mut self, max_len: usize) -> Result<&'a [u8]> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let window = &rest[..rest.len().min(max_len)];
        match window.iter().position(|&b| b == 0) {
            Some(end) => {
                self.pos += end + 1;
                Ok(&window[..end])
            }
            None if window.len() == max_len && max_len > 0 => {
                self.pos += max_len;
                Ok(&window[..max_len - 1])
            }
            None => {
                self.pos += window.len();
                Ok(window)
            }
        }
    }
}
