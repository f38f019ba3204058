/// Binary writer producing extension-file encodings
pub struct BinaryWriter {
    data: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.data.push(v);
        self
    }

    pub fn write_u16_le(&mut self, v: u16) -> &mut Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write_u32_le(&mut self, v: u32) -> &mut Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Four-character label, big-endian.
    pub fn write_label(&mut self, label: u32) -> &mut Self {
        self.data.extend_from_slice(&label.to_be_bytes());
        self
    }

    /// Byte for values below 0xFF, otherwise `0xFF` and a word.
    pub fn write_extended(&mut self, v: u16) -> &mut Self {
        if v < 0xFF {
            self.write_u8(v as u8)
        } else {
            self.write_u8(0xFF).write_u16_le(v)
        }
    }

    /// NUL-terminated string.
    pub fn write_string(&mut self, s: &str) -> &mut Self {
        self.data.extend_from_slice(s.as_bytes());
        self.write_u8(0)
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}
