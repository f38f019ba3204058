//! Builders for extension-file fixtures used across the unit tests.

use crate::codec::BinaryWriter;
use crate::grf::config::{Environment, GrfConfig};
use crate::grf::context::LoadContext;
use crate::grf::stage::LoadingStage;
use crate::host::{GrfStringTable, RecordingSpriteCache};

/// First image id handed out by [`test_context`].
pub const TEST_SPRITE_BASE: u32 = 6000;

/// Context in the activation stage with one config and file per name; the
/// first file is current.
pub fn test_context(files: &[&str]) -> LoadContext {
    let mut ctx = LoadContext::new(
        Environment::default(),
        TEST_SPRITE_BASE,
        Box::new(RecordingSpriteCache::new()),
        Box::new(GrfStringTable::new()),
    );
    for name in files {
        ctx.configs.push(GrfConfig::new(*name));
        ctx.registry.init_file(name, 0);
    }
    ctx.stage = LoadingStage::Activation;
    ctx.begin_file(0, 0);
    ctx
}

/// Assembles a container: header record, then records in order, then the end marker.
pub struct GrfBuilder {
    records: Vec<Vec<u8>>,
}

impl GrfBuilder {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub fn pseudo(&mut self, payload: &[u8]) -> &mut Self {
        let mut w = BinaryWriter::new();
        w.write_u16_le(payload.len() as u16).write_u8(0xFF).write_bytes(payload);
        self.records.push(w.into_vec());
        self
    }

    /// Real image stored uncompressed.
    pub fn real_raw(&mut self, pixels: &[u8]) -> &mut Self {
        let mut w = BinaryWriter::new();
        w.write_u16_le(pixels.len() as u16 + 8).write_u8(0x03);
        w.write_u8(1).write_u16_le(pixels.len() as u16).write_u16_le(0).write_u16_le(0);
        w.write_bytes(pixels);
        self.records.push(w.into_vec());
        self
    }

    /// Real image stored as a single literal chunk.
    pub fn real_rle(&mut self, pixels: &[u8]) -> &mut Self {
        assert!(!pixels.is_empty() && pixels.len() < 0x80);
        let mut w = BinaryWriter::new();
        w.write_u16_le(pixels.len() as u16 + 8).write_u8(0x01);
        w.write_u8(1).write_u16_le(pixels.len() as u16).write_u16_le(0).write_u16_le(0);
        w.write_u8(pixels.len() as u8).write_bytes(pixels);
        self.records.push(w.into_vec());
        self
    }

    pub fn finish(&self) -> Vec<u8> {
        let mut w = BinaryWriter::new();
        w.write_u16_le(4).write_u8(0xFF).write_u32_le(self.records.len() as u32);
        for record in &self.records {
            w.write_bytes(record);
        }
        w.write_u16_le(0);
        w.into_vec()
    }
}

/// Action 08 payload.
pub fn info(version: u8, grfid: u32, name: &str, description: &str) -> Vec<u8> {
    let mut w = BinaryWriter::new();
    w.write_u8(0x08).write_u8(version).write_u32_le(grfid);
    w.write_string(name).write_string(description);
    w.into_vec()
}

/// Action 0D payload with a literal data dword.
pub fn param_set(target: u8, op: u8, src1: u8, src2: u8, data: u32) -> Vec<u8> {
    let mut w = BinaryWriter::new();
    w.write_u8(0x0D).write_u8(target).write_u8(op).write_u8(src1).write_u8(src2).write_u32_le(data);
    w.into_vec()
}

/// Action 09 payload comparing a one-byte parameter.
pub fn skip_if_byte(param: u8, cond: u8, value: u8, num_sprites: u8) -> Vec<u8> {
    vec![0x09, param, 1, cond, value, num_sprites]
}
