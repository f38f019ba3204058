use tracing::{debug, warn};

use super::{for_each_id, ChangeInfoResult, PropertySink};
use crate::codec::ByteReader;
use crate::error::Result;
use crate::tables::{SoundEntry, ORIGINAL_SAMPLE_COUNT};

use ChangeInfoResult::{InvalidId, Success, Unknown};

/// Feature 0C: the sounds a file appended with action 11. Ids start after
/// the original samples.
pub struct SoundSink<'s> {
    pub sounds: &'s mut [SoundEntry],
    pub sound_offset: usize,
    pub num_sounds: u16,
}

impl<'s> SoundSink<'s> {
    fn apply(&mut self, id: usize, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        let index = self.sound_offset + id - ORIGINAL_SAMPLE_COUNT;
        match prop {
            0x08 => self.sounds[index].volume = buf.read_u8()?,
            0x09 => self.sounds[index].priority = buf.read_u8()?,
            0x0A => {
                let orig = buf.read_u8()? as usize;
                if orig >= ORIGINAL_SAMPLE_COUNT {
                    debug!(orig, "sound override target is not an original sample, ignoring");
                } else {
                    self.sounds[orig] = self.sounds[index].clone();
                }
            }
            _ => return Ok(Unknown),
        }
        Ok(Success)
    }
}

impl<'s> PropertySink for SoundSink<'s> {
    fn change_info(&mut self, first: u16, count: u16, prop: u8, buf: &mut ByteReader) -> Result<ChangeInfoResult> {
        if self.sound_offset == 0 {
            warn!("no sound effects defined, skipping");
            return Ok(InvalidId);
        }
        let first_idx = first as usize;
        let end = first_idx + count as usize;
        if first_idx < ORIGINAL_SAMPLE_COUNT
            || end - ORIGINAL_SAMPLE_COUNT > self.num_sounds as usize
            || self.sound_offset + end - ORIGINAL_SAMPLE_COUNT > self.sounds.len()
        {
            warn!(first, count, num_sounds = self.num_sounds, "changing undefined sound effect, skipping");
            return Ok(InvalidId);
        }
        for_each_id(first, count, |id| self.apply(id, prop, buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::GameData;

    fn with_appended(data: &mut GameData, n: usize) -> usize {
        let offset = data.sounds.len();
        data.sounds.extend((0..n).map(|_| SoundEntry { volume: 128, ..Default::default() }));
        offset
    }

    #[test]
    fn test_volume_and_priority() {
        let mut data = GameData::new();
        let offset = with_appended(&mut data, 2);
        let mut sink = SoundSink { sounds: &mut data.sounds, sound_offset: offset, num_sounds: 2 };
        let first = ORIGINAL_SAMPLE_COUNT as u16;
        assert_eq!(sink.change_info(first, 2, 0x08, &mut ByteReader::new(&[10, 20])).unwrap(), Success);
        assert_eq!(sink.change_info(first + 1, 1, 0x09, &mut ByteReader::new(&[3])).unwrap(), Success);
        assert_eq!(data.sounds[offset].volume, 10);
        assert_eq!(data.sounds[offset + 1].volume, 20);
        assert_eq!(data.sounds[offset + 1].priority, 3);
    }

    #[test]
    fn test_override_original() {
        let mut data = GameData::new();
        let offset = with_appended(&mut data, 1);
        data.sounds[offset].name = "horn.wav".into();
        let mut sink = SoundSink { sounds: &mut data.sounds, sound_offset: offset, num_sounds: 1 };
        sink.change_info(ORIGINAL_SAMPLE_COUNT as u16, 1, 0x0A, &mut ByteReader::new(&[5])).unwrap();
        assert_eq!(data.sounds[5].name, "horn.wav");
    }

    #[test]
    fn test_invalid_ids() {
        let mut data = GameData::new();
        let mut sink = SoundSink { sounds: &mut data.sounds, sound_offset: 0, num_sounds: 0 };
        assert_eq!(sink.change_info(73, 1, 0x08, &mut ByteReader::new(&[1])).unwrap(), InvalidId);

        let offset = with_appended(&mut data, 1);
        let mut sink = SoundSink { sounds: &mut data.sounds, sound_offset: offset, num_sounds: 1 };
        assert_eq!(sink.change_info(10, 1, 0x08, &mut ByteReader::new(&[1])).unwrap(), InvalidId);
        assert_eq!(sink.change_info(73, 2, 0x08, &mut ByteReader::new(&[1, 2])).unwrap(), InvalidId);
    }
}
