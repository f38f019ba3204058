//! Sprite-group graph nodes and the per-file table that owns them.
//!
//! Groups reference each other by 16-bit id. A reference to a group that
//! already exists is bound to the node when the referencing group is built;
//! a reference to a slot that is still empty stays `Pending` and is looked
//! up again whenever it is resolved, so later definitions become visible
//! without mutating the referencing node.

use std::rc::Rc;

/// Largest group id an action 2 can define.
pub const MAX_SPRITEGROUP: u16 = 0x7FFF;

#[derive(Debug, Clone, PartialEq)]
pub enum GroupRef {
    Null,
    /// Callback result encoded directly in the reference
    Callback(u16),
    Bound(Rc<SpriteGroup>),
    /// Slot was empty when referenced
    Pending(u16),
}

impl GroupRef {
    pub fn is_null(&self) -> bool {
        matches!(self, GroupRef::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarScope {
    SelfScope,
    Parent,
    /// Randomized group on a vehicle chain position
    Relative(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdjustOp {
    Add = 0x00,
    Sub = 0x01,
    SMin = 0x02,
    SMax = 0x03,
    UMin = 0x04,
    UMax = 0x05,
    SDiv = 0x06,
    SMod = 0x07,
    UDiv = 0x08,
    UMod = 0x09,
    Mul = 0x0A,
    And = 0x0B,
    Or = 0x0C,
    Xor = 0x0D,
    StoreTemp = 0x0E,
    Restore = 0x0F,
    StorePersistent = 0x10,
    Ror = 0x11,
    SCmp = 0x12,
    UCmp = 0x13,
    Shl = 0x14,
    Shr = 0x15,
    Sar = 0x16,
}

impl AdjustOp {
    pub fn from_u8(v: u8) -> Option<Self> {
        use AdjustOp::*;
        const OPS: [AdjustOp; 23] = [
            Add, Sub, SMin, SMax, UMin, UMax, SDiv, SMod, UDiv, UMod, Mul, And, Or, Xor, StoreTemp,
            Restore, StorePersistent, Ror, SCmp, UCmp, Shl, Shr, Sar,
        ];
        OPS.get(v as usize).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustType {
    None,
    Div,
    Mod,
}

/// One value-transform step of a deterministic group.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjust {
    pub op: AdjustOp,
    pub variable: u8,
    pub parameter: u8,
    /// Only for variable 0x7E
    pub subroutine: Option<GroupRef>,
    pub shift_num: u8,
    pub and_mask: u32,
    pub adjust_type: AdjustType,
    pub add_val: u32,
    pub divmod_val: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeterministicRange {
    pub group: GroupRef,
    pub low: u32,
    pub high: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomCmpMode {
    Any,
    All,
}

/// One sprite placed by a tile layout. `delta_z == 0x80` marks a child sprite
/// drawn relative to the previous parent, which carries no bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileSeq {
    pub image: u32,
    pub delta_x: i8,
    pub delta_y: i8,
    pub delta_z: u8,
    pub size_x: u8,
    pub size_y: u8,
    pub size_z: u8,
}

impl TileSeq {
    pub const CHILD: u8 = 0x80;

    pub fn is_parent(&self) -> bool {
        self.delta_z != Self::CHILD
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpriteGroup {
    Callback {
        result: u16,
    },
    Result {
        sprite: u32,
        count: u16,
    },
    Real {
        loaded: Vec<GroupRef>,
        loading: Vec<GroupRef>,
    },
    Deterministic {
        scope: VarScope,
        /// Operand size in bytes: 1, 2 or 4
        size: u8,
        adjusts: Vec<Adjust>,
        ranges: Vec<DeterministicRange>,
        default: GroupRef,
    },
    Randomized {
        scope: VarScope,
        triggers: u8,
        cmp_mode: RandomCmpMode,
        lowest_randbit: u8,
        groups: Vec<GroupRef>,
    },
    TileLayout {
        ground: u32,
        building: Vec<TileSeq>,
    },
}

/// Append-only table of a file's groups; empty slots are allowed.
#[derive(Debug, Clone, Default)]
pub struct SpriteGroupTable {
    groups: Vec<Option<Rc<SpriteGroup>>>,
}

impl SpriteGroupTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Store `group` at `id`, growing the table with empty slots as needed.
    pub fn set(&mut self, id: u16, group: Option<SpriteGroup>) {
        let idx = id as usize;
        if idx >= self.groups.len() {
            self.groups.resize(idx + 1, None);
        }
        self.groups[idx] = group.map(Rc::new);
    }

    pub fn get(&self, id: u16) -> Option<Rc<SpriteGroup>> {
        self.groups.get(id as usize).and_then(|g| g.clone())
    }

    /// Reference to `id`: bound if the slot is filled, pending otherwise.
    pub fn reference(&self, id: u16) -> GroupRef {
        match self.get(id) {
            Some(group) => GroupRef::Bound(group),
            None => GroupRef::Pending(id),
        }
    }

    /// Resolve a reference against the table as it is now.
    pub fn resolve(&self, r: &GroupRef) -> Option<Rc<SpriteGroup>> {
        match r {
            GroupRef::Null => None,
            GroupRef::Callback(result) => Some(Rc::new(SpriteGroup::Callback { result: *result })),
            GroupRef::Bound(group) => Some(group.clone()),
            GroupRef::Pending(id) => self.get(*id),
        }
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

/// Decode a callback-result reference. Before format version 8 a high byte
/// of `0xFF` marks an 8-bit result; otherwise bit 15 is the marker.
pub fn callback_result(value: u16, grf_version: u8) -> u16 {
    if grf_version < 8 && value >> 8 == 0xFF {
        value & 0xFF
    } else {
        value & !0x8000
    }
}
