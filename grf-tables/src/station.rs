pub const MAX_STATION_CLASSES: usize = 32;

const DEFAULT_CLASS: u32 = u32::from_be_bytes(*b"DFLT");
const WAYPOINT_CLASS: u32 = u32::from_be_bytes(*b"WAYP");

#[derive(Debug, Clone, PartialEq)]
pub struct StationClass {
    /// Four-character class label, big-endian
    pub label: u32,
    pub name: u32,
    /// Custom station specs in this class, as (grfid, file-local id)
    pub stations: Vec<(u32, u8)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationClasses {
    classes: Vec<StationClass>,
}

impl StationClasses {
    pub fn new() -> Self {
        let builtin = [DEFAULT_CLASS, WAYPOINT_CLASS]
            .into_iter()
            .map(|label| StationClass { label, name: 0, stations: Vec::new() })
            .collect();
        Self { classes: builtin }
    }

    /// Class id for `label`, allocating a new class if it isn't known yet.
    pub fn allocate(&mut self, label: u32) -> Option<u8> {
        if let Some(id) = self.classes.iter().position(|c| c.label == label) {
            return Some(id as u8);
        }
        if self.classes.len() >= MAX_STATION_CLASSES {
            return None;
        }
        self.classes.push(StationClass { label, name: 0, stations: Vec::new() });
        Some((self.classes.len() - 1) as u8)
    }

    pub fn set_name(&mut self, class: u8, name: u32) {
        if let Some(c) = self.classes.get_mut(class as usize) {
            c.name = name;
        }
    }

    /// Add a custom station to its class. Re-registering is a no-op.
    pub fn register(&mut self, class: u8, grfid: u32, local_id: u8) {
        if let Some(c) = self.classes.get_mut(class as usize) {
            if !c.stations.contains(&(grfid, local_id)) {
                c.stations.push((grfid, local_id));
            }
        }
    }

    /// Empty every class's station list, keeping labels and names.
    pub fn clear_stations(&mut self) {
        for class in &mut self.classes {
            class.stations.clear();
        }
    }

    pub fn get(&self, class: u8) -> Option<&StationClass> {
        self.classes.get(class as usize)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationClass> {
        self.classes.iter()
    }
}

impl Default for StationClasses {
    fn default() -> Self {
        Self::new()
    }
}
