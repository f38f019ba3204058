use std::fmt;

/// Pipeline stages, processed strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadingStage {
    /// Extract identity, name and description, then stop.
    FileScan,
    /// Look for actions unsafe for static content.
    SafetyScan,
    /// Record goto labels.
    LabelScan,
    Init,
    /// Claim shared resources.
    Reserve,
    Activation,
}

impl LoadingStage {
    pub const ALL: [LoadingStage; 6] = [
        Self::FileScan,
        Self::SafetyScan,
        Self::LabelScan,
        Self::Init,
        Self::Reserve,
        Self::Activation,
    ];

    /// Stages run by a full load session.
    pub const LOAD: [LoadingStage; 4] = [Self::LabelScan, Self::Init, Self::Reserve, Self::Activation];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether disabled files are still read in this stage.
    pub fn runs_unconditionally(self) -> bool {
        self <= Self::LabelScan
    }
}

impl fmt::Display for LoadingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FileScan => "file-scan",
            Self::SafetyScan => "safety-scan",
            Self::LabelScan => "label-scan",
            Self::Init => "init",
            Self::Reserve => "reserve",
            Self::Activation => "activation",
        };
        f.write_str(name)
    }
}
