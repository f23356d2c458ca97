use starcc_storage::RecordPath;

/// Paths of the intermediate round edge sets of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundLayout {
    work_dir: RecordPath,
}

impl RoundLayout {
    pub fn new(work_dir: RecordPath) -> Self {
        Self { work_dir }
    }

    pub fn work_dir(&self) -> &RecordPath {
        &self.work_dir
    }

    /// Edge set produced by round `index`; round 0 is the extractor output.
    pub fn round(&self, index: usize) -> RecordPath {
        self.work_dir.join(&format!("graph_{}", index))
    }
}
