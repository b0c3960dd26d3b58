use super::Region;

/// Waveform view that owns the drawn regions
///
/// Implemented by the embedding application. Clearing also detaches every
/// listener the host attached to the old regions.
#[cfg_attr(test, mockall::automock)]
pub trait WaveformHost: Send {
    fn clear_regions(&mut self);

    fn add_region(&mut self, region: Region);

    fn set_region_color(&mut self, id: &str, color: &str);
}

/// Host that only remembers what it was told to draw
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub regions: Vec<Region>,
    pub clear_count: usize,
}

impl WaveformHost for RecordingHost {
    fn clear_regions(&mut self) {
        self.regions.clear();
        self.clear_count += 1;
    }

    fn add_region(&mut self, region: Region) {
        self.regions.push(region);
    }

    fn set_region_color(&mut self, id: &str, color: &str) {
        if let Some(region) = self.regions.iter_mut().find(|r| r.id == id) {
            region.color = color.to_string();
        }
    }
}
