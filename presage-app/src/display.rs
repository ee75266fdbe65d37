use log::{debug, info};
use presage_core::Stimulus;
use presage_experiment::{DisplayError, StimulusDisplay};

/// Headless display: checks each stimulus image can be read and logs what
/// the participant would see.
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    shown: usize,
    open: bool,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> usize {
        self.shown
    }
}

impl StimulusDisplay for ConsoleDisplay {
    fn show_blank(&mut self) -> Result<(), DisplayError> {
        self.open = true;
        debug!("blank screen");
        Ok(())
    }

    fn show_stimulus(&mut self, stimulus: &Stimulus) -> Result<(), DisplayError> {
        let (width, height) = image::image_dimensions(&stimulus.image).map_err(|e| {
            DisplayError(format!("cannot read {}: {e}", stimulus.image.display()))
        })?;
        self.open = true;
        self.shown += 1;
        info!(
            "showing {} ({}, {width}x{height})",
            stimulus.id,
            stimulus.image.display()
        );
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            info!("display closed after {} stimuli", self.shown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presage_core::StimulusPool;

    #[test]
    fn reads_real_images_and_rejects_broken_ones() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        image::RgbImage::new(4, 3).save(&good).unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not a png").unwrap();
        let pool = StimulusPool::new(vec![good], vec![broken]);

        let mut display = ConsoleDisplay::new();
        display.show_blank().unwrap();
        display.show_stimulus(pool.get(0).unwrap()).unwrap();
        assert!(display.show_stimulus(pool.get(1).unwrap()).is_err());
        assert_eq!(display.shown(), 1);
        display.close();
        display.close();
    }
}
