use std::path::PathBuf;

use forecast_lib::{PricePoint, SeriesMetadata};

/// Caches fetched series as JSON files, one entry per file.
pub struct FileStorage {
    base_dir : PathBuf
}

impl FileStorage {
    pub fn create(base_dir : &str) -> anyhow::Result<FileStorage> {
        std::fs::create_dir_all(base_dir)?;
        Ok(FileStorage { base_dir : PathBuf::from(base_dir) })
    }

    fn entry_path(&self, name : &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", name))
    }
}

impl forecast_lib::Storage for FileStorage {
    fn save_series(&mut self, name : &str, points : &Vec<PricePoint>,
                   metadata : &SeriesMetadata) -> anyhow::Result<()> {
        let file = std::fs::File::create(self.entry_path(name))?;
        ::serde_json::to_writer(&file, &(points, metadata))?;
        Ok(())
    }

    fn load_series(&mut self, name : &str) -> anyhow::Result<(Vec<PricePoint>, SeriesMetadata)> {
        let file = std::fs::File::open(self.entry_path(name))?;
        let entry = ::serde_json::from_reader(&file)?;
        Ok(entry)
    }
}
