use std::sync::Arc;

use drop_blob::UploadAdapter;

use crate::middlewares::SpoolConfig;

pub struct DropAxumState {
    pub adapter: Arc<UploadAdapter>,
    pub spool: Arc<SpoolConfig>,
}

impl Clone for DropAxumState {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            spool: Arc::clone(&self.spool),
        }
    }
}

impl DropAxumState {
    pub fn new(adapter: UploadAdapter) -> Self {
        let spool = SpoolConfig::new(adapter.config().max_file_bytes);
        Self {
            adapter: Arc::new(adapter),
            spool: Arc::new(spool),
        }
    }

    pub fn with_spool_dir<P: Into<std::path::PathBuf>>(mut self, dir: P) -> Self {
        let spool = self.spool.as_ref().clone().with_dir(dir);
        self.spool = Arc::new(spool);
        self
    }
}
