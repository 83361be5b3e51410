use crate::config::AppConfig;
use crate::job_controller::state::JobsState;
use crate::objects::ObjectStore;
use crate::store::Store;
use std::sync::Arc;

/// Shared application state, registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub objects: ObjectStore,
    pub config: Arc<AppConfig>,
    pub jobs: JobsState,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store, jobs: JobsState) -> Self {
        let objects = ObjectStore::new(&config.storage);
        Self {
            store,
            objects,
            config: Arc::new(config),
            jobs,
        }
    }

    /// Signed or public URL for an object, honouring the configured TTL.
    pub fn object_url(
        &self,
        bucket: &str,
        path: &str,
    ) -> Result<String, crate::objects::ObjectError> {
        self.objects
            .url_for(bucket, path, self.config.storage.signed_url_ttl_secs)
    }
}
