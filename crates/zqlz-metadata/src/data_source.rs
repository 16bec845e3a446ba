use std::sync::Arc;
use uuid::Uuid;

use crate::config::MetadataConfig;

/// Connection-independent description of the database a table model belongs to
#[derive(Debug, Clone)]
pub struct DataSource {
    id: Uuid,
    name: String,
    config: MetadataConfig,
}

impl DataSource {
    pub fn new(name: impl Into<String>, config: MetadataConfig) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            config,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }

    /// Prefix for data dictionary views, `"SYS."` or empty
    pub fn sys_schema_prefix(&self) -> &'static str {
        if self.config.use_sys_schema_prefix {
            "SYS."
        } else {
            ""
        }
    }
}
