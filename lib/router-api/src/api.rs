use serde::{Deserialize, Serialize};

/// A deployed API as known to the inventory
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDefinition {
    /// API title (e.g., "PetStore")
    pub title: String,

    /// Raw version string as deployed (e.g., "v1.2.3")
    pub version: String,

    /// Virtual host the API is exposed on
    pub vhost: String,
}

impl ApiDefinition {
    pub fn new(
        title: impl Into<String>,
        version: impl Into<String>,
        vhost: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            vhost: vhost.into(),
        }
    }

    /// Whether both definitions are versions of the same API on the same vhost
    pub fn same_family(&self, other: &ApiDefinition) -> bool {
        self.title == other.title && self.vhost == other.vhost
    }
}
