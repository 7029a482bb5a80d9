use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::settings::DeliveryMethod;

/// A body location hormones are placed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: Uuid,
    pub name: String,
    /// Position in the rotation. Orders within a schedule are 0..n with no gaps.
    pub order: i64,
    pub image_id: Option<String>,
}

impl Site {
    pub fn new(name: impl Into<String>, order: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            order,
            image_id: None,
        }
    }

    /// The default site list for a delivery method, images matching names.
    pub fn defaults(method: DeliveryMethod) -> Vec<Site> {
        method
            .default_site_names()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut site = Site::new(*name, i as i64);
                site.image_id = Some((*name).to_string());
                site
            })
            .collect()
    }

    /// Loaded rows with no name or a negative order are unusable.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && self.order >= 0
    }
}
