use uuid::Uuid;

use super::HormoneSchedule;
use crate::error::{Result, ValidationError};
use crate::settings::DeliveryMethod;
use crate::site::Site;
use crate::storage::Database;

/// kv key of the rotation cursor.
pub const SITE_INDEX_KEY: &str = "site_index";

/// Body sites in rotation order. Orders are always 0..count.
#[derive(Debug, Clone, Default)]
pub struct SiteSchedule {
    sites: Vec<Site>,
}

impl SiteSchedule {
    /// Loads stored sites, falling back to the method's defaults when
    /// nothing usable is stored.
    pub fn load(db: &Database, method: DeliveryMethod) -> Self {
        let sites = match db.list_sites() {
            Ok(stored) => {
                let (valid, invalid): (Vec<Site>, Vec<Site>) =
                    stored.into_iter().partition(Site::is_valid);
                for site in &invalid {
                    tracing::warn!("Ignoring site {} with name '{}' and order {}", site.id, site.name, site.order);
                }
                if valid.is_empty() {
                    tracing::info!("No sites stored, creating defaults for {method}");
                    Self::create_defaults(Some(db), method)
                } else {
                    valid
                }
            }
            Err(e) => {
                tracing::error!("Failed to load sites, using defaults: {e}");
                Self::create_defaults(None, method)
            }
        };
        let mut schedule = Self { sites };
        schedule.normalize_orders(Some(db));
        schedule
    }

    fn create_defaults(db: Option<&Database>, method: DeliveryMethod) -> Vec<Site> {
        Site::defaults(method)
            .into_iter()
            .inspect(|site| {
                if let Some(db) = db {
                    if let Err(e) = db.insert_site(site) {
                        tracing::error!("Failed to create site {}: {e}", site.name);
                    }
                }
            })
            .collect()
    }

    /// Sorts by order and closes any gaps, saving sites whose order moved.
    fn normalize_orders(&mut self, db: Option<&Database>) {
        self.sites.sort_by_key(|s| s.order);
        for (i, site) in self.sites.iter_mut().enumerate() {
            let order = i as i64;
            if site.order != order {
                site.order = order;
                if let Some(db) = db {
                    if let Err(e) = db.update_site(site) {
                        tracing::error!("Failed to save site {}: {e}", site.id);
                    }
                }
            }
        }
    }

    pub fn all(&self) -> &[Site] {
        &self.sites
    }

    pub fn count(&self) -> usize {
        self.sites.len()
    }

    pub fn at(&self, index: usize) -> Option<&Site> {
        self.sites.get(index)
    }

    pub fn get(&self, id: Uuid) -> Option<&Site> {
        self.sites.iter().find(|s| s.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.name == name)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.count() {
            Ok(())
        } else {
            Err(ValidationError::OutOfBounds {
                collection: "sites".into(),
                index,
                len: self.count(),
            }
            .into())
        }
    }

    fn push(&self, db: &Database, index: usize) {
        let Some(site) = self.sites.get(index) else {
            return;
        };
        match db.update_site(site) {
            Ok(true) => tracing::info!("Saved site {}", site.name),
            Ok(false) => tracing::warn!("Site {} does not exist in the store", site.id),
            Err(e) => tracing::error!("Failed to save site {}: {e}", site.id),
        }
    }

    /// Appends a site at the end of the rotation.
    pub fn insert_new(&mut self, db: &Database, name: &str) -> Option<&Site> {
        let name = name.trim();
        if name.is_empty() {
            tracing::warn!("Refusing to create a site without a name");
            return None;
        }
        let site = Site::new(name, self.count() as i64);
        if let Err(e) = db.insert_site(&site) {
            tracing::error!("Failed to create site {name}: {e}");
            return None;
        }
        tracing::info!("Created site {name}");
        self.sites.push(site);
        self.sites.last()
    }

    pub fn get_or_insert_by_name(&mut self, db: &Database, name: &str) -> Option<Uuid> {
        if let Some(site) = self.find_by_name(name) {
            return Some(site.id);
        }
        self.insert_new(db, name).map(|s| s.id)
    }

    pub fn rename(&mut self, db: &Database, index: usize, name: &str) -> Result<()> {
        self.check_index(index)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::invalid("name", "site name cannot be empty").into());
        }
        self.sites[index].name = name.to_string();
        self.push(db, index);
        Ok(())
    }

    /// Swaps the site at `index` with the one at `new_order`.
    pub fn reorder(&mut self, db: &Database, index: usize, new_order: usize) -> Result<()> {
        self.check_index(index)?;
        self.check_index(new_order)?;
        if index == new_order {
            return Ok(());
        }
        self.sites.swap(index, new_order);
        self.sites[index].order = index as i64;
        self.sites[new_order].order = new_order as i64;
        self.push(db, index);
        self.push(db, new_order);
        Ok(())
    }

    /// Images are named after the method's default sites.
    pub fn set_image_id(&mut self, db: &Database, index: usize, image_id: &str, method: DeliveryMethod) -> Result<()> {
        self.check_index(index)?;
        if !method.default_site_names().iter().any(|name| *name == image_id) {
            return Err(ValidationError::invalid(
                "image_id",
                format!("'{image_id}' is not an image for {method}"),
            )
            .into());
        }
        self.sites[index].image_id = Some(image_id.to_string());
        self.push(db, index);
        Ok(())
    }

    /// Removes a site and closes the gap. Hormones on it keep its name in the store;
    /// the caller mirrors that onto its hormone cache.
    pub fn delete(&mut self, db: &Database, index: usize) -> Result<Site> {
        self.check_index(index)?;
        let site = self.sites.remove(index);
        match db.delete_site_with_backup(site.id) {
            Ok(backed_up) => tracing::info!("Deleted site {}, backed up {backed_up} hormones", site.name),
            Err(e) => tracing::error!("Failed to delete site {}: {e}", site.id),
        }
        for later in self.sites.iter_mut().skip(index) {
            later.order -= 1;
        }
        Ok(site)
    }

    pub fn names(&self) -> Vec<String> {
        self.sites.iter().map(|s| s.name.clone()).collect()
    }

    pub fn image_ids(&self) -> Vec<Option<String>> {
        self.sites.iter().map(|s| s.image_id.clone()).collect()
    }

    /// Current names followed by any default names not already used.
    pub fn names_union_defaults(&self, method: DeliveryMethod) -> Vec<String> {
        let mut names = self.names();
        for default in method.default_site_names() {
            if !names.iter().any(|n| n == default) {
                names.push((*default).to_string());
            }
        }
        names
    }

    /// Whether the sites are exactly the method's defaults, in order.
    pub fn is_default(&self, method: DeliveryMethod) -> bool {
        let defaults = method.default_site_names();
        self.sites.len() == defaults.len()
            && self.sites.iter().zip(defaults).all(|(s, d)| s.name == *d)
    }

    pub fn reset(&mut self, db: &Database, method: DeliveryMethod) -> usize {
        if let Err(e) = db.delete_all_sites() {
            tracing::error!("Failed to delete sites: {e}");
        }
        self.sites = Self::create_defaults(Some(db), method);
        Self::set_cursor(db, 0);
        self.sites.len()
    }

    /// The stored rotation cursor, 0 when unset or unreadable.
    pub fn cursor(db: &Database) -> usize {
        match db.kv_get(SITE_INDEX_KEY) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid site index '{raw}'");
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                tracing::error!("Failed to read site index: {e}");
                0
            }
        }
    }

    pub fn set_cursor(db: &Database, index: usize) {
        if let Err(e) = db.kv_set(SITE_INDEX_KEY, &index.to_string()) {
            tracing::error!("Failed to save site index: {e}");
        }
    }

    /// Index of the site to suggest next.
    ///
    /// Scans circularly from `cursor` for the first site with no hormone on
    /// it; when every site is occupied, the one after the cursor.
    pub fn next_index(&self, cursor: usize, hormones: &HormoneSchedule) -> Option<usize> {
        let count = self.count();
        if count == 0 {
            return None;
        }
        let cursor = if cursor < count { cursor } else { 0 };
        (0..count)
            .map(|offset| (cursor + offset) % count)
            .find(|&i| hormones.count_on_site(self.sites[i].id) == 0)
            .or(Some((cursor + 1) % count))
    }

    pub fn suggested(&self, cursor: usize, hormones: &HormoneSchedule) -> Option<&Site> {
        self.next_index(cursor, hormones).and_then(|i| self.at(i))
    }
}
