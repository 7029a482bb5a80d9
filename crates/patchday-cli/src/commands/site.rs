//! Site commands for CLI.

use clap::Subcommand;
use serde_json::json;

use super::{commit, open, print_json, CmdResult};

#[derive(Subcommand)]
pub enum SiteAction {
    /// List sites in rotation order
    List,
    /// Show the site suggested for the next application
    Suggest,
    /// Add a site at the end of the rotation
    Add {
        /// Site name
        name: String,
    },
    /// Rename a site
    Rename {
        /// Position in the rotation
        index: usize,
        /// New name
        name: String,
    },
    /// Swap a site with the one at another position
    Reorder {
        /// Position in the rotation
        index: usize,
        /// Position to swap with
        order: usize,
    },
    /// Set the picture shown for a site
    Image {
        /// Position in the rotation
        index: usize,
        /// One of the delivery method's default site names
        image_id: String,
    },
    /// Delete a site; hormones on it keep its name
    Remove {
        /// Position in the rotation
        index: usize,
    },
    /// Restore the default sites
    Reset,
}

pub fn run(action: SiteAction) -> CmdResult {
    let mut data = open()?;
    match action {
        SiteAction::List => {
            let list: Vec<_> = data
                .sites()
                .all()
                .iter()
                .map(|s| {
                    json!({
                        "index": s.order,
                        "id": s.id,
                        "name": s.name,
                        "image_id": s.image_id,
                        "hormones": data.hormones().count_on_site(s.id),
                    })
                })
                .collect();
            print_json(&list)?;
        }
        SiteAction::Suggest => {
            print_json(&data.suggested_site())?;
        }
        SiteAction::Add { name } => {
            let id = data.add_site(&name)?;
            commit(&mut data);
            print_json(&data.sites().get(id))?;
        }
        SiteAction::Rename { index, name } => {
            data.rename_site(index, &name)?;
            commit(&mut data);
            print_json(&data.sites().at(index))?;
        }
        SiteAction::Reorder { index, order } => {
            data.reorder_site(index, order)?;
            commit(&mut data);
            print_json(&data.sites().names())?;
        }
        SiteAction::Image { index, image_id } => {
            data.set_site_image(index, &image_id)?;
            commit(&mut data);
            print_json(&data.sites().at(index))?;
        }
        SiteAction::Remove { index } => {
            let site = data.delete_site(index)?;
            commit(&mut data);
            println!("site removed: {}", site.name);
        }
        SiteAction::Reset => {
            let count = data.reset_sites();
            commit(&mut data);
            print_json(&json!({ "count": count }))?;
        }
    }
    Ok(())
}
