//! Integration tests for site rotation and the shared today summary.

use chrono::{DateTime, TimeZone, Utc};
use patchday_core::{Config, PatchData, TodayData};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, day, hour, 0, 0).unwrap()
}

#[test]
fn test_rotation_cycles_through_every_site() {
    let mut data = PatchData::open_in_memory(Config::default()).unwrap();
    let mut used = Vec::new();

    // replace the oldest patch twice a week for two full cycles
    for round in 0..8u32 {
        let oldest = data.hormones().next().unwrap().id;
        let site = data
            .apply_suggested(oldest, &at(1 + round * 3, 9))
            .unwrap()
            .unwrap();
        used.push(site);
    }

    assert_eq!(
        used,
        vec![
            "Right Glute",
            "Left Glute",
            "Right Abdomen",
            "Left Abdomen",
            "Right Glute",
            "Left Glute",
            "Right Abdomen",
            "Left Abdomen",
        ]
    );
}

#[test]
fn test_rotation_skips_occupied_custom_site() {
    let mut data = PatchData::open_in_memory(Config::default()).unwrap();
    data.add_site("Left Thigh").unwrap();
    data.reorder_site(4, 0).unwrap();
    assert_eq!(data.sites().at(0).unwrap().name, "Left Thigh");

    let id = data.hormones().at(0).unwrap().id;
    data.apply_hormone(id, &at(1, 9), Some("Left Thigh")).unwrap();

    assert_eq!(data.suggested_site().unwrap().name, "Left Glute");
}

#[test]
fn test_rotation_with_all_sites_deleted() {
    let mut data = PatchData::open_in_memory(Config::default()).unwrap();
    for _ in 0..4 {
        data.delete_site(0).unwrap();
    }
    assert!(data.suggested_site().is_none());

    let id = data.hormones().at(0).unwrap().id;
    assert_eq!(data.apply_suggested(id, &at(1, 9)).unwrap(), None);
    assert!(data.hormones().get(id).unwrap().applied().is_some());
}

#[test]
fn test_refresh_shares_today_summary() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = PatchData::open_at(dir.path()).unwrap();
    let id = data.hormones().at(0).unwrap().id;
    data.apply_suggested(id, &at(1, 9)).unwrap();
    data.refresh(&at(1, 10));

    let today = TodayData::read_from(&TodayData::path_in(dir.path()))
        .unwrap()
        .unwrap();
    let next = today.next_hormone.unwrap();
    assert_eq!(next.site_name.as_deref(), Some("Left Glute"));
    assert_eq!(next.date, Some(Utc.with_ymd_and_hms(2026, 4, 4, 21, 0, 0).unwrap()));
    assert_eq!(today.next_pill.unwrap().name, "T-Blocker");
}
