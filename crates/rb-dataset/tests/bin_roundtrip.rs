use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{NaiveDate, TimeDelta};
use proptest::prelude::*;
use rb_dataset::{read_bin, write_bin};
use rb_model::Point;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn n_points_come_back_unchanged(
        steps in prop::collection::vec((1i64..1440, -1.0e6f32..1.0e6f32), 0..200)
    ) {
        let dir = unique_temp_dir("rb_dataset_bin_prop");
        let path = dir.join("series.bin");

        let mut t = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut points = Vec::new();
        for (minutes, value) in &steps {
            t += TimeDelta::minutes(*minutes);
            points.push(Point { timestamp: t, value: *value as f64 });
        }

        write_bin(&path, &points).unwrap();
        let back = read_bin(&path).unwrap();
        let _ = fs::remove_dir_all(&dir);

        prop_assert_eq!(back.len(), points.len());
        for (a, b) in back.iter().zip(&points) {
            prop_assert_eq!(a.timestamp, b.timestamp);
            prop_assert_eq!(a.value, b.value);
        }
    }
}
