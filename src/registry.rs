//! The NYC Open Data datasets these pipelines consume.
//!
//! Every dataset differs only in these few constants, so they live in one table rather than in
//! per-dataset types.

const OPEN_DATA_HOST: &str = "https://data.cityofnewyork.us";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DatasetInfo {
    /// Short name used on the command line.
    pub key: &'static str,
    /// Socrata four-by-four identifier.
    pub dataset_id: &'static str,
    pub display_name: &'static str,
    /// Where the CSV export lives.
    pub csv_url: &'static str,
}

impl DatasetInfo {
    /// The JSON view with column descriptions and dataset metadata.
    pub fn metadata_url(&self) -> String {
        format!("{}/api/views/{}.json", OPEN_DATA_HOST, self.dataset_id)
    }
}

const DATASETS: &[DatasetInfo] = &[
    DatasetInfo {
        key: "curbs",
        dataset_id: "5xvt-8cbk",
        display_name: "NYC Planimetric Database: Curbs",
        csv_url: "https://data.cityofnewyork.us/api/views/5xvt-8cbk/rows.csv?accessType=DOWNLOAD",
    },
    DatasetInfo {
        key: "loading_zones",
        dataset_id: "6pjf-tf5u",
        display_name: "Neighborhood Loading Zones",
        csv_url: "https://data.cityofnewyork.us/resource/6pjf-tf5u.csv?$limit=50000",
    },
    DatasetInfo {
        key: "parking_meters",
        dataset_id: "693u-uax6",
        display_name: "Parking Meters - Locations and Status",
        csv_url: "https://data.cityofnewyork.us/api/views/693u-uax6/rows.csv?accessType=DOWNLOAD",
    },
    DatasetInfo {
        key: "truck_routes",
        dataset_id: "jjja-shxy",
        display_name: "NYC Truck Routes",
        csv_url: "https://data.cityofnewyork.us/resource/jjja-shxy.csv?$limit=50000",
    },
    DatasetInfo {
        key: "accessible_pedestrian_signals",
        dataset_id: "de3m-c5p4",
        display_name: "Accessible Pedestrian Signal Locations",
        csv_url: "https://data.cityofnewyork.us/api/views/de3m-c5p4/rows.csv?accessType=DOWNLOAD",
    },
    DatasetInfo {
        key: "street_sign_work_orders",
        dataset_id: "qt6m-xctn",
        display_name: "Street Sign Work Orders",
        csv_url: "https://data.cityofnewyork.us/api/views/qt6m-xctn/rows.csv?accessType=DOWNLOAD",
    },
    DatasetInfo {
        key: "speed_humps",
        dataset_id: "jknp-skuy",
        display_name: "NYC DOT Speed Humps",
        csv_url: "https://data.cityofnewyork.us/resource/jknp-skuy.csv",
    },
    DatasetInfo {
        key: "raised_crosswalks",
        dataset_id: "uh2s-ftgh",
        display_name: "NYC DOT Raised Crosswalk Locations",
        csv_url: "https://data.cityofnewyork.us/resource/uh2s-ftgh.csv",
    },
    DatasetInfo {
        key: "nyc_311",
        dataset_id: "jrb2-thup",
        display_name: "311 Service Requests",
        csv_url: "https://data.cityofnewyork.us/resource/jrb2-thup.csv",
    },
    DatasetInfo {
        key: "vehicle_collisions",
        dataset_id: "h9gi-nx95",
        display_name: "Motor Vehicle Collisions (Crashes)",
        csv_url: "https://data.cityofnewyork.us/resource/h9gi-nx95.csv",
    },
];

pub fn all() -> &'static [DatasetInfo] {
    DATASETS
}

/// Finds a dataset by its key or its Socrata identifier.
pub fn lookup(name: &str) -> Option<&'static DatasetInfo> {
    DATASETS
        .iter()
        .find(|d| d.key.eq_ignore_ascii_case(name) || d.dataset_id == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup() {
        let meters = lookup("parking_meters").unwrap();
        assert_eq!(meters.dataset_id, "693u-uax6");
        assert_eq!(lookup("693u-uax6"), Some(meters));
        assert_eq!(lookup("Parking_Meters"), Some(meters));
        assert_eq!(lookup("nope"), None);
    }

    #[test]
    fn test_metadata_url() {
        assert_eq!(
            lookup("speed_humps").unwrap().metadata_url(),
            "https://data.cityofnewyork.us/api/views/jknp-skuy.json"
        );
    }

    #[test]
    fn test_entries_are_consistent() {
        let mut keys = HashSet::new();
        for dataset in all() {
            assert!(keys.insert(dataset.key), "duplicate key {}", dataset.key);
            assert!(
                dataset.csv_url.starts_with(OPEN_DATA_HOST),
                "{} points elsewhere",
                dataset.key
            );
            assert!(
                dataset.csv_url.contains(dataset.dataset_id),
                "{} has a mismatched URL",
                dataset.key
            );
        }
    }
}
