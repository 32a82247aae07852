//! Shared fixtures for integration tests

#![allow(dead_code)]

use academic_stress::config::ClassifierConfig;
use academic_stress::inference::ClassifierService;
use academic_stress::preprocessing::RawRecord;
use academic_stress::utils::DatasetSource;
use serde_json::json;
use std::path::{Path, PathBuf};

pub const TARGET_HEADER: &str = " Rate your academic stress index ";

const STAGES: [&str; 3] = ["high school", "undergraduate", "post-graduate"];
const ENVIRONMENTS: [&str; 3] = ["Peaceful", "Noisy", "disrupted"];
const COPING: [&str; 3] = [
    "Analyze the situation and handle it with intellect",
    "Social support (friends, family)",
    "Emotional breakdown (crying a lot)",
];
const HABITS: [&str; 3] = ["No", "Yes", "prefer not to say"];
const PEER_PRESSURE: [i64; 10] = [1, 2, 2, 3, 3, 3, 3, 4, 4, 5];

/// Rows of the synthetic survey; rows 5 and 50 have an empty cell
pub const SURVEY_ROWS: usize = 100;
pub const INCOMPLETE_ROWS: usize = 2;

/// Survey CSV where the stress rating mostly follows peer pressure
pub fn survey_csv() -> String {
    let mut csv = format!(
        "Timestamp,Your Academic Stage,Peer pressure,Academic pressure from your home,\
         Study Environment,What coping strategy you use as a student?,\
         Do you have any bad habits like smoking; drinking on a daily basis?,\
         What would you rate the academic  competition in your student life,{}\n",
        TARGET_HEADER
    );

    for i in 0..SURVEY_ROWS {
        let peer = PEER_PRESSURE[i % 10];
        let home = (i * 3 % 5) as i64 + 1;
        let competition = (i * 7 % 5) as i64 + 1;
        let target = if i % 17 == 0 { (peer + 1).min(5) } else { peer };
        let environment = if i == 5 || i == 50 {
            ""
        } else {
            ENVIRONMENTS[(i / 2) % 3]
        };

        csv.push_str(&format!(
            "24/07/2023 {:02}:{:02}:00,{},{},{},{},\"{}\",{},{},{}\n",
            i % 24,
            i % 60,
            STAGES[i % 3],
            peer,
            home,
            environment,
            COPING[(i / 3) % 3],
            HABITS[(i / 5) % 3],
            competition,
            target
        ));
    }

    csv
}

/// Write the survey CSV into `dir` and return its path
pub fn write_survey(dir: &Path) -> PathBuf {
    let path = dir.join("academic_stress.csv");
    std::fs::write(&path, survey_csv()).unwrap();
    path
}

/// Service reading the synthetic survey and saving into `dir`
pub fn survey_service(dir: &Path) -> ClassifierService {
    let csv = write_survey(dir);
    ClassifierService::new(
        ClassifierConfig::default()
            .with_dataset(DatasetSource::File(csv))
            .with_model_path(dir.join("models").join("model.bin")),
    )
}

/// Complete record of a highly pressured undergraduate
pub fn sample_record() -> RawRecord {
    let value = json!({
        "Your Academic Stage": "undergraduate",
        "Peer pressure": 5,
        "Academic pressure from your home": 4,
        "Study Environment": "Noisy",
        "What coping strategy you use as a student?": "Social support (friends, family)",
        "Do you have any bad habits like smoking; drinking on a daily basis?": "No",
        "What would you rate the academic  competition in your student life": 4,
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}
