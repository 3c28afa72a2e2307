use assert_cmd::prelude::*;
use assert_fs::prelude::*;

use predicates::prelude::*;
use predicates::str::contains;
use std::process::Command;

const PROJECTS: &str = "\
id,ProjectName,ProjectType
1,Hill Crest,Residential
2,Sea Breeze,Residential
3,Palm Court,Residential
";

const ADDRESSES: &str = "\
ProjectId;FullAddress;City
1;Baner Road;Pune
2;Andheri West;Mumbai
3;Powai;Mumbai
";

const CONFIGURATIONS: &str = "\
projectid|Type|Price
1|2 BHK|45 L
2|2 BHK|1.8 Cr
3|3 BHK|95 L
";

/// Data directory with three linked tables in different delimiters
fn listings_dir() -> assert_fs::TempDir {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("1_projects.csv").write_str(&PROJECTS.replace("id,", "project_id,")).unwrap();
    temp.child("2_addresses.csv").write_str(ADDRESSES).unwrap();
    temp.child("3_configurations.csv").write_str(CONFIGURATIONS).unwrap();
    temp
}

/// Helper to create a Command for the `nestor` binary against a data directory
fn nestor_cmd(data_dir: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nestor").expect("binary exists");
    cmd.arg("--data-dir").arg(data_dir.path());
    cmd.env_remove("NESTOR_DATA_DIR");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_search_filters_joined_tables() {
    let temp = listings_dir();

    nestor_cmd(&temp)
        .args(["search", "2bhk", "in", "pune", "under", "50L"])
        .assert()
        .success()
        .stderr(contains("3 rows available"))
        .stdout(contains("Hill Crest").and(contains("Baner Road")).and(contains("Sea Breeze").not()));

    temp.close().unwrap();
}

#[test]
fn test_search_cheapest_first() {
    let temp = listings_dir();

    let output = nestor_cmd(&temp)
        .args(["search", "cheapest", "homes", "in", "mumbai"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let palm = stdout.find("Palm Court").expect("Palm Court listed");
    let sea = stdout.find("Sea Breeze").expect("Sea Breeze listed");
    assert!(palm < sea);
    assert!(stdout.contains("Most affordable"));

    temp.close().unwrap();
}

#[test]
fn test_search_no_matches() {
    let temp = listings_dir();

    nestor_cmd(&temp)
        .args(["search", "4bhk", "in", "chennai"])
        .assert()
        .success()
        .stdout(contains("No matches"));

    temp.close().unwrap();
}

#[test]
fn test_search_json_output() {
    let temp = listings_dir();

    let output = nestor_cmd(&temp)
        .args(["search", "--json", "top", "1", "luxury", "flats", "in", "mumbai"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let reply: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reply["filter"]["city"], "mumbai");
    assert_eq!(reply["filter"]["limit"], 1);
    assert_eq!(reply["filter"]["intents"][0], "luxury");
    assert_eq!(reply["result"]["total_matches"], 2);
    assert_eq!(reply["result"]["rows"][0]["record"]["projectname"], "Sea Breeze");
    assert_eq!(reply["result"]["rows"][0]["price"], 18000000.0);

    temp.close().unwrap();
}

#[test]
fn test_empty_data_dir_is_not_fatal() {
    let temp = assert_fs::TempDir::new().unwrap();

    nestor_cmd(&temp)
        .args(["search", "2bhk", "in", "pune"])
        .assert()
        .success()
        .stderr(contains("No property data loaded"));

    temp.close().unwrap();
}

#[test]
fn test_parse_command() {
    let temp = assert_fs::TempDir::new().unwrap();

    nestor_cmd(&temp)
        .args(["parse", "top", "3", "luxury", "flats", "in", "mumbai"])
        .assert()
        .success()
        .stdout(
            contains("city:      mumbai")
                .and(contains("intents:   luxury"))
                .and(contains("limit:     3")),
        );

    temp.close().unwrap();
}

#[test]
fn test_preview_shows_head() {
    let temp = listings_dir();

    nestor_cmd(&temp)
        .args(["preview", "--rows", "1"])
        .assert()
        .success()
        .stdout(contains("projectname").and(contains("Hill Crest")).and(contains("Sea Breeze").not()));

    temp.close().unwrap();
}

#[test]
fn test_chat_session() {
    let temp = listings_dir();

    assert_cmd::Command::from_std(nestor_cmd(&temp))
        .arg("chat")
        .write_stdin("homes in pune\n:history\n:quit\n")
        .assert()
        .success()
        .stdout(contains("Hill Crest").and(contains("you")).and(contains("homes in pune")));

    temp.close().unwrap();
}

#[test]
fn test_config_file_default_limit() {
    let temp = listings_dir();
    let config = temp.child("nestor.json");
    config.write_str(r#"{"default_limit": 1}"#).unwrap();

    nestor_cmd(&temp)
        .arg("--config")
        .arg(config.path())
        .args(["search", "homes", "in", "mumbai"])
        .assert()
        .success()
        .stdout(contains("Showing 1 of 2 matching properties"));

    temp.close().unwrap();
}
