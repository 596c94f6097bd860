use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("pcmatch").unwrap()
}

fn fixture(tmp: &TempDir) {
    fs::write(
        tmp.path().join("properties.csv"),
        "id,latitude,longitude\n1,54.97,-1.61\n2,60.0,5.0\n",
    )
    .unwrap();
    fs::write(
        tmp.path().join("postcodes.csv"),
        "Postcode,Latitude,Longitude\nNE1 1AA,54.97,-1.61\nNE2 2BB,55.50,-1.40\n",
    )
    .unwrap();
}

#[test]
fn match_with_flags() {
    let tmp = TempDir::new().unwrap();
    fixture(&tmp);
    let out = tmp.path().join("out.csv");

    cmd()
        .current_dir(tmp.path())
        .args([
            "match",
            "--properties",
            "properties.csv",
            "--postcodes",
            "postcodes.csv",
            "--output",
            "out.csv",
        ])
        .assert()
        .success()
        .stdout(contains("Rows: 2"))
        .stdout(contains("matched 1"));

    let text = fs::read_to_string(out).unwrap();
    assert!(text.starts_with("property_id,postcode,distance_m\n1,NE1 1AA,0"));
    assert!(text.contains("\n2,,"));
}

#[test]
fn match_with_config_file() {
    let tmp = TempDir::new().unwrap();
    fixture(&tmp);
    fs::write(
        tmp.path().join("run.toml"),
        "properties_path = \"properties.csv\"\n\
         postcodes_path = \"postcodes.csv\"\n\
         output_path = \"out.csv\"\n\
         max_match_distance_m = 1000000.0\n",
    )
    .unwrap();

    cmd()
        .current_dir(tmp.path())
        .args(["match", "--config", "run.toml", "--parallel"])
        .assert()
        .success()
        .stdout(contains("matched 2"));
}

#[test]
fn no_parallel_overrides_config_file() {
    let tmp = TempDir::new().unwrap();
    fixture(&tmp);
    fs::write(
        tmp.path().join("run.toml"),
        "properties_path = \"properties.csv\"\n\
         postcodes_path = \"postcodes.csv\"\n\
         output_path = \"out.csv\"\n\
         parallel = true\n",
    )
    .unwrap();

    cmd()
        .current_dir(tmp.path())
        .args(["match", "--config", "run.toml", "--no-parallel"])
        .assert()
        .success()
        .stdout(contains("Rows: 2"));

    cmd()
        .current_dir(tmp.path())
        .args(["match", "--config", "run.toml", "--parallel", "--no-parallel"])
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}

#[test]
fn empty_gazetteer_fails() {
    let tmp = TempDir::new().unwrap();
    fixture(&tmp);
    fs::write(tmp.path().join("postcodes.csv"), "postcode,lat,lon\n").unwrap();

    cmd()
        .current_dir(tmp.path())
        .args([
            "match",
            "--properties",
            "properties.csv",
            "--postcodes",
            "postcodes.csv",
            "--output",
            "out.csv",
        ])
        .assert()
        .failure()
        .stderr(contains("reference set is empty"));
    assert!(!tmp.path().join("out.csv").exists());
}

#[test]
fn match_requires_paths_without_config() {
    cmd()
        .args(["match", "--properties", "p.csv"])
        .assert()
        .failure()
        .stderr(contains("required"));
}

#[test]
fn negative_threshold_rejected() {
    let tmp = TempDir::new().unwrap();
    fixture(&tmp);
    cmd()
        .current_dir(tmp.path())
        .args([
            "match",
            "--properties",
            "properties.csv",
            "--postcodes",
            "postcodes.csv",
            "--output",
            "out.csv",
            "--max-distance=-5",
        ])
        .assert()
        .failure()
        .stderr(contains("max_match_distance_m"));
}

#[test]
fn trim_with_bbox() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("uprn.csv"),
        "UPRN,X_COORDINATE,Y_COORDINATE,LATITUDE,LONGITUDE\n\
         1,1,1,54.9,-1.6\n\
         2,1,1,51.5,-0.1\n",
    )
    .unwrap();

    cmd()
        .current_dir(tmp.path())
        .args([
            "trim",
            "--input",
            "uprn.csv",
            "--output",
            "ne.csv",
            "--keep",
            "UPRN,LATITUDE,LONGITUDE",
            "--bbox",
            "54.5,55.3,-2.2,-1.1",
        ])
        .assert()
        .success()
        .stdout(contains("Kept 1 of 2 rows"));

    assert_eq!(
        fs::read_to_string(tmp.path().join("ne.csv")).unwrap(),
        "UPRN,LATITUDE,LONGITUDE\n1,54.9,-1.6\n"
    );
}

#[test]
fn trim_reports_missing_columns() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("epc.csv"), "POSTCODE,ADDRESS1\nNE1,x\n").unwrap();

    cmd()
        .current_dir(tmp.path())
        .args([
            "trim",
            "--input",
            "epc.csv",
            "--output",
            "out.csv",
            "--keep",
            "POSTCODE,POSTTOWN,TOTAL_FLOOR_AREA",
        ])
        .assert()
        .failure()
        .stderr(contains("POSTTOWN, TOTAL_FLOOR_AREA"));
    assert!(!tmp.path().join("out.csv").exists());
}
