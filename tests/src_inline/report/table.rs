use super::*;

use tempfile::TempDir;

fn header(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_write_csv_atomic_writes_header_and_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("out.csv");
    let rows = vec![vec!["T1", "0.5"], vec!["T2, B", ""]];
    write_csv_atomic(&path, &header(&["id", "dockq"]), rows).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text, "id,dockq\nT1,0.5\n\"T2, B\",\n");
}

#[test]
fn test_write_csv_atomic_replaces_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    fs::write(&path, "stale content that is longer than the new one\n").unwrap();
    write_csv_atomic(&path, &header(&["a"]), vec![vec!["1"]]).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "a\n1\n");
    let leftovers = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[test]
fn test_write_csv_atomic_header_only() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.csv");
    write_csv_atomic(&path, &header(&["method", "r"]), Vec::<Vec<String>>::new()).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "method,r\n");
}

#[test]
fn test_write_json_atomic() {
    #[derive(serde::Serialize)]
    struct Doc {
        n: usize,
    }
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("doc.json");
    crate::report::json::write_json_atomic(&path, &Doc { n: 3 }).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.ends_with("}\n"));
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["n"], 3);
}
