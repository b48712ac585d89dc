use std::collections::HashMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use lrt_predict::fasta;
use lrt_predict::search::{SearchHit, parse_tabular, select_best_hits, write_hit_sequences};

fn write_file(dir: &Utf8Path, name: &str, content: &str) -> Utf8PathBuf {
    let path = dir.join(name);
    fs::write(path.as_std_path(), content).unwrap();
    path
}

fn setup() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, dir)
}

fn hit(query: &str, subject: &str, e_value: f64, database: &Utf8Path) -> SearchHit {
    SearchHit {
        query_id: query.to_string(),
        subject_id: subject.to_string(),
        percent_identity: 90.0,
        alignment_length: 120,
        e_value,
        bit_score: 80.0,
        database: database.to_path_buf(),
    }
}

#[test]
fn best_hits_survive_from_raw_rows_to_sequences() {
    let (_temp, dir) = setup();
    let database = write_file(
        &dir,
        "speciesA_v2.cds.fa",
        ">S1\nATGAAA\n>S2\nATGCCC\nGGG\n>S3\nATGTTT\n",
    );
    let query = write_file(&dir, "queries.fa", ">Q1\nATGAAA\n");

    // Q1: one hit under threshold (1e-20), one above (1e-2), one weaker
    // under (1e-5); the 1e-20 row wins.
    let rows = "Q1 S1 90.0 100 5 0 1 100 1 100 1e-5 55\n\
                Q1 S2 95.0 110 2 0 1 110 1 110 1e-20 120\n\
                Q1 S3 80.0 90 9 1 1 90 1 90 1e-2 30\n";
    let hits = parse_tabular(rows, &database).unwrap();
    let best = select_best_hits(&hits, 1e-3);
    assert_eq!(best["Q1"].subject_id, "S2");

    let order = fasta::query_ids_in_order(&query).unwrap();
    let output = dir.join("queries_hits.fa");
    let written = write_hit_sequences(&best, &order, &output).unwrap();

    assert_eq!(written, 1);
    let content = fs::read_to_string(output.as_std_path()).unwrap();
    assert_eq!(content, ">S2\nATGCCC\nGGG\n");
}

#[test]
fn queries_below_threshold_produce_no_record() {
    let (_temp, dir) = setup();
    let database = write_file(&dir, "db.cds.fa", ">S1\nATG\n");

    let hits = vec![hit("Q1", "S1", 1e-1, &database)];
    let best = select_best_hits(&hits, 1e-3);

    let output = dir.join("hits.fa");
    let written = write_hit_sequences(&best, &["Q1".to_string()], &output).unwrap();

    assert_eq!(written, 0);
    assert_eq!(fs::read_to_string(output.as_std_path()).unwrap(), "");
}

#[test]
fn output_follows_input_query_order() {
    let (_temp, dir) = setup();
    let database = write_file(&dir, "db.cds.fa", ">S1\nAAA\n>S2\nCCC\n>S3\nGGG\n");
    let query = write_file(
        &dir,
        "panel.fa",
        ">Q3\nTTT\n>Q1\nTTT\n>Q2\nTTT\n",
    );

    // Rows arrive in an order unrelated to the query file.
    let mut best = HashMap::new();
    best.insert("Q1".to_string(), hit("Q1", "S1", 1e-10, &database));
    best.insert("Q2".to_string(), hit("Q2", "S2", 1e-12, &database));
    best.insert("Q3".to_string(), hit("Q3", "S3", 1e-9, &database));

    let order = fasta::query_ids_in_order(&query).unwrap();
    assert_eq!(order, vec!["Q3", "Q1", "Q2"]);

    let output = dir.join("panel_hits.fa");
    write_hit_sequences(&best, &order, &output).unwrap();

    let content = fs::read_to_string(output.as_std_path()).unwrap();
    let headers: Vec<&str> = content
        .lines()
        .filter(|line| line.starts_with('>'))
        .collect();
    assert_eq!(headers, vec![">S3", ">S1", ">S2"]);
}

#[test]
fn subject_missing_from_database_is_skipped() {
    let (_temp, dir) = setup();
    let database = write_file(&dir, "db.cds.fa", ">S1\nAAA\n");

    let mut best = HashMap::new();
    best.insert("Q1".to_string(), hit("Q1", "S1", 1e-10, &database));
    best.insert("Q2".to_string(), hit("Q2", "S9", 1e-10, &database));

    let output = dir.join("hits.fa");
    let order = vec!["Q1".to_string(), "Q2".to_string()];
    let written = write_hit_sequences(&best, &order, &output).unwrap();

    assert_eq!(written, 1);
    let content = fs::read_to_string(output.as_std_path()).unwrap();
    assert_eq!(content, ">S1\nAAA\n");
}
