use std::fs;

use camino::Utf8PathBuf;

use lrt_predict::domain::{RemoteResource, Source};
use lrt_predict::store::{Metadata, Store, iso_timestamp};

#[test]
fn species_directory_is_created_lazily() {
    let temp = tempfile::tempdir().unwrap();
    let base = Utf8PathBuf::from_path_buf(temp.path().join("cds")).unwrap();
    let store = Store::new(base.clone());

    let resource = RemoteResource {
        source: Source::Phytozome,
        url: "https://genome.jgi.doe.gov/a/speciesA_v2.cds.fa.gz".to_string(),
        md5: None,
        species: "speciesA".parse().unwrap(),
    };
    let entry = store.local_entry(&resource);
    assert_eq!(entry.path, base.join("speciesA/speciesA_v2.cds.fa.gz"));
    assert!(!store.exists(&entry));

    store.ensure_species_dir(&entry).unwrap();
    assert!(entry.species_dir.as_std_path().is_dir());

    fs::write(entry.path.as_std_path(), b"cds").unwrap();
    assert!(store.exists(&entry));
}

#[test]
fn metadata_round_trips_through_disk() {
    let temp = tempfile::tempdir().unwrap();
    let base = Utf8PathBuf::from_path_buf(temp.path().join("cds")).unwrap();
    let store = Store::new(base);

    let species = "Sitalica".parse().unwrap();
    let path = store.metadata_path(&species, "Sitalica_164_v2.1.cds.fa.gz");
    let metadata = Metadata {
        source: "phytozome".to_string(),
        species: "Sitalica".to_string(),
        url: "https://genome.jgi.doe.gov/a/Sitalica_164_v2.1.cds.fa.gz".to_string(),
        file: "Sitalica_164_v2.1.cds.fa.gz".to_string(),
        md5: Some("0123456789abcdef0123456789abcdef".to_string()),
        downloaded_at: iso_timestamp(),
        tool: "lrt-predict/0.1.0".to_string(),
    };

    Store::write_metadata(&path, &metadata).unwrap();

    let content = fs::read_to_string(path.as_std_path()).unwrap();
    let read_back: Metadata = serde_json::from_str(&content).unwrap();
    assert_eq!(read_back.species, "Sitalica");
    assert_eq!(read_back.md5, metadata.md5);
    assert!(!path.with_extension("json.tmp").as_std_path().exists());
}
