use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tempfile::TempDir;
use url::Url;

use petpack::publish::{KEY_CFG, KEY_FPS, KEY_PACK_ID};
use petpack::{
    read_active, ActiveSprite, InstallOptions, Manifest, PackError, PackManager, PlaceholderReason, PngProbe,
    StoreHandle, Transport,
};

const HOST: &str = "https://pets.example.com/packs";

/// Serves packs from memory, keyed by full URL.
#[derive(Default)]
struct PackHost {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl PackHost {
    fn add_pack(&self, id: &str, width: u32, height: u32) {
        let manifest = json!({
            "id": id, "name": format!("Pet {}", id), "fps": 2,
            "variants": [
                { "scale": 1, "cols": 6, "rows": 3, "cellPx": { "w": 160, "h": 160 }, "sprite": "s@1x.png" },
                { "scale": 3, "cols": 6, "rows": 3, "cellPx": { "w": 480, "h": 480 }, "sprite": "s.png" }
            ]
        });
        let mut files = self.files.lock().unwrap();
        files.insert(format!("{}/{}/manifest.json", HOST, id), manifest.to_string().into_bytes());
        files.insert(format!("{}/{}/s.png", HOST, id), png_header(width, height));
    }
}

impl Transport for PackHost {
    fn get(&self, url: &Url) -> petpack::Result<Vec<u8>> {
        self.files.lock().unwrap().get(url.as_str()).cloned().ok_or_else(|| PackError::Transport {
            url: url.to_string(),
            reason: "404 Not Found".to_string(),
        })
    }
}

fn png_header(width: u32, height: u32) -> Vec<u8> {
    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
    out.extend_from_slice(&13u32.to_be_bytes());
    out.extend_from_slice(b"IHDR");
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&[8, 6, 0, 0, 0, 0, 0, 0, 0]);
    out
}

fn manifest_url(id: &str) -> Url {
    Url::parse(&format!("{}/{}/manifest.json", HOST, id)).unwrap()
}

fn manager_with(dir: &TempDir, ids: &[&str]) -> PackManager<PackHost, PngProbe> {
    let host = PackHost::default();
    for id in ids {
        host.add_pack(id, 2880, 1440);
    }
    PackManager::new(StoreHandle::open(dir.path()), host, PngProbe, InstallOptions::default())
}

#[test]
fn install_activate_remove_round() {
    let dir = TempDir::new().unwrap();
    let manager = manager_with(&dir, &["cube", "blob"]);

    let cube = manager.install(&manifest_url("cube")).unwrap().meta;
    let blob = manager.install(&manifest_url("blob")).unwrap().meta;
    assert_eq!(cube.scale, 3);
    assert_eq!(cube.filename, "s.png");
    assert_eq!(manager.list().installed, vec![cube.clone(), blob.clone()]);

    manager.activate("cube").unwrap();
    let store = manager.store();
    assert_eq!(store.defaults().get(KEY_CFG), Some(json!([6, 3, 480, 480])));
    assert_eq!(store.defaults().get(KEY_FPS), Some(json!(2.0)));
    assert_eq!(store.defaults().get(KEY_PACK_ID), Some(json!("cube")));

    // a second process only needs the root to see the same state
    let reader = StoreHandle::open(dir.path());
    match read_active(&reader, &PngProbe) {
        ActiveSprite::Ready(publication) => assert_eq!(publication.pack_id.as_deref(), Some("cube")),
        other => panic!("expected a ready sprite, got {:?}", other),
    }

    manager.remove("blob").unwrap();
    assert_eq!(manager.list().active_pack_id.as_deref(), Some("cube"));
    manager.remove("cube").unwrap();
    assert_eq!(manager.list().active_pack_id, None);
    assert_eq!(read_active(&reader, &PngProbe), ActiveSprite::Placeholder(PlaceholderReason::NotPublished));
    assert!(manager.verify(false).unwrap().is_clean());
}

#[test]
fn persisted_layout_matches_readers() {
    let dir = TempDir::new().unwrap();
    let manager = manager_with(&dir, &["cube"]);
    manager.install(&manifest_url("cube")).unwrap();
    manager.activate("cube").unwrap();

    let root = dir.path();
    assert!(root.join("Packs/cube/manifest.json").is_file());
    assert!(root.join("Packs/cube/s.png").is_file());
    assert!(root.join("current-sprite.png").is_file());

    let index: serde_json::Value = serde_json::from_slice(&fs::read(root.join("Packs/index.json")).unwrap()).unwrap();
    assert_eq!(index["activePackId"], "cube");
    assert_eq!(index["installed"][0]["id"], "cube");
    assert_eq!(index["installed"][0]["cellH"], 480);

    let stored = Manifest::from_slice(&fs::read(root.join("Packs/cube/manifest.json")).unwrap()).unwrap();
    assert_eq!(stored.id, "cube");
}

#[test]
fn concurrent_installs_keep_every_entry() {
    let dir = TempDir::new().unwrap();
    let ids: Vec<String> = (0..8).map(|i| format!("pet-{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let manager = manager_with(&dir, &id_refs);

    thread::scope(|scope| {
        for id in &ids {
            let manager = &manager;
            scope.spawn(move || manager.install(&manifest_url(id)).unwrap());
        }
    });

    let mut installed: Vec<String> = manager.list().installed.into_iter().map(|m| m.id).collect();
    installed.sort();
    assert_eq!(installed, ids);
}

/// Every manifest a reader finds must have its sprite next to it.
fn check_manifest_implies_sprite(packs: &Path) {
    let Ok(entries) = fs::read_dir(packs) else { return };
    for entry in entries.flatten() {
        let dir = entry.path();
        let Ok(data) = fs::read(dir.join("manifest.json")) else { continue };
        let manifest = Manifest::from_slice(&data).expect("manifest must never be half written");
        for variant in manifest.variants.iter().filter(|v| v.scale == 3) {
            assert!(dir.join(&variant.sprite).is_file(), "{} has a manifest but no sprite", dir.display());
        }
    }
}

#[test]
fn readers_never_see_manifest_without_sprite() {
    let dir = TempDir::new().unwrap();
    let ids: Vec<String> = (0..25).map(|i| format!("pack{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let manager = manager_with(&dir, &id_refs);
    let packs = manager.store().packs_root();
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        scope.spawn(|| {
            while !done.load(Ordering::Acquire) {
                check_manifest_implies_sprite(&packs);
            }
        });
        for id in &ids {
            manager.install(&manifest_url(id)).unwrap();
            manager.install(&manifest_url(id)).unwrap();
        }
        done.store(true, Ordering::Release);
    });
    check_manifest_implies_sprite(&packs);
}

#[test]
fn random_operation_sequences_keep_index_consistent() {
    let dir = TempDir::new().unwrap();
    let ids = ["a", "b", "c", "d"];
    let manager = manager_with(&dir, &ids);
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..200 {
        let id = ids[rng.gen_range(0..ids.len())];
        match rng.gen_range(0..3) {
            0 => {
                manager.install(&manifest_url(id)).unwrap();
            }
            1 => {
                manager.remove(id).unwrap();
            }
            _ => {
                let installed = manager.list().meta(id).is_some();
                match manager.activate(id) {
                    Ok(_) => assert!(installed),
                    Err(PackError::NotFound(_)) => assert!(!installed),
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        }

        let index = manager.list();
        if let Some(active) = &index.active_pack_id {
            assert!(index.meta(active).is_some(), "active id {} is dangling", active);
        }
        let mut seen: Vec<&str> = index.installed.iter().map(|m| m.id.as_str()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), index.installed.len());
    }
}
