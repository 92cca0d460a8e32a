// swcrv-aio/src/json_io.rs
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use swcrv_common::error::Result;
use tracing::debug;

/// Pretty-printed JSON with a trailing newline, the way npm writes manifests.
pub fn to_json_bytes<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(data)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Reading JSON from: {}", path.display());
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
    struct Manifest {
        name: String,
        version: String,
    }

    #[test]
    fn writes_trailing_newline_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        let manifest = Manifest {
            name: "next".into(),
            version: "13.5.6".into(),
        };
        let bytes = to_json_bytes(&manifest).unwrap();
        assert!(bytes.ends_with(b"}\n"));
        std::fs::write(&path, &bytes).unwrap();
        let read: Manifest = read_json(&path).unwrap();
        assert_eq!(read, manifest);
    }
}
