use std::path::PathBuf;

use stepmesh::{import_step_file, ImportError, ImportOptions, Protocol};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[tokio::test]
async fn imports_block_from_disk() {
    let result = import_step_file(fixture("block.step"), ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(result.metadata.header.protocol, Protocol::Ap214);
    assert_eq!(result.mesh.num_triangles(), 12);
    assert!(result.warnings.is_empty());
    assert!(result.metadata.euler[0].is_valid());
}

#[tokio::test]
async fn options_from_toml_apply_to_file_import() {
    let options = ImportOptions::from_toml_str("[tessellation]\ncircle_segments = 16\ncurve_segments = 16\n").unwrap();
    let result = import_step_file(fixture("cylinder.step"), options).await.unwrap();
    // 16 x 8 side grid plus two 16-gon caps.
    assert_eq!(result.mesh.num_triangles(), 256 + 14 + 14);
}

#[tokio::test]
async fn missing_file_is_io_error() {
    let err = import_step_file(fixture("missing.step"), ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Io(_)));
}
