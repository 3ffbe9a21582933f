use image::{GrayImage, Luma, Rgb, RgbImage};
use janus_core::fake::FakeSdk;
use janus_core::{
    AttributeList, JanusError, Media, MemoryGallery, Stage, TemplateSdk, MASK_MATCH,
    MASK_NON_MATCH,
};
use janus_harness::{Harness, HarnessConfig, HarnessError};
use std::path::{Path, PathBuf};

fn config(dir: &Path) -> HarnessConfig {
    HarnessConfig {
        sdk_path: dir.to_path_buf(),
        temp_path: dir.to_path_buf(),
        algorithm: "test".into(),
        ..HarnessConfig::default()
    }
}

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

/// Payload of a matrix file: everything after the fourth newline.
fn payload(bytes: &[u8]) -> &[u8] {
    let mut rest = bytes;
    for _ in 0..4 {
        let end = rest.iter().position(|&b| b == b'\n').unwrap();
        rest = &rest[end + 1..];
    }
    rest
}

#[test]
fn test_invalid_sdk_path_fails_before_initialize() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.sdk_path = dir.path().join("no-such-sdk");
    let err = Harness::new(cfg, FakeSdk::new()).err().unwrap();
    assert!(matches!(err, HarnessError::Janus(JanusError::InvalidSdkPath(_))));
}

#[test]
fn test_initialize_and_finish_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    let metrics_path = dir.path().join("metrics.json");
    cfg.metrics_json = Some(metrics_path.clone());

    let harness = Harness::new(cfg, FakeSdk::new()).unwrap();
    assert_eq!(harness.sdk().session(), Some("test"));

    let (sdk, metrics) = harness.finish().unwrap();
    assert_eq!(sdk.session(), None);
    assert_eq!(metrics.summary(Stage::Verify).count, 0);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&metrics_path).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 7);
}

#[test]
fn test_create_template_writes_flat_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let meta = write(dir.path(), "one.csv", "Template_ID,File_Name,Frame\n7,a.png,1\n7,b.png,2\n");
    let output = dir.path().join("one.tmpl");

    let harness = Harness::new(config(dir.path()), FakeSdk::new()).unwrap();
    let id = harness.create_template(&meta, &output).unwrap();

    assert_eq!(id, Some(7));
    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(bytes.len(), FakeSdk::TEMPLATE_LEN);
    assert_eq!(&bytes[..4], &2u32.to_le_bytes());
    assert_eq!(&bytes[4..], &3f32.to_le_bytes());
}

#[test]
fn test_finish_writes_metrics_before_failed_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    let metrics_path = dir.path().join("metrics.json");
    cfg.metrics_json = Some(metrics_path.clone());

    let harness = Harness::new(cfg, FakeSdk::new().failing_shutdown()).unwrap();
    let err = harness.finish().err().unwrap();

    assert!(matches!(err, HarnessError::Janus(JanusError::Unknown(_))));
    assert!(metrics_path.exists());
}

#[test]
fn test_verbose_run_matches_quiet_run() {
    let dir = tempfile::tempdir().unwrap();
    let target = write(dir.path(), "target.csv", "Template_ID,File_Name\n1,a\n1,b\n2,c\n");
    let query = write(dir.path(), "query.csv", "Template_ID,File_Name\n2,d\n1,e\n");
    let quiet_out = dir.path().join("quiet.mtx");
    let loud_out = dir.path().join("loud.mtx");

    let quiet = Harness::new(config(dir.path()), FakeSdk::new()).unwrap();
    quiet.create_simmat(&target, &query, &quiet_out).unwrap();

    let mut cfg = config(dir.path());
    cfg.verbose = true;
    let loud = Harness::new(cfg, FakeSdk::new()).unwrap();
    loud.create_simmat(&target, &query, &loud_out).unwrap();
    let mut gallery = MemoryGallery::new();
    assert_eq!(loud.create_gallery(&target, &mut gallery).unwrap(), 2);

    assert_eq!(std::fs::read(&quiet_out).unwrap(), std::fs::read(&loud_out).unwrap());

    // Verbose finish also prints the metrics table.
    let (_, metrics) = loud.finish().unwrap();
    assert_eq!(metrics.summary(Stage::Verify).count, 4);
}

#[test]
fn test_missing_file_name_column_stops_everything() {
    let dir = tempfile::tempdir().unwrap();
    let meta = write(dir.path(), "bad.csv", "Template_ID,Frame\n1,2\n");
    let output = dir.path().join("bad.tmpl");

    let harness = Harness::new(config(dir.path()), FakeSdk::new()).unwrap();
    let err = harness.create_template(&meta, &output).unwrap_err();

    assert!(matches!(err, HarnessError::Janus(JanusError::MissingFileName)));
    assert!(harness.sdk().reads().is_empty());
    assert_eq!(harness.metrics().summary(Stage::InitializeTemplate).count, 0);
    assert!(!output.exists());
}

#[test]
fn test_create_gallery_uses_data_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let meta = write(
        dir.path(),
        "gallery.csv",
        "File_Name,Template_ID\na.png,1\nb.png,2\nc.png,2\n",
    );
    let mut cfg = config(dir.path());
    cfg.data_prefix = Some(PathBuf::from("/images"));

    let harness = Harness::new(cfg, FakeSdk::new()).unwrap();
    let mut gallery = MemoryGallery::new();
    assert_eq!(harness.create_gallery(&meta, &mut gallery).unwrap(), 2);

    assert_eq!(gallery.ids().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(harness.sdk().reads()[0], PathBuf::from("/images/a.png"));
}

#[test]
fn test_simmat_and_mask_agree_on_shape() {
    let dir = tempfile::tempdir().unwrap();
    let target = write(dir.path(), "target.csv", "Template_ID,File_Name\n10,a\n20,b\n10,c\n");
    let query = write(dir.path(), "query.csv", "Template_ID,File_Name\n20,d\n10,e\n10,f\n");
    let simmat = dir.path().join("out.mtx");
    let mask = dir.path().join("out.mask");

    let harness = Harness::new(config(dir.path()), FakeSdk::new()).unwrap();
    harness.create_simmat(&target, &query, &simmat).unwrap();
    harness.create_mask(&target, &query, &mask).unwrap();

    let scores = std::fs::read(&simmat).unwrap();
    assert_eq!(payload(&scores).len(), 2 * 3 * 4);

    let mask_bytes = std::fs::read(&mask).unwrap();
    assert_eq!(
        payload(&mask_bytes),
        &[MASK_NON_MATCH, MASK_MATCH, MASK_NON_MATCH, MASK_MATCH, MASK_NON_MATCH, MASK_MATCH]
    );
    assert_eq!(harness.metrics().summary(Stage::Verify).count, 6);
}

#[test]
fn test_simmat_verify_failure_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = write(dir.path(), "target.csv", "Template_ID,File_Name\n1,a\n");
    let query = write(dir.path(), "query.csv", "Template_ID,File_Name\n1,b\n");
    let simmat = dir.path().join("out.mtx");

    let harness = Harness::new(config(dir.path()), FakeSdk::new().failing_verify()).unwrap();
    let err = harness.create_simmat(&target, &query, &simmat).unwrap_err();

    assert!(matches!(err, HarnessError::Janus(JanusError::Unknown(_))));
    assert!(!simmat.exists());
}

/// Scores templates by mean pixel brightness of real decoded images.
struct BrightnessSdk;

impl TemplateSdk for BrightnessSdk {
    type Image = Media;
    type Template = Vec<f32>;

    fn max_template_size(&self) -> usize {
        4
    }

    fn read_image(&self, path: &Path) -> janus_core::Result<Media> {
        Media::read(path)
    }

    fn initialize_template(&self) -> janus_core::Result<Vec<f32>> {
        Ok(Vec::new())
    }

    fn add_image(
        &self,
        image: &Media,
        _attributes: &AttributeList,
        template: &mut Vec<f32>,
    ) -> janus_core::Result<()> {
        if image.data.is_empty() {
            return Err(JanusError::InvalidImage("empty".into()));
        }
        let mean = image.data.iter().map(|&b| b as f32).sum::<f32>() / image.data.len() as f32;
        template.push(mean);
        Ok(())
    }

    fn finalize_template(
        &self,
        template: Vec<f32>,
        buffer: &mut [u8],
    ) -> janus_core::Result<usize> {
        let mean = template.iter().sum::<f32>() / template.len().max(1) as f32;
        buffer[..4].copy_from_slice(&mean.to_le_bytes());
        Ok(4)
    }

    fn verify(&self, a: &[u8], b: &[u8]) -> janus_core::Result<f32> {
        let read = |buf: &[u8]| {
            buf.try_into()
                .map(f32::from_le_bytes)
                .map_err(|_| JanusError::Parse("bad template".into()))
        };
        Ok(-(read(a)? - read(b)?).abs())
    }
}

#[test]
fn test_real_images_through_media_reader() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    std::fs::create_dir(&images).unwrap();
    GrayImage::from_pixel(8, 8, Luma([100])).save(images.join("dark.png")).unwrap();
    RgbImage::from_pixel(8, 8, Rgb([200, 200, 200])).save(images.join("bright.png")).unwrap();
    GrayImage::from_pixel(8, 8, Luma([104])).save(images.join("query.png")).unwrap();

    let target = write(
        dir.path(),
        "target.csv",
        "Template_ID,File_Name\n1,dark.png\n2,bright.png\n",
    );
    let query = write(dir.path(), "query.csv", "Template_ID,File_Name\n1,query.png\n");
    let simmat = dir.path().join("out.mtx");

    let mut cfg = config(dir.path());
    cfg.data_prefix = Some(images);
    let harness = Harness::new(cfg, BrightnessSdk).unwrap();
    harness.create_simmat(&target, &query, &simmat).unwrap();

    let bytes = std::fs::read(&simmat).unwrap();
    let scores: Vec<f32> = payload(&bytes)
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(scores.len(), 2);
    assert!((scores[0] + 4.0).abs() < 1e-4);
    assert!((scores[1] + 96.0).abs() < 1e-4);
    assert!(scores[0] > scores[1]);
}

#[test]
fn test_missing_image_file_is_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let target = write(dir.path(), "target.csv", "Template_ID,File_Name\n1,gone.png\n");
    let query = write(dir.path(), "query.csv", "Template_ID,File_Name\n1,gone.png\n");
    let mut cfg = config(dir.path());
    cfg.data_prefix = Some(dir.path().to_path_buf());

    let harness = Harness::new(cfg, BrightnessSdk).unwrap();
    let err = harness
        .create_simmat(&target, &query, &dir.path().join("out.mtx"))
        .unwrap_err();
    assert!(matches!(err, HarnessError::Janus(JanusError::Open(_))));
    assert_eq!(harness.metrics().summary(Stage::ReadImage).count, 1);
}
